//! Input validation for signup payloads

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{ApiError, ApiResult};
use crate::models::NewUser;

/// Validate username
pub fn validate_username(username: &str) -> ApiResult<()> {
    if username.is_empty() {
        return Err(ApiError::Validation("Username is required".to_string()));
    }

    if username.len() < 3 {
        return Err(ApiError::Validation(
            "Username must be at least 3 characters long".to_string(),
        ));
    }

    if username.len() > 32 {
        return Err(ApiError::Validation(
            "Username must be at most 32 characters long".to_string(),
        ));
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err(ApiError::Validation(
            "Username can only contain letters, numbers, and underscores".to_string(),
        ));
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> ApiResult<()> {
    if email.is_empty() {
        return Err(ApiError::Validation("Email is required".to_string()));
    }

    if email.len() > 254 {
        return Err(ApiError::Validation(
            "Email must be at most 254 characters long".to_string(),
        ));
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> ApiResult<()> {
    if password.is_empty() {
        return Err(ApiError::Validation("Password is required".to_string()));
    }

    if password.chars().count() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    if password.chars().count() > 128 {
        return Err(ApiError::Validation(
            "Password must be at most 128 characters long".to_string(),
        ));
    }

    Ok(())
}

/// Validate the whole signup payload
pub fn validate_signup(user: &NewUser) -> ApiResult<()> {
    validate_username(&user.username)?;
    validate_email(&user.email)?;
    validate_password(&user.password)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_reasonable_usernames() {
        assert!(validate_username("nuevo_usuario").is_ok());
        assert!(validate_username("abc").is_ok());
    }

    #[test]
    fn rejects_bad_usernames() {
        assert!(validate_username("").is_err());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has spaces").is_err());
    }

    #[test]
    fn validates_email_shape() {
        assert!(validate_email("usuario@ejemplo.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn validates_password_length() {
        assert!(validate_password("contraseñaSegura123").is_ok());
        assert!(validate_password("corta").is_err());
    }
}
