//! User model and related payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity
#[derive(Debug, Clone, Serialize)]
pub struct User {
    #[serde(rename = "usuario_id")]
    pub id: i32,
    pub username: String,
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido1")]
    pub last_name: String,
    #[serde(rename = "apellido2")]
    pub second_last_name: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(rename = "fecha_registro")]
    pub registered_at: DateTime<Utc>,
    #[serde(rename = "ubicacion")]
    pub location: Option<String>,
}

/// Signup payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido1")]
    pub last_name: String,
    #[serde(rename = "apellido2", default)]
    pub second_last_name: Option<String>,
    pub email: String,
    #[serde(rename = "contraseña", alias = "contrasena")]
    pub password: String,
    #[serde(rename = "ubicacion", default)]
    pub location: Option<String>,
}

/// Self-service profile patch. A field present in the payload is applied
/// even when its value is falsy; an absent field is left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    #[serde(rename = "nombre")]
    pub first_name: Option<String>,
    #[serde(rename = "apellido1")]
    pub last_name: Option<String>,
    #[serde(rename = "apellido2")]
    pub second_last_name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "ubicacion")]
    pub location: Option<String>,
}

/// Login payload
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}
