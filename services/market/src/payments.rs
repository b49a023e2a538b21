//! External payment-checkout integration
//!
//! The checkout provider is opaque to this service: one form-encoded
//! POST creates a checkout session and hands back a redirect URL plus an
//! opaque payment id. Provider errors surface as 400 with the provider's
//! own message.

use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::error;

use crate::error::{ApiError, ApiResult};

const CHECKOUT_SESSIONS_URL: &str = "https://api.stripe.com/v1/checkout/sessions";

/// Payment provider configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl StripeConfig {
    /// Create a new StripeConfig from environment variables
    ///
    /// # Environment Variables
    /// - `STRIPE_SECRET_KEY`: API key for the checkout provider
    /// - `CHECKOUT_SUCCESS_URL` / `CHECKOUT_CANCEL_URL`: redirect targets
    pub fn from_env() -> Self {
        let secret_key = std::env::var("STRIPE_SECRET_KEY").unwrap_or_default();
        let success_url = std::env::var("CHECKOUT_SUCCESS_URL")
            .unwrap_or_else(|_| "http://localhost:3000/checkout-success".to_string());
        let cancel_url = std::env::var("CHECKOUT_CANCEL_URL")
            .unwrap_or_else(|_| "http://localhost:3000/cancel".to_string());

        StripeConfig {
            secret_key,
            success_url,
            cancel_url,
        }
    }
}

/// Checkout session returned by the provider
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    message: String,
}

/// Thin client over the checkout provider's HTTP API
#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    config: StripeConfig,
}

impl StripeClient {
    /// Create a new checkout client
    pub fn new(config: StripeConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Create a single-item card checkout session in EUR
    pub async fn create_checkout_session(
        &self,
        product_name: &str,
        amount: Decimal,
    ) -> ApiResult<CheckoutSession> {
        let unit_amount = eur_to_cents(amount)
            .ok_or_else(|| ApiError::Validation("Invalid transaction amount".to_string()))?;
        let unit_amount = unit_amount.to_string();

        let params = [
            ("payment_method_types[]", "card"),
            ("line_items[0][price_data][currency]", "eur"),
            ("line_items[0][price_data][product_data][name]", product_name),
            ("line_items[0][price_data][unit_amount]", &unit_amount),
            ("line_items[0][quantity]", "1"),
            ("mode", "payment"),
            ("success_url", &self.config.success_url),
            ("cancel_url", &self.config.cancel_url),
        ];

        let response = self
            .http
            .post(CHECKOUT_SESSIONS_URL)
            .basic_auth(&self.config.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!("Checkout provider unreachable: {e}");
                ApiError::Upstream(e.to_string())
            })?;

        if !response.status().is_success() {
            let detail = match response.json::<ProviderError>().await {
                Ok(body) => body.error.message,
                Err(_) => "Payment provider rejected the request".to_string(),
            };
            return Err(ApiError::Upstream(detail));
        }

        response.json::<CheckoutSession>().await.map_err(|e| {
            error!("Malformed checkout session response: {e}");
            ApiError::Upstream(e.to_string())
        })
    }
}

/// Convert a euro amount to integer cents, rejecting sub-cent precision
/// and amounts that overflow the provider's integer range.
fn eur_to_cents(amount: Decimal) -> Option<i64> {
    let cents = amount.checked_mul(Decimal::from(100))?;
    if cents.fract() != Decimal::ZERO || cents <= Decimal::ZERO {
        return None;
    }
    cents.to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn whole_euro_amounts_convert_to_cents() {
        assert_eq!(eur_to_cents(dec!(100)), Some(10_000));
        assert_eq!(eur_to_cents(dec!(19.99)), Some(1_999));
    }

    #[test]
    fn sub_cent_and_non_positive_amounts_are_rejected() {
        assert_eq!(eur_to_cents(dec!(0.001)), None);
        assert_eq!(eur_to_cents(dec!(0)), None);
        assert_eq!(eur_to_cents(dec!(-5)), None);
    }
}
