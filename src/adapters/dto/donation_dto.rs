use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::adapters::dto::form_dto::dotted_domain;

const SUPPORTED_CURRENCIES: &[&str] = &["gbp", "eur", "usd"];

fn supported_currency(currency: &str) -> Result<(), ValidationError> {
    if SUPPORTED_CURRENCIES.contains(&currency.to_ascii_lowercase().as_str()) {
        return Ok(());
    }
    let mut error = ValidationError::new("currency");
    error.message = Some(format!("Unsupported currency '{}'", currency).into());
    Err(error)
}

fn campaign_slug(campaign_id: &str) -> Result<(), ValidationError> {
    if campaign_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Ok(());
    }
    let mut error = ValidationError::new("campaign_id");
    error.message = Some("Invalid campaign id".into());
    Err(error)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCheckoutRequest {
    /// Minor currency units.
    #[validate(range(
        min = 100,
        max = 100_000_000,
        message = "Donation amount must be between 100 and 100000000 (minor units)"
    ))]
    pub amount: i64,
    #[validate(custom(function = "supported_currency"))]
    pub currency: Option<String>,
    #[validate(
        email(message = "A valid email address is required"),
        custom(function = "dotted_domain")
    )]
    pub email: Option<String>,
    #[serde(rename = "campaignId")]
    #[validate(length(min = 1, max = 64), custom(function = "campaign_slug"))]
    pub campaign_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}
