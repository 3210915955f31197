use super::{optional_var, required_var, ConfigError};

pub const DEFAULT_B2_AUTHORIZE_URL: &str =
    "https://api.backblazeb2.com/b2api/v2/b2_authorize_account";
pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
pub const DEFAULT_MAIL_API_BASE: &str = "https://api.resend.com";

/// Credentials for the object storage account that receives certification files.
#[derive(Debug, Clone)]
pub struct StorageSecrets {
    pub key_id: String,
    pub application_key: String,
    pub bucket_id: String,
    pub bucket_name: String,
    pub authorize_url: String,
}

impl StorageSecrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            key_id: required_var("B2_KEY_ID")?,
            application_key: required_var("B2_APPLICATION_KEY")?,
            bucket_id: required_var("B2_BUCKET_ID")?,
            bucket_name: required_var("B2_BUCKET_NAME")?,
            authorize_url: optional_var("B2_AUTHORIZE_URL")
                .unwrap_or_else(|| DEFAULT_B2_AUTHORIZE_URL.to_string()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PaymentSecrets {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
}

impl PaymentSecrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret_key: required_var("STRIPE_SECRET_KEY")?,
            webhook_secret: required_var("STRIPE_WEBHOOK_SECRET")?,
            api_base: optional_var("STRIPE_API_BASE")
                .unwrap_or_else(|| DEFAULT_STRIPE_API_BASE.to_string()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MailSecrets {
    pub api_key: String,
    pub from: String,
    pub notify_to: String,
    pub api_base: String,
}

impl MailSecrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: required_var("MAIL_API_KEY")?,
            from: required_var("MAIL_FROM")?,
            notify_to: required_var("MAIL_NOTIFY_TO")?,
            api_base: optional_var("MAIL_API_BASE")
                .unwrap_or_else(|| DEFAULT_MAIL_API_BASE.to_string()),
        })
    }
}
