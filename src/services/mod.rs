mod b2_storage;
mod error;
mod http_mailer;
mod stripe_payments;

pub use b2_storage::B2StorageService;
pub use error::{MailError, PaymentError, StorageError};
pub use http_mailer::{HttpMailer, LogMailer};
pub use stripe_payments::StripePaymentGateway;

#[cfg(test)]
pub(crate) use stripe_payments::sign_webhook;

use std::sync::Arc;

use reqwest::Client;
use tracing::warn;

use crate::{
    application::services::{Mailer, ObjectStorage, PaymentGateway},
    domain::config::{
        secrets::{MailSecrets, PaymentSecrets, StorageSecrets},
        ConfigError,
    },
};

/// Storage is optional at start-up: without credentials the upload endpoint
/// reports a configuration error instead of the process refusing to boot.
pub fn create_object_storage(
    client: &Client,
) -> Result<Arc<dyn ObjectStorage>, ConfigError> {
    let secrets = StorageSecrets::from_env()?;
    Ok(Arc::new(B2StorageService::new(client.clone(), secrets)))
}

pub fn create_payment_gateway(
    client: &Client,
) -> Result<Arc<dyn PaymentGateway>, ConfigError> {
    let secrets = PaymentSecrets::from_env()?;
    Ok(Arc::new(StripePaymentGateway::new(client.clone(), secrets)))
}

pub fn create_mailer(client: &Client) -> Arc<dyn Mailer> {
    match MailSecrets::from_env() {
        Ok(secrets) => Arc::new(HttpMailer::new(client.clone(), secrets)),
        Err(e) => {
            warn!("Mail provider disabled: {}", e);
            Arc::new(LogMailer)
        }
    }
}
