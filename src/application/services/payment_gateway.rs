use async_trait::async_trait;

use crate::{
    domain::models::donation::{CheckoutRequest, CheckoutSession, PaymentEvent},
    services::PaymentError,
};

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Checks the signature header against the raw request body and decodes the event.
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<PaymentEvent, PaymentError>;
}
