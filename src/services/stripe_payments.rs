use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{info, warn};

use crate::{
    application::services::PaymentGateway,
    domain::{
        config::secrets::PaymentSecrets,
        models::donation::{CheckoutRequest, CheckoutSession, PaymentEvent},
    },
    services::error::PaymentError,
};

type HmacSha256 = Hmac<Sha256>;

const PAYMENT_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum age of a signed webhook, in seconds.
const WEBHOOK_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Deserialize)]
struct CheckoutSessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: WebhookObject,
}

#[derive(Debug, Deserialize)]
struct WebhookObject {
    id: Option<String>,
    amount_total: Option<i64>,
    #[serde(default)]
    metadata: std::collections::HashMap<String, String>,
}

pub struct StripePaymentGateway {
    client: Client,
    secrets: PaymentSecrets,
}

impl StripePaymentGateway {
    pub fn new(client: Client, secrets: PaymentSecrets) -> Self {
        Self { client, secrets }
    }

    fn verify_webhook_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<PaymentEvent, PaymentError> {
        let mut timestamp: Option<&str> = None;
        let mut signatures = Vec::new();
        for part in signature_header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value),
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(PaymentError::InvalidSignature("missing timestamp"))?;
        if signatures.is_empty() {
            return Err(PaymentError::InvalidSignature("missing v1 signature"));
        }

        let signed_at: i64 = timestamp
            .parse()
            .map_err(|_| PaymentError::InvalidSignature("malformed timestamp"))?;
        if (now - signed_at).abs() > WEBHOOK_TOLERANCE_SECS {
            return Err(PaymentError::InvalidSignature("timestamp outside tolerance"));
        }

        let mut mac = HmacSha256::new_from_slice(self.secrets.webhook_secret.as_bytes())
            .map_err(|_| PaymentError::InvalidSignature("unusable webhook secret"))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);

        let matched = signatures.iter().any(|signature| {
            hex::decode(signature)
                .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
                .unwrap_or(false)
        });
        if !matched {
            return Err(PaymentError::InvalidSignature("no matching signature"));
        }

        let envelope: WebhookEnvelope = serde_json::from_slice(payload)
            .map_err(|e| PaymentError::InvalidPayload(e.to_string()))?;

        Ok(PaymentEvent {
            event_type: envelope.event_type,
            session_id: envelope.data.object.id,
            amount_total: envelope.data.object.amount_total,
            campaign_id: envelope.data.object.metadata.get("campaign_id").cloned(),
        })
    }
}

#[async_trait]
impl PaymentGateway for StripePaymentGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let amount = request.amount.to_string();
        let mut form: Vec<(&str, &str)> = vec![
            ("mode", "payment"),
            ("submit_type", "donate"),
            ("success_url", request.success_url.as_str()),
            ("cancel_url", request.cancel_url.as_str()),
            ("line_items[0][quantity]", "1"),
            ("line_items[0][price_data][currency]", request.currency.as_str()),
            ("line_items[0][price_data][unit_amount]", amount.as_str()),
            ("line_items[0][price_data][product_data][name]", "Donation"),
        ];
        if let Some(email) = &request.email {
            form.push(("customer_email", email.as_str()));
        }
        if let Some(campaign_id) = &request.campaign_id {
            form.push(("metadata[campaign_id]", campaign_id.as_str()));
        }

        let response = self
            .client
            .post(format!(
                "{}/v1/checkout/sessions",
                self.secrets.api_base.trim_end_matches('/')
            ))
            .bearer_auth(&self.secrets.secret_key)
            .form(&form)
            .timeout(PAYMENT_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Checkout session creation failed with status {}", status);
            return Err(PaymentError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let session: CheckoutSessionResponse = response.json().await?;
        info!("Created checkout session {}", session.id);

        Ok(CheckoutSession {
            url: session.url.unwrap_or_default(),
            id: session.id,
        })
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<PaymentEvent, PaymentError> {
        self.verify_webhook_at(payload, signature_header, Utc::now().timestamp())
    }
}

#[cfg(test)]
pub(crate) fn sign_webhook(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}
