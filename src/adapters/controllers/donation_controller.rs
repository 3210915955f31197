use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    adapters::{
        dto::donation_dto::{CheckoutResponse, CreateCheckoutRequest, WebhookAck},
        state::AppState,
    },
    application::{
        error::ApplicationError,
        services::{EmailMessage, Recipient},
    },
    domain::models::donation::{CheckoutRequest, Donation, DonationStatus, DEFAULT_CURRENCY},
    services::PaymentError,
};

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";
const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

pub struct DonationController;

impl DonationController {
    /// Creates a hosted checkout session for a one-time donation
    /// POST /api/v1/donations/checkout
    pub async fn create_checkout(
        State(app_state): State<AppState>,
        Json(body): Json<CreateCheckoutRequest>,
    ) -> Result<(StatusCode, Json<CheckoutResponse>), ApplicationError> {
        body.validate()?;

        let payments = app_state.payments.as_ref().ok_or_else(|| {
            ApplicationError::InternalError("Payment provider is not configured".to_string())
        })?;

        let currency = body
            .currency
            .as_deref()
            .unwrap_or(DEFAULT_CURRENCY)
            .to_ascii_lowercase();

        let request = CheckoutRequest {
            amount: body.amount,
            currency: currency.clone(),
            email: body.email.clone(),
            campaign_id: body.campaign_id.clone(),
            success_url: format!(
                "{}/donate/success?session_id={{CHECKOUT_SESSION_ID}}",
                app_state.public_site_url
            ),
            cancel_url: format!("{}/donate", app_state.public_site_url),
        };

        let session = payments
            .create_checkout_session(&request)
            .await
            .map_err(|e| ApplicationError::InternalError(format!("Checkout failed: {}", e)))?;

        app_state
            .donation_repository
            .create_donation(Donation {
                id: Uuid::new_v4(),
                session_id: session.id.clone(),
                amount: body.amount,
                currency,
                email: body.email,
                campaign_id: body.campaign_id,
                status: DonationStatus::Pending,
                created_at: Utc::now(),
                completed_at: None,
            })
            .await?;

        info!("Checkout session {} created for {} minor units", session.id, body.amount);

        Ok((
            StatusCode::CREATED,
            Json(CheckoutResponse {
                session_id: session.id,
                url: session.url,
            }),
        ))
    }

    /// Payment provider webhook
    /// POST /api/v1/donations/webhook
    pub async fn handle_webhook(
        State(app_state): State<AppState>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Json<WebhookAck>, ApplicationError> {
        let payments = app_state.payments.as_ref().ok_or_else(|| {
            ApplicationError::InternalError("Payment provider is not configured".to_string())
        })?;

        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApplicationError::BadRequest(format!("Missing {} header", SIGNATURE_HEADER))
            })?;

        let event = payments
            .verify_webhook(&body, signature)
            .map_err(|e| match e {
                PaymentError::InvalidSignature(_) | PaymentError::InvalidPayload(_) => {
                    warn!("Rejected webhook: {}", e);
                    ApplicationError::BadRequest("Invalid webhook".to_string())
                }
                other => ApplicationError::InternalError(other.to_string()),
            })?;

        if event.event_type != CHECKOUT_COMPLETED {
            info!("Ignoring webhook event {}", event.event_type);
            return Ok(Json(WebhookAck { received: true }));
        }

        let session_id = event.session_id.as_deref().ok_or_else(|| {
            ApplicationError::BadRequest("Webhook event has no session id".to_string())
        })?;

        let Some(completed) = app_state
            .donation_repository
            .complete_donation_and_credit_campaign(
                session_id,
                event.amount_total,
                event.campaign_id.as_deref(),
            )
            .await?
        else {
            info!("Checkout session {} already processed or unknown", session_id);
            return Ok(Json(WebhookAck { received: true }));
        };

        if let (Some(campaign_id), Some(total)) =
            (completed.campaign_id.as_deref(), completed.campaign_total)
        {
            info!("Campaign {} total is now {}", campaign_id, total);
        }

        let donation = completed.donation;
        if let Some(email) = donation.email.clone() {
            let receipt = EmailMessage {
                to: Recipient::Address(email),
                subject: "Thank you for your donation".to_string(),
                text: format!(
                    "We received your donation of {:.2} {}.",
                    donation.amount as f64 / 100.0,
                    donation.currency.to_ascii_uppercase()
                ),
                reply_to: None,
            };
            if let Err(e) = app_state.mailer.send(receipt).await {
                error!("Failed to send donation receipt for {}: {}", session_id, e);
            }
        }

        Ok(Json(WebhookAck { received: true }))
    }
}
