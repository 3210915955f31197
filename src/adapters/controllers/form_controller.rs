use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{error, info};
use validator::Validate;

use crate::{
    adapters::{
        dto::form_dto::{
            ContactRequest, EventRegistrationRequest, ListSubmissionsQuery, NewsletterRequest,
            PartnershipRequest, SubmissionListItem, SubmissionResponse,
        },
        repositories::duplicate_message,
        state::AppState,
    },
    application::{
        error::ApplicationError,
        services::{EmailMessage, Recipient},
    },
    domain::models::submission::{Submission, SubmissionKind},
};

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 500;

pub struct FormController;

impl FormController {
    /// POST /api/v1/contact
    pub async fn submit_contact(
        State(app_state): State<AppState>,
        Json(body): Json<ContactRequest>,
    ) -> Result<(StatusCode, Json<SubmissionResponse>), ApplicationError> {
        body.validate()?;

        let notification = EmailMessage {
            to: Recipient::Staff,
            subject: format!(
                "Contact form: {}",
                body.subject.as_deref().unwrap_or("new message")
            ),
            text: format!("From: {} <{}>\n\n{}", body.name, body.email, body.message),
            reply_to: Some(body.email.clone()),
        };

        Self::store(&app_state, SubmissionKind::Contact, &body.email, &body, notification).await
    }

    /// POST /api/v1/partnerships
    pub async fn submit_partnership(
        State(app_state): State<AppState>,
        Json(body): Json<PartnershipRequest>,
    ) -> Result<(StatusCode, Json<SubmissionResponse>), ApplicationError> {
        body.validate()?;

        let notification = EmailMessage {
            to: Recipient::Staff,
            subject: format!("Partnership enquiry: {}", body.organisation),
            text: format!(
                "From: {} <{}>\nOrganisation: {}\nType: {}\nPhone: {}\n\n{}",
                body.name,
                body.email,
                body.organisation,
                body.partnership_type.as_deref().unwrap_or("-"),
                body.phone.as_deref().unwrap_or("-"),
                body.message
            ),
            reply_to: Some(body.email.clone()),
        };

        Self::store(&app_state, SubmissionKind::Partnership, &body.email, &body, notification)
            .await
    }

    /// POST /api/v1/newsletter
    pub async fn subscribe_newsletter(
        State(app_state): State<AppState>,
        Json(body): Json<NewsletterRequest>,
    ) -> Result<(StatusCode, Json<SubmissionResponse>), ApplicationError> {
        body.validate()?;

        if app_state
            .submission_repository
            .exists_for_email(SubmissionKind::Newsletter, &body.email)
            .await?
        {
            return Err(ApplicationError::Conflict(duplicate_message(
                SubmissionKind::Newsletter,
            )));
        }

        let welcome = EmailMessage {
            to: Recipient::Address(body.email.clone()),
            subject: "Thanks for subscribing".to_string(),
            text: "You are now subscribed to our newsletter.".to_string(),
            reply_to: None,
        };

        Self::store(&app_state, SubmissionKind::Newsletter, &body.email, &body, welcome).await
    }

    /// POST /api/v1/events/{event_id}/registrations
    pub async fn register_for_event(
        State(app_state): State<AppState>,
        Path(event_id): Path<String>,
        Json(body): Json<EventRegistrationRequest>,
    ) -> Result<(StatusCode, Json<SubmissionResponse>), ApplicationError> {
        body.validate()?;
        if event_id.is_empty() || event_id.len() > 64 {
            return Err(ApplicationError::BadRequest("Invalid event id".to_string()));
        }

        let payload = serde_json::json!({
            "eventId": event_id,
            "registration": &body,
        });

        let notification = EmailMessage {
            to: Recipient::Staff,
            subject: format!("Event registration: {}", event_id),
            text: format!(
                "{} <{}> registered {} attendee(s) for {}.",
                body.name, body.email, body.attendees, event_id
            ),
            reply_to: Some(body.email.clone()),
        };

        Self::store(
            &app_state,
            SubmissionKind::EventRegistration,
            &body.email,
            &payload,
            notification,
        )
        .await
    }

    /// GET /api/v1/admin/submissions?kind=contact&limit=50
    pub async fn list_submissions(
        State(app_state): State<AppState>,
        Query(query): Query<ListSubmissionsQuery>,
    ) -> Result<Json<Vec<SubmissionListItem>>, ApplicationError> {
        let kind = match query.kind.as_deref() {
            Some(raw) => Some(SubmissionKind::parse(raw).ok_or_else(|| {
                ApplicationError::BadRequest(format!("Unknown submission kind '{}'", raw))
            })?),
            None => None,
        };
        let limit = query
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);

        let submissions = app_state
            .submission_repository
            .list_submissions(kind, limit)
            .await?;

        Ok(Json(
            submissions
                .into_iter()
                .map(SubmissionListItem::from)
                .collect(),
        ))
    }

    async fn store<T: Serialize>(
        app_state: &AppState,
        kind: SubmissionKind,
        email: &str,
        form: &T,
        notification: EmailMessage,
    ) -> Result<(StatusCode, Json<SubmissionResponse>), ApplicationError> {
        let payload = serde_json::to_value(form)
            .map_err(|e| ApplicationError::InternalError(e.to_string()))?;

        let submission = app_state
            .submission_repository
            .create_submission(Submission::new(kind, email.trim(), payload))
            .await?;

        info!("Stored {} submission {}", kind.as_str(), submission.id);

        if let Err(e) = app_state.mailer.send(notification).await {
            error!(
                "Failed to send email for {} submission {}: {}",
                kind.as_str(),
                submission.id,
                e
            );
        }

        Ok((
            StatusCode::CREATED,
            Json(SubmissionResponse {
                success: true,
                id: submission.id,
            }),
        ))
    }
}
