use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::models::submission::Submission;

/// Rejects values that are empty once surrounding whitespace is removed.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    Ok(())
}

/// `email` accepts single-label domains; addresses here need `domain.tld`.
pub fn dotted_domain(email: &str) -> Result<(), ValidationError> {
    match email
        .rsplit_once('@')
        .and_then(|(_, domain)| domain.rsplit_once('.'))
    {
        Some((host, tld)) if !host.is_empty() && tld.len() >= 2 => Ok(()),
        _ => {
            let mut error = ValidationError::new("email_domain");
            error.message = Some("A valid email address is required".into());
            Err(error)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(max = 120), custom(function = "not_blank"))]
    pub name: String,
    #[validate(
        email(message = "A valid email address is required"),
        custom(function = "dotted_domain")
    )]
    pub email: String,
    #[validate(length(max = 200))]
    pub subject: Option<String>,
    #[validate(length(max = 5000), custom(function = "not_blank"))]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PartnershipRequest {
    #[validate(length(max = 120), custom(function = "not_blank"))]
    pub name: String,
    #[validate(
        email(message = "A valid email address is required"),
        custom(function = "dotted_domain")
    )]
    pub email: String,
    #[validate(length(max = 200), custom(function = "not_blank"))]
    pub organisation: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[serde(rename = "partnershipType")]
    #[validate(length(max = 200))]
    pub partnership_type: Option<String>,
    #[validate(length(max = 5000), custom(function = "not_blank"))]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewsletterRequest {
    #[validate(
        email(message = "A valid email address is required"),
        custom(function = "dotted_domain")
    )]
    pub email: String,
    #[validate(length(max = 120))]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EventRegistrationRequest {
    #[validate(length(max = 120), custom(function = "not_blank"))]
    pub name: String,
    #[validate(
        email(message = "A valid email address is required"),
        custom(function = "dotted_domain")
    )]
    pub email: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[serde(default = "default_attendees")]
    #[validate(range(min = 1, max = 10, message = "attendees must be between 1 and 10"))]
    pub attendees: u32,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

fn default_attendees() -> u32 {
    1
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub success: bool,
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ListSubmissionsQuery {
    pub kind: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionListItem {
    pub id: Uuid,
    pub kind: String,
    pub email: String,
    pub payload: serde_json::Value,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<Submission> for SubmissionListItem {
    fn from(submission: Submission) -> Self {
        Self {
            id: submission.id,
            kind: submission.kind.as_str().to_string(),
            email: submission.email,
            payload: submission.payload,
            created_at: submission.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn newsletter(email: &str) -> NewsletterRequest {
        NewsletterRequest {
            email: email.to_string(),
            name: None,
        }
    }

    #[test]
    fn email_shape_is_checked() {
        assert!(newsletter("ada@example.org").validate().is_ok());
        assert!(newsletter("a.b+c@sub.example.co.uk").validate().is_ok());
        for bad in [
            "",
            "ada",
            "@example.org",
            "ada@",
            "ada@example",
            "ada @example.org",
            "a@b@c.org",
            "a@b..com",
            "<x>@evil.io",
            "a@-.co",
        ] {
            let errors = newsletter(bad).validate().unwrap_err();
            assert!(errors.field_errors().contains_key("email"), "{bad}");
        }
    }

    #[test]
    fn contact_requires_message() {
        let request = ContactRequest {
            name: "Ada".into(),
            email: "ada@example.org".into(),
            subject: None,
            message: "   ".into(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("message"));
        assert!(!errors.field_errors().contains_key("name"));
    }

    #[test]
    fn registration_bounds_attendees() {
        let mut request = EventRegistrationRequest {
            name: "Ada".into(),
            email: "ada@example.org".into(),
            phone: None,
            attendees: 0,
            notes: None,
        };
        assert!(request.validate().is_err());
        request.attendees = 4;
        assert!(request.validate().is_ok());
        request.attendees = 11;
        assert!(request.validate().is_err());
    }

    #[test]
    fn optional_fields_are_length_bounded() {
        let request = PartnershipRequest {
            name: "Ada".into(),
            email: "ada@example.org".into(),
            organisation: "Allotment Society".into(),
            phone: Some("0".repeat(33)),
            partnership_type: None,
            message: "Hello".into(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("phone"));
    }
}
