use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    Contact,
    Partnership,
    Newsletter,
    EventRegistration,
}

impl SubmissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionKind::Contact => "contact",
            SubmissionKind::Partnership => "partnership",
            SubmissionKind::Newsletter => "newsletter",
            SubmissionKind::EventRegistration => "event_registration",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "contact" => Some(SubmissionKind::Contact),
            "partnership" => Some(SubmissionKind::Partnership),
            "newsletter" => Some(SubmissionKind::Newsletter),
            "event_registration" => Some(SubmissionKind::EventRegistration),
            _ => None,
        }
    }
}

/// One stored form submission. `payload` holds the validated form as a JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub kind: SubmissionKind,
    pub email: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(kind: SubmissionKind, email: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            email: email.into(),
            payload,
            created_at: Utc::now(),
        }
    }
}
