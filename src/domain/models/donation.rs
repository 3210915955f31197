use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_CURRENCY: &str = "gbp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    Pending,
    Completed,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::Pending => "pending",
            DonationStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: Uuid,
    pub session_id: String,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub email: Option<String>,
    pub campaign_id: Option<String>,
    pub status: DonationStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A donation that just moved to completed, with the campaign total it was credited to.
#[derive(Debug, Clone)]
pub struct CompletedDonation {
    pub donation: Donation,
    pub campaign_id: Option<String>,
    pub campaign_total: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub amount: i64,
    pub currency: String,
    pub email: Option<String>,
    pub campaign_id: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// A verified payment webhook event reduced to the fields this service acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    pub event_type: String,
    pub session_id: Option<String>,
    pub amount_total: Option<i64>,
    pub campaign_id: Option<String>,
}
