use async_trait::async_trait;

use crate::{
    application::error::ApplicationError,
    domain::models::donation::{CompletedDonation, Donation},
};

#[async_trait]
pub trait DonationRepository: Send + Sync {
    async fn create_donation(&self, donation: Donation) -> Result<Donation, ApplicationError>;

    /// Marks the donation for `session_id` completed and adds its amount to the
    /// campaign total (the donation's own campaign, else `event_campaign_id`) as one
    /// unit of work. Returns `None` when the session is unknown or already completed,
    /// so replayed webhooks are no-ops. On error nothing is written.
    async fn complete_donation_and_credit_campaign(
        &self,
        session_id: &str,
        amount: Option<i64>,
        event_campaign_id: Option<&str>,
    ) -> Result<Option<CompletedDonation>, ApplicationError>;
}
