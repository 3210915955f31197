use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query_as, FromRow, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    application::{error::ApplicationError, repositories::DonationRepository},
    domain::models::donation::{CompletedDonation, Donation, DonationStatus},
};

#[derive(Debug, FromRow)]
struct DonationRow {
    id: Uuid,
    session_id: String,
    amount: i64,
    currency: String,
    email: Option<String>,
    campaign_id: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<DonationRow> for Donation {
    fn from(row: DonationRow) -> Self {
        Donation {
            id: row.id,
            session_id: row.session_id,
            amount: row.amount,
            currency: row.currency,
            email: row.email,
            campaign_id: row.campaign_id,
            status: if row.status == DonationStatus::Completed.as_str() {
                DonationStatus::Completed
            } else {
                DonationStatus::Pending
            },
            created_at: row.created_at,
            completed_at: row.completed_at,
        }
    }
}

pub struct PgDonationRepository {
    pool: sqlx::PgPool,
}

impl PgDonationRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DonationRepository for PgDonationRepository {
    async fn create_donation(&self, donation: Donation) -> Result<Donation, ApplicationError> {
        let query = r#"
            INSERT INTO application.donations (
                id, session_id, amount, currency, email,
                campaign_id, status, created_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
        "#;

        let created: DonationRow = query_as::<_, DonationRow>(query)
            .bind(donation.id)
            .bind(&donation.session_id)
            .bind(donation.amount)
            .bind(&donation.currency)
            .bind(&donation.email)
            .bind(&donation.campaign_id)
            .bind(donation.status.as_str())
            .bind(donation.created_at)
            .bind(donation.completed_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

        Ok(created.into())
    }

    async fn complete_donation_and_credit_campaign(
        &self,
        session_id: &str,
        amount: Option<i64>,
        event_campaign_id: Option<&str>,
    ) -> Result<Option<CompletedDonation>, ApplicationError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

        let query = r#"
            UPDATE application.donations
            SET status = 'completed',
                amount = COALESCE($2, amount),
                completed_at = NOW()
            WHERE session_id = $1 AND status <> 'completed'
            RETURNING *
        "#;

        let updated: Option<DonationRow> = query_as::<_, DonationRow>(query)
            .bind(session_id)
            .bind(amount)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

        // dropping the transaction rolls it back
        let Some(row) = updated else {
            return Ok(None);
        };
        let donation = Donation::from(row);

        let campaign_id = donation
            .campaign_id
            .clone()
            .or_else(|| event_campaign_id.map(str::to_string));
        let campaign_total = match campaign_id.as_deref() {
            Some(campaign_id) => {
                Some(credit_campaign(&mut tx, campaign_id, donation.amount).await?)
            }
            None => None,
        };

        tx.commit()
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

        Ok(Some(CompletedDonation {
            donation,
            campaign_id,
            campaign_total,
        }))
    }
}

async fn credit_campaign(
    tx: &mut Transaction<'_, Postgres>,
    campaign_id: &str,
    amount: i64,
) -> Result<i64, ApplicationError> {
    let query = r#"
        INSERT INTO application.campaigns (campaign_id, total_raised, updated_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (campaign_id)
        DO UPDATE SET total_raised = application.campaigns.total_raised + EXCLUDED.total_raised,
                      updated_at = NOW()
        RETURNING total_raised
    "#;

    let (total,): (i64,) = sqlx::query_as(query)
        .bind(campaign_id)
        .bind(amount)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

    Ok(total)
}
