use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query_as, FromRow, QueryBuilder};
use uuid::Uuid;

use crate::{
    application::{error::ApplicationError, repositories::SubmissionRepository},
    domain::models::submission::{Submission, SubmissionKind},
};

#[derive(Debug, FromRow)]
struct SubmissionRow {
    id: Uuid,
    kind: String,
    email: String,
    payload: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = ApplicationError;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        let kind = SubmissionKind::parse(&row.kind).ok_or_else(|| {
            ApplicationError::DatabaseError(format!("unknown submission kind '{}'", row.kind))
        })?;

        Ok(Submission {
            id: row.id,
            kind,
            email: row.email,
            payload: row.payload,
            created_at: row.created_at,
        })
    }
}

/// Conflict message for a duplicate submission, from the pre-check or the unique index.
pub(crate) fn duplicate_message(kind: SubmissionKind) -> String {
    match kind {
        SubmissionKind::Newsletter => "This email is already subscribed".to_string(),
        other => format!("Duplicate {} submission", other.as_str()),
    }
}

pub struct PgSubmissionRepository {
    pool: sqlx::PgPool,
}

impl PgSubmissionRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionRepository for PgSubmissionRepository {
    async fn create_submission(
        &self,
        submission: Submission,
    ) -> Result<Submission, ApplicationError> {
        let query = r#"
            INSERT INTO application.submissions (id, kind, email, payload, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, kind, email, payload, created_at
        "#;

        let created: SubmissionRow = query_as::<_, SubmissionRow>(query)
            .bind(submission.id)
            .bind(submission.kind.as_str())
            .bind(&submission.email)
            .bind(&submission.payload)
            .bind(submission.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    ApplicationError::Conflict(duplicate_message(submission.kind))
                }
                other => ApplicationError::DatabaseError(other.to_string()),
            })?;

        created.try_into()
    }

    async fn exists_for_email(
        &self,
        kind: SubmissionKind,
        email: &str,
    ) -> Result<bool, ApplicationError> {
        let query = r#"
            SELECT EXISTS (
                SELECT 1 FROM application.submissions
                WHERE kind = $1 AND lower(email) = lower($2)
            )
        "#;

        let (exists,): (bool,) = sqlx::query_as(query)
            .bind(kind.as_str())
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

        Ok(exists)
    }

    async fn list_submissions(
        &self,
        kind: Option<SubmissionKind>,
        limit: i64,
    ) -> Result<Vec<Submission>, ApplicationError> {
        let mut builder = QueryBuilder::new(
            "SELECT id, kind, email, payload, created_at FROM application.submissions",
        );
        if let Some(kind) = kind {
            builder.push(" WHERE kind = ");
            builder.push_bind(kind.as_str());
        }
        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(limit);

        let rows: Vec<SubmissionRow> = builder
            .build_query_as::<SubmissionRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(Submission::try_from).collect()
    }
}
