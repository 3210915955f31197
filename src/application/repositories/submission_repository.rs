use async_trait::async_trait;

use crate::{
    application::error::ApplicationError,
    domain::models::submission::{Submission, SubmissionKind},
};

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn create_submission(&self, submission: Submission)
        -> Result<Submission, ApplicationError>;
    async fn exists_for_email(
        &self,
        kind: SubmissionKind,
        email: &str,
    ) -> Result<bool, ApplicationError>;
    async fn list_submissions(
        &self,
        kind: Option<SubmissionKind>,
        limit: i64,
    ) -> Result<Vec<Submission>, ApplicationError>;
}
