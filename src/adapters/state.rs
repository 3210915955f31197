use std::sync::Arc;

use axum::extract::FromRef;
use tokio_util::sync::CancellationToken;

use crate::application::{
    error::UploadError,
    repositories::{DonationRepository, SubmissionRepository},
    services::{Mailer, PaymentGateway, UploadPipeline},
};

#[derive(Clone)]
pub struct AdminSecret(pub Arc<str>);

/// Upload pipeline, or the reason it could not be configured.
#[derive(Clone)]
pub enum Uploads {
    Enabled(Arc<UploadPipeline>),
    Disabled(Arc<str>),
}

impl Uploads {
    pub fn pipeline(&self) -> Result<&UploadPipeline, UploadError> {
        match self {
            Uploads::Enabled(pipeline) => Ok(pipeline),
            Uploads::Disabled(reason) => Err(UploadError::Configuration(reason.to_string())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Uploads::Enabled(_))
    }
}

#[derive(Clone, FromRef)]
pub struct AppState {
    pub public_site_url: Arc<str>,
    pub admin_secret: AdminSecret,
    pub uploads: Uploads,
    pub payments: Option<Arc<dyn PaymentGateway>>,
    pub mailer: Arc<dyn Mailer>,
    pub submission_repository: Arc<dyn SubmissionRepository>,
    pub donation_repository: Arc<dyn DonationRepository>,
    /// Cancelled on shutdown; every upload runs under a child of this token.
    pub shutdown: CancellationToken,
}
