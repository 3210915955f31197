//! In-memory collaborators for router-level tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::{
    adapters::{
        repositories::duplicate_message,
        state::{AdminSecret, AppState, Uploads},
    },
    application::{
        error::ApplicationError,
        repositories::{DonationRepository, SubmissionRepository},
        services::{
            retry::BackoffPolicy, EmailMessage, Mailer, ObjectStorage, PaymentGateway,
            UploadPipeline,
        },
    },
    domain::{
        config::secrets::PaymentSecrets,
        models::{
            donation::{
                CheckoutRequest, CheckoutSession, CompletedDonation, Donation, DonationStatus,
                PaymentEvent,
            },
            submission::{Submission, SubmissionKind},
            upload::{
                AuthorizationContext, StoredObject, UniqueObjectName, UploadRequest, UploadTarget,
            },
        },
    },
    services::{MailError, PaymentError, StorageError, StripePaymentGateway},
};

pub const TEST_ADMIN_SECRET: &str = "admin-test-secret";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

#[derive(Debug, Default, Clone)]
pub struct StorageCalls {
    pub authorize: u32,
    pub allocate: u32,
    pub transfer: u32,
}

/// Storage fake that counts provider calls; transfers fail with `failure_status` when set.
pub struct CountingStorage {
    calls: Mutex<StorageCalls>,
    failure_status: Option<u16>,
}

impl CountingStorage {
    pub fn new(failure_status: Option<u16>) -> Self {
        Self {
            calls: Mutex::new(StorageCalls::default()),
            failure_status,
        }
    }

    pub fn calls(&self) -> StorageCalls {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for CountingStorage {
    async fn authorize(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<AuthorizationContext, StorageError> {
        self.calls.lock().unwrap().authorize += 1;
        Ok(AuthorizationContext {
            authorization_token: "account-token".into(),
            api_url: "https://api.example.test".into(),
            download_url: "https://f000.example.test".into(),
        })
    }

    async fn allocate_upload_target(
        &self,
        _auth: &AuthorizationContext,
        _cancel: &CancellationToken,
    ) -> Result<UploadTarget, StorageError> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            calls.allocate += 1;
            calls.allocate
        };
        Ok(UploadTarget {
            upload_url: format!("https://pod.example.test/upload/{}", attempt),
            authorization_token: format!("upload-token-{}", attempt),
            bucket_id: "bucket-id".into(),
        })
    }

    async fn transfer(
        &self,
        request: &UploadRequest,
        _target: UploadTarget,
        object_name: &UniqueObjectName,
        _cancel: &CancellationToken,
    ) -> Result<StoredObject, StorageError> {
        self.calls.lock().unwrap().transfer += 1;
        if let Some(status) = self.failure_status {
            return Err(StorageError::Status {
                status,
                body: "service_unavailable".into(),
            });
        }
        Ok(StoredObject {
            file_id: "4_z_fake_file".into(),
            file_name: object_name.to_string(),
            content_length: request.size(),
            upload_timestamp: Utc::now().timestamp_millis(),
        })
    }

    fn public_url(&self, auth: &AuthorizationContext, object_name: &UniqueObjectName) -> String {
        format!("{}/file/site-uploads/{}", auth.download_url, object_name)
    }
}

#[derive(Default)]
pub struct InMemorySubmissionRepository {
    submissions: Mutex<Vec<Submission>>,
    hide_existing: AtomicBool,
}

impl InMemorySubmissionRepository {
    pub fn all(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    /// `exists_for_email` reports false, as it would for a signup racing another.
    pub fn hide_existing(&self) {
        self.hide_existing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubmissionRepository for InMemorySubmissionRepository {
    async fn create_submission(
        &self,
        submission: Submission,
    ) -> Result<Submission, ApplicationError> {
        let mut submissions = self.submissions.lock().unwrap();
        // Same rule as the partial unique index on newsletter emails.
        if submission.kind == SubmissionKind::Newsletter
            && submissions.iter().any(|s| {
                s.kind == SubmissionKind::Newsletter
                    && s.email.eq_ignore_ascii_case(&submission.email)
            })
        {
            return Err(ApplicationError::Conflict(duplicate_message(
                submission.kind,
            )));
        }
        submissions.push(submission.clone());
        Ok(submission)
    }

    async fn exists_for_email(
        &self,
        kind: SubmissionKind,
        email: &str,
    ) -> Result<bool, ApplicationError> {
        if self.hide_existing.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self
            .submissions
            .lock()
            .unwrap()
            .iter()
            .any(|s| s.kind == kind && s.email.eq_ignore_ascii_case(email.trim())))
    }

    async fn list_submissions(
        &self,
        kind: Option<SubmissionKind>,
        limit: i64,
    ) -> Result<Vec<Submission>, ApplicationError> {
        Ok(self
            .submissions
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|s| kind.map_or(true, |k| s.kind == k))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryDonationRepository {
    donations: Mutex<Vec<Donation>>,
    campaigns: Mutex<HashMap<String, i64>>,
    fail_next_credit: AtomicBool,
}

impl InMemoryDonationRepository {
    pub fn all(&self) -> Vec<Donation> {
        self.donations.lock().unwrap().clone()
    }

    pub fn campaign_total(&self, campaign_id: &str) -> i64 {
        self.campaigns
            .lock()
            .unwrap()
            .get(campaign_id)
            .copied()
            .unwrap_or(0)
    }

    /// The next campaign credit fails, leaving both tables untouched.
    pub fn fail_next_credit(&self) {
        self.fail_next_credit.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DonationRepository for InMemoryDonationRepository {
    async fn create_donation(&self, donation: Donation) -> Result<Donation, ApplicationError> {
        self.donations.lock().unwrap().push(donation.clone());
        Ok(donation)
    }

    async fn complete_donation_and_credit_campaign(
        &self,
        session_id: &str,
        amount: Option<i64>,
        event_campaign_id: Option<&str>,
    ) -> Result<Option<CompletedDonation>, ApplicationError> {
        let mut donations = self.donations.lock().unwrap();
        let mut campaigns = self.campaigns.lock().unwrap();

        let Some(donation) = donations
            .iter_mut()
            .find(|d| d.session_id == session_id && d.status != DonationStatus::Completed)
        else {
            return Ok(None);
        };

        let campaign_id = donation
            .campaign_id
            .clone()
            .or_else(|| event_campaign_id.map(str::to_string));
        if campaign_id.is_some() && self.fail_next_credit.swap(false, Ordering::SeqCst) {
            return Err(ApplicationError::DatabaseError(
                "campaign credit failed".to_string(),
            ));
        }

        donation.status = DonationStatus::Completed;
        donation.completed_at = Some(Utc::now());
        if let Some(amount) = amount {
            donation.amount = amount;
        }

        let campaign_total = campaign_id.as_ref().map(|id| {
            let total = campaigns.entry(id.clone()).or_insert(0);
            *total += donation.amount;
            *total
        });

        Ok(Some(CompletedDonation {
            donation: donation.clone(),
            campaign_id,
            campaign_total,
        }))
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_sends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Rejected {
                status: 503,
                body: "mail provider down".into(),
            });
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Issues sequential session ids; webhook verification is the real HMAC check.
pub struct FakePaymentGateway {
    sessions: AtomicU32,
    verifier: StripePaymentGateway,
}

impl FakePaymentGateway {
    pub fn new() -> Self {
        Self {
            sessions: AtomicU32::new(0),
            verifier: StripePaymentGateway::new(
                reqwest::Client::new(),
                PaymentSecrets {
                    secret_key: "sk_test".into(),
                    webhook_secret: TEST_WEBHOOK_SECRET.into(),
                    api_base: "http://127.0.0.1:9".into(),
                },
            ),
        }
    }
}

#[async_trait]
impl PaymentGateway for FakePaymentGateway {
    async fn create_checkout_session(
        &self,
        _request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let n = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CheckoutSession {
            id: format!("cs_test_{}", n),
            url: format!("https://checkout.example.test/pay/cs_test_{}", n),
        })
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<PaymentEvent, PaymentError> {
        self.verifier.verify_webhook(payload, signature_header)
    }
}

pub fn fast_policy() -> BackoffPolicy {
    BackoffPolicy {
        max_attempts: 5,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        max_jitter: Duration::from_millis(1),
        fallback_delay: Duration::from_millis(1),
    }
}

pub struct TestContext {
    pub storage: Arc<CountingStorage>,
    pub submissions: Arc<InMemorySubmissionRepository>,
    pub donations: Arc<InMemoryDonationRepository>,
    pub mailer: Arc<RecordingMailer>,
    pub payments: Arc<FakePaymentGateway>,
    uploads: Uploads,
}

impl TestContext {
    pub fn new() -> Self {
        Self::build(CountingStorage::new(None), true)
    }

    pub fn with_failing_storage(status: u16) -> Self {
        Self::build(CountingStorage::new(Some(status)), true)
    }

    pub fn without_storage() -> Self {
        Self::build(CountingStorage::new(None), false)
    }

    fn build(storage: CountingStorage, storage_configured: bool) -> Self {
        let storage = Arc::new(storage);
        let uploads = if storage_configured {
            Uploads::Enabled(Arc::new(UploadPipeline::with_policy(
                storage.clone(),
                fast_policy(),
            )))
        } else {
            Uploads::Disabled("environment variable B2_KEY_ID must be set".into())
        };

        Self {
            storage,
            submissions: Arc::new(InMemorySubmissionRepository::default()),
            donations: Arc::new(InMemoryDonationRepository::default()),
            mailer: Arc::new(RecordingMailer::default()),
            payments: Arc::new(FakePaymentGateway::new()),
            uploads,
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            public_site_url: "https://site.example.test".into(),
            admin_secret: AdminSecret(TEST_ADMIN_SECRET.into()),
            uploads: self.uploads.clone(),
            payments: Some(self.payments.clone()),
            mailer: self.mailer.clone(),
            submission_repository: self.submissions.clone(),
            donation_repository: self.donations.clone(),
            shutdown: CancellationToken::new(),
        }
    }
}
