mod pg_donation_repository;
mod pg_submission_repository;

pub use pg_donation_repository::PgDonationRepository;
pub use pg_submission_repository::PgSubmissionRepository;
pub(crate) use pg_submission_repository::duplicate_message;
