pub mod donation_repository;
pub mod submission_repository;

pub use donation_repository::DonationRepository;
pub use submission_repository::SubmissionRepository;
