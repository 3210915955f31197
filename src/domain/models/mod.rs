pub mod donation;
pub mod submission;
pub mod upload;
