pub mod mailer;
pub mod payment_gateway;
pub mod retry;
pub mod storage_service;
pub mod upload_pipeline;

pub use mailer::{EmailMessage, Mailer, Recipient};
pub use payment_gateway::PaymentGateway;
pub use storage_service::ObjectStorage;
pub use upload_pipeline::UploadPipeline;
