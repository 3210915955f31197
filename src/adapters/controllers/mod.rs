pub mod donation_controller;
pub mod form_controller;
pub mod health_controller;
pub mod upload_controller;
