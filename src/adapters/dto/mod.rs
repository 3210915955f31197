pub mod donation_dto;
pub mod form_dto;
pub mod upload_dto;
