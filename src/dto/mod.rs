pub mod application_dto;
pub mod batch_dto;
pub mod review_dto;
