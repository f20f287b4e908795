pub mod application_service;
pub mod batch_service;
pub mod document_service;
pub mod export_service;
pub mod interview_service;
pub mod notification_service;
pub mod review_service;
pub mod timeline_service;
