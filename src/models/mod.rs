pub mod actor;
pub mod applicant;
pub mod application;
pub mod document;
pub mod interview;
pub mod notification;
pub mod timeline;
