pub mod admission_service;
pub mod auth_service;
pub mod candidate_service;
pub mod email_service;
pub mod notification_service;
pub mod scheduling_service;
pub mod window;
