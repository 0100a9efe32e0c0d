pub mod admission_dto;
pub mod auth_dto;
pub mod booking_dto;
pub mod candidate_dto;
pub mod webhook_dto;
