pub mod attempt_dto;
pub mod quiz_dto;
