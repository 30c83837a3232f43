pub mod attempt;
pub mod attempt_answer;
pub mod attempt_event;
pub mod question;
pub mod quiz;
