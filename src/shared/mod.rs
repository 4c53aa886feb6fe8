//! Messaging between the engines and whatever renders them

pub mod messages;

pub use messages::JudgeEvent;
