pub mod config;
pub mod events;
pub mod reveal;
pub mod ring;
pub mod stage;
pub mod sys;
