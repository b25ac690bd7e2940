pub mod config;
pub mod error;
pub mod messages;
pub mod state;
