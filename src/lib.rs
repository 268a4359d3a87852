pub mod args;
pub mod display;
pub mod duration;
pub mod engine;
pub mod error;
pub mod event_handler;
pub mod heartbeat;
pub mod ping;
pub mod settings;
pub mod summary;
pub mod watchdog;
