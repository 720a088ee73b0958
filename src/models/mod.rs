//! Data models

pub mod event;
pub mod log_entry;

pub use event::*;
pub use log_entry::*;
