//! Command Handlers

mod play_handlers;

pub use play_handlers::{PlayHandler, SetVolumeHandler, StopHandler};
