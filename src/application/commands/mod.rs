//! Application Commands - 播放命令及处理器

pub mod handlers;
mod play_commands;

pub use handlers::{PlayHandler, SetVolumeHandler, StopHandler};
pub use play_commands::{
    PlayCommand, PlayResponse, SetVolumeCommand, SetVolumeResponse, StopCommand, StopResponse,
};
