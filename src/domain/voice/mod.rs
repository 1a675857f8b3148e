//! Voice Context - 语音限界上下文
//!
//! 职责:
//! - 公会/频道标识
//! - 语音连接状态机
//! - 语音层错误

mod errors;
mod value_objects;

pub use errors::VoiceError;
pub use value_objects::{ChannelId, ConnectionStatus, GuildId};
