//! Voice Infrastructure - 语音会话与网关实现

pub mod loopback;
mod registry;
mod session;

pub use loopback::{LoopbackConfig, LoopbackPlayer, LoopbackVoiceGateway};
pub use registry::GuildSessionRegistry;
pub use session::{VoiceSession, READY_TIMEOUT};
