//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod extractor;
pub mod metadata;
pub mod voice;

pub use extractor::{ApiResolverBackend, HttpMediaFetcher, StreamProxyBackend};
pub use metadata::OembedTitleClient;
pub use voice::{GuildSessionRegistry, LoopbackVoiceGateway, VoiceSession};
