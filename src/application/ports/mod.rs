//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod extraction;
mod metadata;
mod voice;

pub use extraction::{
    ByteStream, Codec, Container, ExtractError, ExtractionBackendPort, ExtractionResult,
    FetchError, MediaFetchPort, ProbedStream, StreamFormat,
};
pub use metadata::{TitleError, TitleSourcePort};
pub use voice::{
    AudioPlayerPort, GatewayError, PlayerError, PlayerEvent, SubscribeError,
    VoiceConnectionPort, VoiceGatewayPort,
};
