//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（ExtractionBackend、MediaFetch、VoiceGateway、TitleSource）
//! - extraction: 提取后端回退链与流格式探测
//! - playback: 播放控制器（状态机 + 监督例程）
//! - commands: 播放命令及处理器
//! - error: 面向用户的统一失败分类

pub mod commands;
pub mod error;
pub mod extraction;
pub mod playback;
pub mod ports;

pub use commands::{
    PlayCommand, PlayHandler, PlayResponse, SetVolumeCommand, SetVolumeHandler,
    SetVolumeResponse, StopCommand, StopHandler, StopResponse,
};
pub use error::PlaybackFailure;
pub use extraction::{ExtractionFailed, ExtractorChain, FormatProbe};
pub use playback::{PlaybackController, PlaybackPipeline};
