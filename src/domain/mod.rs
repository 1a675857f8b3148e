//! Domain Layer - 领域层
//!
//! 包含三个限界上下文:
//! - Track Context: 视频引用解析
//! - Playback Context: 播放状态机与音量
//! - Voice Context: 语音连接状态

pub mod playback;
pub mod track;
pub mod voice;
