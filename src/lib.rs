//! Jukebot - 语音频道音乐播放核心
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Track Context: 视频引用解析与规范化
//! - Playback Context: 播放状态机与音量
//! - Voice Context: 语音连接状态
//!
//! 应用层 (application/):
//! - Ports: 端口定义（ExtractionBackend、MediaFetch、VoiceGateway、TitleSource）
//! - Extraction: 提取后端回退链 + 流格式探测
//! - Playback: 播放控制器（监督例程，单次销毁）
//! - Commands: 播放命令及处理器
//!
//! 基础设施层 (infrastructure/):
//! - Extractor: 解析服务后端、直接流式后端、直链拉取
//! - Metadata: oEmbed 标题客户端
//! - Voice: 会话生命周期、公会注册表、Loopback 网关

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
