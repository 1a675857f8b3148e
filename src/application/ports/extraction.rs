//! Extraction Port - 流提取后端抽象
//!
//! 定义提取后端、直链拉取与流格式的抽象接口，
//! 具体实现在 infrastructure/extractor 层

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;
use url::Url;

use crate::domain::track::VideoReference;

/// 可播放的异步字节流
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// 容器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Webm,
    Ogg,
    Mp4,
    Mpeg,
    Riff,
    Flac,
}

/// 编码类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Opus,
    Vorbis,
    Aac,
    Mp3,
    Pcm,
    Flac,
}

/// 流格式（容器 + 编码）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    WebmOpus,
    OggOpus,
    OggVorbis,
    Mp4Aac,
    Mp3,
    Wav,
    Flac,
}

impl StreamFormat {
    pub fn container(self) -> Container {
        match self {
            StreamFormat::WebmOpus => Container::Webm,
            StreamFormat::OggOpus | StreamFormat::OggVorbis => Container::Ogg,
            StreamFormat::Mp4Aac => Container::Mp4,
            StreamFormat::Mp3 => Container::Mpeg,
            StreamFormat::Wav => Container::Riff,
            StreamFormat::Flac => Container::Flac,
        }
    }

    pub fn codec(self) -> Codec {
        match self {
            StreamFormat::WebmOpus | StreamFormat::OggOpus => Codec::Opus,
            StreamFormat::OggVorbis => Codec::Vorbis,
            StreamFormat::Mp4Aac => Codec::Aac,
            StreamFormat::Mp3 => Codec::Mp3,
            StreamFormat::Wav => Codec::Pcm,
            StreamFormat::Flac => Codec::Flac,
        }
    }

    /// 从 HTTP Content-Type / MIME 推断格式
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.to_ascii_lowercase();
        if mime.contains("webm") {
            Some(StreamFormat::WebmOpus)
        } else if mime.contains("ogg") {
            if mime.contains("vorbis") {
                Some(StreamFormat::OggVorbis)
            } else {
                Some(StreamFormat::OggOpus)
            }
        } else if mime.contains("mp4") || mime.contains("m4a") || mime.contains("aac") {
            Some(StreamFormat::Mp4Aac)
        } else if mime.contains("mpeg") || mime.contains("mp3") {
            Some(StreamFormat::Mp3)
        } else if mime.contains("wav") {
            Some(StreamFormat::Wav)
        } else if mime.contains("flac") {
            Some(StreamFormat::Flac)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StreamFormat::WebmOpus => "webm/opus",
            StreamFormat::OggOpus => "ogg/opus",
            StreamFormat::OggVorbis => "ogg/vorbis",
            StreamFormat::Mp4Aac => "mp4/aac",
            StreamFormat::Mp3 => "mp3",
            StreamFormat::Wav => "wav",
            StreamFormat::Flac => "flac",
        }
    }
}

impl std::fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 提取结果
///
/// 在交给探测器之前，由产生它的提取调用独占持有。
pub enum ExtractionResult {
    /// 可直接探测的字节流（无中间 URL 步骤）
    Stream {
        stream: ByteStream,
        hint: Option<StreamFormat>,
    },
    /// 已解析出的短时效直链，需要再经有界 HTTP 拉取
    DirectUrl {
        url: Url,
        hint: Option<StreamFormat>,
    },
}

impl std::fmt::Debug for ExtractionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionResult::Stream { hint, .. } => f
                .debug_struct("ExtractionResult::Stream")
                .field("hint", hint)
                .finish_non_exhaustive(),
            ExtractionResult::DirectUrl { url, hint } => f
                .debug_struct("ExtractionResult::DirectUrl")
                .field("url", url)
                .field("hint", hint)
                .finish(),
        }
    }
}

impl ExtractionResult {
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionResult::Stream { .. } => "stream",
            ExtractionResult::DirectUrl { .. } => "direct_url",
        }
    }

    pub fn hint(&self) -> Option<StreamFormat> {
        match self {
            ExtractionResult::Stream { hint, .. } => *hint,
            ExtractionResult::DirectUrl { hint, .. } => *hint,
        }
    }
}

/// 已探测的流，可直接交给播放器
///
/// 所有权随播放转移给 PlaybackController。
pub struct ProbedStream {
    pub format: StreamFormat,
    pub stream: ByteStream,
}

impl std::fmt::Debug for ProbedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbedStream")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// 单个后端的提取错误
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timeout")]
    Timeout,

    #[error("service error: {0}")]
    Service(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no playable audio format for video {0}")]
    NoPlayableFormat(String),
}

/// Extraction Backend Port
///
/// 单个提取策略：把视频引用变成可播放的流或直链
#[async_trait]
pub trait ExtractionBackendPort: Send + Sync {
    /// 后端名称（用于日志与聚合错误）
    fn name(&self) -> &'static str;

    /// 尝试提取；每次网络调用都必须有界超时
    async fn extract(&self, reference: &VideoReference)
        -> Result<ExtractionResult, ExtractError>;
}

/// 直链拉取错误
#[derive(Debug, Error)]
pub enum FetchError {
    /// 重试次数耗尽
    #[error("fetch failed after {attempts} attempts: {reason}")]
    Exhausted { attempts: u32, reason: String },

    /// 不可重试的 HTTP 状态
    #[error("fetch rejected with http status {0}")]
    Status(u16),
}

/// Media Fetch Port
///
/// 把短时效直链变成字节流：有界重试（3 次）与有界跳转（5 跳）
#[async_trait]
pub trait MediaFetchPort: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<ByteStream, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_container_codec() {
        assert_eq!(StreamFormat::WebmOpus.container(), Container::Webm);
        assert_eq!(StreamFormat::WebmOpus.codec(), Codec::Opus);
        assert_eq!(StreamFormat::Mp4Aac.codec(), Codec::Aac);
        assert_eq!(StreamFormat::Wav.codec(), Codec::Pcm);
    }

    #[test]
    fn test_format_from_mime() {
        assert_eq!(
            StreamFormat::from_mime("audio/webm; codecs=\"opus\""),
            Some(StreamFormat::WebmOpus)
        );
        assert_eq!(StreamFormat::from_mime("audio/mp4"), Some(StreamFormat::Mp4Aac));
        assert_eq!(StreamFormat::from_mime("audio/mpeg"), Some(StreamFormat::Mp3));
        assert_eq!(StreamFormat::from_mime("text/html"), None);
    }
}
