//! Format Probe - 流格式探测
//!
//! 只读取流头部的有界窗口做容器/编码分类，不做整流缓冲，
//! 因此可用于尚未完结的直播流。已消费的头部字节会被接回流前，
//! 播放器拿到的仍是完整的流。

use std::io::Cursor;
use thiserror::Error;
use tokio::io::AsyncReadExt;

use crate::application::ports::{ByteStream, ProbedStream, StreamFormat};

/// 默认探测窗口（字节）
pub const DEFAULT_PROBE_WINDOW: usize = 8192;

#[derive(Debug, Error)]
pub enum ProbeError {
    /// 窗口内未识别出任何已知格式
    #[error("no recognizable audio format within the first {0} bytes")]
    UnrecognizedFormat(usize),

    #[error("failed to read stream head: {0}")]
    Io(#[from] std::io::Error),
}

/// 流格式探测器
pub struct FormatProbe {
    window: usize,
}

impl FormatProbe {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    /// 探测流格式
    ///
    /// 最多读取 window 字节；一旦分类无歧义立即停止读取。
    /// 嗅探无结论时回退到提取阶段给出的 hint。
    pub async fn probe(
        &self,
        mut stream: ByteStream,
        hint: Option<StreamFormat>,
    ) -> Result<ProbedStream, ProbeError> {
        let mut head = Vec::with_capacity(self.window.min(4096));
        let mut buf = [0u8; 1024];
        let mut sniffed = None;

        while head.len() < self.window {
            let take = (self.window - head.len()).min(buf.len());
            let n = stream.read(&mut buf[..take]).await?;
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);

            if let Some(format) = classify(&head) {
                sniffed = Some(format);
                break;
            }
        }

        let format = sniffed
            .or(hint)
            .ok_or(ProbeError::UnrecognizedFormat(self.window))?;

        tracing::debug!(
            format = %format,
            head_bytes = head.len(),
            from_hint = sniffed.is_none(),
            "Stream format probed"
        );

        // 把已消费的头部接回流前
        let stream: ByteStream = Box::new(Cursor::new(head).chain(stream));
        Ok(ProbedStream { format, stream })
    }
}

impl Default for FormatProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_WINDOW)
    }
}

/// 按魔数分类头部字节
///
/// Ogg 容器的编码由页面负载里的标记决定（OpusHead / \x01vorbis），
/// 标记未到达前返回 None 继续读取。
fn classify(head: &[u8]) -> Option<StreamFormat> {
    // EBML 头 -> WebM（平台的纯音频 WebM 均为 Opus）
    if head.len() >= 4 && head[..4] == [0x1A, 0x45, 0xDF, 0xA3] {
        return Some(StreamFormat::WebmOpus);
    }

    if head.starts_with(b"OggS") {
        if contains(head, b"OpusHead") {
            return Some(StreamFormat::OggOpus);
        }
        if contains(head, b"\x01vorbis") {
            return Some(StreamFormat::OggVorbis);
        }
        return None;
    }

    if head.starts_with(b"ID3") {
        return Some(StreamFormat::Mp3);
    }
    if head.len() >= 2 && head[0] == 0xFF && head[1] & 0xE0 == 0xE0 {
        return Some(StreamFormat::Mp3);
    }

    if head.len() >= 12 && &head[..4] == b"RIFF" && &head[8..12] == b"WAVE" {
        return Some(StreamFormat::Wav);
    }

    if head.starts_with(b"fLaC") {
        return Some(StreamFormat::Flac);
    }

    if head.len() >= 8 && &head[4..8] == b"ftyp" {
        return Some(StreamFormat::Mp4Aac);
    }

    None
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_of(bytes: Vec<u8>) -> ByteStream {
        Box::new(Cursor::new(bytes))
    }

    #[tokio::test]
    async fn test_probe_webm() {
        let mut data = vec![0x1A, 0x45, 0xDF, 0xA3];
        data.extend_from_slice(&[0u8; 64]);

        let probe = FormatProbe::default();
        let probed = probe.probe(stream_of(data), None).await.unwrap();
        assert_eq!(probed.format, StreamFormat::WebmOpus);
    }

    #[tokio::test]
    async fn test_probe_ogg_opus() {
        let mut data = b"OggS".to_vec();
        data.extend_from_slice(&[0u8; 24]);
        data.extend_from_slice(b"OpusHead");
        data.extend_from_slice(&[0u8; 32]);

        let probe = FormatProbe::default();
        let probed = probe.probe(stream_of(data), None).await.unwrap();
        assert_eq!(probed.format, StreamFormat::OggOpus);
    }

    #[tokio::test]
    async fn test_probe_ogg_vorbis() {
        let mut data = b"OggS".to_vec();
        data.extend_from_slice(&[0u8; 24]);
        data.extend_from_slice(b"\x01vorbis");
        data.extend_from_slice(&[0u8; 32]);

        let probe = FormatProbe::default();
        let probed = probe.probe(stream_of(data), None).await.unwrap();
        assert_eq!(probed.format, StreamFormat::OggVorbis);
    }

    #[tokio::test]
    async fn test_probe_mp3_id3() {
        let mut data = b"ID3".to_vec();
        data.extend_from_slice(&[0u8; 61]);

        let probe = FormatProbe::default();
        let probed = probe.probe(stream_of(data), None).await.unwrap();
        assert_eq!(probed.format, StreamFormat::Mp3);
    }

    #[tokio::test]
    async fn test_probe_mp4() {
        let mut data = vec![0x00, 0x00, 0x00, 0x20];
        data.extend_from_slice(b"ftypM4A ");
        data.extend_from_slice(&[0u8; 32]);

        let probe = FormatProbe::default();
        let probed = probe.probe(stream_of(data), None).await.unwrap();
        assert_eq!(probed.format, StreamFormat::Mp4Aac);
    }

    #[tokio::test]
    async fn test_probe_unknown_fails() {
        let data = vec![0x42u8; 128];

        let probe = FormatProbe::default();
        let err = probe.probe(stream_of(data), None).await.unwrap_err();
        assert!(matches!(err, ProbeError::UnrecognizedFormat(_)));
    }

    #[tokio::test]
    async fn test_probe_window_is_bounded() {
        // 无限的零字节流：探测必须在窗口耗尽后终止
        let endless: ByteStream = Box::new(tokio::io::repeat(0u8));

        let probe = FormatProbe::new(2048);
        let err = probe.probe(endless, None).await.unwrap_err();
        assert!(matches!(err, ProbeError::UnrecognizedFormat(2048)));
    }

    #[tokio::test]
    async fn test_probe_falls_back_to_hint() {
        // OggS 头有了，但编码标记不在窗口内 -> 由 hint 决定
        let mut data = b"OggS".to_vec();
        data.extend_from_slice(&[0u8; 60]);

        let probe = FormatProbe::new(64);
        let probed = probe
            .probe(stream_of(data), Some(StreamFormat::OggOpus))
            .await
            .unwrap();
        assert_eq!(probed.format, StreamFormat::OggOpus);
    }

    #[tokio::test]
    async fn test_probed_stream_preserves_head_bytes() {
        let mut data = vec![0x1A, 0x45, 0xDF, 0xA3];
        data.extend_from_slice(b"rest of the stream payload");
        let original = data.clone();

        let probe = FormatProbe::default();
        let mut probed = probe.probe(stream_of(data), None).await.unwrap();

        let mut replayed = Vec::new();
        probed.stream.read_to_end(&mut replayed).await.unwrap();
        assert_eq!(replayed, original);
    }
}
