//! Track Context - Value Objects

use serde::{Deserialize, Serialize};

/// 视频标识的固定长度
pub const VIDEO_ID_LEN: usize = 11;

/// 判断字符是否属于视频标识字符集
#[inline]
pub fn is_id_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

/// 视频唯一标识
///
/// 不变量:
/// - 恰好 11 个字符
/// - 字符集为 [A-Za-z0-9_-]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Result<Self, &'static str> {
        let id = id.into();
        if id.chars().count() != VIDEO_ID_LEN {
            return Err("视频标识必须为 11 个字符");
        }
        if !id.chars().all(is_id_char) {
            return Err("视频标识包含非法字符");
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 视频引用 - 一次解析后不可变
///
/// 不变量:
/// - id 已通过 VideoId 校验
/// - watch_url 由 id 规范化生成
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoReference {
    raw: String,
    id: VideoId,
    watch_url: String,
}

impl VideoReference {
    pub fn new(raw: impl Into<String>, id: VideoId) -> Self {
        let watch_url = format!("https://www.youtube.com/watch?v={}", id);
        Self {
            raw: raw.into(),
            id,
            watch_url,
        }
    }

    /// 用户输入的原始文本
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn id(&self) -> &VideoId {
        &self.id
    }

    /// 规范化的 watch URL
    pub fn watch_url(&self) -> &str {
        &self.watch_url
    }
}

/// 曲目标题 - 尽力获取，默认回退到原始输入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackTitle(String);

impl TrackTitle {
    pub fn new(title: impl Into<String>) -> Self {
        Self(title.into())
    }

    /// 回退标题：原始输入文本
    pub fn fallback(reference: &VideoReference) -> Self {
        Self(reference.raw().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_accepts_valid_alphabet() {
        let id = VideoId::new("dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");

        assert!(VideoId::new("a-b_c-d_e-f").is_ok());
    }

    #[test]
    fn test_video_id_rejects_wrong_length() {
        assert!(VideoId::new("short").is_err());
        assert!(VideoId::new("dQw4w9WgXcQQ").is_err());
        assert!(VideoId::new("").is_err());
    }

    #[test]
    fn test_video_id_rejects_bad_chars() {
        assert!(VideoId::new("dQw4w9WgXc!").is_err());
        assert!(VideoId::new("dQw4w9WgXc ").is_err());
    }

    #[test]
    fn test_reference_watch_url() {
        let id = VideoId::new("dQw4w9WgXcQ").unwrap();
        let reference = VideoReference::new("https://youtu.be/dQw4w9WgXcQ", id);
        assert_eq!(
            reference.watch_url(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_fallback_title_is_raw_input() {
        let id = VideoId::new("dQw4w9WgXcQ").unwrap();
        let reference = VideoReference::new("some user text dQw4w9WgXcQ", id);
        assert_eq!(
            TrackTitle::fallback(&reference).as_str(),
            "some user text dQw4w9WgXcQ"
        );
    }
}
