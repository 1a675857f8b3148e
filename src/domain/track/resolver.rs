//! 输入解析器
//!
//! 将用户的自由文本输入归一化为规范的视频引用。
//!
//! 解析策略（按优先级）：
//! 1. 清洗输入（去空白、去一层尖括号包裹、去控制字符与零宽字符）
//! 2. 作为 URL 解析：依次检查 youtu.be 短链、/shorts/ 路径、watch?v= 查询
//! 3. 非 URL 或未命中时，扫描文本中独立的 11 字符 token
//! 4. 均未命中则报 InvalidReference

use url::Url;

use super::errors::TrackError;
use super::value_objects::{is_id_char, VideoId, VideoReference, VIDEO_ID_LEN};

/// 解析用户输入为视频引用
///
/// 对同一输入结果是确定的（幂等）。
pub fn resolve(raw: &str) -> Result<VideoReference, TrackError> {
    let sanitized = sanitize(raw);
    if sanitized.is_empty() {
        return Err(TrackError::InvalidReference(raw.to_string()));
    }

    // URL 形式优先：URL 中可能携带与裸扫描冲突的多余文本
    if let Ok(parsed) = Url::parse(&sanitized) {
        if let Some(id) = id_from_url(&parsed) {
            return Ok(VideoReference::new(raw, id));
        }
    }

    if let Some(id) = scan_for_id(&sanitized) {
        return Ok(VideoReference::new(raw, id));
    }

    Err(TrackError::InvalidReference(raw.to_string()))
}

/// 清洗输入文本
///
/// - 去除首尾空白
/// - 去除一层 <...> 包裹（聊天客户端抑制预览的写法）
/// - 去除控制字符与零宽字符
fn sanitize(raw: &str) -> String {
    let mut text = raw.trim();

    if text.len() >= 2 && text.starts_with('<') && text.ends_with('>') {
        text = &text[1..text.len() - 1];
        text = text.trim();
    }

    text.chars()
        .filter(|ch| !ch.is_control() && !is_zero_width(*ch))
        .collect()
}

#[inline]
fn is_zero_width(ch: char) -> bool {
    matches!(
        ch,
        '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}'
    )
}

/// 从已解析的 URL 中提取视频标识
///
/// 检查顺序：短链路径段 -> /shorts/<id> -> watch?v=<id>
fn id_from_url(url: &Url) -> Option<VideoId> {
    let host = url.host_str()?.to_ascii_lowercase();

    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();

    // 1. youtu.be/<id> 短链
    if host == "youtu.be" || host == "www.youtu.be" {
        if let Some(first) = segments.first() {
            if let Ok(id) = VideoId::new(*first) {
                return Some(id);
            }
        }
    }

    if !is_platform_host(&host) {
        return None;
    }

    // 2. /shorts/<id>
    if segments.len() >= 2 && segments[0] == "shorts" {
        if let Ok(id) = VideoId::new(segments[1]) {
            return Some(id);
        }
    }

    // 3. watch?v=<id>
    if let Some((_, value)) = url.query_pairs().find(|(key, _)| key == "v") {
        if let Ok(id) = VideoId::new(value.as_ref()) {
            return Some(id);
        }
    }

    None
}

/// 平台主机判断（youtube.com 及其镜像域名）
fn is_platform_host(host: &str) -> bool {
    host == "youtu.be"
        || host == "www.youtu.be"
        || host.ends_with("youtube.com")
        || host.ends_with("youtube-nocookie.com")
}

/// 扫描文本中独立的 11 字符 token
///
/// token 以字符集外的任意字符为边界，长度必须恰好为 11。
fn scan_for_id(text: &str) -> Option<VideoId> {
    text.split(|ch: char| !is_id_char(ch))
        .filter(|token| token.chars().count() == VIDEO_ID_LEN)
        .find_map(|token| VideoId::new(token).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_link() {
        let reference = resolve("https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(reference.id().as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_watch_url_with_extra_params() {
        let reference = resolve("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=30").unwrap();
        assert_eq!(reference.id().as_str(), "dQw4w9WgXcQ");
        assert_eq!(
            reference.watch_url(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_shorts_url() {
        let reference = resolve("https://www.youtube.com/shorts/dQw4w9WgXcQ").unwrap();
        assert_eq!(reference.id().as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_mobile_and_nocookie_hosts() {
        let reference = resolve("https://m.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(reference.id().as_str(), "dQw4w9WgXcQ");

        let reference =
            resolve("https://www.youtube-nocookie.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(reference.id().as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_angle_bracket_wrap() {
        let reference = resolve("<https://youtu.be/dQw4w9WgXcQ>").unwrap();
        assert_eq!(reference.id().as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_zero_width_chars_stripped() {
        let reference = resolve("https://youtu.be/dQw4w9\u{200B}WgXcQ").unwrap();
        assert_eq!(reference.id().as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_bare_id_scan() {
        let reference = resolve("dQw4w9WgXcQ").unwrap();
        assert_eq!(reference.id().as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_scan_inside_text() {
        let reference = resolve("please play dQw4w9WgXcQ for me").unwrap();
        assert_eq!(reference.id().as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_embedded_token_is_not_standalone() {
        // 12+ 字符的连续 token 不是独立标识
        assert!(resolve("xdQw4w9WgXcQy").is_err());
    }

    #[test]
    fn test_random_text_fails() {
        assert!(matches!(
            resolve("random text"),
            Err(TrackError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(resolve("   ").is_err());
    }

    #[test]
    fn test_url_priority_over_scan() {
        // URL 中 watch?v= 的标识优先于路径里其它可匹配的 token
        let reference =
            resolve("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLAAAAAAAAAA").unwrap();
        assert_eq!(reference.id().as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_idempotent() {
        let a = resolve("https://youtu.be/dQw4w9WgXcQ").unwrap();
        let b = resolve("https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_raw_input_preserved() {
        let raw = "<https://youtu.be/dQw4w9WgXcQ>";
        let reference = resolve(raw).unwrap();
        assert_eq!(reference.raw(), raw);
    }
}
