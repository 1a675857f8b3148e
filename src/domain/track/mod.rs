//! Track Context - 曲目限界上下文
//!
//! 职责:
//! - 视频引用的解析与规范化
//! - 曲目标题（尽力获取，回退到原始输入）

mod errors;
pub mod resolver;
mod value_objects;

pub use errors::TrackError;
pub use value_objects::{is_id_char, TrackTitle, VideoId, VideoReference, VIDEO_ID_LEN};
