//! Track Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackError {
    /// 无法从输入中提取视频标识
    #[error("no video reference found in input: {0}")]
    InvalidReference(String),
}
