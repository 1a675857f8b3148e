//! Playback - 播放控制

mod controller;

pub use controller::{PlaybackController, PlaybackPipeline};
