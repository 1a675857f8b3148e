//! Configuration - 配置加载与类型

mod loader;
mod types;

pub use loader::{load_config, load_config_from_path, print_config, ConfigError};
pub use types::{
    AppConfig, ExtractionConfig, LogConfig, MetadataConfig, PlaybackConfig, ProbeConfig,
};
