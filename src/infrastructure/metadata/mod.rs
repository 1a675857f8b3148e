//! Metadata Adapters - 曲目元数据实现

mod oembed_client;

pub use oembed_client::{OembedClientConfig, OembedTitleClient};
