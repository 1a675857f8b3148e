//! Extractor Adapters - 提取后端与直链拉取实现

mod api_resolver;
mod http_fetcher;
mod stream_proxy;

pub use api_resolver::{ApiResolverBackend, ApiResolverConfig};
pub use http_fetcher::{
    HttpMediaFetcher, HttpMediaFetcherConfig, MAX_FETCH_ATTEMPTS, MAX_REDIRECT_HOPS,
};
pub use stream_proxy::{StreamProxyBackend, StreamProxyConfig};
