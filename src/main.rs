//! Jukebot - 本地播放运行器
//!
//! 交互层（斜杠命令、真实网关接入）在本核心之外；此二进制通过
//! Loopback 网关驱动完整的 解析 -> 提取 -> 探测 -> 播放 管线，
//! 用于本地冒烟验证。
//!
//! 用法: jukebot <video-reference> [volume-percent]

use std::sync::Arc;
use std::time::Duration;

use jukebot::application::extraction::{ExtractorChain, FormatProbe};
use jukebot::application::{PlayCommand, PlayHandler, PlaybackPipeline};
use jukebot::config::{load_config, print_config};
use jukebot::domain::voice::{ChannelId, GuildId};
use jukebot::infrastructure::extractor::{
    ApiResolverBackend, ApiResolverConfig, HttpMediaFetcher, HttpMediaFetcherConfig,
    StreamProxyBackend, StreamProxyConfig,
};
use jukebot::infrastructure::metadata::{OembedClientConfig, OembedTitleClient};
use jukebot::infrastructure::voice::{GuildSessionRegistry, LoopbackVoiceGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志
    let log_filter = format!("{},jukebot={}", config.log.level, config.log.level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    tracing::info!("Jukebot - 语音播放核心（本地运行器）");
    print_config(&config);

    let mut args = std::env::args().skip(1);
    let input = match args.next() {
        Some(input) => input,
        None => {
            eprintln!("Usage: jukebot <video-reference> [volume-percent]");
            std::process::exit(2);
        }
    };
    let volume_percent = args
        .next()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(config.playback.default_volume_percent);

    // 提取后端：解析服务优先，直接流式回退
    let resolver = ApiResolverBackend::new(ApiResolverConfig {
        base_url: config.extraction.resolver_url.clone(),
        user_agent: config.extraction.user_agent.clone(),
        accept_language: config.extraction.accept_language.clone(),
        cookie: config.extraction.cookie.clone(),
        timeout_secs: config.extraction.timeout_secs,
    })
    .map_err(|e| anyhow::anyhow!("Failed to build resolver backend: {}", e))?;

    let proxy = StreamProxyBackend::new(StreamProxyConfig {
        base_url: config.extraction.resolver_url.clone(),
        user_agent: config.extraction.user_agent.clone(),
        accept_language: config.extraction.accept_language.clone(),
        cookie: config.extraction.cookie.clone(),
        connect_timeout_secs: config.extraction.connect_timeout_secs,
        read_timeout_secs: config.extraction.read_timeout_secs,
    })
    .map_err(|e| anyhow::anyhow!("Failed to build stream proxy backend: {}", e))?;

    let fetcher = HttpMediaFetcher::new(HttpMediaFetcherConfig {
        user_agent: config.extraction.user_agent.clone(),
        accept_language: config.extraction.accept_language.clone(),
        cookie: config.extraction.cookie.clone(),
        connect_timeout_secs: config.extraction.connect_timeout_secs,
        read_timeout_secs: config.extraction.read_timeout_secs,
    })
    .map_err(|e| anyhow::anyhow!("Failed to build media fetcher: {}", e))?;

    let title_client = OembedTitleClient::new(OembedClientConfig {
        oembed_url: config.metadata.oembed_url.clone(),
        user_agent: config.extraction.user_agent.clone(),
        timeout_secs: config.metadata.timeout_secs,
    })
    .map_err(|e| anyhow::anyhow!("Failed to build title client: {}", e))?;

    let pipeline = Arc::new(PlaybackPipeline {
        chain: Arc::new(ExtractorChain::new(vec![
            Arc::new(resolver),
            Arc::new(proxy),
        ])),
        fetcher: Arc::new(fetcher),
        probe: Arc::new(FormatProbe::new(config.probe.window_bytes)),
        title_source: Arc::new(title_client),
        title_wait: Duration::from_millis(config.metadata.join_wait_ms),
    });

    // Loopback 网关：吸干音频流，不接真实语音传输
    let gateway = Arc::new(LoopbackVoiceGateway::with_defaults());
    let registry = GuildSessionRegistry::new().arc();
    let handler = PlayHandler::new(gateway, registry.clone(), pipeline);

    let guild = GuildId::new(0);
    let command = PlayCommand {
        guild_id: guild,
        channel_id: ChannelId::new(0),
        channel_name: "loopback".to_string(),
        input,
        volume_percent,
    };

    match handler.handle(command).await {
        Ok(response) => {
            println!("{}", response.status_line());
        }
        Err(failure) => {
            eprintln!("{}", failure);
            std::process::exit(1);
        }
    }

    // 等待播放自然结束（loopback 播放器全速吸干流后销毁会话）
    while registry.get(guild).is_some() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    tracing::info!("Playback complete");
    Ok(())
}
