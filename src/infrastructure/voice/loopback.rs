//! Loopback Voice Gateway - 进程内语音网关
//!
//! 本地运行与测试用的网关实现：不产生任何真实网络流量，
//! 连接在可配置延迟后就绪（或永不就绪），播放器直接吸干流
//! 并投递结束/故障事件。销毁次数可观测，便于验证幂等性。

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::application::ports::{
    AudioPlayerPort, GatewayError, PlayerError, PlayerEvent, ProbedStream, SubscribeError,
    VoiceConnectionPort, VoiceGatewayPort,
};
use crate::domain::playback::Volume;
use crate::domain::voice::{ChannelId, ConnectionStatus, GuildId};

/// Loopback 网关配置
#[derive(Debug, Clone)]
pub struct LoopbackConfig {
    /// 连接就绪前的延迟（毫秒）
    pub ready_delay_ms: u64,
    /// 永不就绪（用于验证超时路径）
    pub never_ready: bool,
    /// 播放器吸干流后注入的故障；None 表示正常结束
    pub fault: Option<String>,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            ready_delay_ms: 0,
            never_ready: false,
            fault: None,
        }
    }
}

/// 进程内语音网关
pub struct LoopbackVoiceGateway {
    config: LoopbackConfig,
    disconnects: Arc<AtomicUsize>,
    connections: Mutex<Vec<Arc<watch::Sender<ConnectionStatus>>>>,
}

impl LoopbackVoiceGateway {
    pub fn new(config: LoopbackConfig) -> Self {
        Self {
            config,
            disconnects: Arc::new(AtomicUsize::new(0)),
            connections: Mutex::new(Vec::new()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(LoopbackConfig::default())
    }

    /// 所有连接累计的底层释放次数
    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::Acquire)
    }

    /// 模拟传输层意外断开：所有就绪连接转入 Disconnected
    pub fn sever_connections(&self) {
        let senders = self.connections.lock().unwrap();
        for sender in senders.iter() {
            sender.send_if_modified(|status| {
                if *status == ConnectionStatus::Ready {
                    *status = ConnectionStatus::Disconnected;
                    true
                } else {
                    false
                }
            });
        }
    }
}

#[async_trait]
impl VoiceGatewayPort for LoopbackVoiceGateway {
    async fn connect(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> Result<Box<dyn VoiceConnectionPort>, GatewayError> {
        let (tx, _rx) = watch::channel(ConnectionStatus::Connecting);
        let tx = Arc::new(tx);

        self.connections.lock().unwrap().push(tx.clone());

        if !self.config.never_ready {
            let sender = tx.clone();
            let delay = self.config.ready_delay_ms;
            tokio::spawn(async move {
                if delay > 0 {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                sender.send_if_modified(|status| {
                    if *status == ConnectionStatus::Connecting {
                        *status = ConnectionStatus::Ready;
                        true
                    } else {
                        false
                    }
                });
            });
        }

        tracing::debug!(guild_id = %guild, channel_id = %channel, "Loopback connection opened");

        Ok(Box::new(LoopbackConnection {
            status_tx: tx,
            player: Mutex::new(None),
            disconnects: self.disconnects.clone(),
        }))
    }

    fn create_player(&self) -> Arc<dyn AudioPlayerPort> {
        Arc::new(LoopbackPlayer::new(self.config.fault.clone()))
    }
}

/// 进程内语音连接
struct LoopbackConnection {
    status_tx: Arc<watch::Sender<ConnectionStatus>>,
    player: Mutex<Option<Arc<dyn AudioPlayerPort>>>,
    disconnects: Arc<AtomicUsize>,
}

#[async_trait]
impl VoiceConnectionPort for LoopbackConnection {
    fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    fn subscribe(&self, player: Arc<dyn AudioPlayerPort>) -> Result<(), SubscribeError> {
        let current = *self.status_tx.borrow();
        if current != ConnectionStatus::Ready {
            return Err(SubscribeError::NotReady(current));
        }
        *self.player.lock().unwrap() = Some(player);
        Ok(())
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::AcqRel);
        let _ = self.status_tx.send(ConnectionStatus::Destroyed);
        self.player.lock().unwrap().take();
    }
}

/// 进程内播放器
///
/// 全速吸干流（不按实时节奏），随后投递 Ended 或配置的故障。
pub struct LoopbackPlayer {
    volume_bits: AtomicU32,
    fault: Option<String>,
    events_tx: mpsc::Sender<PlayerEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<PlayerEvent>>>,
    drain: Mutex<Option<JoinHandle<()>>>,
}

impl LoopbackPlayer {
    pub fn new(fault: Option<String>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(8);
        Self {
            volume_bits: AtomicU32::new(Volume::default().as_f32().to_bits()),
            fault,
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            drain: Mutex::new(None),
        }
    }

    /// 当前音量（测试断言用）
    pub fn volume(&self) -> Volume {
        Volume::new(f32::from_bits(self.volume_bits.load(Ordering::Acquire)))
    }
}

#[async_trait]
impl AudioPlayerPort for LoopbackPlayer {
    async fn play(&self, stream: ProbedStream, volume: Volume) -> Result<(), PlayerError> {
        self.set_volume(volume);

        tracing::debug!(format = %stream.format, "Loopback player draining stream");

        let events = self.events_tx.clone();
        let fault = self.fault.clone();
        let mut reader = stream.stream;

        let handle = tokio::spawn(async move {
            let mut sink = tokio::io::sink();
            let drained = tokio::io::copy(&mut reader, &mut sink).await;

            let event = match (fault, drained) {
                (Some(reason), _) => PlayerEvent::Fault(reason),
                (None, Ok(_)) => PlayerEvent::Ended,
                (None, Err(e)) => PlayerEvent::Fault(e.to_string()),
            };
            let _ = events.send(event).await;
        });

        *self.drain.lock().unwrap() = Some(handle);
        Ok(())
    }

    fn set_volume(&self, volume: Volume) {
        self.volume_bits
            .store(volume.as_f32().to_bits(), Ordering::Release);
    }

    fn stop(&self) {
        if let Some(handle) = self.drain.lock().unwrap().take() {
            handle.abort();
        }
    }

    fn take_events(&self) -> Option<mpsc::Receiver<PlayerEvent>> {
        self.events_rx.lock().unwrap().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{ByteStream, StreamFormat};

    #[tokio::test]
    async fn test_connection_becomes_ready() {
        let gateway = LoopbackVoiceGateway::with_defaults();
        let connection = gateway
            .connect(GuildId::new(1), ChannelId::new(2))
            .await
            .unwrap();

        let mut status = connection.status();
        status
            .wait_for(|s| *s == ConnectionStatus::Ready)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_never_ready_stays_connecting() {
        let gateway = LoopbackVoiceGateway::new(LoopbackConfig {
            never_ready: true,
            ..LoopbackConfig::default()
        });
        let connection = gateway
            .connect(GuildId::new(1), ChannelId::new(2))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*connection.status().borrow(), ConnectionStatus::Connecting);
    }

    #[tokio::test]
    async fn test_player_drains_and_emits_ended() {
        let player = LoopbackPlayer::new(None);
        let mut events = player.take_events().unwrap();

        let stream: ByteStream = Box::new(std::io::Cursor::new(vec![0u8; 4096]));
        player
            .play(
                ProbedStream {
                    format: StreamFormat::WebmOpus,
                    stream,
                },
                Volume::from_percent(75),
            )
            .await
            .unwrap();

        let event = events.recv().await.unwrap();
        assert!(matches!(event, PlayerEvent::Ended));
        assert_eq!(player.volume().as_percent(), 75);
    }

    #[tokio::test]
    async fn test_player_fault_injection() {
        let player = LoopbackPlayer::new(Some("injected fault".to_string()));
        let mut events = player.take_events().unwrap();

        let stream: ByteStream = Box::new(std::io::Cursor::new(vec![0u8; 16]));
        player
            .play(
                ProbedStream {
                    format: StreamFormat::Mp3,
                    stream,
                },
                Volume::default(),
            )
            .await
            .unwrap();

        let event = events.recv().await.unwrap();
        assert!(matches!(event, PlayerEvent::Fault(reason) if reason == "injected fault"));
    }

    #[tokio::test]
    async fn test_events_taken_once() {
        let player = LoopbackPlayer::new(None);
        assert!(player.take_events().is_some());
        assert!(player.take_events().is_none());
    }
}
