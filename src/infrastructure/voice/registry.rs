//! Guild Session Registry - 公会会话注册表
//!
//! 显式的公会 -> 活跃播放映射，保证每个公会同时最多一个存活会话、
//! 最多一个播放控制器。不使用环境级全局状态，由持有者注入。

use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::playback::PlaybackController;
use crate::domain::voice::GuildId;

/// 公会会话注册表
pub struct GuildSessionRegistry {
    active: DashMap<GuildId, Arc<PlaybackController>>,
}

impl GuildSessionRegistry {
    pub fn new() -> Self {
        Self {
            active: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 驱逐并销毁公会的现存会话（若有）
    ///
    /// 新播放开始前调用：先销毁旧会话，再创建新连接。
    pub async fn evict(&self, guild: GuildId) -> bool {
        if let Some((_, old)) = self.active.remove(&guild) {
            let session = old.session();
            let age_secs = (chrono::Utc::now() - session.connected_at()).num_seconds();
            tracing::info!(
                guild_id = %guild,
                session_id = %session.id(),
                age_secs = age_secs,
                "Destroying previous session for guild"
            );
            session.destroy().await;
            return true;
        }
        false
    }

    /// 登记活跃播放
    ///
    /// 竞态下残留的旧条目同样先销毁，绝不让两个会话同时存活。
    pub async fn insert(&self, controller: Arc<PlaybackController>) {
        let guild = controller.session().guild();
        let session_id = controller.session().id();

        if let Some(old) = self.active.insert(guild, controller) {
            if old.session().id() != session_id {
                tracing::warn!(
                    guild_id = %guild,
                    session_id = %old.session().id(),
                    "Stale session replaced during insert"
                );
                old.session().destroy().await;
            }
        }
        tracing::debug!(guild_id = %guild, session_id = %session_id, "Session registered");
    }

    pub fn get(&self, guild: GuildId) -> Option<Arc<PlaybackController>> {
        self.active.get(&guild).map(|entry| entry.clone())
    }

    /// 按会话 id 匹配移除
    ///
    /// 已结束的会话不得误删它的替代者。
    pub fn remove(&self, guild: GuildId, session_id: Uuid) {
        let removed = self
            .active
            .remove_if(&guild, |_, controller| controller.session().id() == session_id);
        if removed.is_some() {
            tracing::debug!(guild_id = %guild, session_id = %session_id, "Session unregistered");
        }
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl Default for GuildSessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
