use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Storage for the last accepted alert per bot.
///
/// Lookup and record are separate calls, so a guard that reads and then
/// writes is not atomic: two concurrent first alerts for the same bot can
/// both observe "absent". Cooldown is a best-effort rate limiter.
#[async_trait]
pub trait CooldownStore: Send + Sync {
    /// Instant of the last accepted alert, if any
    async fn last_accepted(&self, bot: &str) -> Option<Instant>;

    /// Record an accepted alert. Last write wins.
    async fn record(&self, bot: &str, at: Instant);

    /// Number of bots tracked
    async fn len(&self) -> usize;
}

/// `RwLock<HashMap>` store. Entries are never evicted.
pub struct InMemoryCooldownStore {
    data: Arc<RwLock<HashMap<String, Instant>>>,
}

impl InMemoryCooldownStore {
    pub fn new() -> Self {
        Self { data: Arc::new(RwLock::new(HashMap::new())) }
    }
}

impl Default for InMemoryCooldownStore {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl CooldownStore for InMemoryCooldownStore {
    async fn last_accepted(&self, bot: &str) -> Option<Instant> {
        let data = self.data.read().await;
        data.get(bot).copied()
    }

    async fn record(&self, bot: &str, at: Instant) {
        let mut data = self.data.write().await;
        data.insert(bot.to_string(), at);
    }

    async fn len(&self) -> usize {
        self.data.read().await.len()
    }
}
