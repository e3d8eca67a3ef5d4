use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::cooldown::{CooldownStore, InMemoryCooldownStore};
use crate::error::RiskError;
use crate::pnl::PnlSource;

/// Risk guard configuration
#[derive(Debug, Clone, Default)]
pub struct RiskGuardConfig {
    /// Minimum time between accepted alerts per bot. Zero disables the gate.
    pub cooldown: Duration,
    /// Reject when the bot's PnL is above this value
    pub pnl_max: Option<f64>,
    /// Reject when the bot's PnL is below this value.
    ///
    /// `Some(0.0)` is treated the same as `None`: a minimum of exactly zero
    /// never triggers.
    pub pnl_min: Option<f64>,
}

impl RiskGuardConfig {
    fn effective_pnl_min(&self) -> Option<f64> {
        self.pnl_min.filter(|min| *min != 0.0)
    }
}

/// Per-bot cooldown plus an optional PnL circuit breaker.
///
/// Gates run in order and the first failure wins:
/// 1. cooldown, open when unconfigured
/// 2. PnL, open when no source is configured, closed when the source fails
pub struct RiskGuard {
    config: RiskGuardConfig,
    cooldowns: Arc<dyn CooldownStore>,
    pnl: Option<Arc<dyn PnlSource>>,
}

impl RiskGuard {
    pub fn new(config: RiskGuardConfig, pnl: Option<Arc<dyn PnlSource>>) -> Self {
        Self::with_store(config, pnl, Arc::new(InMemoryCooldownStore::new()))
    }

    pub fn with_store(
        config: RiskGuardConfig,
        pnl: Option<Arc<dyn PnlSource>>,
        cooldowns: Arc<dyn CooldownStore>,
    ) -> Self {
        Self {
            config,
            cooldowns,
            pnl,
        }
    }

    pub fn pnl_enabled(&self) -> bool {
        self.pnl.is_some()
    }

    /// Run both gates for `bot`.
    pub async fn check(&self, bot: &str) -> Result<(), RiskError> {
        self.check_cooldown(bot).await?;
        self.check_pnl(bot).await
    }

    async fn check_cooldown(&self, bot: &str) -> Result<(), RiskError> {
        let cooldown = self.config.cooldown;
        if cooldown.is_zero() {
            return Ok(());
        }

        let now = Instant::now();
        if let Some(last) = self.cooldowns.last_accepted(bot).await {
            let since_last = now.saturating_duration_since(last);
            if since_last < cooldown {
                warn!(
                    bot,
                    since_last_ms = since_last.as_millis() as u64,
                    cooldown_ms = cooldown.as_millis() as u64,
                    "cooldown check failed"
                );
                return Err(RiskError::CooldownActive {
                    bot: bot.to_string(),
                    remaining: cooldown - since_last,
                });
            }
        }

        // Not atomic with the lookup above; concurrent alerts for a new bot
        // may both get here.
        self.cooldowns.record(bot, now).await;
        debug!(bot, cooldown_ms = cooldown.as_millis() as u64, "cooldown check passed");
        Ok(())
    }

    async fn check_pnl(&self, bot: &str) -> Result<(), RiskError> {
        let Some(source) = &self.pnl else {
            debug!(bot, "pnl check skipped, no metrics source configured");
            return Ok(());
        };

        let pnl = match source.query_pnl(bot).await {
            Ok(Some(pnl)) => pnl,
            Ok(None) => {
                debug!(bot, "no pnl data found");
                return Ok(());
            }
            Err(e) => {
                error!(bot, error = %e, "pnl query failed, rejecting alert");
                return Err(RiskError::PnlUnavailable {
                    bot: bot.to_string(),
                    source: e,
                });
            }
        };

        debug!(
            bot,
            pnl,
            pnl_max = ?self.config.pnl_max,
            pnl_min = ?self.config.pnl_min,
            "pnl check"
        );

        if let Some(max) = self.config.pnl_max {
            if pnl > max {
                warn!(bot, pnl, max, "pnl exceeds maximum");
                return Err(RiskError::PnlExceedsMax {
                    bot: bot.to_string(),
                    pnl,
                    max,
                });
            }
        }

        if let Some(min) = self.config.effective_pnl_min() {
            if pnl < min {
                warn!(bot, pnl, min, "pnl below minimum");
                return Err(RiskError::PnlBelowMin {
                    bot: bot.to_string(),
                    pnl,
                    min,
                });
            }
        }

        Ok(())
    }
}
