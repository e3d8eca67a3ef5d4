use async_trait::async_trait;

use crate::error::PnlError;

/// Source of the current profit-and-loss metric per bot.
#[async_trait]
pub trait PnlSource: Send + Sync {
    /// Current PnL for `bot`, or `None` when the source has no data for it.
    ///
    /// Implementations must bound the query with a timeout and report
    /// transport, status and decode failures as errors.
    async fn query_pnl(&self, bot: &str) -> Result<Option<f64>, PnlError>;
}
