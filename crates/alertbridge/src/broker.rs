use async_trait::async_trait;

use crate::error::OrderError;
use crate::types::{OrderReceipt, Side};

/// Trait for brokerage order submission.
///
/// Implementations own authentication and request timeouts. The pipeline
/// calls this at most once per alert and never retries.
#[async_trait]
pub trait OrderSubmitter: Send + Sync {
    /// Place a market order for `qty` (a decimal literal) of `symbol`.
    ///
    /// `bot` identifies the alert source and may be used to build the
    /// client order id.
    async fn create_order(
        &self,
        bot: &str,
        symbol: &str,
        side: Side,
        qty: &str,
    ) -> Result<OrderReceipt, OrderError>;
}
