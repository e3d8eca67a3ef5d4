//! Test doubles for the pipeline collaborators.
//!
//! Each mock records its calls behind a `tokio::sync::Mutex` so tests can
//! assert on exactly what the pipeline did and reconfigure behavior
//! mid-test.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::broker::OrderSubmitter;
use crate::error::{NotifyError, OrderError, PnlError};
use crate::notify::Notifier;
use crate::pnl::PnlSource;
use crate::types::{OrderReceipt, Side};

/// Configurable response for `create_order`.
#[derive(Clone, Debug)]
pub enum SubmitBehavior {
    /// Return Ok with an auto-generated order ID.
    Accept,
    /// Return Err(Rejected) with the given status.
    Reject(u16),
    /// Return Err(Timeout).
    Timeout,
}

/// One recorded `create_order` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedOrder {
    pub bot: String,
    pub symbol: String,
    pub side: Side,
    pub qty: String,
}

#[derive(Debug)]
pub struct MockBrokerState {
    pub behavior: SubmitBehavior,
    pub submitted: Vec<SubmittedOrder>,
    next_id: u64,
}

impl Default for MockBrokerState {
    fn default() -> Self {
        Self {
            behavior: SubmitBehavior::Accept,
            submitted: Vec::new(),
            next_id: 1,
        }
    }
}

/// A mock broker. Every call is logged, including failed ones.
#[derive(Default)]
pub struct MockBroker {
    pub state: Arc<Mutex<MockBrokerState>>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: SubmitBehavior) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockBrokerState {
                behavior,
                ..Default::default()
            })),
        }
    }

    pub async fn submitted(&self) -> Vec<SubmittedOrder> {
        self.state.lock().await.submitted.clone()
    }
}

#[async_trait]
impl OrderSubmitter for MockBroker {
    async fn create_order(
        &self,
        bot: &str,
        symbol: &str,
        side: Side,
        qty: &str,
    ) -> Result<OrderReceipt, OrderError> {
        let mut state = self.state.lock().await;
        state.submitted.push(SubmittedOrder {
            bot: bot.to_string(),
            symbol: symbol.to_string(),
            side,
            qty: qty.to_string(),
        });

        match state.behavior.clone() {
            SubmitBehavior::Accept => {
                let order_id = format!("mock-order-{}", state.next_id);
                state.next_id += 1;
                Ok(OrderReceipt {
                    raw: serde_json::json!({
                        "id": order_id,
                        "symbol": symbol,
                        "side": side.as_str(),
                        "qty": qty,
                    }),
                    order_id,
                })
            }
            SubmitBehavior::Reject(status) => Err(OrderError::Rejected {
                status,
                body: "mock rejection".to_string(),
            }),
            SubmitBehavior::Timeout => Err(OrderError::Timeout { timeout_ms: 10_000 }),
        }
    }
}

/// Configurable response for `query_pnl`.
#[derive(Clone, Debug)]
pub enum PnlBehavior {
    Value(f64),
    NoData,
    /// Return Err(Status) with the given HTTP status.
    Status(u16),
    Timeout,
}

/// A mock PnL source that counts its queries.
pub struct MockPnl {
    pub behavior: Mutex<PnlBehavior>,
    pub queries: Mutex<Vec<String>>,
}

impl MockPnl {
    pub fn new(behavior: PnlBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub async fn query_count(&self) -> usize {
        self.queries.lock().await.len()
    }
}

#[async_trait]
impl PnlSource for MockPnl {
    async fn query_pnl(&self, bot: &str) -> Result<Option<f64>, PnlError> {
        self.queries.lock().await.push(bot.to_string());
        match self.behavior.lock().await.clone() {
            PnlBehavior::Value(v) => Ok(Some(v)),
            PnlBehavior::NoData => Ok(None),
            PnlBehavior::Status(status) => Err(PnlError::Status {
                status,
                endpoint: "mock://pnl".to_string(),
            }),
            PnlBehavior::Timeout => Err(PnlError::Timeout { timeout_ms: 5000 }),
        }
    }
}

/// A mock notifier that records messages and can be told to fail.
#[derive(Default)]
pub struct MockNotifier {
    pub messages: Mutex<Vec<String>>,
    pub fail: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub async fn messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        self.messages.lock().await.push(text.to_string());
        if self.fail {
            return Err(NotifyError::Rejected { status: 500 });
        }
        Ok(())
    }
}
