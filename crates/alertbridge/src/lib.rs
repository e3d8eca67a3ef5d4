//! alertbridge: webhook alert admission and risk gating
//!
//! Turns trading alerts into brokerage orders. Every alert passes signature
//! verification, payload validation and the [`risk::RiskGuard`] before the
//! [`broker::OrderSubmitter`] is called.

pub mod auth;
pub mod broker;
pub mod cooldown;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod pnl;
pub mod risk;
pub mod types;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use auth::SignatureVerifier;
pub use broker::OrderSubmitter;
pub use cooldown::{CooldownStore, InMemoryCooldownStore};
pub use error::{NotifyError, OrderError, PnlError, Rejection, RejectionKind, RiskError};
pub use notify::{NotifyPolicy, Notifier};
pub use pipeline::AlertPipeline;
pub use pnl::PnlSource;
pub use risk::{RiskGuard, RiskGuardConfig};
pub use types::{AlertRequest, OrderReceipt, PlacedOrder, Side};
