use std::time::Duration;

use thiserror::Error;

/// Errors from the PnL metrics source.
///
/// Every variant is treated as "risk unknown" by the guard, which then
/// rejects the alert.
#[derive(Error, Debug)]
pub enum PnlError {
    #[error("metrics connection error: {0}")]
    Connection(String),

    #[error("metrics query timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("metrics query failed with status {status} for endpoint {endpoint}")]
    Status { status: u16, endpoint: String },

    #[error("failed to decode metrics response: {0}")]
    Decode(String),

    #[error("unexpected pnl value type: {0}")]
    UnexpectedValue(String),

    #[error("invalid pnl value: {0}")]
    InvalidValue(String),
}

/// Errors from risk checks
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("cooldown period not elapsed for bot {bot} ({}ms remaining)", .remaining.as_millis())]
    CooldownActive { bot: String, remaining: Duration },

    #[error("pnl {pnl:.2} exceeds max {max:.2}")]
    PnlExceedsMax { bot: String, pnl: f64, max: f64 },

    #[error("pnl {pnl:.2} below min {min:.2}")]
    PnlBelowMin { bot: String, pnl: f64, min: f64 },

    #[error("pnl check unavailable for bot {bot}: {source}")]
    PnlUnavailable {
        bot: String,
        #[source]
        source: PnlError,
    },
}

/// Errors from order submission
#[derive(Error, Debug)]
pub enum OrderError {
    #[error("invalid qty: {0}")]
    InvalidQuantity(String),

    #[error("order rejected by broker: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("broker timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("broker connection error: {0}")]
    Connection(String),

    #[error("broker returned unexpected response: {0}")]
    Unexpected(String),
}

/// Errors from outbound notifications
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("no notification target configured")]
    NotConfigured,

    #[error("notification connection error: {0}")]
    Connection(String),

    #[error("notification rejected: HTTP {status}")]
    Rejected { status: u16 },

    #[error("notification api error: {0}")]
    Api(String),
}

/// Broad category of a rejected alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// Missing or invalid signature
    Auth,
    /// Payload could not be decoded or failed field validation
    Validation,
    /// Blocked by the risk guard
    Risk,
    /// The broker failed to accept the order
    Upstream,
}

impl RejectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::Auth => "auth",
            RejectionKind::Validation => "validation",
            RejectionKind::Risk => "risk",
            RejectionKind::Upstream => "upstream",
        }
    }
}

/// Outcome of an alert that did not produce an order
#[derive(Error, Debug)]
pub enum Rejection {
    #[error("missing signature")]
    MissingSignature,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid request body: {0}")]
    MalformedPayload(String),

    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("invalid side: {0:?}")]
    InvalidSide(String),

    #[error("risk check failed: {0}")]
    RiskRejected(#[from] RiskError),

    #[error("failed to create order: {0}")]
    OrderSubmissionFailed(#[source] OrderError),
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::MissingSignature | Rejection::InvalidSignature => RejectionKind::Auth,
            Rejection::MalformedPayload(_)
            | Rejection::MissingFields(_)
            | Rejection::InvalidSide(_) => RejectionKind::Validation,
            Rejection::RiskRejected(_) => RejectionKind::Risk,
            Rejection::OrderSubmissionFailed(_) => RejectionKind::Upstream,
        }
    }
}
