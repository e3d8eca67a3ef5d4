use std::sync::Arc;

use tracing::{error, info, warn};

use crate::auth::SignatureVerifier;
use crate::broker::OrderSubmitter;
use crate::error::Rejection;
use crate::notify::{NotifyPolicy, Notifier};
use crate::risk::RiskGuard;
use crate::types::{AlertRequest, PlacedOrder, Side};

/// Turns a raw webhook body into at most one order.
///
/// Steps short-circuit in order: signature, decode, required fields, side,
/// risk guard, order submission. Notifications are sent only for risk and
/// submission outcomes, and their failures never change the result.
pub struct AlertPipeline {
    verifier: SignatureVerifier,
    guard: Arc<RiskGuard>,
    broker: Arc<dyn OrderSubmitter>,
    notifier: Option<Arc<dyn Notifier>>,
    policy: NotifyPolicy,
}

impl AlertPipeline {
    pub fn new(
        verifier: SignatureVerifier,
        guard: Arc<RiskGuard>,
        broker: Arc<dyn OrderSubmitter>,
    ) -> Self {
        Self {
            verifier,
            guard,
            broker,
            notifier: None,
            policy: NotifyPolicy::none(),
        }
    }

    /// Attach a notifier with the outcomes it should hear about
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>, policy: NotifyPolicy) -> Self {
        self.notifier = Some(notifier);
        self.policy = policy;
        self
    }

    /// Handle one alert. `signature` is the raw header value, if present.
    pub async fn handle(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> Result<PlacedOrder, Rejection> {
        if self.verifier.is_enabled() {
            let Some(signature) = signature else {
                error!("missing signature");
                return Err(Rejection::MissingSignature);
            };
            if !self.verifier.verify(raw_body, signature) {
                error!("invalid signature");
                return Err(Rejection::InvalidSignature);
            }
        }

        let alert: AlertRequest = serde_json::from_slice(raw_body).map_err(|e| {
            error!(error = %e, "failed to decode request");
            Rejection::MalformedPayload(e.to_string())
        })?;

        let missing = alert.missing_fields();
        if !missing.is_empty() {
            error!(missing = ?missing, "missing required fields");
            return Err(Rejection::MissingFields(missing));
        }

        let side = Side::parse(&alert.side).ok_or_else(|| {
            error!(side = %alert.side, "invalid side");
            Rejection::InvalidSide(alert.side.clone())
        })?;

        if let Err(e) = self.guard.check(&alert.bot).await {
            error!(bot = %alert.bot, error = %e, "risk check failed");
            if self.policy.on_failure {
                self.notify(&format!("alert rejected for bot {}: {}", alert.bot, e))
                    .await;
            }
            return Err(Rejection::RiskRejected(e));
        }

        let receipt = match self
            .broker
            .create_order(&alert.bot, &alert.symbol, side, &alert.qty)
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                error!(bot = %alert.bot, symbol = %alert.symbol, error = %e, "failed to create order");
                if self.policy.on_failure {
                    self.notify(&format!(
                        "order failed for bot {}: {} {} {}: {}",
                        alert.bot, side, alert.qty, alert.symbol, e
                    ))
                    .await;
                }
                return Err(Rejection::OrderSubmissionFailed(e));
            }
        };

        info!(
            bot = %alert.bot,
            symbol = %alert.symbol,
            side = %side,
            qty = %alert.qty,
            order_id = %receipt.order_id,
            "order placed"
        );
        if self.policy.on_success {
            self.notify(&format!(
                "order placed for bot {}: {} {} {} (order {})",
                alert.bot, side, alert.qty, alert.symbol, receipt.order_id
            ))
            .await;
        }

        Ok(PlacedOrder {
            bot: alert.bot,
            symbol: alert.symbol,
            side,
            qty: alert.qty,
            receipt,
        })
    }

    async fn notify(&self, text: &str) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if let Err(e) = notifier.send_message(text).await {
            warn!(error = %e, "notification failed");
        }
    }
}
