use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info};

use alertbridge::broker::OrderSubmitter;
use alertbridge::error::OrderError;
use alertbridge::types::{OrderReceipt, Side};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Paper trading endpoint, used when no base URL is configured
pub const PAPER_BASE_URL: &str = "https://paper-api.alpaca.markets";

/// Body of POST /v2/orders
#[derive(Debug, Serialize)]
struct AlpacaOrderRequest<'a> {
    symbol: &'a str,
    qty: String,
    side: &'static str,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
    client_order_id: String,
}

/// Alpaca REST order client
pub struct AlpacaClient {
    http: Client,
    api_key: String,
    api_secret: String,
    base_url: String,
}

impl AlpacaClient {
    pub fn new(
        api_key: String,
        api_secret: String,
        base_url: String,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key,
            api_secret,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Crypto pairs trade around the clock and only accept GTC.
    fn time_in_force(symbol: &str) -> &'static str {
        if is_crypto(symbol) {
            "gtc"
        } else {
            "day"
        }
    }

    fn client_order_id(bot: &str) -> String {
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        format!("{}-{}", bot, nanos)
    }
}

fn is_crypto(symbol: &str) -> bool {
    symbol.ends_with("USD") || symbol.ends_with("USDT") || symbol.ends_with("USDC")
}

#[async_trait]
impl OrderSubmitter for AlpacaClient {
    async fn create_order(
        &self,
        bot: &str,
        symbol: &str,
        side: Side,
        qty: &str,
    ) -> Result<OrderReceipt, OrderError> {
        let qty = Decimal::from_str(qty).map_err(|e| OrderError::InvalidQuantity(e.to_string()))?;
        let time_in_force = Self::time_in_force(symbol);

        let body = AlpacaOrderRequest {
            symbol,
            qty: qty.to_string(),
            side: side.as_str(),
            order_type: "market",
            time_in_force,
            client_order_id: Self::client_order_id(bot),
        };

        let url = format!("{}/v2/orders", self.base_url);
        debug!(url = %url, request = ?body, "placing order");

        let resp = self
            .http
            .post(&url)
            .header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.api_secret)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OrderError::Timeout {
                        timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
                    }
                } else {
                    OrderError::Connection(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let error_body = resp.text().await.unwrap_or_default();
            error!(
                symbol,
                side = %side,
                qty = %qty,
                time_in_force,
                status = status.as_u16(),
                body = %error_body,
                "alpaca API error"
            );
            return Err(OrderError::Rejected {
                status: status.as_u16(),
                body: error_body,
            });
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| OrderError::Unexpected(e.to_string()))?;
        let order_id = raw
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| OrderError::Unexpected("order response missing id".to_string()))?
            .to_string();

        info!(
            symbol,
            side = %side,
            qty = %qty,
            time_in_force,
            order_id = %order_id,
            "order placed successfully"
        );
        Ok(OrderReceipt { order_id, raw })
    }
}

impl std::fmt::Debug for AlpacaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
