use serde::{Deserialize, Deserializer, Serialize};

/// Side of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Parse the wire value. Only the exact lowercase strings are accepted.
    pub fn parse(s: &str) -> Option<Side> {
        match s {
            "buy" => Some(Side::Buy),
            "sell" => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound webhook payload.
///
/// Every field defaults to empty so that a missing key is reported as a
/// missing field rather than a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub bot: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub symbol: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub side: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub qty: String,
    #[serde(default, rename = "ts")]
    pub timestamp: Option<i64>,
}

/// An explicit `null` decodes like a missing key.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl AlertRequest {
    /// Names of required fields that are empty, in wire order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("bot", &self.bot),
            ("symbol", &self.symbol),
            ("side", &self.side),
            ("qty", &self.qty),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// An order accepted by the brokerage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderReceipt {
    pub order_id: String,
    /// Order as returned by the brokerage, passed back to the webhook caller
    pub raw: serde_json::Value,
}

/// An alert that made it through to the brokerage
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub bot: String,
    pub symbol: String,
    pub side: Side,
    pub qty: String,
    pub receipt: OrderReceipt,
}
