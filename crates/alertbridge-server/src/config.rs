use std::net::SocketAddr;
use std::time::Duration;

use alertbridge::{NotifyPolicy, RiskGuardConfig};
use alertbridge_adapters::alpaca::PAPER_BASE_URL;
use clap::Parser;
use thiserror::Error;
use url::Url;

/// alertbridge: TradingView webhook to Alpaca order relay
#[derive(Parser, Debug, Clone)]
#[command(name = "alertbridge")]
pub struct Config {
    /// Listen address for the HTTP API
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// Port override for the listen address
    #[arg(long, env = "PORT")]
    pub port: Option<String>,

    /// Alpaca API key ID
    #[arg(long, env = "ALP_KEY", default_value = "")]
    pub alpaca_key: String,

    /// Alpaca API secret key
    #[arg(long, env = "ALP_SECRET", default_value = "")]
    pub alpaca_secret: String,

    /// Alpaca REST base URL
    #[arg(long, env = "ALP_BASE", default_value = PAPER_BASE_URL)]
    pub alpaca_base_url: String,

    /// Minimum seconds between accepted alerts per bot (0 disables)
    #[arg(long, env = "COOLDOWN_SEC", default_value = "0")]
    pub cooldown_secs: u64,

    /// Shared HMAC secret for X-TV-Signature (empty disables verification)
    #[arg(long, env = "TV_SECRET")]
    pub tv_secret: Option<String>,

    /// Prometheus base URL for the PnL gate (unset disables the gate)
    #[arg(long, env = "PROM_URL")]
    pub prom_url: Option<String>,

    /// Timeout for PnL queries in seconds
    #[arg(long, env = "PROM_TIMEOUT_SEC", default_value = "5")]
    pub prom_timeout_secs: u64,

    /// Reject alerts while PnL is above this value
    #[arg(long, env = "PNL_MAX")]
    pub pnl_max: Option<String>,

    /// Reject alerts while PnL is below this value (0 disables)
    #[arg(long, env = "PNL_MIN", allow_negative_numbers = true)]
    pub pnl_min: Option<String>,

    /// Slack incoming webhook URL
    #[arg(long, env = "SLACK_WEBHOOK_URL")]
    pub slack_webhook_url: Option<String>,

    /// Slack bot token, used when no webhook is set
    #[arg(long, env = "SLACK_TOKEN")]
    pub slack_token: Option<String>,

    /// Slack channel for token mode
    #[arg(long, env = "SLACK_CHANNEL")]
    pub slack_channel: Option<String>,

    /// Outcomes to notify about: success, failure (comma separated)
    #[arg(long, env = "SLACK_NOTIFY", default_value = "success")]
    pub slack_notify: String,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid listen address {addr:?}: {reason}")]
    InvalidListenAddr { addr: String, reason: String },

    #[error("invalid PROM_URL {url:?}: {reason}")]
    InvalidPromUrl { url: String, reason: String },

    #[error("PROM_TIMEOUT_SEC must be greater than zero")]
    ZeroPromTimeout,

    #[error("invalid {name} {value:?}: expected a finite number")]
    InvalidThreshold { name: &'static str, value: String },

    #[error("unknown SLACK_NOTIFY entry {0:?} (expected success or failure)")]
    UnknownNotifyOutcome(String),

    #[error("SLACK_TOKEN is set but SLACK_CHANNEL is empty")]
    MissingSlackChannel,
}

/// Slack target after validation
#[derive(Debug, Clone, PartialEq)]
pub struct SlackSettings {
    pub webhook_url: Option<String>,
    pub token: Option<String>,
    pub channel: Option<String>,
}

/// PnL endpoint after validation
#[derive(Debug, Clone, PartialEq)]
pub struct PromSettings {
    pub url: Url,
    pub timeout: Duration,
}

/// Everything the binary needs, checked once at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub listen_addr: SocketAddr,
    pub alpaca_key: String,
    pub alpaca_secret: String,
    pub alpaca_base_url: String,
    pub tv_secret: Option<String>,
    pub risk: RiskGuardConfig,
    pub prom: Option<PromSettings>,
    pub slack: Option<SlackSettings>,
    pub notify_policy: NotifyPolicy,
}

impl Config {
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        let mut listen_addr: SocketAddr =
            self.listen_addr
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::InvalidListenAddr {
                    addr: self.listen_addr.clone(),
                    reason: e.to_string(),
                })?;
        if let Some(port) = non_empty(&self.port) {
            let port: u16 = port.parse().map_err(|_| ConfigError::InvalidListenAddr {
                addr: port.to_string(),
                reason: "invalid port".to_string(),
            })?;
            listen_addr.set_port(port);
        }

        let prom = match non_empty(&self.prom_url) {
            Some(raw) => {
                let url = Url::parse(raw).map_err(|e| ConfigError::InvalidPromUrl {
                    url: raw.to_string(),
                    reason: e.to_string(),
                })?;
                if self.prom_timeout_secs == 0 {
                    return Err(ConfigError::ZeroPromTimeout);
                }
                Some(PromSettings {
                    url,
                    timeout: Duration::from_secs(self.prom_timeout_secs),
                })
            }
            None => None,
        };

        let risk = RiskGuardConfig {
            cooldown: Duration::from_secs(self.cooldown_secs),
            pnl_max: parse_threshold("PNL_MAX", &self.pnl_max)?,
            pnl_min: parse_threshold("PNL_MIN", &self.pnl_min)?,
        };

        let webhook_url = non_empty(&self.slack_webhook_url).map(str::to_string);
        let token = non_empty(&self.slack_token).map(str::to_string);
        let channel = non_empty(&self.slack_channel).map(str::to_string);
        let slack = if webhook_url.is_none() && token.is_none() {
            None
        } else {
            if webhook_url.is_none() && channel.is_none() {
                return Err(ConfigError::MissingSlackChannel);
            }
            Some(SlackSettings {
                webhook_url,
                token,
                channel,
            })
        };

        Ok(Settings {
            listen_addr,
            alpaca_key: self.alpaca_key.clone(),
            alpaca_secret: self.alpaca_secret.clone(),
            alpaca_base_url: self.alpaca_base_url.clone(),
            // Used byte for byte as the HMAC key; only an empty value disables it.
            tv_secret: self
                .tv_secret
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            risk,
            prom,
            slack,
            notify_policy: parse_notify_policy(&self.slack_notify)?,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_threshold(name: &'static str, value: &Option<String>) -> Result<Option<f64>, ConfigError> {
    let Some(raw) = non_empty(value) else {
        return Ok(None);
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(ConfigError::InvalidThreshold {
            name,
            value: raw.to_string(),
        }),
    }
}

/// Parse `SLACK_NOTIFY`. Blank entries are skipped.
pub fn parse_notify_policy(raw: &str) -> Result<NotifyPolicy, ConfigError> {
    let mut policy = NotifyPolicy::none();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match entry {
            "success" => policy.on_success = true,
            "failure" => policy.on_failure = true,
            other => return Err(ConfigError::UnknownNotifyOutcome(other.to_string())),
        }
    }
    Ok(policy)
}
