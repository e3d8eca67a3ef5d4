use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use alertbridge::error::NotifyError;
use alertbridge::notify::Notifier;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

#[derive(Serialize)]
struct WebhookMessage<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct ChannelMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

/// chat.postMessage answers 200 even on failure and reports it in the body
#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Slack notifier. An incoming webhook takes precedence over a bot token.
pub struct SlackNotifier {
    http: Client,
    webhook_url: Option<String>,
    token: Option<String>,
    channel: String,
    api_url: String,
}

impl SlackNotifier {
    pub fn new(
        webhook_url: Option<String>,
        token: Option<String>,
        channel: Option<String>,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            http,
            webhook_url,
            token,
            channel: channel.unwrap_or_default(),
            api_url: POST_MESSAGE_URL.to_string(),
        })
    }

    /// Point token mode at a different chat.postMessage endpoint.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    async fn post_webhook(&self, url: &str, text: &str) -> Result<(), NotifyError> {
        let resp = self
            .http
            .post(url)
            .json(&WebhookMessage { text })
            .send()
            .await
            .map_err(|e| NotifyError::Connection(e.to_string()))?;

        let status = resp.status().as_u16();
        if status >= 300 {
            return Err(NotifyError::Rejected { status });
        }
        Ok(())
    }

    async fn post_message(&self, token: &str, text: &str) -> Result<(), NotifyError> {
        let resp = self
            .http
            .post(&self.api_url)
            .bearer_auth(token)
            .json(&ChannelMessage {
                channel: &self.channel,
                text,
            })
            .send()
            .await
            .map_err(|e| NotifyError::Connection(e.to_string()))?;

        let status = resp.status().as_u16();
        if status >= 300 {
            return Err(NotifyError::Rejected { status });
        }

        // Tolerate bodies we can't read; the status already said yes.
        if let Ok(body) = resp.json::<ApiResponse>().await {
            if !body.ok {
                return Err(NotifyError::Api(
                    body.error.unwrap_or_else(|| "unknown".to_string()),
                ));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        if let Some(url) = &self.webhook_url {
            debug!("posting slack webhook");
            return self.post_webhook(url, text).await;
        }
        match &self.token {
            Some(token) => {
                debug!(channel = %self.channel, "posting slack message");
                self.post_message(token, text).await
            }
            None => Err(NotifyError::NotConfigured),
        }
    }
}

impl std::fmt::Debug for SlackNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = if self.webhook_url.is_some() {
            "webhook"
        } else if self.token.is_some() {
            "token"
        } else {
            "unconfigured"
        };
        f.debug_struct("SlackNotifier")
            .field("mode", &mode)
            .field("channel", &self.channel)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_webhook_posts_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_json(serde_json::json!({ "text": "order placed" })))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let notifier =
            SlackNotifier::new(Some(format!("{}/hook", server.uri())), None, None).unwrap();
        notifier.send_message("order placed").await.unwrap();
    }

    #[tokio::test]
    async fn test_webhook_wins_over_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat.postMessage"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let notifier = SlackNotifier::new(
            Some(format!("{}/hook", server.uri())),
            Some("xoxb-token".to_string()),
            Some("#alerts".to_string()),
        )
        .unwrap()
        .with_api_url(format!("{}/api/chat.postMessage", server.uri()));
        notifier.send_message("hi").await.unwrap();
    }

    #[tokio::test]
    async fn test_webhook_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no_service"))
            .mount(&server)
            .await;

        let notifier = SlackNotifier::new(Some(server.uri()), None, None).unwrap();
        match notifier.send_message("hi").await.unwrap_err() {
            NotifyError::Rejected { status } => assert_eq!(status, 404),
            e => panic!("expected Rejected, got: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_token_posts_channel_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat.postMessage"))
            .and(header("authorization", "Bearer xoxb-token"))
            .and(body_json(serde_json::json!({
                "channel": "#alerts",
                "text": "order failed"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "channel": "C123",
                "ts": "1700000000.000100"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = SlackNotifier::new(
            None,
            Some("xoxb-token".to_string()),
            Some("#alerts".to_string()),
        )
        .unwrap()
        .with_api_url(format!("{}/api/chat.postMessage", server.uri()));
        notifier.send_message("order failed").await.unwrap();
    }

    #[tokio::test]
    async fn test_token_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "error": "channel_not_found"
            })))
            .mount(&server)
            .await;

        let notifier = SlackNotifier::new(
            None,
            Some("xoxb-token".to_string()),
            Some("#missing".to_string()),
        )
        .unwrap()
        .with_api_url(server.uri());
        match notifier.send_message("hi").await.unwrap_err() {
            NotifyError::Api(msg) => assert_eq!(msg, "channel_not_found"),
            e => panic!("expected Api, got: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_token_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = SlackNotifier::new(None, Some("t".to_string()), Some("#c".to_string()))
            .unwrap()
            .with_api_url(server.uri());
        assert!(matches!(
            notifier.send_message("hi").await,
            Err(NotifyError::Rejected { status: 500 })
        ));
    }

    #[tokio::test]
    async fn test_unconfigured() {
        let notifier = SlackNotifier::new(None, None, None).unwrap();
        assert!(matches!(
            notifier.send_message("hi").await,
            Err(NotifyError::NotConfigured)
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let notifier =
            SlackNotifier::new(None, Some("xoxb-secret".to_string()), Some("#c".to_string()))
                .unwrap();
        let debug = format!("{:?}", notifier);
        assert!(debug.contains("token"));
        assert!(!debug.contains("xoxb-secret"));
    }
}
