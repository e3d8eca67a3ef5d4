use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use alertbridge::error::PnlError;
use alertbridge::pnl::PnlSource;

/// Instant-query response. Only the fields we read are modelled.
#[derive(Debug, Deserialize)]
struct PromResponse {
    #[serde(default)]
    data: PromData,
}

#[derive(Debug, Default, Deserialize)]
struct PromData {
    #[serde(default)]
    result: Vec<PromSample>,
}

#[derive(Debug, Deserialize)]
struct PromSample {
    /// `[unix_ts, "value"]`
    #[serde(default)]
    value: Vec<serde_json::Value>,
}

/// Reads `pnl{bot="..."}` from a Prometheus-compatible query endpoint.
#[derive(Debug)]
pub struct PrometheusPnl {
    http: Client,
    endpoint: String,
    timeout: Duration,
}

impl PrometheusPnl {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/api/v1/query", base_url.trim_end_matches('/')),
            timeout,
        })
    }

    fn query_url(&self, bot: &str) -> Result<Url, PnlError> {
        let query = format!("pnl{{bot=\"{}\"}}", escape_label_value(bot));
        Url::parse_with_params(&self.endpoint, &[("query", query.as_str())])
            .map_err(|e| PnlError::Connection(format!("invalid query url: {}", e)))
    }
}

/// Escape a PromQL double-quoted label value.
fn escape_label_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// First sample wins. Empty results and short values mean "no data".
fn extract_value(resp: PromResponse) -> Result<Option<f64>, PnlError> {
    let Some(sample) = resp.data.result.into_iter().next() else {
        return Ok(None);
    };
    if sample.value.len() < 2 {
        return Ok(None);
    }
    let raw = sample.value[1]
        .as_str()
        .ok_or_else(|| PnlError::UnexpectedValue(sample.value[1].to_string()))?;
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| PnlError::InvalidValue(raw.to_string()))
}

#[async_trait]
impl PnlSource for PrometheusPnl {
    async fn query_pnl(&self, bot: &str) -> Result<Option<f64>, PnlError> {
        let url = self.query_url(bot)?;
        debug!(bot, url = %url, "querying pnl");

        let resp = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                PnlError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                }
            } else {
                PnlError::Connection(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PnlError::Status {
                status: status.as_u16(),
                endpoint: self.endpoint.clone(),
            });
        }

        let body: PromResponse = resp
            .json()
            .await
            .map_err(|e| PnlError::Decode(e.to_string()))?;
        extract_value(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (MockServer, PrometheusPnl) {
        let server = MockServer::start().await;
        let pnl = PrometheusPnl::new(&server.uri(), Duration::from_secs(5)).unwrap();
        (server, pnl)
    }

    fn vector(value: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    { "metric": { "__name__": "pnl", "bot": "alpha" }, "value": value }
                ]
            }
        })
    }

    async fn mount(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_query_value() {
        let (server, pnl) = setup().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .and(query_param("query", "pnl{bot=\"alpha\"}"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(vector(serde_json::json!([1700000000.0, "-42.5"]))),
            )
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(pnl.query_pnl("alpha").await.unwrap(), Some(-42.5));
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(escape_label_value("alpha"), "alpha");
        assert_eq!(escape_label_value(r#"a"b"#), r#"a\"b"#);
        assert_eq!(escape_label_value(r"a\b"), r"a\\b");
        assert_eq!(escape_label_value("a\nb"), r"a\nb");
    }

    #[tokio::test]
    async fn test_bot_name_with_quote_is_escaped() {
        let (server, pnl) = setup().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .and(query_param("query", r#"pnl{bot="al\"}or vector(1)#"}"#))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(vector(serde_json::json!([1700000000.0, "3"]))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let value = pnl.query_pnl(r#"al"}or vector(1)#"#).await.unwrap();
        assert_eq!(value, Some(3.0));
    }

    #[tokio::test]
    async fn test_empty_result_is_no_data() {
        let (server, pnl) = setup().await;
        mount(
            &server,
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "data": { "resultType": "vector", "result": [] }
            })),
        )
        .await;

        assert_eq!(pnl.query_pnl("alpha").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_short_value_is_no_data() {
        let (server, pnl) = setup().await;
        mount(
            &server,
            ResponseTemplate::new(200).set_body_json(vector(serde_json::json!([1700000000.0]))),
        )
        .await;

        assert_eq!(pnl.query_pnl("alpha").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_non_string_value() {
        let (server, pnl) = setup().await;
        mount(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(vector(serde_json::json!([1700000000.0, 12.0]))),
        )
        .await;

        let err = pnl.query_pnl("alpha").await.unwrap_err();
        assert!(matches!(err, PnlError::UnexpectedValue(_)));
    }

    #[tokio::test]
    async fn test_unparseable_value() {
        let (server, pnl) = setup().await;
        mount(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(vector(serde_json::json!([1700000000.0, "lots"]))),
        )
        .await;

        match pnl.query_pnl("alpha").await.unwrap_err() {
            PnlError::InvalidValue(v) => assert_eq!(v, "lots"),
            e => panic!("expected InvalidValue, got: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_server_error() {
        let (server, pnl) = setup().await;
        mount(&server, ResponseTemplate::new(500)).await;

        match pnl.query_pnl("alpha").await.unwrap_err() {
            PnlError::Status { status, endpoint } => {
                assert_eq!(status, 500);
                assert!(endpoint.ends_with("/api/v1/query"));
            }
            e => panic!("expected Status, got: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let (server, pnl) = setup().await;
        mount(&server, ResponseTemplate::new(200).set_body_string("bad")).await;

        let err = pnl.query_pnl("alpha").await.unwrap_err();
        assert!(matches!(err, PnlError::Decode(_)));
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let server = MockServer::start().await;
        let pnl = PrometheusPnl::new(&server.uri(), Duration::from_millis(100)).unwrap();
        mount(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(vector(serde_json::json!([1700000000.0, "1"])))
                .set_delay(Duration::from_secs(2)),
        )
        .await;

        match pnl.query_pnl("alpha").await.unwrap_err() {
            PnlError::Timeout { timeout_ms } => assert_eq!(timeout_ms, 100),
            e => panic!("expected Timeout, got: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let uri = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let pnl = PrometheusPnl::new(&uri, Duration::from_secs(1)).unwrap();
        let err = pnl.query_pnl("alpha").await.unwrap_err();
        assert!(matches!(err, PnlError::Connection(_)));
    }
}
