use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use alertbridge::auth::SIGNATURE_HEADER;
use alertbridge::{Rejection, RejectionKind};

use crate::AppState;

/// Build the axum router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/hook", post(hook))
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

fn status_for(rejection: &Rejection) -> StatusCode {
    match rejection.kind() {
        RejectionKind::Auth => StatusCode::UNAUTHORIZED,
        RejectionKind::Validation => StatusCode::BAD_REQUEST,
        RejectionKind::Risk => StatusCode::FORBIDDEN,
        RejectionKind::Upstream => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /hook
async fn hook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    match state.pipeline.handle(&body, signature).await {
        Ok(placed) => {
            state
                .metrics
                .orders_total
                .with_label_values(&[placed.bot.as_str(), placed.side.as_str()])
                .inc();
            (StatusCode::OK, Json(placed.receipt.raw)).into_response()
        }
        Err(rejection) => {
            state
                .metrics
                .alerts_rejected
                .with_label_values(&[rejection.kind().as_str()])
                .inc();
            (
                status_for(&rejection),
                Json(serde_json::json!({"error": rejection.to_string()})),
            )
                .into_response()
        }
    }
}

/// GET /healthz
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.shutting_down.load(Ordering::Relaxed) {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response();
    }
    (StatusCode::OK, "ok").into_response()
}

/// GET /metrics
async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let encoder = prometheus::TextEncoder::new();
    let families = state.metrics.registry.gather();
    match encoder.encode_to_string(&families) {
        Ok(text) => (StatusCode::OK, text).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encoding error: {}", e),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alertbridge::error::{OrderError, PnlError, RiskError};

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&Rejection::MissingSignature),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&Rejection::InvalidSignature),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&Rejection::MalformedPayload("eof".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&Rejection::InvalidSide("hold".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&Rejection::RiskRejected(RiskError::PnlUnavailable {
                bot: "b".into(),
                source: PnlError::Decode("eof".into()),
            })),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(&Rejection::OrderSubmissionFailed(OrderError::Timeout {
                timeout_ms: 10_000
            })),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
