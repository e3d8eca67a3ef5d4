//! alertbridge-server: HTTP surface for the alert pipeline

pub mod api;
pub mod config;
pub mod shutdown;

use std::sync::atomic::AtomicBool;

use alertbridge::AlertPipeline;
use prometheus::{IntCounterVec, Opts, Registry};

/// Metrics for prometheus
pub struct Metrics {
    pub registry: Registry,
    pub orders_total: IntCounterVec,
    pub alerts_rejected: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        // Unprefixed to match dashboards built on the Go service.
        let orders_total = IntCounterVec::new(
            Opts::new("order_total", "Orders placed with the brokerage"),
            &["bot", "side"],
        )
        .expect("valid orders_total metric");
        let alerts_rejected = IntCounterVec::new(
            Opts::new("alertbridge_alerts_rejected_total", "Alerts rejected by category"),
            &["kind"],
        )
        .expect("valid alerts_rejected metric");

        registry
            .register(Box::new(orders_total.clone()))
            .expect("orders_total registered once");
        registry
            .register(Box::new(alerts_rejected.clone()))
            .expect("alerts_rejected registered once");

        Self {
            registry,
            orders_total,
            alerts_rejected,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared application state
pub struct AppState {
    pub pipeline: AlertPipeline,
    pub metrics: Metrics,
    pub shutting_down: AtomicBool,
}

impl AppState {
    pub fn new(pipeline: AlertPipeline) -> Self {
        Self {
            pipeline,
            metrics: Metrics::new(),
            shutting_down: AtomicBool::new(false),
        }
    }
}
