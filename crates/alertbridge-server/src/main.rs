use std::future::IntoFuture;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use alertbridge::{
    AlertPipeline, Notifier, OrderSubmitter, PnlSource, RiskGuard, SignatureVerifier,
};
use alertbridge_adapters::{AlpacaClient, PrometheusPnl, SlackNotifier};
use alertbridge_server::config::{Config, Settings};
use alertbridge_server::{api, shutdown, AppState};

#[tokio::main]
async fn main() {
    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "alertbridge=info,alertbridge_server=info,alertbridge_adapters=info".into()
            }),
        )
        .json()
        .init();

    let config = Config::parse();
    let settings = match config.validate() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };
    info!(
        listen_addr = %settings.listen_addr,
        cooldown_secs = settings.risk.cooldown.as_secs(),
        pnl_gate = settings.prom.is_some(),
        signature_check = settings.tv_secret.is_some(),
        slack = settings.slack.is_some(),
        "alertbridge starting"
    );

    let pipeline = match build_pipeline(&settings) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!(error = %e, "failed to build HTTP clients");
            std::process::exit(1);
        }
    };
    let state = Arc::new(AppState::new(pipeline));

    // Spawn shutdown handler
    let (signal_tx, signal_rx) = watch::channel(false);
    let shutdown_state = state.clone();
    tokio::spawn(async move {
        shutdown::wait_for_shutdown(shutdown_state).await;
        let _ = signal_tx.send(true);
    });

    let app = api::router(state);
    let listener = match tokio::net::TcpListener::bind(settings.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %settings.listen_addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(addr = %settings.listen_addr, "API server listening");

    let mut graceful_rx = signal_rx.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = graceful_rx.wait_for(|signalled| *signalled).await;
        })
        .into_future();
    let mut deadline_rx = signal_rx;
    let signalled = async move {
        let _ = deadline_rx.wait_for(|signalled| *signalled).await;
    };

    match shutdown::drain_with_deadline(server, signalled, shutdown::DRAIN_TIMEOUT).await {
        Some(Ok(())) => info!("alertbridge stopped"),
        Some(Err(e)) => {
            error!(error = %e, "server error");
            std::process::exit(1);
        }
        None => warn!(
            timeout_secs = shutdown::DRAIN_TIMEOUT.as_secs(),
            "in-flight requests did not drain in time, exiting"
        ),
    }
}

fn build_pipeline(settings: &Settings) -> Result<AlertPipeline, reqwest::Error> {
    let broker: Arc<dyn OrderSubmitter> = Arc::new(AlpacaClient::new(
        settings.alpaca_key.clone(),
        settings.alpaca_secret.clone(),
        settings.alpaca_base_url.clone(),
    )?);

    let pnl: Option<Arc<dyn PnlSource>> = match &settings.prom {
        Some(prom) => {
            let source = PrometheusPnl::new(prom.url.as_str(), prom.timeout)?;
            Some(Arc::new(source) as Arc<dyn PnlSource>)
        }
        None => None,
    };

    let verifier = match &settings.tv_secret {
        Some(secret) => SignatureVerifier::new(secret.as_bytes()),
        None => SignatureVerifier::disabled(),
    };

    let guard = Arc::new(RiskGuard::new(settings.risk.clone(), pnl));
    let mut pipeline = AlertPipeline::new(verifier, guard, broker);

    if let Some(slack) = &settings.slack {
        let notifier: Arc<dyn Notifier> = Arc::new(SlackNotifier::new(
            slack.webhook_url.clone(),
            slack.token.clone(),
            slack.channel.clone(),
        )?);
        pipeline = pipeline.with_notifier(notifier, settings.notify_policy);
    }

    Ok(pipeline)
}
