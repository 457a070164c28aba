use crate::cli::ServeArgs;
use crate::infra::{assemble, load_catalog, AppState};
use crate::routes::with_case_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use docket::clock::SystemClock;
use docket::config::{AppConfig, AutomationConfig};
use docket::error::AppError;
use docket::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(secs) = args.interval_secs.take() {
        config.automation.sweep_interval = AutomationConfig::interval_from_secs(secs)?;
    }

    telemetry::init(&config.telemetry)?;

    let catalog = load_catalog(args.catalog_csv.as_deref())?;
    let runtime = assemble(&config.automation, catalog, Arc::new(SystemClock));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        scheduler: runtime.scheduler.clone(),
    };

    let app = with_case_routes(runtime.desk.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    runtime.scheduler.start();
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        sweep_interval_secs = config.automation.sweep_interval.as_secs(),
        "case desk ready"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    readiness_flag.store(false, Ordering::Release);
    runtime.scheduler.stop().await;
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
