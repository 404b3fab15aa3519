use crate::cli::ServeArgs;
use crate::infra::{load_repository, AppState, InMemoryScanLog};
use crate::routes::with_scan_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use wellscan::config::AppConfig;
use wellscan::error::AppError;
use wellscan::scan::WellnessPipeline;
use wellscan::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = load_repository(config.seed_dir.as_deref())?;
    let sources = config.providers.sources()?;
    info!(providers = sources.len(), "nutrition providers configured");
    let pipeline = Arc::new(WellnessPipeline::new(repository, sources));
    let scans = Arc::new(InMemoryScanLog::default());

    let app = with_scan_routes(pipeline, scans)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "wellness scan service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
