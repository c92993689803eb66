use crate::cli::ServeArgs;
use crate::infra::{build_core, seed_standard_ward, AppState};
use crate::routes::with_flow_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use patient_flow::config::AppConfig;
use patient_flow::error::AppError;
use patient_flow::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    let (service, store) = build_core();
    if args.seed_ward {
        match seed_standard_ward(&service) {
            Ok(_) => info!("standard demo ward provisioned"),
            Err(err) => warn!(error = %err, "ward seeding failed"),
        }
    }

    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        store,
    };

    let app = with_flow_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "patient flow tracker ready");

    axum::serve(listener, app).await?;
    Ok(())
}
