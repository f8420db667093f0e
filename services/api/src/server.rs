use crate::cli::ServeArgs;
use crate::infra::{
    seed_agents, seed_units, AppState, InMemoryAgentRepository, InMemoryBookingRepository,
    InMemoryLeadRepository, InMemoryUnitRepository, LoggingNotifier, ProjectSiteGeo,
};
use crate::routes::with_pipeline_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use salesdesk::config::AppConfig;
use salesdesk::error::AppError;
use salesdesk::pipeline::{IntakeGuard, PipelineService, PricingConfig};
use salesdesk::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.listen.host = host;
    }
    if let Some(port) = args.port.take() {
        config.listen.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let leads = Arc::new(InMemoryLeadRepository::default());
    let agents = Arc::new(InMemoryAgentRepository::default());
    let units = Arc::new(InMemoryUnitRepository::default());
    let bookings = Arc::new(InMemoryBookingRepository::default());
    seed_agents(&agents).map_err(salesdesk::pipeline::PipelineError::from)?;
    seed_units(&units).map_err(salesdesk::pipeline::PipelineError::from)?;

    let service = Arc::new(PipelineService::new(
        leads,
        agents,
        units,
        bookings,
        Arc::new(LoggingNotifier::default()),
        Arc::new(ProjectSiteGeo::default()),
        PricingConfig::standard(),
        IntakeGuard::default(),
    ));

    let app = with_pipeline_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.listen.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "lead-to-booking pipeline ready");

    axum::serve(listener, app).await?;
    Ok(())
}
