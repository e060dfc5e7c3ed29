use actix_web::{App, HttpServer, middleware::Logger, web};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod app;
mod model;
mod service;

use app::AppState;
use model::Config;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present (ignore if missing)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let bind_addr = config.bind_addr();

    let state = AppState::new(config).map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize application");
        std::io::Error::other(e)
    })?;

    let report_service = web::Data::from(state.report_service);
    let limits = web::Data::new(state.limits);
    let cors = state.cors;

    tracing::info!(
        max_files = limits.max_files,
        max_file_bytes = limits.max_file_bytes,
        any_origin = cors.allows_any_origin(),
        "Starting Meter Inspector server on {}",
        bind_addr
    );

    HttpServer::new(move || {
        App::new()
            .wrap(api::cors(&cors))
            .wrap(Logger::default())
            .app_data(report_service.clone())
            .app_data(limits.clone())
            .configure(api::report::configure)
            .configure(api::health::configure)
            .configure(api::openapi::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
