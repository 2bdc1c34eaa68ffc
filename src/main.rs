// Bouncer API Main Entry Point
// Serves face search, web search, deep search and trust analysis over HTTP
use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use bouncer_api::{api, telemetry, BouncerConfig, SearchManager};
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    telemetry::init();

    info!("Starting Bouncer API");

    let config = BouncerConfig::from_env()?;
    if config.facecheck_testing_mode {
        warn!("FACECHECK_TESTING_MODE is on: face matches are demo results");
    }

    let manager = web::Data::new(SearchManager::new(&config)?);
    info!(services = ?manager.service_ids(), "Initialized upstream adapters");

    let bind = (config.host.clone(), config.service_port);
    info!("🚀 [Bouncer API] Listening on http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(TracingLogger::default())
            .app_data(manager.clone())
            .configure(api::configure)
    })
    .bind(bind.clone())
    .with_context(|| format!("failed to bind {}:{}", bind.0, bind.1))?
    .run()
    .await
    .context("HTTP server failed")?;

    info!("Bouncer API stopped");
    Ok(())
}
