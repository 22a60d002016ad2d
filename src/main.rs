use std::sync::Arc;
use std::time::Duration;

use actix_web::middleware::Logger;
use actix_web::{App, HttpServer};
use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use medportal::app::Portal;
use medportal::auth::SessionVerifier;
use medportal::config::{Config, Environment, StorageBackend};
use medportal::security::{CsrfGuard, SecurityHeaders};
use medportal::services::{BucketImageStore, HttpAllocationNotifier, OpenAiVision, ScanService};
use medportal::store::{Stores, pg};

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,medportal=debug")),
        )
        .init();

    let config = Config::from_env()?;

    let stores = match config.storage {
        StorageBackend::Postgres => {
            let url = config.database_url.as_deref().context("DATABASE_URL must be set")?;
            let pool = pg::pool(url, config.pool_size).context("failed to create database pool")?;
            Stores::postgres(pool)
        }
        StorageBackend::Memory => {
            tracing::warn!("using the in-memory store, data is lost on restart");
            Stores::memory()
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .context("failed to build HTTP client")?;

    let scanner = ScanService::new(
        Arc::new(OpenAiVision::new(client.clone(), config.vision.clone())),
        Arc::new(BucketImageStore::new(client.clone(), config.bucket.clone())),
        stores.prescriptions.clone(),
    );
    let portal = Portal {
        sessions: Arc::new(SessionVerifier::new(&config.auth)),
        scanner: Arc::new(scanner),
        allocator: Arc::new(HttpAllocationNotifier::new(client, config.allocation_base_url())),
        stores,
    };

    let trusted = config.trusted_origins();
    let nonces = config.environment == Environment::Production;
    tracing::info!(host = %config.host, port = config.port, storage = ?config.storage, "starting medportal");

    HttpServer::new(move || {
        App::new()
            .wrap(CsrfGuard::new(trusted.clone()))
            .wrap(Logger::default())
            .wrap(SecurityHeaders::new(nonces))
            .configure(|cfg| portal.configure(cfg))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
