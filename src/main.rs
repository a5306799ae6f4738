use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::EnvFilter;

mod components;
mod config;
mod controllers;
mod errors;
mod form;
mod layout;
mod middleware;
mod models;
mod routes;
mod scrape;
mod sheet;
mod store;

use config::{Config, ScraperMode, StoreBackend};
use scrape::{
    DisabledLookup, FallbackPolicy, HttpLookup, MockLookup, PropertyLookup,
    ScrapeAdapter,
};
use store::{sample, MemoryStore, PropertyStore, XlsxStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let state = models::AppState {
        store: create_store(&config).await?,
        scraper: Arc::new(create_scraper(&config)),
    };
    let app = routes::build_app(state);

    let addr = SocketAddr::from((config.host, config.port));
    tracing::info!(
        %addr,
        property_dir = %config.property_dir.display(),
        "listening"
    );
    axum::Server::try_bind(&addr)
        .with_context(|| format!("could not bind {addr}"))?
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

async fn create_store(config: &Config) -> Result<Arc<dyn PropertyStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            let store = MemoryStore::new();
            store
                .insert(sample::SAMPLE_ID, sample::sample_sheet(&config.sheet_name))
                .await;
            tracing::info!("using in-memory property store");
            Ok(Arc::new(store))
        }
        StoreBackend::Xlsx => {
            let store = XlsxStore::new(
                &config.property_dir,
                &config.backup_dir,
                &config.sheet_name,
            );
            if config.seed_sample && store.list_properties().await?.is_empty() {
                sample::write_sample(&config.property_dir, &config.sheet_name)?;
            }
            Ok(Arc::new(store))
        }
    }
}

fn create_scraper(config: &Config) -> ScrapeAdapter {
    let lookup: Arc<dyn PropertyLookup> = match &config.scraper {
        ScraperMode::Http(url) => Arc::new(HttpLookup::new(url)),
        ScraperMode::Mock => Arc::new(MockLookup),
        ScraperMode::Disabled => Arc::new(DisabledLookup),
    };
    let fallback = if config.scrape_fallback {
        FallbackPolicy::Placeholder
    } else {
        FallbackPolicy::Fail
    };
    ScrapeAdapter::new(lookup, config.scrape_timeout, fallback)
}
