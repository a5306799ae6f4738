//! We can have a little hard-coded config, [as a
//! snack](https://knowyourmeme.com/memes/cats-can-have-a-little-salami).
//! Everything else comes from the environment (and `.env`).

use anyhow::{bail, Context, Result};
use std::{net::IpAddr, path::PathBuf, str::FromStr, time::Duration};

/// The sheet holding the property layout. Workbooks without a sheet by this
/// name fall back to their first sheet.
pub const DEFAULT_SHEET_NAME: &str = "Property Info";

pub const DEFAULT_SCRAPE_TIMEOUT_SECS: u64 = 20;

#[derive(Clone, Debug, PartialEq)]
pub enum StoreBackend {
    Xlsx,
    /// Nothing touches disk; seeded with the sample property.
    Memory,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScraperMode {
    Http(String),
    Mock,
    Disabled,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub property_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub sheet_name: String,
    pub store_backend: StoreBackend,
    pub scraper: ScraperMode,
    pub scrape_timeout: Duration,
    pub scrape_fallback: bool,
    pub seed_sample: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let property_dir =
            PathBuf::from(get("PROPERTY_DIR").unwrap_or_else(|| ".".into()));
        let backup_dir = get("BACKUP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| property_dir.join("backups"));

        let store_backend = match get("STORE_BACKEND").as_deref() {
            None | Some("xlsx") => StoreBackend::Xlsx,
            Some("memory") => StoreBackend::Memory,
            Some(other) => bail!(
                "STORE_BACKEND must be one of xlsx, memory (got {other:?})"
            ),
        };

        let url = get("SCRAPER_URL");
        let scraper = match (get("SCRAPER_MODE").as_deref(), url) {
            (None | Some("http"), Some(url)) => ScraperMode::Http(url),
            (Some("http"), None) => {
                bail!("SCRAPER_MODE=http requires SCRAPER_URL")
            }
            (None | Some("disabled"), _) => ScraperMode::Disabled,
            (Some("mock"), _) => ScraperMode::Mock,
            (Some(other), _) => bail!(
                "SCRAPER_MODE must be one of http, mock, disabled (got {other:?})"
            ),
        };

        Ok(Self {
            host: parse(&get, "HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: parse(&get, "PORT", 8000)?,
            property_dir,
            backup_dir,
            sheet_name: get("SHEET_NAME")
                .unwrap_or_else(|| DEFAULT_SHEET_NAME.into()),
            store_backend,
            scraper,
            scrape_timeout: Duration::from_secs(parse(
                &get,
                "SCRAPE_TIMEOUT_SECS",
                DEFAULT_SCRAPE_TIMEOUT_SECS,
            )?),
            scrape_fallback: parse(&get, "SCRAPE_FALLBACK", true)?,
            seed_sample: parse(&get, "SEED_SAMPLE", false)?,
        })
    }
}

fn parse<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
