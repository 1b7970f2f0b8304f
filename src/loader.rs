// Loads a previously scraped JSON file into the database. Kept separate from scraping so a scrape
// can be inspected, and re-loaded, without hitting the site again.

use crate::models::Restaurant;
use anyhow::{Context, Result};
use std::{fmt, fs, path::Path};
use tracing::{debug, warn};
use url::Url;

mod store;
mod transform;

pub use store::{LoadError, RestStore, Upsert, upsert_restaurants};
pub use transform::{RestaurantRow, transform, transform_all};

pub static URL_VAR: &str = "NEXT_PUBLIC_SUPABASE_URL";
pub static KEY_VAR: &str = "SUPABASE_SERVICE_ROLE_KEY";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error(
        "missing required environment variable(s): {}. Set them in the env file or the environment",
        .0.join(", ")
    )]
    Missing(Vec<&'static str>),
    #[error("NEXT_PUBLIC_SUPABASE_URL is not a valid URL: {0}")]
    InvalidUrl(String),
}

#[derive(Clone)]
pub struct LoaderConfig {
    /// Project URL, e.g. https://abc.supabase.co
    pub url: String,
    pub service_key: String,
}

impl fmt::Debug for LoaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderConfig")
            .field("url", &self.url)
            .field("service_key", &"<redacted>")
            .finish()
    }
}

impl LoaderConfig {
    /// Read the config from the process environment, after loading `env_file` if it exists.
    /// Variables already set in the environment win over the file.
    pub fn from_env(env_file: &Path) -> Result<Self, ConfigError> {
        match dotenvy::from_path(env_file) {
            Ok(()) => debug!(path = %env_file.display(), "Loaded env file"),
            Err(err) if err.not_found() => {
                debug!(path = %env_file.display(), "No env file, using the environment only")
            }
            Err(err) => warn!(%err, path = %env_file.display(), "Failed to load env file"),
        }
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name| lookup(name).filter(|v: &String| !v.trim().is_empty());
        let (url, key) = (get(URL_VAR), get(KEY_VAR));

        let (url, service_key) = match (url, key) {
            (Some(url), Some(key)) => (url, key),
            (url, key) => {
                let missing = [(URL_VAR, url.is_none()), (KEY_VAR, key.is_none())]
                    .into_iter()
                    .filter_map(|(name, missing)| missing.then_some(name))
                    .collect();
                return Err(ConfigError::Missing(missing));
            }
        };

        if Url::parse(&url).is_err() {
            return Err(ConfigError::InvalidUrl(url));
        }
        Ok(Self { url, service_key })
    }
}

/// Read restaurants from a JSON file written by the scraper
pub fn load_restaurants(path: &Path) -> Result<Vec<Restaurant>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Invalid restaurant JSON in {}", path.display()))
}
