//! Runtime configuration: built-in defaults overridable through
//! `GRADCAFE_`-prefixed environment variables (e.g. `GRADCAFE_DB_PATH`).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use config::{Config, Environment};
use serde::Deserialize;

const DEFAULT_LISTING_URL: &str = "https://www.thegradcafe.com/survey/";
const DEFAULT_DB_PATH: &str = "data/applicants.sqlite";
const DEFAULT_EXPORT_PATH: &str = "data/applicant_data.jsonl";
const DEFAULT_DELAY_MS: i64 = 250;
const DEFAULT_USER_AGENT: &str = concat!("gradcafe_scraper/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub listing_url: String,
    pub db_path: PathBuf,
    pub export_path: PathBuf,
    pub delay_ms: u64,
    pub user_agent: String,
}

impl Settings {
    /// Politeness pause between page fetches.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

pub fn load() -> Result<Settings> {
    let cfg = Config::builder()
        .set_default("listing_url", DEFAULT_LISTING_URL)?
        .set_default("db_path", DEFAULT_DB_PATH)?
        .set_default("export_path", DEFAULT_EXPORT_PATH)?
        .set_default("delay_ms", DEFAULT_DELAY_MS)?
        .set_default("user_agent", DEFAULT_USER_AGENT)?
        .add_source(Environment::with_prefix("GRADCAFE").try_parsing(true))
        .build()?;
    Ok(cfg.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load() {
        let settings = load().unwrap();
        assert_eq!(settings.listing_url, DEFAULT_LISTING_URL);
        assert_eq!(settings.delay(), Duration::from_millis(250));
        assert!(settings.user_agent.starts_with("gradcafe_scraper/"));
    }
}
