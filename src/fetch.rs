//! Blocking HTTP adapter for the scrape driver.

use anyhow::{Context, Result};
use reqwest::blocking::Client;

use crate::scrape::{PageFetcher, ScrapeError};

pub struct HttpFetcher {
    client: Client,
    listing_url: String,
}

impl HttpFetcher {
    pub fn new(listing_url: &str, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            listing_url: listing_url.to_string(),
        })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch_page(&self, page: usize) -> Result<String, ScrapeError> {
        let url = page_url(&self.listing_url, page);
        self.client
            .get(&url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .map_err(|source| ScrapeError::Http { page, source })
    }
}

/// Page 1 is the bare listing URL; later pages append a 1-based `page`
/// query parameter.
fn page_url(listing_url: &str, page: usize) -> String {
    if page <= 1 {
        listing_url.to_string()
    } else {
        format!("{listing_url}?page={page}")
    }
}
