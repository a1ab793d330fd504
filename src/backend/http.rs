//! HTTP client for the scanning backend.
//!
//! Endpoints:
//! - `GET  /api/config`            → sports, bookmakers, market labels
//! - `GET  /api/scan?...`          → opportunities + API usage
//! - `POST /api/simulation/place`  → virtual bet
//! - `GET  /api/simulation/stats`  → bankroll and pending bets
//!
//! The scan request carries no client timeout of its own; the scan
//! controller decides whether to bound it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::ScanBackend;
use crate::types::{Opportunity, RemoteConfig, ScanResponse, SimulationStats, VirtualBetResponse};
use crate::view::filters::FilterSelection;

const USER_AGENT: &str = "ARBWATCH/0.1.0";

pub struct HttpBackend {
    http: Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpBackend {
    /// `request_timeout` bounds the config and virtual-bet calls only.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client for scanning backend")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full scan URL for a filter selection.
    pub fn scan_url(&self, filters: &FilterSelection) -> String {
        let query = filters
            .query_pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(&v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}/api/scan?{query}", self.base_url)
    }

    async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("{what} error {status}: {body}");
        }

        resp.json::<T>()
            .await
            .with_context(|| format!("Failed to parse {what} response"))
    }
}

#[async_trait]
impl ScanBackend for HttpBackend {
    async fn fetch_config(&self) -> Result<RemoteConfig> {
        let url = format!("{}/api/config", self.base_url);
        debug!(url = %url, "Fetching dashboard config");

        let resp = self
            .http
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .context("Config request failed")?;

        Self::decode(resp, "config").await
    }

    async fn scan(&self, filters: &FilterSelection) -> Result<ScanResponse> {
        let url = self.scan_url(filters);
        debug!(url = %url, "Requesting scan");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("Scan request failed")?;

        Self::decode(resp, "scan").await
    }

    async fn place_virtual_bet(&self, opportunity: &Opportunity) -> Result<VirtualBetResponse> {
        let url = format!("{}/api/simulation/place", self.base_url);
        debug!(url = %url, event = %opportunity.event_name(), "Placing virtual bet");

        let resp = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .json(opportunity)
            .send()
            .await
            .context("Virtual bet request failed")?;

        Self::decode(resp, "virtual bet").await
    }

    async fn simulation_stats(&self) -> Result<SimulationStats> {
        let url = format!("{}/api/simulation/stats", self.base_url);
        debug!(url = %url, "Fetching simulation stats");

        let resp = self
            .http
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .context("Simulation stats request failed")?;

        Self::decode(resp, "simulation stats").await
    }
}
