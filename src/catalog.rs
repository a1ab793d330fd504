//! Read-only sport and bookmaker metadata.
//!
//! Loaded once at startup from the backend's config endpoint. When that
//! fails the dashboard keeps running on an empty store: filter lists stay
//! unpopulated and every bookmaker renders with the neutral fallback.

use tracing::{info, warn};

use crate::backend::ScanBackend;
use crate::notify::NotificationService;
use crate::types::{ArbwatchError, BookmakerInfo, RemoteConfig};
use crate::view::filters::FilterControls;

pub const FALLBACK_COLOR: &str = "#6b7280";
pub const FALLBACK_URL: &str = "#";

/// How one bookmaker is drawn in a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmakerStyle {
    pub name: String,
    pub color: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigStore {
    remote: RemoteConfig,
}

impl ConfigStore {
    pub fn new(remote: RemoteConfig) -> Self {
        Self { remote }
    }

    /// Fetch the config from the backend.
    pub async fn load(backend: &dyn ScanBackend) -> Result<Self, ArbwatchError> {
        let remote = backend
            .fetch_config()
            .await
            .map_err(|e| ArbwatchError::ConfigLoad(format!("{e:#}")))?;

        info!(
            sports = remote.sports.len(),
            bookmakers = remote.bookmakers.len(),
            "Dashboard config loaded"
        );
        Ok(Self::new(remote))
    }

    /// Load at startup, degrading to an empty store on failure.
    /// The failure is reported once.
    pub async fn bootstrap(backend: &dyn ScanBackend, notifications: &NotificationService) -> Self {
        match Self::load(backend).await {
            Ok(store) => store,
            Err(e) => {
                warn!(error = %e, "Continuing without sport/bookmaker metadata");
                notifications.error(e.to_string());
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.remote.sports.is_empty() && self.remote.bookmakers.is_empty()
    }

    pub fn sport_label(&self, key: &str) -> Option<&str> {
        self.remote.sports.get(key).map(String::as_str)
    }

    pub fn sports(&self) -> impl Iterator<Item = (&str, &str)> {
        self.remote.sports.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn bookmaker(&self, key: &str) -> Option<&BookmakerInfo> {
        self.remote.bookmakers.get(key)
    }

    pub fn bookmakers(&self) -> impl Iterator<Item = (&str, &BookmakerInfo)> {
        self.remote.bookmakers.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Market key → label, as configured on the backend.
    pub fn market_labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.remote.markets.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Lookahead presets, shortest first.
    pub fn timeframes(&self) -> Vec<(&str, u32)> {
        let mut frames: Vec<_> = self
            .remote
            .timeframes
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        frames.sort_by_key(|(_, hours)| *hours);
        frames
    }

    /// Fill blank ROI and stake fields with the backend's defaults.
    pub fn seed_defaults(&self, controls: &mut FilterControls) {
        if controls.min_roi.trim().is_empty() {
            if let Some(roi) = self.remote.default_min_roi {
                controls.min_roi = roi.to_string();
            }
        }
        if controls.investment.trim().is_empty() {
            if let Some(investment) = self.remote.default_investment {
                controls.investment = investment.normalize().to_string();
            }
        }
    }

    /// Style for a bookmaker key. Unknown keys never fail: they fall back to
    /// `display_name` (then the key itself), a neutral color and `#`.
    pub fn bookmaker_style(&self, key: &str, display_name: &str) -> BookmakerStyle {
        match self.bookmaker(key) {
            Some(info) => BookmakerStyle {
                name: info.name.clone(),
                color: non_empty_or(&info.color, FALLBACK_COLOR),
                url: non_empty_or(&info.url, FALLBACK_URL),
            },
            None => BookmakerStyle {
                name: non_empty_or(display_name, key),
                color: FALLBACK_COLOR.to_string(),
                url: FALLBACK_URL.to_string(),
            },
        }
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
