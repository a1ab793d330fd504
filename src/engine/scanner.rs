//! Scan controller: the single-flight `Idle → Scanning → Idle` cycle.
//!
//! Manual triggers, the refresh shortcut and the auto-refresh timer all
//! call `ScanController::scan`. A trigger that arrives while a scan is in
//! flight is dropped, never queued. A completed scan replaces the whole
//! session snapshot in one step; a failed one leaves it untouched.

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backend::ScanBackend;
use crate::catalog::ConfigStore;
use crate::notify::{Chime, NotificationService};
use crate::session::{ScanSession, Snapshot};
use crate::types::{ArbwatchError, OpportunityList, ScanResponse};
use crate::view::filters::{FilterSelection, FilterState};
use crate::view::{render, stats};

/// What one call to `scan()` did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// The list was replaced with `count` opportunities.
    Completed { count: usize },
    /// The request failed; the previous list is still shown.
    Failed { reason: String },
    /// Another scan was already in flight.
    Skipped,
}

impl ScanOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ScanOutcome::Completed { .. })
    }
}

pub struct ScanController {
    backend: Arc<dyn ScanBackend>,
    session: Arc<ScanSession>,
    filters: Arc<FilterState>,
    catalog: Arc<ConfigStore>,
    notifications: NotificationService,
    chime: Arc<dyn Chime>,
    scan_timeout: Option<Duration>,
    last_error: Mutex<Option<String>>,
}

impl ScanController {
    pub fn new(
        backend: Arc<dyn ScanBackend>,
        session: Arc<ScanSession>,
        filters: Arc<FilterState>,
        catalog: Arc<ConfigStore>,
        notifications: NotificationService,
        chime: Arc<dyn Chime>,
    ) -> Self {
        Self {
            backend,
            session,
            filters,
            catalog,
            notifications,
            chime,
            scan_timeout: None,
            last_error: Mutex::new(None),
        }
    }

    /// Bound each scan round-trip. `None` lets a scan wait indefinitely.
    pub fn with_timeout(mut self, scan_timeout: Option<Duration>) -> Self {
        self.scan_timeout = scan_timeout;
        self
    }

    pub fn session(&self) -> &Arc<ScanSession> {
        &self.session
    }

    pub fn filters(&self) -> &Arc<FilterState> {
        &self.filters
    }

    pub fn catalog(&self) -> &Arc<ConfigStore> {
        &self.catalog
    }

    pub fn is_scanning(&self) -> bool {
        self.session.is_scanning()
    }

    /// Text of the most recent failure, cleared by the next success.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Run one scan with the filters as they are right now.
    pub async fn scan(&self) -> ScanOutcome {
        let Some(mut permit) = self.session.try_begin_scan() else {
            debug!("Scan already in flight, trigger dropped");
            return ScanOutcome::Skipped;
        };

        let filters = self.filters.current();
        info!(
            sports = filters.sports.len(),
            bookmakers = filters.bookmakers.len(),
            min_roi = filters.min_roi,
            investment = %filters.investment,
            hours = ?filters.hours,
            "Scan started"
        );

        let response = match self.request(&filters).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Scan failed, keeping previous results");
                let reason = e.to_string();
                *self.last_error.lock() = Some(reason.clone());
                self.notifications.error(reason.clone());
                return ScanOutcome::Failed { reason };
            }
        };

        let previous = permit.current();
        let opportunities = OpportunityList::ingest(response.opportunities.unwrap_or_default());
        let mut state = previous.state.clone();
        if let Some(usage) = &response.api_usage {
            state.apply_usage(usage);
        }
        let now = Utc::now();
        state.last_scan = Some(now);

        let snapshot = Snapshot {
            stats: stats::aggregate(opportunities.opportunities()),
            view: render::render(&opportunities, &self.catalog, now),
            opportunities,
            state,
        };
        let count = snapshot.opportunities.len();

        info!(
            count,
            best_roi = snapshot.stats.best_roi,
            total_profit = %snapshot.stats.total_profit,
            remaining_credits = ?snapshot.state.remaining_api_credits,
            "Scan complete"
        );

        permit.publish(snapshot);
        drop(permit);
        *self.last_error.lock() = None;

        if count > 0 {
            self.notifications
                .success(format!("Found {count} arbitrage opportunities"));
            self.chime.play();
        }

        ScanOutcome::Completed { count }
    }

    async fn request(&self, filters: &FilterSelection) -> Result<ScanResponse, ArbwatchError> {
        let call = self.backend.scan(filters);
        let result = match self.scan_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(ArbwatchError::ScanRequest(format!(
                        "timed out after {}s",
                        limit.as_secs()
                    )))
                }
            },
            None => call.await,
        };
        result.map_err(|e| ArbwatchError::ScanRequest(format!("{e:#}")))
    }
}
