//! Session state shared by the scan, bet and display components.
//!
//! One `ScanSession` owns the current snapshot (list, credits, stats and
//! rendered rows), the visibility of the scan controls, and the scan
//! phase. Snapshots are published whole, so a reader always sees stats and
//! rows computed from the same list.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::types::{ApiUsage, OpportunityList};
use crate::view::render::RenderedView;
use crate::view::stats::ScanStats;

pub const SCAN_LABEL_IDLE: &str = "Scan Now";
pub const SCAN_LABEL_BUSY: &str = "Scanning...";

/// Timestamps and API quota as of the last completed scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSessionState {
    pub last_scan: Option<DateTime<Utc>>,
    pub remaining_api_credits: Option<u64>,
    pub used_api_credits: Option<u64>,
    pub total_api_credits: Option<u64>,
}

impl ScanSessionState {
    pub fn apply_usage(&mut self, usage: &ApiUsage) {
        self.remaining_api_credits = usage.remaining;
        self.used_api_credits = usage.used;
        self.total_api_credits = match (usage.remaining, usage.used) {
            (Some(remaining), Some(used)) => Some(remaining + used),
            _ => self.total_api_credits,
        };
    }
}

/// Everything one completed scan produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub opportunities: OpportunityList,
    pub state: ScanSessionState,
    pub stats: ScanStats,
    pub view: RenderedView,
}

/// Visibility and enablement of the scan-related widgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub scan_enabled: bool,
    pub scan_label: String,
    pub loading_visible: bool,
    pub table_visible: bool,
    pub empty_visible: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            scan_enabled: true,
            scan_label: SCAN_LABEL_IDLE.to_string(),
            loading_visible: false,
            table_visible: false,
            empty_visible: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPhase {
    Idle,
    Scanning,
}

#[derive(Debug)]
pub struct ScanSession {
    phase: Mutex<ScanPhase>,
    snapshot: RwLock<Arc<Snapshot>>,
    controls: RwLock<Controls>,
    generation: watch::Sender<u64>,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSession {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            phase: Mutex::new(ScanPhase::Idle),
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            controls: RwLock::new(Controls::default()),
            generation,
        }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }

    pub fn controls(&self) -> Controls {
        self.controls.read().clone()
    }

    pub fn phase(&self) -> ScanPhase {
        *self.phase.lock()
    }

    pub fn is_scanning(&self) -> bool {
        self.phase() == ScanPhase::Scanning
    }

    /// Receiver that changes each time a snapshot is published.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    /// `Idle → Scanning`. Returns `None` when a scan is already running.
    ///
    /// The returned permit puts the session back to `Idle` when dropped,
    /// whatever happened in between.
    pub fn try_begin_scan(&self) -> Option<ScanPermit<'_>> {
        let mut phase = self.phase.lock();
        if *phase == ScanPhase::Scanning {
            return None;
        }
        *phase = ScanPhase::Scanning;

        let mut controls = self.controls.write();
        let prior = controls.clone();
        controls.scan_enabled = false;
        controls.scan_label = SCAN_LABEL_BUSY.to_string();
        controls.loading_visible = true;
        controls.table_visible = false;
        controls.empty_visible = false;

        Some(ScanPermit {
            session: self,
            prior,
            published: false,
        })
    }
}

/// Proof that the holder is the one running scan.
pub struct ScanPermit<'a> {
    session: &'a ScanSession,
    prior: Controls,
    published: bool,
}

impl ScanPermit<'_> {
    /// The snapshot the scan is building on.
    pub fn current(&self) -> Arc<Snapshot> {
        self.session.snapshot()
    }

    /// Replace the current snapshot in one step.
    pub fn publish(&mut self, snapshot: Snapshot) {
        let has_rows = !snapshot.view.is_empty();
        *self.session.snapshot.write() = Arc::new(snapshot);
        {
            let mut controls = self.session.controls.write();
            controls.table_visible = has_rows;
            controls.empty_visible = !has_rows;
        }
        self.published = true;
        self.session.generation.send_modify(|g| *g += 1);
    }
}

impl Drop for ScanPermit<'_> {
    fn drop(&mut self) {
        {
            let mut controls = self.session.controls.write();
            controls.scan_enabled = true;
            controls.scan_label = SCAN_LABEL_IDLE.to_string();
            controls.loading_visible = false;
            if !self.published {
                controls.table_visible = self.prior.table_visible;
                controls.empty_visible = self.prior.empty_visible;
            }
        }
        *self.session.phase.lock() = ScanPhase::Idle;
        debug!(published = self.published, "Scan phase back to idle");
    }
}
