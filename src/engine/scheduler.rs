//! Periodic auto-refresh.
//!
//! While enabled, a background task fires a scan every period. Each tick
//! goes through the same single-flight guard as a manual scan, so a tick
//! that lands on a running scan is simply dropped. Disabling stops future
//! ticks; a scan already in flight is left to finish.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::engine::scanner::{ScanController, ScanOutcome};

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);
pub const MIN_PERIOD: Duration = Duration::from_secs(1);

pub struct AutoRefreshScheduler {
    controller: Arc<ScanController>,
    period: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AutoRefreshScheduler {
    /// Periods under one second are raised to one second.
    pub fn new(controller: Arc<ScanController>, period: Duration) -> Self {
        Self {
            controller,
            period: period.max(MIN_PERIOD),
            task: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_enabled(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Start ticking. The first scan happens one full period from now.
    /// Returns false if auto-refresh was already on.
    pub fn enable(&self) -> bool {
        let mut task = self.task.lock();
        if task.is_some() {
            return false;
        }

        let controller = Arc::clone(&self.controller);
        let period = self.period;
        *task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                debug!("Auto-refresh tick");
                let controller = Arc::clone(&controller);
                tokio::spawn(async move {
                    controller.scan().await;
                });
            }
        }));

        info!(period_secs = period.as_secs(), "Auto-refresh enabled");
        true
    }

    /// Stop ticking. Returns false if auto-refresh was already off.
    pub fn disable(&self) -> bool {
        match self.task.lock().take() {
            Some(handle) => {
                handle.abort();
                info!("Auto-refresh disabled");
                true
            }
            None => false,
        }
    }

    /// Flip the toggle. Returns the new state.
    pub fn toggle(&self) -> bool {
        if self.is_enabled() {
            self.disable();
            false
        } else {
            self.enable();
            true
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        if enabled {
            self.enable();
        } else {
            self.disable();
        }
    }

    /// A filter changed. With auto-refresh on, scan right away instead of
    /// waiting for the next tick; otherwise do nothing.
    pub fn on_filters_changed(&self) -> Option<JoinHandle<ScanOutcome>> {
        if !self.is_enabled() {
            return None;
        }
        debug!("Filters changed with auto-refresh on, scanning now");
        let controller = Arc::clone(&self.controller);
        Some(tokio::spawn(async move { controller.scan().await }))
    }
}

impl Drop for AutoRefreshScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}
