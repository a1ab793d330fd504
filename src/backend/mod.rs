//! Scanning backend integration.
//!
//! Defines the `ScanBackend` trait (config, scan, virtual bets, bankroll) and the
//! HTTP implementation used in production. Tests substitute in-memory
//! implementations.

pub mod http;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{Opportunity, RemoteConfig, ScanResponse, SimulationStats, VirtualBetResponse};
use crate::view::filters::FilterSelection;

/// Abstraction over the arbitrage scanning service.
///
/// The arbitrage math runs entirely behind this trait; the client only
/// asks for results and forwards simulated bets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScanBackend: Send + Sync {
    /// Sport and bookmaker metadata. Called once at startup.
    async fn fetch_config(&self) -> Result<RemoteConfig>;

    /// Run one scan with the given filters.
    async fn scan(&self, filters: &FilterSelection) -> Result<ScanResponse>;

    /// Record a simulated bet on one opportunity.
    async fn place_virtual_bet(&self, opportunity: &Opportunity) -> Result<VirtualBetResponse>;

    /// Current simulated bankroll and pending bet count.
    async fn simulation_stats(&self) -> Result<SimulationStats>;
}
