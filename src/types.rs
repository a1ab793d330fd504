//! Shared types for ARBWATCH.
//!
//! Wire shapes exchanged with the scanning backend plus the identity and
//! error types the rest of the crate builds on. Field names follow the
//! backend's JSON exactly so that an `Opportunity` can be posted back to
//! the simulation endpoint unchanged.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Market kind
// ---------------------------------------------------------------------------

/// The three market shapes the backend scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MarketKind {
    #[serde(rename = "h2h")]
    Moneyline,
    #[serde(rename = "spreads")]
    Spread,
    #[serde(rename = "totals")]
    Total,
}

impl MarketKind {
    pub const ALL: [MarketKind; 3] = [MarketKind::Moneyline, MarketKind::Spread, MarketKind::Total];

    /// Key used on the wire (`markets=` query parameter, `market` field).
    pub fn wire_key(&self) -> &'static str {
        match self {
            MarketKind::Moneyline => "h2h",
            MarketKind::Spread => "spreads",
            MarketKind::Total => "totals",
        }
    }

    /// Human label shown in the opportunity table.
    pub fn label(&self) -> &'static str {
        match self {
            MarketKind::Moneyline => "Moneyline",
            MarketKind::Spread => "Handicap",
            MarketKind::Total => "Over/Under",
        }
    }
}

impl fmt::Display for MarketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Accepts wire keys and the common spoken names (case-insensitive).
impl std::str::FromStr for MarketKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "h2h" | "moneyline" | "ml" | "1x2" => Ok(MarketKind::Moneyline),
            "spreads" | "spread" | "handicap" => Ok(MarketKind::Spread),
            "totals" | "total" | "ou" | "over/under" => Ok(MarketKind::Total),
            other => anyhow::bail!("Unknown market kind: {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Opportunity
// ---------------------------------------------------------------------------

/// One leg of an arbitrage: the stake to place on a single outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stake {
    pub stake: Decimal,
    pub odds: f64,
    /// Bookmaker display name as reported by the backend.
    #[serde(default)]
    pub book: String,
    #[serde(default)]
    pub book_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potential_return: Option<Decimal>,
}

/// An arbitrage opportunity exactly as produced by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub sport: String,
    #[serde(default)]
    pub sport_title: String,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    /// Event start. Empty or unparsable timestamps are treated as unknown.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub commence_time: Option<DateTime<Utc>>,
    pub market: MarketKind,
    #[serde(default)]
    pub line: Option<f64>,
    /// Return on investment, in percent.
    pub roi: f64,
    pub profit: Decimal,
    /// Outcome label → stake. Ordered so that hashing is deterministic.
    #[serde(default)]
    pub stakes: BTreeMap<String, Stake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_return: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_investment: Option<Decimal>,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
        .map(|t| t.with_timezone(&Utc)))
}

impl Opportunity {
    /// "Home vs Away".
    pub fn event_name(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }

    /// Hash over the whole payload, amounts included. A rescan that changes
    /// any stake or the profit yields a different id, so a bet placed on an
    /// old id cannot post figures the user never saw.
    pub fn fingerprint(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.sport.hash(&mut h);
        self.home_team.hash(&mut h);
        self.away_team.hash(&mut h);
        self.commence_time.map(|t| t.timestamp()).hash(&mut h);
        self.market.hash(&mut h);
        self.line.map(f64::to_bits).hash(&mut h);
        self.roi.to_bits().hash(&mut h);
        self.profit.hash(&mut h);
        self.total_return.hash(&mut h);
        self.total_investment.hash(&mut h);
        for (outcome, stake) in &self.stakes {
            outcome.hash(&mut h);
            stake.book_key.hash(&mut h);
            stake.book.hash(&mut h);
            stake.odds.to_bits().hash(&mut h);
            stake.stake.hash(&mut h);
            stake.potential_return.hash(&mut h);
        }
        h.finish()
    }

    /// Helper to build a sample opportunity with sensible defaults.
    #[cfg(test)]
    pub fn sample(roi: f64, profit: Decimal) -> Self {
        use rust_decimal_macros::dec;

        let mut stakes = BTreeMap::new();
        stakes.insert(
            "Boston Bruins".to_string(),
            Stake {
                stake: dec!(260.00),
                odds: 2.05,
                book: "Pinnacle".to_string(),
                book_key: "pinnacle".to_string(),
                potential_return: Some(dec!(533.00)),
            },
        );
        stakes.insert(
            "Edmonton Oilers".to_string(),
            Stake {
                stake: dec!(240.00),
                odds: 2.22,
                book: "Bet365".to_string(),
                book_key: "bet365".to_string(),
                potential_return: Some(dec!(532.80)),
            },
        );
        Opportunity {
            sport: "icehockey_nhl".to_string(),
            sport_title: "NHL".to_string(),
            home_team: "Boston Bruins".to_string(),
            away_team: "Edmonton Oilers".to_string(),
            commence_time: Some(Utc::now() + chrono::Duration::hours(5)),
            market: MarketKind::Moneyline,
            line: None,
            roi,
            profit,
            stakes,
            total_return: None,
            total_investment: Some(dec!(500)),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity and the current list
// ---------------------------------------------------------------------------

/// Stable handle for one opportunity, minted when a scan result is ingested.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpportunityId(String);

impl OpportunityId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OpportunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpportunityEntry {
    pub id: OpportunityId,
    pub opportunity: Opportunity,
}

/// The ordered result of one completed scan. Cheap to clone; never
/// mutated after ingestion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpportunityList {
    entries: Arc<Vec<OpportunityEntry>>,
}

impl OpportunityList {
    /// Mint ids for a fresh backend payload, preserving its order.
    /// Identical opportunities in one payload get an occurrence suffix.
    pub fn ingest(opportunities: Vec<Opportunity>) -> Self {
        let mut seen: HashMap<u64, usize> = HashMap::new();
        let entries = opportunities
            .into_iter()
            .map(|opportunity| {
                let fp = opportunity.fingerprint();
                let n = seen.entry(fp).or_insert(0);
                let id = if *n == 0 {
                    format!("{fp:016x}")
                } else {
                    format!("{fp:016x}-{n}")
                };
                *n += 1;
                OpportunityEntry {
                    id: OpportunityId(id),
                    opportunity,
                }
            })
            .collect();
        Self {
            entries: Arc::new(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpportunityEntry> {
        self.entries.iter()
    }

    pub fn opportunities(&self) -> impl Iterator<Item = &Opportunity> {
        self.entries.iter().map(|e| &e.opportunity)
    }

    pub fn get(&self, position: usize) -> Option<&OpportunityEntry> {
        self.entries.get(position)
    }

    pub fn find(&self, id: &OpportunityId) -> Option<&OpportunityEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }
}

// ---------------------------------------------------------------------------
// Backend payloads
// ---------------------------------------------------------------------------

/// `api_usage` block of a scan response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUsage {
    #[serde(default)]
    pub remaining: Option<u64>,
    #[serde(default)]
    pub used: Option<u64>,
}

/// Response of the scan endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanResponse {
    #[serde(default)]
    pub opportunities: Option<Vec<Opportunity>>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub api_usage: Option<ApiUsage>,
}

/// Response of the virtual-bet endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualBetResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub bet_id: Option<u64>,
}

/// Bankroll block of the simulation stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bankroll {
    pub total: Decimal,
    pub available: Decimal,
    pub in_play: Decimal,
}

/// Response of the simulation stats endpoint. Only the bankroll and the
/// pending count are read; the rest of the payload is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationStats {
    pub bankroll: Bankroll,
    pub pending_bets: u64,
}

impl SimulationStats {
    /// One-line readout, e.g. "Bankroll 870.00 available, 130.00 in play, 1 pending bet".
    pub fn summary(&self) -> String {
        let plural = if self.pending_bets == 1 { "" } else { "s" };
        format!(
            "Bankroll {:.2} available, {:.2} in play, {} pending bet{plural}",
            self.bankroll.available, self.bankroll.in_play, self.pending_bets
        )
    }
}

/// Display metadata for one bookmaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmakerInfo {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub color: String,
}

/// Sport and bookmaker metadata served by the config endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub sports: BTreeMap<String, String>,
    pub bookmakers: BTreeMap<String, BookmakerInfo>,
    pub markets: BTreeMap<String, String>,
    /// Label → hours, e.g. `"24h" → 24`.
    pub timeframes: BTreeMap<String, u32>,
    pub default_investment: Option<Decimal>,
    pub default_min_roi: Option<f64>,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
    Warning,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationLevel::Success => write!(f, "OK"),
            NotificationLevel::Error => write!(f, "ERROR"),
            NotificationLevel::Warning => write!(f, "WARN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// The failure modes of the dashboard. None of them is fatal; each is
/// reported through the notification queue.
#[derive(Debug, thiserror::Error)]
pub enum ArbwatchError {
    #[error("Config load failed: {0}")]
    ConfigLoad(String),

    #[error("Scan failed: {0}")]
    ScanRequest(String),

    #[error(transparent)]
    VirtualBet(#[from] VirtualBetError),

    #[error("Bankroll request failed: {0}")]
    Bankroll(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VirtualBetError {
    /// `position` is 0-based; the message shows the 1-based row number.
    #[error("Row {} is not in the current list ({} shown)", .position + 1, .len)]
    OutOfRange { position: usize, len: usize },

    #[error("Opportunity {0} is no longer in the current list")]
    Stale(OpportunityId),

    #[error("Virtual bet rejected: {0}")]
    Rejected(String),

    #[error("Virtual bet request failed: {0}")]
    Request(String),
}

impl VirtualBetError {
    /// Local misses never reach the backend.
    pub fn is_local(&self) -> bool {
        matches!(self, VirtualBetError::OutOfRange { .. } | VirtualBetError::Stale(_))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
