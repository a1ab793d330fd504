//! Filter controls and the canonical parameter set sent with each scan.
//!
//! `FilterControls` is the raw state of the filter inputs (checkbox groups
//! and free-text fields). `FilterControls::selection` turns it into a
//! defaulted `FilterSelection`; that derivation is pure and runs fresh for
//! every scan request.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::types::MarketKind;

pub const DEFAULT_MIN_ROI: f64 = 0.5;
pub const DEFAULT_INVESTMENT: Decimal = dec!(500);

/// Canonical scan parameters.
///
/// Empty `sports` / `bookmakers` mean "no restriction". `markets` is never
/// empty: an empty selection has already been widened to all three kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub sports: BTreeSet<String>,
    pub markets: BTreeSet<MarketKind>,
    pub bookmakers: BTreeSet<String>,
    pub min_roi: f64,
    pub investment: Decimal,
    pub hours: Option<u32>,
    /// Only events already in play.
    #[serde(default)]
    pub live: bool,
}

impl Default for FilterSelection {
    fn default() -> Self {
        FilterControls::default().selection()
    }
}

impl FilterSelection {
    /// Query parameters in the order the scan endpoint documents them.
    /// `hours` is left out entirely when there is no horizon, and `live`
    /// only appears when set.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("sports", join(self.sports.iter().map(String::as_str))),
            ("markets", join(self.markets.iter().map(|m| m.wire_key()))),
            ("bookmakers", join(self.bookmakers.iter().map(String::as_str))),
            ("min_roi", self.min_roi.to_string()),
            ("investment", self.investment.normalize().to_string()),
        ];
        if let Some(hours) = self.hours {
            pairs.push(("hours", hours.to_string()));
        }
        if self.live {
            pairs.push(("live", "1".to_string()));
        }
        pairs
    }
}

fn join<'a>(keys: impl Iterator<Item = &'a str>) -> String {
    keys.collect::<Vec<_>>().join(",")
}

/// What the user currently has checked and typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterControls {
    pub sports: BTreeSet<String>,
    pub markets: BTreeSet<MarketKind>,
    pub bookmakers: BTreeSet<String>,
    pub min_roi: String,
    pub investment: String,
    pub hours: String,
    pub live: bool,
}

impl FilterControls {
    /// Read the controls into scan parameters, applying defaults.
    pub fn selection(&self) -> FilterSelection {
        let markets = if self.markets.is_empty() {
            MarketKind::ALL.into_iter().collect()
        } else {
            self.markets.clone()
        };

        let min_roi = self
            .min_roi
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(DEFAULT_MIN_ROI);

        let investment = Decimal::from_str(self.investment.trim())
            .ok()
            .filter(|v| *v > Decimal::ZERO)
            .unwrap_or(DEFAULT_INVESTMENT);

        let hours = self.hours.trim().parse::<u32>().ok().filter(|h| *h > 0);

        FilterSelection {
            sports: clean(&self.sports),
            markets,
            bookmakers: clean(&self.bookmakers),
            min_roi,
            investment,
            hours,
            live: self.live,
        }
    }

    /// Flip a sport checkbox. Returns whether it is now checked.
    pub fn toggle_sport(&mut self, key: &str) -> bool {
        toggle(&mut self.sports, key.trim().to_string())
    }

    pub fn toggle_market(&mut self, kind: MarketKind) -> bool {
        toggle(&mut self.markets, kind)
    }

    pub fn toggle_bookmaker(&mut self, key: &str) -> bool {
        toggle(&mut self.bookmakers, key.trim().to_string())
    }

    /// Flip the live-only switch. Returns whether it is now on.
    pub fn toggle_live(&mut self) -> bool {
        self.live = !self.live;
        self.live
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn clean(keys: &BTreeSet<String>) -> BTreeSet<String> {
    keys.iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

fn toggle<T: Ord>(set: &mut BTreeSet<T>, value: T) -> bool {
    if set.remove(&value) {
        false
    } else {
        set.insert(value);
        true
    }
}

/// Shared handle on the filter controls. Readers get a fresh
/// `FilterSelection` each time; writers edit the raw controls.
#[derive(Debug, Default)]
pub struct FilterState {
    controls: RwLock<FilterControls>,
}

impl FilterState {
    pub fn new(controls: FilterControls) -> Self {
        Self {
            controls: RwLock::new(controls),
        }
    }

    pub fn current(&self) -> FilterSelection {
        self.controls.read().selection()
    }

    pub fn controls(&self) -> FilterControls {
        self.controls.read().clone()
    }

    pub fn replace(&self, controls: FilterControls) {
        *self.controls.write() = controls;
    }

    pub fn update<R>(&self, edit: impl FnOnce(&mut FilterControls) -> R) -> R {
        edit(&mut *self.controls.write())
    }
}
