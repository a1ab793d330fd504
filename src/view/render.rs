//! Opportunity list → render-ready rows.
//!
//! Pure transform over one snapshot of the list and the config store.
//! Bookmakers missing from the config degrade per leg (neutral color,
//! `#` link); they never fail the render.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::ConfigStore;
use crate::types::{MarketKind, OpportunityEntry, OpportunityId, OpportunityList};

/// ROI (percent) at or above which a row is highlighted.
pub const HIGHLIGHT_ROI: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegRow {
    pub outcome: String,
    pub bookmaker: String,
    pub color: String,
    pub url: String,
    pub odds: f64,
    pub stake: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityRow {
    pub id: OpportunityId,
    pub sport: String,
    pub event: String,
    pub starts_in: String,
    pub market: String,
    pub roi: f64,
    pub roi_text: String,
    pub highlighted: bool,
    pub profit: String,
    pub legs: Vec<LegRow>,
}

/// What the opportunity panel should show.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedView {
    #[default]
    Empty,
    Rows { rows: Vec<OpportunityRow> },
}

impl RenderedView {
    pub fn rows(&self) -> &[OpportunityRow] {
        match self {
            RenderedView::Empty => &[],
            RenderedView::Rows { rows } => rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RenderedView::Empty)
    }

    /// Row at a display position (0-based).
    pub fn row(&self, position: usize) -> Option<&OpportunityRow> {
        self.rows().get(position)
    }
}

/// Render the whole list at `now`.
pub fn render(list: &OpportunityList, catalog: &ConfigStore, now: DateTime<Utc>) -> RenderedView {
    if list.is_empty() {
        return RenderedView::Empty;
    }
    RenderedView::Rows {
        rows: list.iter().map(|e| render_row(e, catalog, now)).collect(),
    }
}

fn render_row(entry: &OpportunityEntry, catalog: &ConfigStore, now: DateTime<Utc>) -> OpportunityRow {
    let opp = &entry.opportunity;

    let sport = if !opp.sport_title.is_empty() {
        opp.sport_title.clone()
    } else {
        catalog.sport_label(&opp.sport).unwrap_or(&opp.sport).to_string()
    };

    let legs = opp
        .stakes
        .iter()
        .map(|(outcome, stake)| {
            let style = catalog.bookmaker_style(&stake.book_key, &stake.book);
            LegRow {
                outcome: outcome.clone(),
                bookmaker: style.name,
                color: style.color,
                url: style.url,
                odds: stake.odds,
                stake: format!("{:.2}", stake.stake),
            }
        })
        .collect();

    OpportunityRow {
        id: entry.id.clone(),
        sport,
        event: opp.event_name(),
        starts_in: time_bucket(opp.commence_time, now),
        market: market_label(opp.market, opp.line),
        roi: opp.roi,
        roi_text: format!("{:.2}%", opp.roi),
        highlighted: opp.roi >= HIGHLIGHT_ROI,
        profit: format!("{:.2}", opp.profit),
        legs,
    }
}

/// "Soon" under an hour away (including already started), otherwise the
/// rounded hour count, e.g. "5h". Unknown start times show "TBD".
pub fn time_bucket(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(start) = start else {
        return "TBD".to_string();
    };
    let hours = (start - now).num_seconds() as f64 / 3600.0;
    if hours < 1.0 {
        "Soon".to_string()
    } else {
        format!("{}h", hours.round() as i64)
    }
}

/// e.g. "Moneyline", "Over/Under (6.5)".
pub fn market_label(kind: MarketKind, line: Option<f64>) -> String {
    match line {
        Some(line) => format!("{} ({line})", kind.label()),
        None => kind.label().to_string(),
    }
}
