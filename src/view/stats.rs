//! Summary statistics over one opportunity list.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::Opportunity;

/// Count, best ROI and total profit of a list.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScanStats {
    pub count: usize,
    pub best_roi: f64,
    pub total_profit: Decimal,
}

impl ScanStats {
    /// e.g. `3.4%`
    pub fn best_roi_text(&self) -> String {
        format!("{}%", self.best_roi)
    }

    /// Two-decimal profit, e.g. `54.00`.
    pub fn total_profit_text(&self) -> String {
        format!("{:.2}", self.total_profit)
    }
}

/// Aggregate a list. Pure; an empty list yields all zeros.
pub fn aggregate<'a>(opportunities: impl IntoIterator<Item = &'a Opportunity>) -> ScanStats {
    let mut count = 0usize;
    let mut best_roi = f64::NEG_INFINITY;
    let mut total_profit = Decimal::ZERO;

    for opp in opportunities {
        count += 1;
        best_roi = best_roi.max(opp.roi);
        total_profit += opp.profit;
    }

    ScanStats {
        count,
        best_roi: if count == 0 { 0.0 } else { best_roi },
        total_profit,
    }
}
