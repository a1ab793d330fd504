//! Core engine: scanning, auto-refresh and virtual bets.
//!
//! All three act on the shared `ScanSession`; none of them draws anything.

pub mod bets;
pub mod scanner;
pub mod scheduler;

pub use bets::{BetTarget, VirtualBetReceipt, VirtualBetService};
pub use scanner::{ScanController, ScanOutcome};
pub use scheduler::AutoRefreshScheduler;
