//! Terminal front-end.
//!
//! Reads one command per line from stdin and redraws the screen whenever a
//! scan publishes, a command runs, or the notification stack changes.
//! Scans and bets run as background tasks so input stays live while a
//! request is in flight.

use anyhow::{bail, Context, Result};
use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, Tabled};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::engine::{
    AutoRefreshScheduler, BetTarget, ScanController, ScanOutcome, VirtualBetReceipt,
    VirtualBetService,
};
use crate::notify::{NotificationPhase, NotificationService};
use crate::session::Snapshot;
use crate::types::{ArbwatchError, MarketKind, OpportunityId, SimulationStats, VirtualBetError};
use crate::view::render::OpportunityRow;

const EMPTY_STATE: &str = "No arbitrage opportunities found. Adjust the filters and scan again.";
const LOADING: &str = "Scanning for arbitrage opportunities...";

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Scan,
    /// Close the detail overlay.
    Escape,
    /// Open the detail overlay for a displayed row (1-based).
    Show(usize),
    /// Virtual bet on a displayed row (1-based).
    Bet(usize),
    /// `None` toggles.
    Auto(Option<bool>),
    Sport(String),
    Market(MarketKind),
    Book(String),
    MinRoi(String),
    Stake(String),
    /// Empty clears the horizon.
    Hours(String),
    /// Live-only switch. `None` toggles.
    Live(Option<bool>),
    Bankroll,
    Clear,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (head, arg) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        let cmd = match head.to_lowercase().as_str() {
            "r" | "refresh" | "scan" | "^r" | "ctrl+r" | "\u{12}" => Command::Scan,
            "esc" | "escape" | "\u{1b}" => Command::Escape,
            "show" => Command::Show(row_number(arg)?),
            "bet" => Command::Bet(row_number(arg)?),
            "auto" => Command::Auto(switch(arg, "auto")?),
            "live" => Command::Live(switch(arg, "live")?),
            "bankroll" | "bank" => Command::Bankroll,
            "sport" => Command::Sport(required(arg, "sport")?),
            "market" => Command::Market(arg.parse()?),
            "book" => Command::Book(required(arg, "book")?),
            "roi" => Command::MinRoi(arg.to_string()),
            "stake" => Command::Stake(arg.to_string()),
            "hours" => match arg.to_lowercase().as_str() {
                "" | "any" => Command::Hours(String::new()),
                _ => Command::Hours(arg.to_string()),
            },
            "clear" => Command::Clear,
            "help" | "?" => Command::Help,
            "q" | "quit" | "exit" => Command::Quit,
            other => bail!("Unknown command: {other} (type help)"),
        };
        Ok(cmd)
    }
}

fn row_number(arg: &str) -> Result<usize> {
    let n: usize = arg
        .parse()
        .with_context(|| format!("Expected a row number, got: {arg:?}"))?;
    if n == 0 {
        bail!("Rows are numbered from 1");
    }
    Ok(n)
}

/// `on`, `off`, or nothing for a toggle.
fn switch(arg: &str, what: &str) -> Result<Option<bool>> {
    match arg.to_lowercase().as_str() {
        "" => Ok(None),
        "on" => Ok(Some(true)),
        "off" => Ok(Some(false)),
        other => bail!("{what} takes on or off, got: {other}"),
    }
}

fn required(arg: &str, what: &str) -> Result<String> {
    if arg.is_empty() {
        bail!("{what} needs a key");
    }
    Ok(arg.to_string())
}

/// What the loop should do after a command.
#[derive(Debug)]
pub enum Flow {
    Continue,
    Scanning(JoinHandle<ScanOutcome>),
    Betting(JoinHandle<Result<VirtualBetReceipt, ArbwatchError>>),
    Bankroll(JoinHandle<Result<SimulationStats, ArbwatchError>>),
    Quit,
}

// ---------------------------------------------------------------------------
// Table rows
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "#")]
    number: usize,
    #[tabled(rename = "Sport")]
    sport: String,
    #[tabled(rename = "Event")]
    event: String,
    #[tabled(rename = "Starts")]
    starts: String,
    #[tabled(rename = "Market")]
    market: String,
    #[tabled(rename = "ROI")]
    roi: String,
    #[tabled(rename = "Profit")]
    profit: String,
    #[tabled(rename = "Stakes")]
    stakes: String,
}

impl TableRow {
    fn new(number: usize, row: &OpportunityRow) -> Self {
        let stakes = row
            .legs
            .iter()
            .map(|leg| format!("{} @ {} {}: {}", leg.outcome, leg.odds, leg.bookmaker, leg.stake))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            number,
            sport: row.sport.clone(),
            event: row.event.clone(),
            starts: row.starts_in.clone(),
            market: row.market.clone(),
            roi: if row.highlighted {
                format!("* {}", row.roi_text)
            } else {
                row.roi_text.clone()
            },
            profit: row.profit.clone(),
            stakes,
        }
    }
}

// ---------------------------------------------------------------------------
// Terminal UI
// ---------------------------------------------------------------------------

pub struct TerminalUi {
    controller: Arc<ScanController>,
    scheduler: Arc<AutoRefreshScheduler>,
    bets: Arc<VirtualBetService>,
    notifications: NotificationService,
    /// Row ids in the order they were last drawn.
    displayed: Vec<OpportunityId>,
    modal: Option<OpportunityId>,
    help_visible: bool,
    drawn_notifications: Vec<Uuid>,
}

impl TerminalUi {
    pub fn new(
        controller: Arc<ScanController>,
        scheduler: Arc<AutoRefreshScheduler>,
        bets: Arc<VirtualBetService>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            controller,
            scheduler,
            bets,
            notifications,
            displayed: Vec::new(),
            modal: None,
            help_visible: false,
            drawn_notifications: Vec::new(),
        }
    }

    /// Read commands until `quit` or end of input.
    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut published = self.controller.session().subscribe();
        let mut poll = tokio::time::interval(Duration::from_millis(250));

        println!("{}", self.draw());
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read stdin")? else {
                        debug!("stdin closed");
                        break;
                    };
                    if !line.trim().is_empty() {
                        match line.parse::<Command>() {
                            Ok(cmd) => {
                                if let Flow::Quit = self.handle(cmd) {
                                    break;
                                }
                            }
                            Err(e) => {
                                self.notifications.warning(e.to_string());
                            }
                        }
                    }
                    println!("{}", self.draw());
                }
                changed = published.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    println!("{}", self.draw());
                }
                _ = poll.tick() => {
                    if self.notifications_changed() {
                        println!("{}", self.draw());
                    }
                }
            }
        }
        Ok(())
    }

    /// Apply one command. Scans and bets are spawned, not awaited.
    pub fn handle(&mut self, cmd: Command) -> Flow {
        self.help_visible = false;
        match cmd {
            Command::Scan => {
                let controller = Arc::clone(&self.controller);
                Flow::Scanning(tokio::spawn(async move { controller.scan().await }))
            }
            Command::Escape => {
                self.modal = None;
                Flow::Continue
            }
            Command::Show(n) => {
                match self.row_id(n) {
                    Some(id) => self.modal = Some(id),
                    None => {
                        self.notifications.warning(format!("No row {n} on screen"));
                    }
                }
                Flow::Continue
            }
            Command::Bet(n) => match self.row_id(n) {
                Some(id) => {
                    let bets = Arc::clone(&self.bets);
                    let target = BetTarget::Id(id);
                    Flow::Betting(tokio::spawn(async move { bets.place(target).await }))
                }
                None => {
                    let err = VirtualBetError::OutOfRange {
                        position: n.saturating_sub(1),
                        len: self.displayed.len(),
                    };
                    self.notifications.error(err.to_string());
                    Flow::Continue
                }
            },
            Command::Auto(None) => {
                self.scheduler.toggle();
                Flow::Continue
            }
            Command::Auto(Some(enabled)) => {
                self.scheduler.set_enabled(enabled);
                Flow::Continue
            }
            Command::Sport(key) => self.edit_filters(|c| {
                c.toggle_sport(&key);
            }),
            Command::Market(kind) => self.edit_filters(|c| {
                c.toggle_market(kind);
            }),
            Command::Book(key) => self.edit_filters(|c| {
                c.toggle_bookmaker(&key);
            }),
            Command::MinRoi(value) => self.edit_filters(|c| c.min_roi = value),
            Command::Stake(value) => self.edit_filters(|c| c.investment = value),
            Command::Hours(value) => self.edit_filters(|c| c.hours = value),
            Command::Live(None) => self.edit_filters(|c| {
                c.toggle_live();
            }),
            Command::Live(Some(on)) => self.edit_filters(|c| c.live = on),
            Command::Bankroll => {
                let bets = Arc::clone(&self.bets);
                Flow::Bankroll(tokio::spawn(async move { bets.bankroll().await }))
            }
            Command::Clear => self.edit_filters(|c| c.clear()),
            Command::Help => {
                self.help_visible = true;
                Flow::Continue
            }
            Command::Quit => Flow::Quit,
        }
    }

    /// Id of a 1-based row as last drawn.
    fn row_id(&self, n: usize) -> Option<OpportunityId> {
        n.checked_sub(1).and_then(|i| self.displayed.get(i)).cloned()
    }

    fn edit_filters(&mut self, edit: impl FnOnce(&mut crate::view::filters::FilterControls)) -> Flow {
        self.controller.filters().update(edit);
        match self.scheduler.on_filters_changed() {
            Some(handle) => Flow::Scanning(handle),
            None => Flow::Continue,
        }
    }

    fn notifications_changed(&self) -> bool {
        let ids: Vec<Uuid> = self.notifications.active().iter().map(|n| n.id).collect();
        ids != self.drawn_notifications
    }

    /// Render the whole screen and remember which rows were shown.
    pub fn draw(&mut self) -> String {
        let session = self.controller.session();
        let snapshot = session.snapshot();
        let controls = session.controls();
        let mut out = String::new();

        let _ = writeln!(out, "{}", self.header(&snapshot, &controls.scan_label));
        let _ = writeln!(
            out,
            "Opportunities: {}   Best ROI: {}   Total profit: {}",
            snapshot.stats.count,
            snapshot.stats.best_roi_text(),
            snapshot.stats.total_profit_text()
        );
        let _ = writeln!(out);

        if controls.loading_visible {
            let _ = writeln!(out, "{LOADING}");
            self.displayed.clear();
        } else if controls.table_visible {
            let rows: Vec<TableRow> = snapshot
                .view
                .rows()
                .iter()
                .enumerate()
                .map(|(i, row)| TableRow::new(i + 1, row))
                .collect();
            let _ = writeln!(out, "{}", Table::new(rows));
            self.displayed = snapshot.view.rows().iter().map(|r| r.id.clone()).collect();
        } else {
            if controls.empty_visible {
                let _ = writeln!(out, "{EMPTY_STATE}");
            }
            self.displayed.clear();
        }

        if let Some(detail) = self.detail(&snapshot) {
            let _ = writeln!(out, "\n{detail}");
        }
        if self.help_visible {
            let _ = writeln!(out, "\n{}", self.help());
        }

        let active = self.notifications.active();
        for n in &active {
            let fading = if n.phase == NotificationPhase::Leaving { " ..." } else { "" };
            let _ = writeln!(out, "[{}] {}{fading}", n.level, n.message);
        }
        self.drawn_notifications = active.iter().map(|n| n.id).collect();

        out
    }

    fn header(&self, snapshot: &Snapshot, scan_label: &str) -> String {
        let auto = if self.scheduler.is_enabled() { "on" } else { "off" };
        let credits = match (
            snapshot.state.remaining_api_credits,
            snapshot.state.total_api_credits,
        ) {
            (Some(remaining), Some(total)) => format!("{remaining}/{total}"),
            (Some(remaining), None) => remaining.to_string(),
            _ => "-".to_string(),
        };
        let last_scan = snapshot
            .state
            .last_scan
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());

        format!(
            "ARBWATCH  [{scan_label}]  auto-refresh: {auto} ({}s)  credits: {credits}  last scan: {last_scan}",
            self.scheduler.period().as_secs()
        )
    }

    /// Detail overlay for the open row. Closes itself if the row is gone.
    fn detail(&mut self, snapshot: &Snapshot) -> Option<String> {
        let id = self.modal.as_ref()?;
        let Some(row) = snapshot.view.rows().iter().find(|r| &r.id == id) else {
            self.modal = None;
            return Some("That opportunity is no longer listed.".to_string());
        };

        let mut out = String::new();
        let _ = writeln!(out, "== {} ({}) ==", row.event, row.sport);
        let _ = writeln!(
            out,
            "{}  starts: {}  ROI: {}  profit: {}",
            row.market, row.starts_in, row.roi_text, row.profit
        );
        for leg in &row.legs {
            let _ = writeln!(
                out,
                "  {} @ {}  {} ({})  stake {}  {}",
                leg.outcome, leg.odds, leg.bookmaker, leg.color, leg.stake, leg.url
            );
        }
        let _ = write!(out, "(esc to close)");
        Some(out)
    }

    fn help(&self) -> String {
        let catalog = self.controller.catalog();
        let mut out = String::from(
            "Commands: r | refresh | ^r   scan now\n\
             \x20         show N / bet N     detail / virtual bet on row N\n\
             \x20         esc                close detail\n\
             \x20         auto [on|off]      auto-refresh\n\
             \x20         sport KEY | market KIND | book KEY   toggle a filter\n\
             \x20         roi X | stake X | hours N|any        set a filter\n\
             \x20         live [on|off]      live events only\n\
             \x20         bankroll           simulated bankroll and pending bets\n\
             \x20         clear | help | q",
        );

        let sports: Vec<String> = catalog.sports().map(|(k, v)| format!("{k} ({v})")).collect();
        if !sports.is_empty() {
            let _ = write!(out, "\nSports: {}", sports.join(", "));
        }
        let books: Vec<&str> = catalog.bookmakers().map(|(k, _)| k).collect();
        if !books.is_empty() {
            let _ = write!(out, "\nBookmakers: {}", books.join(", "));
        }
        let markets: Vec<String> = catalog
            .market_labels()
            .map(|(k, v)| format!("{k} ({v})"))
            .collect();
        if !markets.is_empty() {
            let _ = write!(out, "\nMarkets: {}", markets.join(", "));
        }
        let frames: Vec<String> = catalog
            .timeframes()
            .into_iter()
            .map(|(label, hours)| format!("{label}={hours}h"))
            .collect();
        if !frames.is_empty() {
            let _ = write!(out, "\nTimeframes: {}", frames.join(", "));
        }

        let filters = self.controller.filters().current();
        let _ = write!(
            out,
            "\nCurrent filters: {}",
            filters
                .query_pairs()
                .into_iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(" ")
        );
        out
    }
}
