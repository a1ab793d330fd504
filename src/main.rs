//! ARBWATCH: terminal controller for a sports-betting arbitrage scanner.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! fetches the sport/bookmaker catalog, wires the scan, refresh and bet
//! services together and runs the terminal until quit or Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use arbwatch::backend::http::HttpBackend;
use arbwatch::backend::ScanBackend;
use arbwatch::catalog::ConfigStore;
use arbwatch::config::AppConfig;
use arbwatch::dashboard::{self, DashboardState};
use arbwatch::engine::{AutoRefreshScheduler, ScanController, VirtualBetService};
use arbwatch::notify::{Chime, NotificationService, SilentChime, TerminalBell};
use arbwatch::session::ScanSession;
use arbwatch::terminal::TerminalUi;
use arbwatch::view::filters::FilterState;

const BANNER: &str = r#"
    _    ____  ______        ___  _____ ____ _   _
   / \  |  _ \| __ ) \      / / \|_   _/ ___| | | |
  / _ \ | |_) |  _ \\ \ /\ / / _ \ | || |   | |_| |
 / ___ \|  _ <| |_) |\ V  V / ___ \| || |___|  _  |
/_/   \_\_| \_\____/  \_/\_/_/   \_\_| \____|_| |_|

  Arbitrage opportunity scanner  v0.1.0  (type help)
"#;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path = AppConfig::path_from_env();
    let cfg = AppConfig::load_or_default(&config_path)?;

    println!("{BANNER}");
    info!(
        backend = %cfg.backend.base_url,
        refresh_secs = cfg.refresh.interval_secs,
        auto_start = cfg.refresh.auto_start,
        scan_timeout_secs = ?cfg.backend.scan_timeout_secs,
        "ARBWATCH starting up"
    );

    // -- Initialise components -------------------------------------------

    let backend: Arc<dyn ScanBackend> = Arc::new(HttpBackend::new(
        &cfg.backend.base_url,
        cfg.backend.request_timeout(),
    )?);
    let notifications = NotificationService::new(
        cfg.notifications.visible_for(),
        cfg.notifications.exit_after(),
    );
    let chime: Arc<dyn Chime> = if cfg.notifications.sound {
        Arc::new(TerminalBell)
    } else {
        Arc::new(SilentChime)
    };

    let catalog = Arc::new(ConfigStore::bootstrap(backend.as_ref(), &notifications).await);
    let session = Arc::new(ScanSession::new());
    let mut initial_filters = cfg.filters.clone();
    catalog.seed_defaults(&mut initial_filters);
    let filters = Arc::new(FilterState::new(initial_filters));

    let controller = Arc::new(
        ScanController::new(
            Arc::clone(&backend),
            Arc::clone(&session),
            filters,
            catalog,
            notifications.clone(),
            Arc::clone(&chime),
        )
        .with_timeout(cfg.backend.scan_timeout()),
    );
    let scheduler = Arc::new(AutoRefreshScheduler::new(
        Arc::clone(&controller),
        cfg.refresh.interval(),
    ));
    let bets = Arc::new(VirtualBetService::new(
        backend,
        session,
        notifications.clone(),
        chime,
    ));

    if cfg.refresh.auto_start {
        scheduler.enable();
    }

    if cfg.dashboard.enabled {
        let state = Arc::new(DashboardState::new(
            Arc::clone(&controller),
            Arc::clone(&scheduler),
            Arc::clone(&bets),
            notifications.clone(),
        ));
        if let Err(e) = dashboard::spawn_dashboard(state, cfg.dashboard.port).await {
            warn!(error = %e, "Control API disabled");
        }
    }

    // -- Main loop -------------------------------------------------------

    let ui = TerminalUi::new(controller, Arc::clone(&scheduler), bets, notifications);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tokio::select! {
        result = ui.run() => result?,
        _ = &mut shutdown => {
            info!("Shutdown signal received.");
        }
    }

    scheduler.disable();
    info!("ARBWATCH shut down cleanly.");
    Ok(())
}

/// Initialise the tracing subscriber. Logs go to stderr so they don't
/// interleave with the table on stdout.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("arbwatch=info"));

    let json_logging = std::env::var("ARBWATCH_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
