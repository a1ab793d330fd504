//! End-to-end scan, refresh and bet cycles against the in-memory backend.

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use arbwatch::backend::ScanBackend;
use arbwatch::catalog::{ConfigStore, FALLBACK_COLOR};
use arbwatch::engine::{
    AutoRefreshScheduler, BetTarget, ScanController, ScanOutcome, VirtualBetService,
};
use arbwatch::notify::{NotificationService, SilentChime};
use arbwatch::session::{ScanPhase, ScanSession};
use arbwatch::types::{ArbwatchError, NotificationLevel, VirtualBetError};
use arbwatch::view::filters::FilterState;

use crate::mock_backend::{opportunity, remote_config, MockBackend};

struct Harness {
    backend: Arc<MockBackend>,
    controller: Arc<ScanController>,
    scheduler: AutoRefreshScheduler,
    bets: VirtualBetService,
    notifications: NotificationService,
}

impl Harness {
    async fn new(backend: Arc<MockBackend>) -> Self {
        let dyn_backend: Arc<dyn ScanBackend> = backend.clone();
        let notifications = NotificationService::default();
        let catalog = ConfigStore::bootstrap(dyn_backend.as_ref(), &notifications).await;
        let session = Arc::new(ScanSession::new());
        let controller = Arc::new(ScanController::new(
            Arc::clone(&dyn_backend),
            Arc::clone(&session),
            Arc::new(FilterState::default()),
            Arc::new(catalog),
            notifications.clone(),
            Arc::new(SilentChime),
        ));
        let scheduler = AutoRefreshScheduler::new(Arc::clone(&controller), Duration::from_secs(60));
        let bets = VirtualBetService::new(
            dyn_backend,
            session,
            notifications.clone(),
            Arc::new(SilentChime),
        );
        Self {
            backend,
            controller,
            scheduler,
            bets,
            notifications,
        }
    }

    fn session(&self) -> &Arc<ScanSession> {
        self.controller.session()
    }
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

fn configured() -> Arc<MockBackend> {
    let backend = MockBackend::new();
    backend.set_config(remote_config());
    backend
}

#[tokio::test]
async fn test_three_opportunities_end_to_end() {
    let backend = configured();
    backend.push_opportunities(vec![
        opportunity("Boston Bruins", "Edmonton Oilers", 1.2, 12.0),
        opportunity("Toronto Maple Leafs", "Vancouver Canucks", 3.4, 34.0),
        opportunity("Calgary Flames", "Winnipeg Jets", 0.8, 8.0),
    ]);
    let h = Harness::new(backend).await;

    assert_eq!(h.controller.scan().await, ScanOutcome::Completed { count: 3 });

    let snap = h.session().snapshot();
    assert_eq!(snap.view.rows().len(), 3);
    assert_eq!(snap.stats.best_roi_text(), "3.4%");
    assert_eq!(snap.stats.total_profit_text(), "54.00");
    assert_eq!(snap.state.remaining_api_credits, Some(480));

    let row = &snap.view.rows()[1];
    assert_eq!(row.event, "Toronto Maple Leafs vs Vancouver Canucks");
    assert!(row.highlighted);
    assert_eq!(row.starts_in, "6h");
    let pinnacle = row.legs.iter().find(|l| l.bookmaker == "Pinnacle").unwrap();
    assert_eq!(pinnacle.color, "#c41230");
    let unibet = row.legs.iter().find(|l| l.bookmaker == "Unibet").unwrap();
    assert_eq!(unibet.color, FALLBACK_COLOR);

    let active = h.notifications.active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].level, NotificationLevel::Success);
    assert_eq!(active[0].message, "Found 3 arbitrage opportunities");
}

#[tokio::test]
async fn test_second_trigger_during_scan_is_dropped() {
    let backend = configured();
    let gate = backend.gate();
    backend.push_opportunities(vec![opportunity("A", "B", 1.0, 5.0)]);
    let h = Harness::new(backend).await;

    let controller = Arc::clone(&h.controller);
    let first = tokio::spawn(async move { controller.scan().await });
    h.backend.scan_entered().await;
    assert_eq!(h.session().phase(), ScanPhase::Scanning);

    let controls = h.session().controls();
    assert!(!controls.scan_enabled);
    assert!(controls.loading_visible);

    assert_eq!(h.controller.scan().await, ScanOutcome::Skipped);
    assert_eq!(h.backend.scan_calls(), 1);

    gate.notify_one();
    assert_eq!(first.await.unwrap(), ScanOutcome::Completed { count: 1 });
    assert_eq!(h.backend.scan_calls(), 1);
    assert_eq!(h.session().phase(), ScanPhase::Idle);
}

#[tokio::test]
async fn test_failed_scan_leaves_list_untouched() {
    let backend = configured();
    backend.push_opportunities(vec![
        opportunity("A", "B", 2.5, 12.5),
        opportunity("C", "D", 1.0, 5.0),
    ]);
    backend.push_error("Scan API error 502: bad gateway");
    let h = Harness::new(backend).await;

    h.controller.scan().await;
    let before = h.session().snapshot();

    let outcome = h.controller.scan().await;
    assert!(matches!(outcome, ScanOutcome::Failed { .. }));

    let after = h.session().snapshot();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after.stats.count, 2);
    assert_eq!(after.stats.total_profit_text(), "17.50");
    assert!(h.session().controls().table_visible);

    let last = h.notifications.active().pop().unwrap();
    assert_eq!(last.level, NotificationLevel::Error);
    assert!(last.message.contains("502"));
}

#[tokio::test]
async fn test_bet_on_replaced_list_is_stale() {
    let backend = configured();
    backend.push_opportunities(vec![opportunity("A", "B", 1.0, 5.0)]);
    backend.push_opportunities(vec![opportunity("E", "F", 1.5, 7.5)]);
    let h = Harness::new(backend).await;

    h.controller.scan().await;
    let old_id = h.session().snapshot().view.rows()[0].id.clone();
    h.controller.scan().await;

    let err = h.bets.place(BetTarget::Id(old_id)).await.unwrap_err();
    assert!(matches!(err, ArbwatchError::VirtualBet(VirtualBetError::Stale(_))));
    assert_eq!(h.backend.bet_calls(), 0);

    let receipt = h.bets.place(BetTarget::Position(0)).await.unwrap();
    assert_eq!(receipt.bet_id, Some(1));
    assert_eq!(h.backend.bets()[0].home_team, "E");
}

#[tokio::test]
async fn test_rescan_with_new_investment_makes_old_id_stale() {
    let backend = configured();
    let shown = opportunity("A", "B", 1.0, 5.0);
    let mut rescaled = shown.clone();
    for stake in rescaled.stakes.values_mut() {
        stake.stake *= Decimal::from(2);
    }
    rescaled.profit = Decimal::from(10);
    rescaled.total_investment = Some(Decimal::from(1000));
    backend.push_opportunities(vec![shown]);
    backend.push_opportunities(vec![rescaled]);
    let h = Harness::new(backend).await;

    h.controller.scan().await;
    let old_id = h.session().snapshot().view.rows()[0].id.clone();
    h.controller.scan().await;
    assert_ne!(h.session().snapshot().view.rows()[0].id, old_id);

    let err = h.bets.place(BetTarget::Id(old_id)).await.unwrap_err();
    assert!(matches!(err, ArbwatchError::VirtualBet(VirtualBetError::Stale(_))));
    assert_eq!(h.backend.bet_calls(), 0);
}

#[tokio::test]
async fn test_bets_draw_down_bankroll() {
    let backend = configured();
    backend.push_opportunities(vec![opportunity("A", "B", 1.0, 5.0)]);
    let h = Harness::new(backend).await;
    h.controller.scan().await;

    let stats = h.bets.bankroll().await.unwrap();
    assert_eq!(stats.bankroll.available, Decimal::from(1000));
    assert_eq!(stats.pending_bets, 0);

    h.bets.place(BetTarget::Position(0)).await.unwrap();
    h.bets.place(BetTarget::Position(0)).await.unwrap();
    let err = h.bets.place(BetTarget::Position(0)).await.unwrap_err();
    assert!(matches!(err, ArbwatchError::VirtualBet(VirtualBetError::Rejected(_))));
    assert!(err.to_string().contains("Insufficient bankroll"));

    let stats = h.bets.bankroll().await.unwrap();
    assert_eq!(stats.bankroll.available, Decimal::ZERO);
    assert_eq!(stats.bankroll.in_play, Decimal::from(1000));
    assert_eq!(stats.pending_bets, 2);
    let last = h.notifications.active().pop().unwrap();
    assert_eq!(last.level, NotificationLevel::Success);
    assert_eq!(last.message, "Bankroll 0.00 available, 1000.00 in play, 2 pending bets");
}

#[tokio::test]
async fn test_bet_position_out_of_range_after_shrink() {
    let backend = configured();
    backend.push_opportunities(vec![
        opportunity("A", "B", 1.0, 5.0),
        opportunity("C", "D", 1.0, 5.0),
    ]);
    backend.push_opportunities(vec![opportunity("A", "B", 1.0, 5.0)]);
    let h = Harness::new(backend).await;

    h.controller.scan().await;
    h.controller.scan().await;

    let err = h.bets.place(BetTarget::Position(1)).await.unwrap_err();
    assert!(matches!(
        err,
        ArbwatchError::VirtualBet(VirtualBetError::OutOfRange { position: 1, len: 1 })
    ));
    assert_eq!(h.backend.bet_calls(), 0);
}

#[tokio::test]
async fn test_config_failure_degrades_to_fallbacks() {
    let backend = MockBackend::new();
    backend.push_opportunities(vec![opportunity("A", "B", 1.0, 5.0)]);
    let h = Harness::new(backend).await;

    assert!(h.controller.catalog().is_empty());
    let errors: Vec<_> = h
        .notifications
        .active()
        .into_iter()
        .filter(|n| n.level == NotificationLevel::Error)
        .collect();
    assert_eq!(errors.len(), 1);

    h.controller.scan().await;
    let snap = h.session().snapshot();
    let legs = &snap.view.rows()[0].legs;
    assert!(legs.iter().all(|l| l.color == FALLBACK_COLOR && l.url == "#"));
}

#[tokio::test]
async fn test_filters_reach_backend() {
    let backend = configured();
    let h = Harness::new(backend).await;
    h.controller.filters().update(|c| {
        c.toggle_sport("soccer_epl");
        c.investment = "-20".into();
        c.hours = "48".into();
    });

    h.controller.scan().await;
    let sent = h.backend.last_filters().unwrap();
    assert!(sent.sports.contains("soccer_epl"));
    assert_eq!(sent.investment.to_string(), "500");
    assert_eq!(sent.hours, Some(48));
    assert_eq!(sent.markets.len(), 3);
    assert!(!sent.live);

    h.controller.filters().update(|c| {
        c.toggle_live();
    });
    h.controller.scan().await;
    assert!(h.backend.last_filters().unwrap().live);
}

#[tokio::test(start_paused = true)]
async fn test_auto_refresh_ticks_until_disabled() {
    let backend = configured();
    let h = Harness::new(backend).await;

    h.scheduler.enable();
    settle().await;
    tokio::time::sleep(Duration::from_secs(61)).await;
    settle().await;
    assert_eq!(h.backend.scan_calls(), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(h.backend.scan_calls(), 2);

    h.scheduler.disable();
    tokio::time::sleep(Duration::from_secs(300)).await;
    settle().await;
    assert_eq!(h.backend.scan_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_tick_during_manual_scan_is_dropped() {
    let backend = configured();
    let gate = backend.gate();
    let h = Harness::new(backend).await;

    let controller = Arc::clone(&h.controller);
    let manual = tokio::spawn(async move { controller.scan().await });
    h.backend.scan_entered().await;

    h.scheduler.enable();
    settle().await;
    tokio::time::sleep(Duration::from_secs(61)).await;
    settle().await;
    assert_eq!(h.backend.scan_calls(), 1);

    gate.notify_one();
    assert!(manual.await.unwrap().is_completed());
    h.scheduler.disable();
}
