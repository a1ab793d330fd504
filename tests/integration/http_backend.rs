//! `HttpBackend` against a fake scanning service on an ephemeral port.

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arbwatch::backend::http::HttpBackend;
use arbwatch::backend::ScanBackend;
use arbwatch::catalog::ConfigStore;
use arbwatch::engine::{ScanController, ScanOutcome};
use arbwatch::notify::{NotificationService, SilentChime};
use arbwatch::session::ScanSession;
use arbwatch::types::MarketKind;
use arbwatch::view::filters::{FilterControls, FilterState};

use crate::mock_backend::opportunity;

#[derive(Default)]
struct FakeService {
    fail_scans: bool,
    last_query: Mutex<Option<String>>,
    last_bet: Mutex<Option<Value>>,
}

type Shared = Arc<FakeService>;

async fn config() -> Json<Value> {
    Json(json!({
        "sports": { "soccer_epl": "EPL", "basketball_nba": "NBA" },
        "bookmakers": {
            "pinnacle": { "name": "Pinnacle", "url": "https://www.pinnacle.com/", "color": "#c41230" },
            "betfair_ex_eu": { "name": "Betfair", "url": "https://www.betfair.com/", "color": "#ffb80c" }
        },
        "markets": { "h2h": "Moneyline", "spreads": "Handicap", "totals": "Over/Under" },
        "timeframes": { "24h": 24, "1w": 168 },
        "default_investment": 500,
        "default_min_roi": 0.5
    }))
}

async fn scan(State(svc): State<Shared>, RawQuery(query): RawQuery) -> (StatusCode, Json<Value>) {
    *svc.last_query.lock().unwrap() = query;
    if svc.fail_scans {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Odds API quota exhausted" })),
        );
    }
    let opps = vec![
        opportunity("Arsenal", "Chelsea", 1.8, 9.0),
        opportunity("Liverpool", "Everton", 2.6, 13.0),
    ];
    (
        StatusCode::OK,
        Json(json!({
            "opportunities": opps,
            "count": 2,
            "api_usage": { "remaining": 450, "used": 50 }
        })),
    )
}

async fn place(State(svc): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let event = format!(
        "{} vs {}",
        body["home_team"].as_str().unwrap_or_default(),
        body["away_team"].as_str().unwrap_or_default()
    );
    *svc.last_bet.lock().unwrap() = Some(body);
    Json(json!({
        "success": true,
        "message": format!("Virtual bet placed on {event}"),
        "bet_id": 11
    }))
}

async fn simulation_stats() -> Json<Value> {
    Json(json!({
        "bankroll": { "total": 1000.0, "available": 745.0, "in_play": 255.0 },
        "statistics": { "total_bets": 1, "pending": 1, "profit_loss": 0.0 },
        "pending_bets": 1,
        "bookmaker_balances": {}
    }))
}

async fn serve(svc: FakeService) -> (String, Shared) {
    let svc = Arc::new(svc);
    let app = Router::new()
        .route("/api/config", get(config))
        .route("/api/scan", get(scan))
        .route("/api/simulation/place", post(place))
        .route("/api/simulation/stats", get(simulation_stats))
        .with_state(Arc::clone(&svc));

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/"), svc)
}

fn client(base: &str) -> HttpBackend {
    HttpBackend::new(base, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_fetch_config() {
    let (base, _) = serve(FakeService::default()).await;
    let store = ConfigStore::load(&client(&base)).await.unwrap();

    assert_eq!(store.sport_label("soccer_epl"), Some("EPL"));
    assert_eq!(store.bookmaker("betfair_ex_eu").unwrap().name, "Betfair");
    assert_eq!(store.timeframes(), vec![("24h", 24), ("1w", 168)]);
    assert_eq!(store.market_labels().count(), 3);
}

#[tokio::test]
async fn test_scan_query_and_response() {
    let (base, svc) = serve(FakeService::default()).await;
    let mut controls = FilterControls::default();
    controls.toggle_sport("soccer_epl");
    controls.toggle_sport("basketball_nba");
    controls.toggle_market(MarketKind::Total);
    controls.toggle_bookmaker("pinnacle");
    controls.min_roi = "1".into();
    controls.investment = "250.00".into();
    controls.hours = "24".into();

    let resp = client(&base).scan(&controls.selection()).await.unwrap();
    assert_eq!(resp.count, Some(2));
    assert_eq!(resp.opportunities.unwrap()[1].home_team, "Liverpool");
    assert_eq!(resp.api_usage.unwrap().remaining, Some(450));

    let query = svc.last_query.lock().unwrap().clone().unwrap();
    assert_eq!(
        query,
        "sports=basketball_nba%2Csoccer_epl&markets=totals&bookmakers=pinnacle&min_roi=1&investment=250&hours=24"
    );
}

#[tokio::test]
async fn test_live_only_query() {
    let (base, svc) = serve(FakeService::default()).await;
    let mut controls = FilterControls::default();
    controls.toggle_live();

    client(&base).scan(&controls.selection()).await.unwrap();
    let query = svc.last_query.lock().unwrap().clone().unwrap();
    assert!(query.ends_with("&investment=500&live=1"));
}

#[tokio::test]
async fn test_fetch_simulation_stats() {
    let (base, _) = serve(FakeService::default()).await;
    let stats = client(&base).simulation_stats().await.unwrap();
    assert_eq!(stats.bankroll.available, Decimal::from(745));
    assert_eq!(stats.bankroll.in_play, Decimal::from(255));
    assert_eq!(stats.pending_bets, 1);
}

#[tokio::test]
async fn test_scan_error_status() {
    let (base, _) = serve(FakeService {
        fail_scans: true,
        ..Default::default()
    })
    .await;

    let err = client(&base)
        .scan(&FilterControls::default().selection())
        .await
        .unwrap_err();
    let text = format!("{err:#}");
    assert!(text.contains("500"));
    assert!(text.contains("quota exhausted"));
}

#[tokio::test]
async fn test_place_virtual_bet_posts_opportunity() {
    let (base, svc) = serve(FakeService::default()).await;
    let opp = opportunity("Arsenal", "Chelsea", 1.8, 9.0);

    let resp = client(&base).place_virtual_bet(&opp).await.unwrap();
    assert!(resp.success);
    assert_eq!(resp.bet_id, Some(11));
    assert_eq!(resp.message.unwrap(), "Virtual bet placed on Arsenal vs Chelsea");

    let body = svc.last_bet.lock().unwrap().clone().unwrap();
    assert_eq!(body["market"], "h2h");
    assert_eq!(body["stakes"]["Arsenal"]["book_key"], "pinnacle");
    assert_eq!(body["roi"], 1.8);
}

#[tokio::test]
async fn test_unreachable_backend_fails_scan() {
    // Nothing listens on port 9 of localhost in the test environment.
    let backend: Arc<dyn ScanBackend> = Arc::new(client("http://127.0.0.1:9"));
    let notifications = NotificationService::default();
    let controller = ScanController::new(
        backend,
        Arc::new(ScanSession::new()),
        Arc::new(FilterState::default()),
        Arc::new(ConfigStore::default()),
        notifications.clone(),
        Arc::new(SilentChime),
    );

    let outcome = controller.scan().await;
    assert!(matches!(outcome, ScanOutcome::Failed { .. }));
    assert!(controller.session().snapshot().opportunities.is_empty());
    assert_eq!(notifications.len(), 1);
}

#[tokio::test]
async fn test_controller_over_http() {
    let (base, _) = serve(FakeService::default()).await;
    let backend: Arc<dyn ScanBackend> = Arc::new(client(&base));
    let catalog = ConfigStore::load(backend.as_ref()).await.unwrap();
    let controller = ScanController::new(
        backend,
        Arc::new(ScanSession::new()),
        Arc::new(FilterState::default()),
        Arc::new(catalog),
        NotificationService::default(),
        Arc::new(SilentChime),
    );

    assert_eq!(controller.scan().await, ScanOutcome::Completed { count: 2 });
    let snap = controller.session().snapshot();
    assert_eq!(snap.stats.best_roi_text(), "2.6%");
    assert_eq!(snap.stats.total_profit_text(), "22.00");
    assert_eq!(snap.state.total_api_credits, Some(500));
}
