//! Control API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::engine::{
    AutoRefreshScheduler, BetTarget, ScanController, ScanOutcome, VirtualBetService,
};
use crate::notify::{Notification, NotificationService};
use crate::session::{Controls, ScanPhase, ScanSessionState};
use crate::types::{ArbwatchError, OpportunityId, VirtualBetError};
use crate::view::filters::{FilterControls, FilterSelection};
use crate::view::render::RenderedView;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub controller: Arc<ScanController>,
    pub scheduler: Arc<AutoRefreshScheduler>,
    pub bets: Arc<VirtualBetService>,
    pub notifications: NotificationService,
}

impl DashboardState {
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
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub count: usize,
    pub best_roi: String,
    pub total_profit: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewResponse {
    pub phase: ScanPhase,
    pub controls: Controls,
    pub session: ScanSessionState,
    pub stats: StatsResponse,
    pub view: RenderedView,
    pub auto_refresh: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FiltersResponse {
    pub controls: FilterControls,
    pub selection: FilterSelection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutoRefreshRequest {
    /// Omitted means toggle.
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoRefreshResponse {
    pub enabled: bool,
    pub period_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/view
pub async fn get_view(State(state): State<AppState>) -> Json<ViewResponse> {
    let session = state.controller.session();
    let snapshot = session.snapshot();

    Json(ViewResponse {
        phase: session.phase(),
        controls: session.controls(),
        session: snapshot.state.clone(),
        stats: StatsResponse {
            count: snapshot.stats.count,
            best_roi: snapshot.stats.best_roi_text(),
            total_profit: snapshot.stats.total_profit_text(),
        },
        view: snapshot.view.clone(),
        auto_refresh: state.scheduler.is_enabled(),
        last_error: state.controller.last_error(),
    })
}

/// GET /api/notifications
pub async fn get_notifications(State(state): State<AppState>) -> Json<Vec<Notification>> {
    Json(state.notifications.active())
}

/// GET /api/filters
pub async fn get_filters(State(state): State<AppState>) -> Json<FiltersResponse> {
    Json(filters_response(&state))
}

/// PUT /api/filters
///
/// Replaces the filter controls. With auto-refresh on this also starts a
/// scan, which the response does not wait for.
pub async fn put_filters(
    State(state): State<AppState>,
    Json(controls): Json<FilterControls>,
) -> Json<FiltersResponse> {
    state.controller.filters().replace(controls);
    state.scheduler.on_filters_changed();
    Json(filters_response(&state))
}

fn filters_response(state: &DashboardState) -> FiltersResponse {
    let filters = state.controller.filters();
    FiltersResponse {
        controls: filters.controls(),
        selection: filters.current(),
    }
}

/// POST /api/scan
pub async fn post_scan(State(state): State<AppState>) -> (StatusCode, Json<ScanOutcome>) {
    let outcome = state.controller.scan().await;
    let status = match outcome {
        ScanOutcome::Completed { .. } => StatusCode::OK,
        ScanOutcome::Skipped => StatusCode::CONFLICT,
        ScanOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, Json(outcome))
}

/// POST /api/auto-refresh
pub async fn post_auto_refresh(
    State(state): State<AppState>,
    Json(req): Json<AutoRefreshRequest>,
) -> Json<AutoRefreshResponse> {
    match req.enabled {
        Some(enabled) => state.scheduler.set_enabled(enabled),
        None => {
            state.scheduler.toggle();
        }
    }
    Json(AutoRefreshResponse {
        enabled: state.scheduler.is_enabled(),
        period_secs: state.scheduler.period().as_secs(),
    })
}

/// DELETE /api/notifications/:id
pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    if state.notifications.dismiss(id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// POST /api/bets/:id
pub async fn post_bet(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.bets.place(BetTarget::Id(OpportunityId::new(id))).await {
        Ok(receipt) => Json(receipt).into_response(),
        Err(e) => {
            let status = match &e {
                ArbwatchError::VirtualBet(err) if err.is_local() => StatusCode::NOT_FOUND,
                ArbwatchError::VirtualBet(VirtualBetError::Rejected(_)) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                _ => StatusCode::BAD_GATEWAY,
            };
            (status, Json(ErrorResponse { error: e.to_string() })).into_response()
        }
    }
}

/// GET /api/bankroll
pub async fn get_bankroll(State(state): State<AppState>) -> Response {
    match state.bets.bankroll().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse { error: e.to_string() }),
        )
            .into_response(),
    }
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}
