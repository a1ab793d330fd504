//! Virtual (simulated) bets on the opportunities currently shown.
//!
//! A bet target is resolved against the current snapshot before any
//! request is made. Targets that no longer exist fail locally and never
//! reach the backend, so a refresh between render and click cannot send
//! the wrong opportunity.
//!
//! The same service reads back the simulated bankroll those bets draw on.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::ScanBackend;
use crate::notify::{Chime, NotificationService};
use crate::session::ScanSession;
use crate::types::{ArbwatchError, Opportunity, OpportunityId, SimulationStats, VirtualBetError};

/// Which opportunity to bet on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BetTarget {
    /// 0-based row in the current rendered view.
    Position(usize),
    /// Stable id carried by a rendered row.
    Id(OpportunityId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualBetReceipt {
    pub id: OpportunityId,
    pub message: String,
    pub bet_id: Option<u64>,
}

pub struct VirtualBetService {
    backend: Arc<dyn ScanBackend>,
    session: Arc<ScanSession>,
    notifications: NotificationService,
    chime: Arc<dyn Chime>,
}

impl VirtualBetService {
    pub fn new(
        backend: Arc<dyn ScanBackend>,
        session: Arc<ScanSession>,
        notifications: NotificationService,
        chime: Arc<dyn Chime>,
    ) -> Self {
        Self {
            backend,
            session,
            notifications,
            chime,
        }
    }

    /// Place a virtual bet. Every outcome is also reported as a
    /// notification; the chime only plays on success.
    pub async fn place(&self, target: BetTarget) -> Result<VirtualBetReceipt, ArbwatchError> {
        let result = self.try_place(target).await;
        match &result {
            Ok(receipt) => {
                self.notifications.success(receipt.message.clone());
                self.chime.play();
            }
            Err(e) => {
                self.notifications.error(e.to_string());
            }
        }
        result.map_err(ArbwatchError::from)
    }

    async fn try_place(&self, target: BetTarget) -> Result<VirtualBetReceipt, VirtualBetError> {
        let (id, opportunity) = self.resolve(&target)?;

        let response = self
            .backend
            .place_virtual_bet(&opportunity)
            .await
            .map_err(|e| {
                warn!(id = %id, error = %e, "Virtual bet request failed");
                VirtualBetError::Request(format!("{e:#}"))
            })?;

        if !response.success {
            let reason = response
                .error
                .or(response.message)
                .unwrap_or_else(|| "unknown error".to_string());
            warn!(id = %id, reason = %reason, "Virtual bet rejected");
            return Err(VirtualBetError::Rejected(reason));
        }

        let message = match (response.message, response.bet_id) {
            (Some(message), _) if !message.trim().is_empty() => message,
            (_, Some(bet_id)) => format!("Virtual bet #{bet_id} placed"),
            _ => "Virtual bet placed".to_string(),
        };
        info!(
            id = %id,
            bet_id = ?response.bet_id,
            event = %opportunity.event_name(),
            roi = opportunity.roi,
            "Virtual bet placed"
        );

        Ok(VirtualBetReceipt {
            id,
            message,
            bet_id: response.bet_id,
        })
    }

    /// Fetch the simulated bankroll and report it as a notification.
    pub async fn bankroll(&self) -> Result<SimulationStats, ArbwatchError> {
        match self.backend.simulation_stats().await {
            Ok(stats) => {
                debug!(
                    available = %stats.bankroll.available,
                    in_play = %stats.bankroll.in_play,
                    pending = stats.pending_bets,
                    "Bankroll fetched"
                );
                self.notifications.success(stats.summary());
                Ok(stats)
            }
            Err(e) => {
                warn!(error = %e, "Bankroll request failed");
                let err = ArbwatchError::Bankroll(format!("{e:#}"));
                self.notifications.error(err.to_string());
                Err(err)
            }
        }
    }

    /// Target → (id, opportunity) in the current snapshot.
    fn resolve(&self, target: &BetTarget) -> Result<(OpportunityId, Opportunity), VirtualBetError> {
        let snapshot = self.session.snapshot();
        let id = match target {
            BetTarget::Position(position) => snapshot
                .view
                .row(*position)
                .map(|row| row.id.clone())
                .ok_or(VirtualBetError::OutOfRange {
                    position: *position,
                    len: snapshot.view.rows().len(),
                })?,
            BetTarget::Id(id) => id.clone(),
        };

        let entry = snapshot
            .opportunities
            .find(&id)
            .ok_or_else(|| VirtualBetError::Stale(id.clone()))?;
        Ok((id, entry.opportunity.clone()))
    }
}
