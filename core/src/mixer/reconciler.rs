//! Deposit Reconciler
//!
//! Watches the mixer contract for `Deposit` events and promotes matching
//! Pending records to Confirmed.
//!
//! - Only promotes; a Confirmed record is never demoted (reorgs are not handled)
//! - Idempotent: replaying an event changes nothing after the first time
//! - A failed event fetch is logged and leaves local state untouched

use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use obscura_commitment::Commitment;

use crate::chain::abi::{DEPOSIT_EVENT_SIGNATURE, DepositEvent, decode_deposit_event};
use crate::chain::{ChainClient, EventFilter};
use crate::error::MixerResult;
use crate::ledger::LocalLedger;

use super::MixerSettings;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Pending records at the start of the pass
    pub pending: usize,
    /// Decodable Deposit events returned by the chain
    pub events_seen: usize,
    pub promoted: Vec<Commitment>,
    /// Set when the event query failed; nothing was changed
    pub fetch_error: Option<String>,
}

pub struct EventReconciler<C> {
    chain: Arc<C>,
    ledger: LocalLedger,
    settings: MixerSettings,
}

impl<C: ChainClient> EventReconciler<C> {
    pub fn new(chain: Arc<C>, ledger: LocalLedger, settings: MixerSettings) -> Self {
        Self {
            chain,
            ledger,
            settings,
        }
    }

    /// Query deposit events for every Pending commitment and promote matches.
    pub async fn reconcile_once(&self) -> MixerResult<ReconcileReport> {
        let pending = self.ledger.pending_deposits()?;
        let mut report = ReconcileReport {
            pending: pending.len(),
            ..ReconcileReport::default()
        };
        if pending.is_empty() {
            return Ok(report);
        }

        let wanted: HashSet<Commitment> = pending.iter().map(|r| r.commitment).collect();
        let filter = EventFilter {
            indexed: pending.iter().map(|r| r.commitment.0).collect(),
            from_block: self.settings.from_block,
        };

        let events = match self
            .chain
            .query_events(&self.settings.contract, DEPOSIT_EVENT_SIGNATURE, &filter)
            .await
        {
            Ok(events) => events,
            Err(e) => {
                warn!("Deposit event query failed, retrying next pass: {}", e);
                report.fetch_error = Some(e.to_string());
                return Ok(report);
            }
        };

        for raw in events.iter().filter(|e| e.address == self.settings.contract) {
            let event = match decode_deposit_event(raw) {
                Ok(event) => event,
                Err(e) => {
                    warn!("Skipping malformed Deposit log: {}", e);
                    continue;
                }
            };
            report.events_seen += 1;

            if wanted.contains(&event.commitment) && self.apply_event(&event)? {
                report.promoted.push(event.commitment);
            }
        }

        Ok(report)
    }

    /// Apply one on-chain deposit event. Returns whether a record changed.
    pub fn apply_event(&self, event: &DepositEvent) -> MixerResult<bool> {
        let promoted = self.ledger.mark_confirmed(&event.commitment)?;
        if promoted {
            info!(
                "Deposit {} confirmed on chain (leaf {}, block {:?})",
                event.commitment, event.leaf_index, event.block_number
            );
        } else {
            debug!("Deposit event for {} already applied", event.commitment);
        }
        Ok(promoted)
    }

    /// Run `reconcile_once` every `interval` until `cancel` fires.
    pub async fn run(&self, interval: Duration, cancel: CancellationToken) {
        info!("Reconciler started, interval {:?}", interval);
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Reconciler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match self.reconcile_once().await {
                        Ok(report) if !report.promoted.is_empty() => {
                            info!(
                                "Promoted {} of {} pending deposits",
                                report.promoted.len(),
                                report.pending
                            );
                        }
                        Ok(report) => debug!("Reconcile pass: {:?}", report),
                        Err(e) => error!("Reconcile pass failed: {}", e),
                    }
                }
            }
        }
    }
}
