//! On-chain reconciliation pass
//!
//! Transfers in `waiting_to_send` or `sent_to_remote` are the ones whose
//! outbox index still means something. They are grouped by
//! (source chain, sucker, token) so one outbox snapshot serves every
//! transfer in the group — O(distinct groups) RPC calls instead of O(n) —
//! and the snapshot cache collapses repeated sweeps on top of that.

use std::collections::HashMap;

use eyre::Result;

use super::{OutboxKey, StateReconciler};
use crate::classifier::direction_of;
use crate::ledger::BridgeTransfer;
use crate::metrics;
use crate::types::{OutboxSnapshot, TransferStatus};

/// Whether the outbox counter proves this transfer was relayed.
///
/// `number_of_claims_sent` counts already-relayed claims, so an index
/// strictly below it has been sent to the remote chain.
pub fn should_advance(outbox_index: i64, snapshot: &OutboxSnapshot) -> bool {
    outbox_index >= 0 && (outbox_index as u64) < snapshot.number_of_claims_sent
}

impl StateReconciler {
    pub(crate) async fn outbox_pass(&mut self) -> Result<()> {
        let transfers = self.ledger().awaiting_outbox().await?;
        if transfers.is_empty() {
            return Ok(());
        }

        let mut groups: HashMap<OutboxKey, Vec<BridgeTransfer>> = HashMap::new();
        for transfer in transfers {
            let (sucker, token) = match (transfer.sucker(), transfer.token_address()) {
                (Ok(s), Ok(t)) => (s, t),
                (sucker, token) => {
                    tracing::warn!(
                        id = %transfer.id,
                        sucker_err = sucker.is_err(),
                        token_err = token.is_err(),
                        "Skipping transfer with unparseable addresses"
                    );
                    continue;
                }
            };
            groups
                .entry((transfer.source_chain_id as u64, sucker, token))
                .or_default()
                .push(transfer);
        }

        tracing::debug!(groups = groups.len(), "On-chain pass grouped transfers");

        for (key, group) in groups {
            let snapshot = match self.outbox_snapshot(key).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(
                        chain_id = key.0,
                        sucker = %key.1,
                        token = %key.2,
                        error = %e,
                        "Outbox fetch failed, group retried next sweep"
                    );
                    continue;
                }
            };

            for transfer in group {
                if let Err(e) = self.reconcile_against_outbox(&transfer, &snapshot).await {
                    tracing::warn!(id = %transfer.id, error = %e, "Transfer reconciliation failed");
                }
            }
        }

        Ok(())
    }

    async fn reconcile_against_outbox(
        &self,
        transfer: &BridgeTransfer,
        snapshot: &OutboxSnapshot,
    ) -> Result<()> {
        if transfer.transfer_status()? != TransferStatus::WaitingToSend {
            // Already sent; the backend pass owns the next promotion
            return Ok(());
        }
        if !should_advance(transfer.outbox_index, snapshot) {
            return Ok(());
        }

        if self
            .ledger()
            .update_status(&transfer.id, TransferStatus::SentToRemote)
            .await?
        {
            metrics::TRANSFERS_ADVANCED
                .with_label_values(&["sent_to_remote"])
                .inc();

            let classification = self
                .classifier()
                .classify(transfer.source_chain_id as u64, transfer.sucker()?)
                .await;
            let direction = direction_of(
                transfer.source_chain_id as u64,
                transfer.target_chain_id as u64,
            );
            let profile = classification.profile(direction);
            tracing::info!(
                id = %transfer.id,
                bridge = %classification.kind,
                direction = %direction,
                estimated_minutes = profile.estimated_minutes,
                extra_steps = profile.has_extra_steps,
                "Transfer relayed to remote chain"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    fn snapshot(number_of_claims_sent: u64) -> OutboxSnapshot {
        OutboxSnapshot {
            nonce: 1,
            balance: U256::ZERO,
            tree_count: 10,
            number_of_claims_sent,
        }
    }

    #[test]
    fn test_index_below_counter_advances() {
        assert!(should_advance(3, &snapshot(5)));
    }

    #[test]
    fn test_index_at_or_above_counter_stays() {
        assert!(!should_advance(5, &snapshot(5)));
        assert!(!should_advance(7, &snapshot(5)));
    }

    #[test]
    fn test_negative_index_never_advances() {
        assert!(!should_advance(-1, &snapshot(5)));
    }
}
