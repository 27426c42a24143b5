//! Backend reconciliation pass
//!
//! Transfers relayed to the remote chain but lacking proof data are grouped
//! by (target chain, sucker, token, beneficiary) — the backend's natural
//! query granularity — and one claims request is issued per group, a few
//! groups in parallel. Returned records are matched to transfers by leaf
//! index; a record the ledger has never seen (created from another client)
//! is materialized as a brand-new ready-to-claim transfer rather than
//! discarded.

use std::collections::HashMap;

use alloy::primitives::Address;
use eyre::Result;
use futures::stream::{self, StreamExt};

use super::StateReconciler;
use crate::backend::BackendError;
use crate::ledger::{BridgeTransfer, NewBridgeTransfer};
use crate::metrics;
use crate::proof;
use crate::types::{ClaimRecord, TransferStatus};

/// Parallel claims requests per pass
const CLAIMS_FETCH_CONCURRENCY: usize = 4;

type ClaimsKey = (u64, Address, Address, Address);

impl StateReconciler {
    pub(crate) async fn claims_pass(&mut self) -> Result<()> {
        let transfers = self.ledger().awaiting_proof().await?;
        if transfers.is_empty() {
            return Ok(());
        }

        let mut groups: HashMap<ClaimsKey, Vec<BridgeTransfer>> = HashMap::new();
        for transfer in transfers {
            let (sucker, token, beneficiary) = match (
                transfer.sucker(),
                transfer.token_address(),
                transfer.beneficiary_address(),
            ) {
                (Ok(s), Ok(t), Ok(b)) => (s, t, b),
                _ => {
                    tracing::warn!(id = %transfer.id, "Skipping transfer with unparseable addresses");
                    continue;
                }
            };
            groups
                .entry((transfer.target_chain_id as u64, sucker, token, beneficiary))
                .or_default()
                .push(transfer);
        }

        tracing::debug!(groups = groups.len(), "Backend pass grouped transfers");

        let backend = self.backend().clone();
        let fetched: Vec<(ClaimsKey, Vec<BridgeTransfer>, Result<Vec<ClaimRecord>, BackendError>)> =
            stream::iter(groups)
                .map(|(key, group)| {
                    let backend = backend.clone();
                    async move {
                        let (chain_id, sucker, token, beneficiary) = key;
                        metrics::CLAIMS_REQUESTS
                            .with_label_values(&[chain_id.to_string().as_str()])
                            .inc();
                        let records = backend.claims(chain_id, sucker, token, beneficiary).await;
                        (key, group, records)
                    }
                })
                .buffer_unordered(CLAIMS_FETCH_CONCURRENCY)
                .collect()
                .await;

        for (key, group, records) in fetched {
            let records = match records {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(
                        chain_id = key.0,
                        sucker = %key.1,
                        error = %e,
                        "Claims request failed, group retried next pass"
                    );
                    continue;
                }
            };
            if let Err(e) = self.apply_claim_records(key, &group, records).await {
                tracing::warn!(chain_id = key.0, sucker = %key.1, error = %e, "Claim matching failed");
            }
        }

        Ok(())
    }

    /// Match records to transfers by leaf index; materialize the rest.
    async fn apply_claim_records(
        &self,
        key: ClaimsKey,
        group: &[BridgeTransfer],
        records: Vec<ClaimRecord>,
    ) -> Result<()> {
        let (chain_id, sucker, _, _) = key;
        let by_index: HashMap<u64, &BridgeTransfer> = group
            .iter()
            .filter(|t| t.outbox_index >= 0)
            .map(|t| (t.outbox_index as u64, t))
            .collect();

        for record in records {
            match by_index.get(&record.leaf.index) {
                Some(transfer) => {
                    let normalized = proof::normalize_proof(&record.proof);
                    let proof_json = serde_json::to_string(&normalized)?;
                    let leaf_json = serde_json::to_string(&record.leaf)?;
                    if self
                        .ledger()
                        .attach_claim(&transfer.id, &proof_json, &leaf_json, None)
                        .await?
                    {
                        metrics::TRANSFERS_ADVANCED
                            .with_label_values(&["ready_to_claim"])
                            .inc();
                        tracing::info!(
                            id = %transfer.id,
                            leaf_index = record.leaf.index,
                            "Transfer ready to claim"
                        );
                    }
                }
                None => {
                    self.materialize_claim(chain_id, sucker, record).await;
                }
            }
        }
        Ok(())
    }

    /// A claim the ledger didn't know about — e.g. created from another
    /// client. Recover it as a new ready-to-claim transfer; the source-side
    /// fields were never observed locally and stay zero sentinels.
    async fn materialize_claim(&self, chain_id: u64, sucker: Address, record: ClaimRecord) {
        let id = NewBridgeTransfer::claim_id(chain_id, sucker, record.leaf.index);
        match self.ledger().get(&id).await {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "Ledger lookup failed, skipping materialization");
                return;
            }
        }

        let project_id = match self.chain().sucker_project_id(chain_id, sucker).await {
            Ok(project) => project,
            Err(e) => {
                tracing::warn!(
                    chain_id,
                    sucker = %sucker,
                    error = %e,
                    "Project id lookup failed, claim retried next pass"
                );
                return;
            }
        };

        let normalized = proof::normalize_proof(&record.proof);
        let (proof_json, leaf_json) =
            match (serde_json::to_string(&normalized), serde_json::to_string(&record.leaf)) {
                (Ok(p), Ok(l)) => (p, l),
                _ => {
                    tracing::warn!(id = %id, "Claim data not serializable, skipping");
                    return;
                }
            };

        let new = NewBridgeTransfer {
            id: id.clone(),
            tx_hash: String::new(),
            project_id: project_id as i64,
            source_chain_id: 0,
            target_chain_id: chain_id as i64,
            sucker_address: format!("0x{}", hex::encode(sucker.as_slice())),
            beneficiary: format!("0x{}", hex::encode(record.leaf.beneficiary.as_slice())),
            token: format!("0x{}", hex::encode(record.token.as_slice())),
            project_token_amount: record.leaf.project_token_amount.to_string(),
            terminal_token_amount: record.leaf.terminal_token_amount.to_string(),
            outbox_index: record.leaf.index as i64,
            outbox_root: None,
            claim_proof: Some(proof_json),
            claim_leaf: Some(leaf_json),
            status: TransferStatus::ReadyToClaim,
        };

        match self.ledger().insert(&new).await {
            Ok(true) => {
                metrics::TRANSFERS_MATERIALIZED
                    .with_label_values(&[chain_id.to_string().as_str()])
                    .inc();
                tracing::info!(id = %id, leaf_index = record.leaf.index, "Materialized unknown claim");
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "Failed to materialize claim");
            }
        }
    }
}
