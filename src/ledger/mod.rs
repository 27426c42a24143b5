//! Transaction ledger
//!
//! The single source of locally-known bridge transfers, persisted in a
//! process-local sqlite database. Only the reconciler mutates status and
//! proof fields; the claim-execution collaborator performs the terminal
//! `claimed` transition; records are deleted only by explicit user action.
//! Every mutation broadcasts a [`LedgerEvent`] so observers refresh without
//! polling the ledger itself.
//!
//! Status transitions are monotonic at this boundary: a backward write is a
//! logged no-op, never an error, so racing observers cannot corrupt the
//! forward-only state machine.

use chrono::Utc;
use eyre::{Result, WrapErr};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::str::FromStr;
use tokio::sync::broadcast;

pub mod models;

pub use models::{BridgeTransfer, NewBridgeTransfer};

use crate::types::TransferStatus;

/// Change notification emitted on every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    Inserted { id: String },
    Updated { id: String },
    Removed { id: String },
}

const SELECT_COLUMNS: &str = "id, tx_hash, project_id, source_chain_id, target_chain_id, \
     sucker_address, beneficiary, token, project_token_amount, terminal_token_amount, \
     outbox_index, outbox_root, claim_proof, claim_leaf, status, created_at, updated_at";

#[derive(Clone)]
pub struct TransactionLedger {
    pool: SqlitePool,
    events: broadcast::Sender<LedgerEvent>,
}

impl TransactionLedger {
    /// Open (creating if missing) and migrate the ledger database.
    ///
    /// A single connection: sqlite serializes writers anyway, and it keeps
    /// `sqlite::memory:` ledgers coherent in tests.
    pub async fn open(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .wrap_err("Invalid ledger database URL")?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .wrap_err("Failed to open ledger database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .wrap_err("Failed to run ledger migrations")?;

        let (events, _) = broadcast::channel(256);
        Ok(Self { pool, events })
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    fn notify(&self, event: LedgerEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    /// Insert a transfer. Idempotent on `id`: re-observing an already-known
    /// transfer adds nothing. Returns whether a row was inserted.
    pub async fn insert(&self, new: &NewBridgeTransfer) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO transfers (id, tx_hash, project_id, source_chain_id, target_chain_id,
                sucker_address, beneficiary, token, project_token_amount, terminal_token_amount,
                outbox_index, outbox_root, claim_proof, claim_leaf, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&new.id)
        .bind(new.tx_hash.to_ascii_lowercase())
        .bind(new.project_id)
        .bind(new.source_chain_id)
        .bind(new.target_chain_id)
        .bind(&new.sucker_address)
        .bind(&new.beneficiary)
        .bind(&new.token)
        .bind(&new.project_token_amount)
        .bind(&new.terminal_token_amount)
        .bind(new.outbox_index)
        .bind(&new.outbox_root)
        .bind(&new.claim_proof)
        .bind(&new.claim_leaf)
        .bind(new.status.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .wrap_err("Failed to insert transfer")?;

        let inserted = result.rows_affected() > 0;
        if inserted {
            self.notify(LedgerEvent::Inserted { id: new.id.clone() });
        }
        Ok(inserted)
    }

    pub async fn get(&self, id: &str) -> Result<Option<BridgeTransfer>> {
        let row = sqlx::query_as::<_, BridgeTransfer>(&format!(
            "SELECT {} FROM transfers WHERE id = ?",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .wrap_err("Failed to get transfer")?;
        Ok(row)
    }

    /// All records describing the given on-chain transaction
    pub async fn get_by_tx_hash(&self, tx_hash: &str) -> Result<Vec<BridgeTransfer>> {
        let rows = sqlx::query_as::<_, BridgeTransfer>(&format!(
            "SELECT {} FROM transfers WHERE tx_hash = ? ORDER BY updated_at DESC",
            SELECT_COLUMNS
        ))
        .bind(tx_hash.to_ascii_lowercase())
        .fetch_all(&self.pool)
        .await
        .wrap_err("Failed to get transfers by tx hash")?;
        Ok(rows)
    }

    pub async fn list(&self) -> Result<Vec<BridgeTransfer>> {
        let rows = sqlx::query_as::<_, BridgeTransfer>(&format!(
            "SELECT {} FROM transfers ORDER BY created_at",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .wrap_err("Failed to list transfers")?;
        Ok(rows)
    }

    pub async fn list_by_status(&self, status: TransferStatus) -> Result<Vec<BridgeTransfer>> {
        let rows = sqlx::query_as::<_, BridgeTransfer>(&format!(
            "SELECT {} FROM transfers WHERE status = ? ORDER BY created_at",
            SELECT_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .wrap_err("Failed to list transfers by status")?;
        Ok(rows)
    }

    /// Transfers with either side on the given chain
    pub async fn list_by_chain(&self, chain_id: u64) -> Result<Vec<BridgeTransfer>> {
        let rows = sqlx::query_as::<_, BridgeTransfer>(&format!(
            "SELECT {} FROM transfers WHERE source_chain_id = ? OR target_chain_id = ? \
             ORDER BY created_at",
            SELECT_COLUMNS
        ))
        .bind(chain_id as i64)
        .bind(chain_id as i64)
        .fetch_all(&self.pool)
        .await
        .wrap_err("Failed to list transfers by chain")?;
        Ok(rows)
    }

    /// Row counts per status, for the status endpoint
    pub async fn count_by_status(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM transfers GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await
        .wrap_err("Failed to count transfers")?;
        Ok(rows)
    }

    /// Transfers whose outbox index is still meaningful to reconcile
    pub async fn awaiting_outbox(&self) -> Result<Vec<BridgeTransfer>> {
        let rows = sqlx::query_as::<_, BridgeTransfer>(&format!(
            "SELECT {} FROM transfers WHERE status IN ('waiting_to_send', 'sent_to_remote') \
             ORDER BY created_at",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .wrap_err("Failed to select transfers awaiting outbox")?;
        Ok(rows)
    }

    /// Transfers relayed to the remote chain but still lacking proof data
    pub async fn awaiting_proof(&self) -> Result<Vec<BridgeTransfer>> {
        let rows = sqlx::query_as::<_, BridgeTransfer>(&format!(
            "SELECT {} FROM transfers WHERE status = 'sent_to_remote' AND claim_proof IS NULL \
             ORDER BY created_at",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .wrap_err("Failed to select transfers awaiting proof")?;
        Ok(rows)
    }

    /// Advance a transfer's status. Monotonic: a backward (or same-rank)
    /// transition is a logged no-op. Returns whether the row changed.
    pub async fn update_status(&self, id: &str, next: TransferStatus) -> Result<bool> {
        let Some(current) = self.get(id).await? else {
            tracing::warn!(id, "Status update for unknown transfer");
            return Ok(false);
        };
        let current_status = current.transfer_status()?;
        if !current_status.can_advance_to(next) {
            if current_status != next {
                tracing::warn!(
                    id,
                    current = %current_status,
                    requested = %next,
                    "Ignoring backward status transition"
                );
            }
            return Ok(false);
        }

        sqlx::query("UPDATE transfers SET status = ?, updated_at = ? WHERE id = ?")
            .bind(next.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .wrap_err("Failed to update transfer status")?;

        self.notify(LedgerEvent::Updated { id: id.to_string() });
        Ok(true)
    }

    /// Attach claim proof/leaf data and promote to `ready_to_claim` in one
    /// step. Guarded by status so a claimed transfer is never demoted.
    pub async fn attach_claim(
        &self,
        id: &str,
        proof_json: &str,
        leaf_json: &str,
        outbox_root: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE transfers
            SET claim_proof = ?, claim_leaf = ?, outbox_root = COALESCE(?, outbox_root),
                status = 'ready_to_claim', updated_at = ?
            WHERE id = ? AND status IN ('initiated', 'waiting_to_send', 'sent_to_remote')
            "#,
        )
        .bind(proof_json)
        .bind(leaf_json)
        .bind(outbox_root)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .wrap_err("Failed to attach claim data")?;

        let changed = result.rows_affected() > 0;
        if changed {
            self.notify(LedgerEvent::Updated { id: id.to_string() });
        }
        Ok(changed)
    }

    /// Terminal transition, called by the claim-execution collaborator
    pub async fn mark_claimed(&self, id: &str) -> Result<bool> {
        self.update_status(id, TransferStatus::Claimed).await
    }

    /// Delete a transfer. Explicit user action only; the reconciler never
    /// calls this.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM transfers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .wrap_err("Failed to remove transfer")?;
        let removed = result.rows_affected() > 0;
        if removed {
            self.notify(LedgerEvent::Removed { id: id.to_string() });
        }
        Ok(removed)
    }

    /// Collapse duplicate records. Ids are unique by schema; the interesting
    /// case is two ids describing the same on-chain event — a race between
    /// local creation and backend-derived creation — which share a
    /// `tx_hash`. The most recently updated record wins. Records with an
    /// empty `tx_hash` (backend-materialized, source side unknown) are
    /// skipped: they do not describe a locally observed event and would
    /// otherwise all collapse into each other. Returns the number removed.
    pub async fn dedup(&self) -> Result<u64> {
        let all = self.list().await?;
        let mut by_hash: HashMap<&str, Vec<&BridgeTransfer>> = HashMap::new();
        for transfer in &all {
            if transfer.tx_hash.is_empty() {
                continue;
            }
            by_hash.entry(transfer.tx_hash.as_str()).or_default().push(transfer);
        }

        let mut removed = 0u64;
        for (_, mut group) in by_hash {
            if group.len() < 2 {
                continue;
            }
            // Newest first; id as the deterministic tie-break
            group.sort_by(|a, b| {
                b.updated_at
                    .cmp(&a.updated_at)
                    .then_with(|| a.id.cmp(&b.id))
            });
            for loser in &group[1..] {
                if self.remove(&loser.id).await? {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            tracing::info!(removed, "Ledger dedup removed duplicate transfers");
        }
        Ok(removed)
    }
}
