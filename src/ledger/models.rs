//! Ledger row models
//!
//! Amounts are stored as TEXT (decimal U256) and addresses as lowercase hex
//! strings; typed accessors parse them back at the edges. Claim proof and
//! leaf are stored as JSON written by the reconciler's backend pass.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use crate::types::{ClaimLeaf, TransferStatus};

/// A tracked bridge transfer.
///
/// `tx_hash` is empty and `source_chain_id` is zero for transfers
/// materialized from backend claim data alone; the source side of those was
/// never observed locally.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BridgeTransfer {
    pub id: String,
    pub tx_hash: String,
    pub project_id: i64,
    pub source_chain_id: i64,
    pub target_chain_id: i64,
    pub sucker_address: String,
    pub beneficiary: String,
    pub token: String,
    pub project_token_amount: String,
    pub terminal_token_amount: String,
    pub outbox_index: i64,
    pub outbox_root: Option<String>,
    pub claim_proof: Option<String>,
    pub claim_leaf: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BridgeTransfer {
    pub fn transfer_status(&self) -> Result<TransferStatus> {
        TransferStatus::parse(&self.status)
    }

    pub fn sucker(&self) -> Result<Address> {
        Address::from_str(&self.sucker_address)
            .wrap_err_with(|| format!("Invalid sucker address on transfer {}", self.id))
    }

    pub fn token_address(&self) -> Result<Address> {
        Address::from_str(&self.token)
            .wrap_err_with(|| format!("Invalid token address on transfer {}", self.id))
    }

    pub fn beneficiary_address(&self) -> Result<Address> {
        Address::from_str(&self.beneficiary)
            .wrap_err_with(|| format!("Invalid beneficiary on transfer {}", self.id))
    }

    /// Decode the stored claim leaf, if the backend pass has attached one
    pub fn decoded_leaf(&self) -> Result<Option<ClaimLeaf>> {
        match &self.claim_leaf {
            Some(json) => Ok(Some(
                serde_json::from_str(json)
                    .wrap_err_with(|| format!("Corrupt claim leaf on transfer {}", self.id))?,
            )),
            None => Ok(None),
        }
    }

    /// Decode the stored normalized proof, if attached
    pub fn decoded_proof(&self) -> Result<Option<Vec<String>>> {
        match &self.claim_proof {
            Some(json) => Ok(Some(
                serde_json::from_str(json)
                    .wrap_err_with(|| format!("Corrupt claim proof on transfer {}", self.id))?,
            )),
            None => Ok(None),
        }
    }
}

/// For inserting new transfers
#[derive(Debug, Clone)]
pub struct NewBridgeTransfer {
    pub id: String,
    pub tx_hash: String,
    pub project_id: i64,
    pub source_chain_id: i64,
    pub target_chain_id: i64,
    pub sucker_address: String,
    pub beneficiary: String,
    pub token: String,
    pub project_token_amount: String,
    pub terminal_token_amount: String,
    pub outbox_index: i64,
    pub outbox_root: Option<String>,
    pub claim_proof: Option<String>,
    pub claim_leaf: Option<String>,
    pub status: TransferStatus,
}

impl NewBridgeTransfer {
    /// Deterministic id for a transfer observed from its source-chain event
    pub fn local_id(source_chain_id: u64, tx_hash: &str) -> String {
        format!("{}-{}", source_chain_id, tx_hash.to_ascii_lowercase())
    }

    /// Deterministic id for a transfer materialized from backend claim data
    pub fn claim_id(target_chain_id: u64, sucker: Address, leaf_index: u64) -> String {
        format!(
            "{}-0x{}-{}",
            target_chain_id,
            hex::encode(sucker.as_slice()),
            leaf_index
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_id_is_case_insensitive_on_hash() {
        assert_eq!(
            NewBridgeTransfer::local_id(10, "0xABCD"),
            NewBridgeTransfer::local_id(10, "0xabcd")
        );
    }

    #[test]
    fn test_claim_id_embeds_all_parts() {
        let id = NewBridgeTransfer::claim_id(8453, Address::repeat_byte(7), 42);
        assert!(id.starts_with("8453-0x07"));
        assert!(id.ends_with("-42"));
    }
}
