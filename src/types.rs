//! Common types for sucker pair tracking
//!
//! Shared across discovery, classification, and reconciliation. The alloy
//! primitive types (`Address`, `U256`) are used directly at the edges; the
//! ledger stores their string forms.

use alloy::primitives::{Address, U256};
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classifier::BridgeClassification;

/// Lifecycle status of a bridge transfer.
///
/// Strictly forward-moving: `Initiated → WaitingToSend → SentToRemote →
/// ReadyToClaim → Claimed`. The ledger enforces monotonicity; a backward
/// write is a logged no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    Initiated,
    WaitingToSend,
    SentToRemote,
    ReadyToClaim,
    Claimed,
}

impl TransferStatus {
    /// Get the status as a lowercase string (the ledger's storage form)
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Initiated => "initiated",
            TransferStatus::WaitingToSend => "waiting_to_send",
            TransferStatus::SentToRemote => "sent_to_remote",
            TransferStatus::ReadyToClaim => "ready_to_claim",
            TransferStatus::Claimed => "claimed",
        }
    }

    /// Parse from the storage form
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "initiated" => Ok(TransferStatus::Initiated),
            "waiting_to_send" => Ok(TransferStatus::WaitingToSend),
            "sent_to_remote" => Ok(TransferStatus::SentToRemote),
            "ready_to_claim" => Ok(TransferStatus::ReadyToClaim),
            "claimed" => Ok(TransferStatus::Claimed),
            other => Err(eyre!("Unknown transfer status: {}", other)),
        }
    }

    /// Position in the forward-only lifecycle
    pub fn rank(&self) -> u8 {
        match self {
            TransferStatus::Initiated => 0,
            TransferStatus::WaitingToSend => 1,
            TransferStatus::SentToRemote => 2,
            TransferStatus::ReadyToClaim => 3,
            TransferStatus::Claimed => 4,
        }
    }

    /// Whether moving to `next` is a forward transition
    pub fn can_advance_to(&self, next: TransferStatus) -> bool {
        next.rank() > self.rank()
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One side of a sucker pair: the contract, the chain it lives on, and the
/// project it serves. Classification is attached after discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuckerEndpoint {
    pub chain_id: u64,
    pub address: Address,
    pub project_id: u64,
    pub classification: Option<BridgeClassification>,
}

/// A discovered pairing of two sucker contracts on different chains.
///
/// `id` is canonical: identical regardless of which endpoint is passed
/// first, so repeated or concurrent discovery runs deduplicate cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuckerPair {
    pub id: String,
    pub a: SuckerEndpoint,
    pub b: SuckerEndpoint,
}

impl SuckerPair {
    pub fn new(a: SuckerEndpoint, b: SuckerEndpoint) -> Self {
        let id = pair_id(a.chain_id, a.address, b.chain_id, b.address);
        Self { id, a, b }
    }

    /// The endpoint on the given chain, if either side lives there
    pub fn endpoint_on(&self, chain_id: u64) -> Option<&SuckerEndpoint> {
        if self.a.chain_id == chain_id {
            Some(&self.a)
        } else if self.b.chain_id == chain_id {
            Some(&self.b)
        } else {
            None
        }
    }
}

/// Order-independent identifier for a sucker pair.
///
/// Each half is `"{chain_id}:0x{address}"` (lowercase hex); halves are
/// sorted lexicographically before joining, so `pair_id(a, b) ==
/// pair_id(b, a)` for all orderings.
pub fn pair_id(a_chain: u64, a_address: Address, b_chain: u64, b_address: Address) -> String {
    let mut halves = [
        format!("{}:0x{}", a_chain, hex::encode(a_address.as_slice())),
        format!("{}:0x{}", b_chain, hex::encode(b_address.as_slice())),
    ];
    halves.sort();
    halves.join("-")
}

/// A pair entry as the registry reports it, before the remote endpoint's
/// project id has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSuckerPair {
    pub local: Address,
    pub remote: Address,
    pub remote_chain_id: u64,
}

/// Source-chain outbox state for one (sucker, token).
///
/// `number_of_claims_sent` is the authoritative relay counter: a transfer
/// whose `outbox_index` falls below it has been sent to the remote chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxSnapshot {
    pub nonce: u64,
    pub balance: U256,
    pub tree_count: u64,
    pub number_of_claims_sent: u64,
}

/// Merkle leaf of a claimable transfer, as the destination sucker hashes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimLeaf {
    pub index: u64,
    pub beneficiary: Address,
    pub project_token_amount: U256,
    pub terminal_token_amount: U256,
}

/// A claimable-transfer record returned by the claims backend.
///
/// `proof` is kept raw here; only the proof codec normalizes it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimRecord {
    pub token: Address,
    pub leaf: ClaimLeaf,
    pub proof: Vec<crate::proof::RawProofElement>,
}

/// Parse a U256 from either a 0x-prefixed hex string or a decimal string.
/// Backends are inconsistent about which form they emit.
pub fn parse_u256(s: &str) -> Result<U256> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        U256::from_str_radix(hex, 16).map_err(|e| eyre!("Invalid hex amount {}: {}", s, e))
    } else {
        U256::from_str_radix(s, 10).map_err(|e| eyre!("Invalid decimal amount {}: {}", s, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_round_trip() {
        for status in [
            TransferStatus::Initiated,
            TransferStatus::WaitingToSend,
            TransferStatus::SentToRemote,
            TransferStatus::ReadyToClaim,
            TransferStatus::Claimed,
        ] {
            assert_eq!(TransferStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(TransferStatus::parse("finalized").is_err());
    }

    #[test]
    fn test_status_monotonic() {
        assert!(TransferStatus::WaitingToSend.can_advance_to(TransferStatus::SentToRemote));
        assert!(TransferStatus::SentToRemote.can_advance_to(TransferStatus::Claimed));
        assert!(!TransferStatus::ReadyToClaim.can_advance_to(TransferStatus::SentToRemote));
        assert!(!TransferStatus::Claimed.can_advance_to(TransferStatus::Claimed));
    }

    #[test]
    fn test_pair_id_symmetric() {
        let a = Address::from_str("0x00000000000000000000000000000000000000aa").unwrap();
        let b = Address::from_str("0x00000000000000000000000000000000000000bb").unwrap();
        assert_eq!(pair_id(1, a, 10, b), pair_id(10, b, 1, a));
    }

    #[test]
    fn test_pair_id_distinguishes_chains() {
        let a = Address::from_str("0x00000000000000000000000000000000000000aa").unwrap();
        assert_ne!(pair_id(1, a, 10, a), pair_id(1, a, 8453, a));
    }

    #[test]
    fn test_parse_u256_decimal_and_hex() {
        assert_eq!(parse_u256("1000").unwrap(), U256::from(1000u64));
        assert_eq!(parse_u256("0xff").unwrap(), U256::from(255u64));
        assert!(parse_u256("not-a-number").is_err());
    }
}
