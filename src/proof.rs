//! Merkle proof normalization
//!
//! Claim proofs arrive from the backend in whatever shape its serializer
//! produced: hex strings (mixed case, with or without 0x) or raw byte
//! arrays, and rarely the full tree depth. The destination sucker validates
//! a fixed `bytes32[32]` proof bit-for-bit, so this module is the single
//! boundary where everything is forced into that shape: each element becomes
//! a 0x-prefixed lowercase 64-digit hex string, and the array is right-padded
//! with the zero hash or truncated to exactly 32 entries. Malformed input is
//! normalized, never rejected; the destination contract is the final
//! authority on proof validity.

use alloy::primitives::{Address, FixedBytes, U256};
use eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::contracts::{ClaimData, ClaimLeafData};
use crate::types::ClaimLeaf;

/// Fixed proof depth expected by the destination claim call
pub const PROOF_DEPTH: usize = 32;

/// The zero hash used to right-pad short proofs
pub const ZERO_HASH: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";

/// A proof element as the backend supplies it: either a hex string or a
/// byte array, depending on which serializer produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawProofElement {
    Hex(String),
    Bytes(Vec<u8>),
}

/// Normalize one proof element to a 0x-prefixed lowercase 64-digit hex string.
///
/// Shorter values are left-padded (numeric semantics); longer values keep
/// their least-significant 32 bytes.
pub fn normalize_element(element: &RawProofElement) -> String {
    let hex = match element {
        RawProofElement::Hex(s) => {
            let stripped = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
            stripped.to_ascii_lowercase()
        }
        RawProofElement::Bytes(b) => hex::encode(b),
    };
    let hex = if hex.len() % 2 == 1 { format!("0{}", hex) } else { hex };
    let hex = if hex.len() > 64 {
        hex[hex.len() - 64..].to_string()
    } else {
        format!("{}{}", "0".repeat(64 - hex.len()), hex)
    };
    format!("0x{}", hex)
}

/// Normalize a raw proof to exactly [`PROOF_DEPTH`] elements.
///
/// Fewer elements are right-padded with [`ZERO_HASH`]; extras beyond the
/// depth are dropped.
pub fn normalize_proof(raw: &[RawProofElement]) -> Vec<String> {
    let mut proof: Vec<String> = raw
        .iter()
        .take(PROOF_DEPTH)
        .map(normalize_element)
        .collect();
    while proof.len() < PROOF_DEPTH {
        proof.push(ZERO_HASH.to_string());
    }
    proof
}

/// Convert a normalized proof into the fixed-width array the claim call takes.
pub fn proof_to_fixed(proof: &[String]) -> Result<[FixedBytes<32>; PROOF_DEPTH]> {
    if proof.len() != PROOF_DEPTH {
        return Err(eyre!(
            "Proof must have exactly {} elements, got {}",
            PROOF_DEPTH,
            proof.len()
        ));
    }
    let mut fixed = [FixedBytes::<32>::ZERO; PROOF_DEPTH];
    for (i, element) in proof.iter().enumerate() {
        let stripped = element.strip_prefix("0x").unwrap_or(element);
        let bytes = hex::decode(stripped)
            .wrap_err_with(|| format!("Proof element {} is not valid hex: {}", i, element))?;
        if bytes.len() != 32 {
            return Err(eyre!(
                "Proof element {} must be 32 bytes, got {}",
                i,
                bytes.len()
            ));
        }
        fixed[i] = FixedBytes::from_slice(&bytes);
    }
    Ok(fixed)
}

/// Build the exact calldata struct for `sucker.claim` from a leaf and a
/// normalized proof. Claim submission itself is the caller's business; this
/// crate only guarantees the structure is bit-for-bit what the destination
/// contract validates.
pub fn claim_call_data(token: Address, leaf: &ClaimLeaf, proof: &[String]) -> Result<ClaimData> {
    Ok(ClaimData {
        token,
        leaf: ClaimLeafData {
            index: U256::from(leaf.index),
            beneficiary: leaf.beneficiary,
            projectTokenCount: leaf.project_token_amount,
            terminalTokenAmount: leaf.terminal_token_amount,
        },
        proof: proof_to_fixed(proof)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn hex_el(s: &str) -> RawProofElement {
        RawProofElement::Hex(s.to_string())
    }

    #[test]
    fn test_normalize_element_pads_short_hex() {
        let normalized = normalize_element(&hex_el("0xAB"));
        assert_eq!(normalized.len(), 66);
        assert!(normalized.ends_with("ab"));
        assert!(normalized.starts_with("0x00"));
    }

    #[test]
    fn test_normalize_element_lowercases() {
        let normalized = normalize_element(&hex_el(
            "0xDEADBEEF00000000000000000000000000000000000000000000000000000001",
        ));
        assert_eq!(
            normalized,
            "0xdeadbeef00000000000000000000000000000000000000000000000000000001"
        );
    }

    #[test]
    fn test_normalize_element_truncates_long_input() {
        // 33 bytes; the least-significant 32 survive
        let long = format!("0xff{}", "11".repeat(32));
        let normalized = normalize_element(&hex_el(&long));
        assert_eq!(normalized, format!("0x{}", "11".repeat(32)));
    }

    #[test]
    fn test_normalize_element_bytes() {
        let normalized = normalize_element(&RawProofElement::Bytes(vec![0xde, 0xad]));
        assert!(normalized.ends_with("dead"));
        assert_eq!(normalized.len(), 66);
    }

    #[test]
    fn test_normalize_element_odd_length() {
        let normalized = normalize_element(&hex_el("0xabc"));
        assert!(normalized.ends_with("0abc"));
        assert_eq!(normalized.len(), 66);
    }

    #[test]
    fn test_normalize_proof_pads_to_depth() {
        let raw: Vec<RawProofElement> = (0u8..10).map(|i| RawProofElement::Bytes(vec![i])).collect();
        let proof = normalize_proof(&raw);
        assert_eq!(proof.len(), PROOF_DEPTH);
        for (i, el) in proof.iter().take(10).enumerate() {
            assert_eq!(*el, normalize_element(&raw[i]));
        }
        for el in proof.iter().skip(10) {
            assert_eq!(el, ZERO_HASH);
        }
    }

    #[test]
    fn test_normalize_proof_truncates_past_depth() {
        let raw: Vec<RawProofElement> = (0u8..40).map(|i| RawProofElement::Bytes(vec![i])).collect();
        let proof = normalize_proof(&raw);
        assert_eq!(proof.len(), PROOF_DEPTH);
        assert_eq!(proof[31], normalize_element(&raw[31]));
    }

    #[test]
    fn test_proof_to_fixed_round_trip() {
        let raw: Vec<RawProofElement> = vec![hex_el("0x01"), hex_el("0x02")];
        let proof = normalize_proof(&raw);
        let fixed = proof_to_fixed(&proof).unwrap();
        assert_eq!(fixed[0][31], 1);
        assert_eq!(fixed[1][31], 2);
        assert_eq!(fixed[31], FixedBytes::<32>::ZERO);
    }

    #[test]
    fn test_proof_to_fixed_rejects_wrong_length() {
        assert!(proof_to_fixed(&[ZERO_HASH.to_string()]).is_err());
    }

    #[test]
    fn test_claim_call_data_shape() {
        let leaf = ClaimLeaf {
            index: 7,
            beneficiary: Address::from_str("0x00000000000000000000000000000000000000aa").unwrap(),
            project_token_amount: U256::from(1_000u64),
            terminal_token_amount: U256::from(900u64),
        };
        let proof = normalize_proof(&[RawProofElement::Bytes(vec![1])]);
        let call = claim_call_data(Address::ZERO, &leaf, &proof).unwrap();
        assert_eq!(call.leaf.index, U256::from(7u64));
        assert_eq!(call.proof.len(), PROOF_DEPTH);
        assert_eq!(call.proof[0][31], 1);
    }
}
