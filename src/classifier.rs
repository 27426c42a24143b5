//! Bridge implementation detection
//!
//! A sucker is backed by one of a handful of underlying bridge technologies,
//! each with different payment, timing, and manual-step semantics. The
//! classifier walks a static table of known deployer contracts and asks each
//! one whether it deployed the sucker in question; the first positive probe
//! wins. A sucker no deployer claims is `Unknown` and gets the configured
//! conservative profile — classification failure must never under-estimate
//! cost or time.
//!
//! Results are cached per (chain, sucker) for the process lifetime; a
//! deployed contract's backing bridge never changes. `invalidate` and
//! `update_mappings` let an operator correct a misclassification without a
//! restart.

use alloy::primitives::{address, Address};
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use crate::cache::TtlCache;
use crate::chain::ChainQuery;

/// Chains treated as L1 for direction classification
const L1_CHAIN_IDS: &[u64] = &[1, 11_155_111];

/// Max classification cache entries; far above any realistic sucker count
const CLASSIFICATION_CACHE_SIZE: usize = 4096;

/// Transfer direction between the two layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    L1ToL2,
    L2ToL1,
    L2ToL2,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::L1ToL2 => "l1_to_l2",
            Direction::L2ToL1 => "l2_to_l1",
            Direction::L2ToL2 => "l2_to_l2",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether the chain is an L1 in the static layer classification
pub fn is_l1(chain_id: u64) -> bool {
    L1_CHAIN_IDS.contains(&chain_id)
}

/// Direction of a transfer from `source_chain` to `target_chain`.
///
/// Paired suckers never sit on two L1s; a same-layer pair behaves like
/// L2-to-L2.
pub fn direction_of(source_chain: u64, target_chain: u64) -> Direction {
    match (is_l1(source_chain), is_l1(target_chain)) {
        (true, false) => Direction::L1ToL2,
        (false, true) => Direction::L2ToL1,
        _ => Direction::L2ToL2,
    }
}

/// The bridge technology backing a sucker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeKind {
    Optimism,
    Arbitrum,
    Ccip,
    Unknown,
}

impl BridgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BridgeKind::Optimism => "optimism",
            BridgeKind::Arbitrum => "arbitrum",
            BridgeKind::Ccip => "ccip",
            BridgeKind::Unknown => "unknown",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BridgeKind::Optimism => "OP Standard Bridge",
            BridgeKind::Arbitrum => "Arbitrum native bridge",
            BridgeKind::Ccip => "Chainlink CCIP",
            BridgeKind::Unknown => "Unknown bridge",
        }
    }

    /// Parse from the config form
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "optimism" => Ok(BridgeKind::Optimism),
            "arbitrum" => Ok(BridgeKind::Arbitrum),
            "ccip" => Ok(BridgeKind::Ccip),
            "unknown" => Ok(BridgeKind::Unknown),
            other => Err(eyre!("Unknown bridge kind: {}", other)),
        }
    }
}

impl fmt::Display for BridgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cost/timing/step semantics of one transfer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeProfile {
    /// The transfer needs a native payment (relay gas, ticket fee) to move
    pub requires_payment: bool,
    /// Manual steps remain after the message lands (prove, finalize)
    pub has_extra_steps: bool,
    pub estimated_minutes: u32,
}

/// The profile of every direction for one bridge kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionProfiles {
    pub l1_to_l2: BridgeProfile,
    pub l2_to_l1: BridgeProfile,
    pub l2_to_l2: BridgeProfile,
}

impl DirectionProfiles {
    pub fn for_direction(&self, direction: Direction) -> &BridgeProfile {
        match direction {
            Direction::L1ToL2 => &self.l1_to_l2,
            Direction::L2ToL1 => &self.l2_to_l1,
            Direction::L2ToL2 => &self.l2_to_l2,
        }
    }

    /// The same profile in every direction
    pub fn uniform(profile: BridgeProfile) -> Self {
        Self {
            l1_to_l2: profile,
            l2_to_l1: profile,
            l2_to_l2: profile,
        }
    }

    pub fn max_estimated_minutes(&self) -> u32 {
        self.l1_to_l2
            .estimated_minutes
            .max(self.l2_to_l1.estimated_minutes)
            .max(self.l2_to_l2.estimated_minutes)
    }
}

/// A classified sucker: the backing bridge and its directional semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeClassification {
    pub kind: BridgeKind,
    pub display_name: String,
    pub profiles: DirectionProfiles,
}

impl BridgeClassification {
    pub fn profile(&self, direction: Direction) -> &BridgeProfile {
        self.profiles.for_direction(direction)
    }
}

// Seven-day challenge/finalization windows dominate every withdrawal path.
const SEVEN_DAYS_MINUTES: u32 = 10_080;

const OPTIMISM_PROFILES: DirectionProfiles = DirectionProfiles {
    l1_to_l2: BridgeProfile {
        requires_payment: false,
        has_extra_steps: false,
        estimated_minutes: 3,
    },
    l2_to_l1: BridgeProfile {
        requires_payment: false,
        has_extra_steps: true,
        estimated_minutes: SEVEN_DAYS_MINUTES,
    },
    l2_to_l2: BridgeProfile {
        requires_payment: false,
        has_extra_steps: true,
        estimated_minutes: SEVEN_DAYS_MINUTES,
    },
};

const ARBITRUM_PROFILES: DirectionProfiles = DirectionProfiles {
    l1_to_l2: BridgeProfile {
        requires_payment: true,
        has_extra_steps: false,
        estimated_minutes: 15,
    },
    l2_to_l1: BridgeProfile {
        requires_payment: false,
        has_extra_steps: true,
        estimated_minutes: SEVEN_DAYS_MINUTES,
    },
    l2_to_l2: BridgeProfile {
        requires_payment: true,
        has_extra_steps: true,
        estimated_minutes: SEVEN_DAYS_MINUTES,
    },
};

const CCIP_PROFILES: DirectionProfiles = DirectionProfiles {
    l1_to_l2: BridgeProfile {
        requires_payment: true,
        has_extra_steps: false,
        estimated_minutes: 30,
    },
    l2_to_l1: BridgeProfile {
        requires_payment: true,
        has_extra_steps: false,
        estimated_minutes: 30,
    },
    l2_to_l2: BridgeProfile {
        requires_payment: true,
        has_extra_steps: false,
        estimated_minutes: 30,
    },
};

/// One known deployer: the chain it lives on, its address, and the bridge
/// technology its suckers use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployerMapping {
    pub chain_id: u64,
    pub deployer: Address,
    pub kind: BridgeKind,
}

/// The deployer table for the current production deployments.
pub fn default_mappings() -> Vec<DeployerMapping> {
    vec![
        DeployerMapping {
            chain_id: 1,
            deployer: address!("34b40205b249e5733cf93d86b7c9783b015dd3e7"),
            kind: BridgeKind::Optimism,
        },
        DeployerMapping {
            chain_id: 10,
            deployer: address!("34b40205b249e5733cf93d86b7c9783b015dd3e7"),
            kind: BridgeKind::Optimism,
        },
        DeployerMapping {
            chain_id: 1,
            deployer: address!("b825b1d4ab79049fdf1ee28506e2fbb155c53a1a"),
            kind: BridgeKind::Arbitrum,
        },
        DeployerMapping {
            chain_id: 42_161,
            deployer: address!("b825b1d4ab79049fdf1ee28506e2fbb155c53a1a"),
            kind: BridgeKind::Arbitrum,
        },
        DeployerMapping {
            chain_id: 1,
            deployer: address!("de901ebafc70d545f9d43034308c136ce8c94a5c"),
            kind: BridgeKind::Ccip,
        },
        DeployerMapping {
            chain_id: 8453,
            deployer: address!("de901ebafc70d545f9d43034308c136ce8c94a5c"),
            kind: BridgeKind::Ccip,
        },
        DeployerMapping {
            chain_id: 10,
            deployer: address!("de901ebafc70d545f9d43034308c136ce8c94a5c"),
            kind: BridgeKind::Ccip,
        },
        DeployerMapping {
            chain_id: 42_161,
            deployer: address!("de901ebafc70d545f9d43034308c136ce8c94a5c"),
            kind: BridgeKind::Ccip,
        },
    ]
}

/// Classifies suckers by probing known deployers, with a process-lifetime
/// cache.
pub struct BridgeClassifier {
    chain: Arc<dyn ChainQuery>,
    mappings: RwLock<Vec<DeployerMapping>>,
    cache: Mutex<TtlCache<(u64, Address), BridgeClassification>>,
    unknown_profile: BridgeProfile,
}

impl BridgeClassifier {
    pub fn new(
        chain: Arc<dyn ChainQuery>,
        mappings: Vec<DeployerMapping>,
        unknown_profile: BridgeProfile,
    ) -> Self {
        Self {
            chain,
            mappings: RwLock::new(mappings),
            cache: Mutex::new(TtlCache::pinned(CLASSIFICATION_CACHE_SIZE)),
            unknown_profile,
        }
    }

    /// Classify a sucker. Infallible: probe failures are swallowed per
    /// candidate and an unclaimed sucker resolves to `Unknown`.
    pub async fn classify(&self, chain_id: u64, sucker: Address) -> BridgeClassification {
        if let Some(cached) = self.cache.lock().unwrap().get(&(chain_id, sucker)) {
            return cached;
        }

        let candidates: Vec<DeployerMapping> = self
            .mappings
            .read()
            .unwrap()
            .iter()
            .filter(|m| m.chain_id == chain_id)
            .copied()
            .collect();

        let mut kind = BridgeKind::Unknown;
        for candidate in candidates {
            match self
                .chain
                .is_sucker_of(chain_id, candidate.deployer, sucker)
                .await
            {
                Ok(true) => {
                    kind = candidate.kind;
                    break;
                }
                Ok(false) => {}
                Err(e) => {
                    // Deployer may simply not exist on this chain
                    tracing::debug!(
                        chain_id,
                        deployer = %candidate.deployer,
                        sucker = %sucker,
                        error = %e,
                        "Deployer probe failed, trying next candidate"
                    );
                }
            }
        }

        if kind == BridgeKind::Unknown {
            tracing::warn!(
                chain_id,
                sucker = %sucker,
                "No known deployer claims this sucker, using conservative profile"
            );
        }

        let classification = self.classification_for(kind);
        self.cache
            .lock()
            .unwrap()
            .insert((chain_id, sucker), classification.clone());
        classification
    }

    /// The classification record for a known kind
    pub fn classification_for(&self, kind: BridgeKind) -> BridgeClassification {
        let profiles = match kind {
            BridgeKind::Optimism => OPTIMISM_PROFILES,
            BridgeKind::Arbitrum => ARBITRUM_PROFILES,
            BridgeKind::Ccip => CCIP_PROFILES,
            BridgeKind::Unknown => DirectionProfiles::uniform(self.unknown_profile),
        };
        BridgeClassification {
            kind,
            display_name: kind.display_name().to_string(),
            profiles,
        }
    }

    /// Directional profile for a kind and a (source, target) chain pair
    pub fn profile(&self, kind: BridgeKind, source_chain: u64, target_chain: u64) -> BridgeProfile {
        *self
            .classification_for(kind)
            .profile(direction_of(source_chain, target_chain))
    }

    /// Drop a cached classification so the next `classify` re-probes
    pub fn invalidate(&self, chain_id: u64, sucker: Address) {
        self.cache.lock().unwrap().invalidate(&(chain_id, sucker));
    }

    /// Replace the deployer table. Clears the cache: entries classified
    /// under the old table would survive the remap otherwise.
    pub fn update_mappings(&self, mappings: Vec<DeployerMapping>) {
        *self.mappings.write().unwrap() = mappings;
        self.cache.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_of() {
        assert_eq!(direction_of(1, 10), Direction::L1ToL2);
        assert_eq!(direction_of(10, 1), Direction::L2ToL1);
        assert_eq!(direction_of(10, 8453), Direction::L2ToL2);
    }

    #[test]
    fn test_bridge_kind_round_trip() {
        for kind in [
            BridgeKind::Optimism,
            BridgeKind::Arbitrum,
            BridgeKind::Ccip,
            BridgeKind::Unknown,
        ] {
            assert_eq!(BridgeKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(BridgeKind::parse("hyperlane").is_err());
    }

    #[test]
    fn test_uniform_profiles() {
        let profile = BridgeProfile {
            requires_payment: true,
            has_extra_steps: true,
            estimated_minutes: 99,
        };
        let profiles = DirectionProfiles::uniform(profile);
        assert_eq!(profiles.for_direction(Direction::L1ToL2), &profile);
        assert_eq!(profiles.max_estimated_minutes(), 99);
    }

    #[test]
    fn test_withdrawal_paths_have_extra_steps() {
        assert!(OPTIMISM_PROFILES.l2_to_l1.has_extra_steps);
        assert!(ARBITRUM_PROFILES.l2_to_l1.has_extra_steps);
        assert!(!CCIP_PROFILES.l2_to_l1.has_extra_steps);
    }

    #[test]
    fn test_default_mappings_cover_known_chains() {
        let mappings = default_mappings();
        assert!(mappings.iter().any(|m| m.chain_id == 1));
        assert!(mappings.iter().any(|m| m.kind == BridgeKind::Ccip));
    }
}
