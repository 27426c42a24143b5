//! Sucker pair discovery
//!
//! Walks the cross-chain pair graph for a project: each chain's registry
//! declares pairs, each pair's remote endpoint names another chain, and the
//! remote sucker's own project id seeds the next node. The traversal is a
//! worklist with a visited set keyed `"{chain}-{project}"`, so cyclic graphs
//! (every healthy pair graph is cyclic — A pairs back to B) terminate with
//! each node processed at most once. A failed lookup abandons that branch
//! and is logged; it never aborts the traversal.

use alloy::primitives::Address;
use eyre::Result;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::chain::ChainQuery;
use crate::classifier::BridgeClassifier;
use crate::metrics;
use crate::types::{pair_id, RawSuckerPair, SuckerEndpoint, SuckerPair};

/// A snapshot of one chain/project's declared pairs.
#[derive(Debug, Clone)]
pub struct ProjectSuckerMapping {
    pub project_id: u64,
    pub chain_id: u64,
    pub raw_pairs: Vec<RawSuckerPair>,
}

/// Output of a full traversal. Immutable once returned.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryResult {
    /// Per-node snapshots, keyed `"{chain_id}-{project_id}"`
    pub mappings: HashMap<String, ProjectSuckerMapping>,
    /// Discovered pairs, keyed by canonical pair id
    pub pairs: HashMap<String, SuckerPair>,
}

impl DiscoveryResult {
    /// Pairs with an endpoint on the given chain — what a transfer front
    /// end actually asks for.
    pub fn pairs_on_chain(&self, chain_id: u64) -> Vec<&SuckerPair> {
        let mut pairs: Vec<&SuckerPair> = self
            .pairs
            .values()
            .filter(|p| p.endpoint_on(chain_id).is_some())
            .collect();
        pairs.sort_by(|a, b| a.id.cmp(&b.id));
        pairs
    }
}

/// Key of one traversal node
fn node_key(chain_id: u64, project_id: u64) -> String {
    format!("{}-{}", chain_id, project_id)
}

/// Worklist graph traversal over per-chain sucker registries.
pub struct PairDiscoveryEngine {
    chain: Arc<dyn ChainQuery>,
    classifier: Arc<BridgeClassifier>,
    /// Registry contract per chain
    registries: HashMap<u64, Address>,
}

impl PairDiscoveryEngine {
    pub fn new(
        chain: Arc<dyn ChainQuery>,
        classifier: Arc<BridgeClassifier>,
        registries: HashMap<u64, Address>,
    ) -> Self {
        Self {
            chain,
            classifier,
            registries,
        }
    }

    /// Discover the full connected pair graph reachable from the seed.
    ///
    /// Idempotent: the same seed yields the same pair-id key set. Nodes are
    /// processed sequentially to respect third-party RPC rate limits; the
    /// visited-set and canonical-pair-id dedup are order-independent.
    pub async fn discover(
        &self,
        start_chain_id: u64,
        start_project_id: u64,
    ) -> Result<DiscoveryResult> {
        let mut result = DiscoveryResult::default();
        let mut visited: HashSet<String> = HashSet::new();
        let mut worklist: VecDeque<(u64, u64)> = VecDeque::new();
        worklist.push_back((start_chain_id, start_project_id));

        while let Some((chain_id, project_id)) = worklist.pop_front() {
            let key = node_key(chain_id, project_id);
            if !visited.insert(key.clone()) {
                continue;
            }

            let Some(&registry) = self.registries.get(&chain_id) else {
                tracing::warn!(chain_id, project_id, "No registry configured for chain, abandoning branch");
                continue;
            };

            let raw_pairs = match self
                .chain
                .pairs_of_project(chain_id, registry, project_id)
                .await
            {
                Ok(pairs) => pairs,
                Err(e) => {
                    tracing::warn!(
                        chain_id,
                        project_id,
                        error = %e,
                        "Registry lookup failed, abandoning branch"
                    );
                    continue;
                }
            };

            tracing::debug!(chain_id, project_id, pairs = raw_pairs.len(), "Visited node");
            result.mappings.insert(
                key,
                ProjectSuckerMapping {
                    project_id,
                    chain_id,
                    raw_pairs: raw_pairs.clone(),
                },
            );

            for raw in raw_pairs {
                let id = pair_id(chain_id, raw.local, raw.remote_chain_id, raw.remote);
                if result.pairs.contains_key(&id) {
                    continue;
                }

                // One extra chain call per new remote endpoint
                let remote_project_id = match self
                    .chain
                    .sucker_project_id(raw.remote_chain_id, raw.remote)
                    .await
                {
                    Ok(project) => project,
                    Err(e) => {
                        tracing::warn!(
                            chain_id = raw.remote_chain_id,
                            remote = %raw.remote,
                            error = %e,
                            "Remote project id lookup failed, abandoning pair"
                        );
                        continue;
                    }
                };

                let local = SuckerEndpoint {
                    chain_id,
                    address: raw.local,
                    project_id,
                    classification: None,
                };
                let remote = SuckerEndpoint {
                    chain_id: raw.remote_chain_id,
                    address: raw.remote,
                    project_id: remote_project_id,
                    classification: None,
                };
                result.pairs.insert(id, SuckerPair::new(local, remote));
                worklist.push_back((raw.remote_chain_id, remote_project_id));
            }
        }

        self.enrich(&mut result).await;

        metrics::DISCOVERED_PAIRS.set(result.pairs.len() as f64);
        tracing::info!(
            start_chain_id,
            start_project_id,
            nodes = result.mappings.len(),
            pairs = result.pairs.len(),
            "Pair discovery complete"
        );
        Ok(result)
    }

    /// Attach a bridge classification to every endpoint
    async fn enrich(&self, result: &mut DiscoveryResult) {
        for pair in result.pairs.values_mut() {
            let a = self.classifier.classify(pair.a.chain_id, pair.a.address).await;
            let b = self.classifier.classify(pair.b.chain_id, pair.b.address).await;
            pair.a.classification = Some(a);
            pair.b.classification = Some(b);
        }
    }
}
