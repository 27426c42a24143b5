//! Chain read access
//!
//! `ChainQuery` is the read-only collaborator interface every engine in this
//! crate depends on; tests inject doubles, production uses [`EvmChainQuery`],
//! which holds one read-only alloy provider per configured chain (no signer
//! needed — this crate never submits transactions).

use alloy::{
    primitives::{Address, U256},
    providers::{ProviderBuilder, RootProvider},
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use eyre::{eyre, Result};
use std::collections::HashMap;

use crate::config::ChainConfig;
use crate::contracts::{Sucker, SuckerDeployer, SuckerRegistry, ERC20};
use crate::types::{OutboxSnapshot, RawSuckerPair};

/// Read-only chain access, keyed by chain id.
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// Registry query: all sucker pairs a project declares on a chain
    async fn pairs_of_project(
        &self,
        chain_id: u64,
        registry: Address,
        project_id: u64,
    ) -> Result<Vec<RawSuckerPair>>;

    /// The project id a sucker serves
    async fn sucker_project_id(&self, chain_id: u64, sucker: Address) -> Result<u64>;

    /// Outbox state for (sucker, token) on the source chain
    async fn outbox_of(&self, chain_id: u64, sucker: Address, token: Address)
        -> Result<OutboxSnapshot>;

    /// Deployer probe: did this deployer deploy the given contract
    async fn is_sucker_of(&self, chain_id: u64, deployer: Address, sucker: Address)
        -> Result<bool>;

    /// ERC-20 decimals
    async fn token_decimals(&self, chain_id: u64, token: Address) -> Result<u8>;

    /// ERC-20 balance
    async fn erc20_balance(&self, chain_id: u64, token: Address, owner: Address) -> Result<U256>;

    /// ERC-20 allowance
    async fn erc20_allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256>;
}

/// Multi-chain query client over read-only HTTP providers.
pub struct EvmChainQuery {
    providers: HashMap<u64, RootProvider<Http<Client>>>,
}

impl EvmChainQuery {
    /// Create a provider per configured chain
    pub fn new(chains: &[ChainConfig]) -> Result<Self> {
        let mut providers = HashMap::new();
        for chain in chains {
            let provider = ProviderBuilder::new().on_http(
                chain
                    .rpc_url
                    .parse()
                    .map_err(|e| eyre!("Invalid RPC URL for chain {}: {}", chain.chain_id, e))?,
            );
            providers.insert(chain.chain_id, provider);
        }
        Ok(Self { providers })
    }

    fn provider(&self, chain_id: u64) -> Result<&RootProvider<Http<Client>>> {
        self.providers
            .get(&chain_id)
            .ok_or_else(|| eyre!("No RPC configured for chain {}", chain_id))
    }
}

#[async_trait]
impl ChainQuery for EvmChainQuery {
    async fn pairs_of_project(
        &self,
        chain_id: u64,
        registry: Address,
        project_id: u64,
    ) -> Result<Vec<RawSuckerPair>> {
        let provider = self.provider(chain_id)?;
        let registry = SuckerRegistry::new(registry, provider);
        let result = registry
            .pairsOfProject(U256::from(project_id))
            .call()
            .await
            .map_err(|e| eyre!("Failed to get pairs of project {}: {}", project_id, e))?;

        let mut pairs = Vec::with_capacity(result.pairs.len());
        for pair in result.pairs {
            pairs.push(RawSuckerPair {
                local: pair.local,
                remote: pair.remote,
                remote_chain_id: u64::try_from(pair.remoteChainId)
                    .map_err(|_| eyre!("Remote chain id out of range: {}", pair.remoteChainId))?,
            });
        }
        Ok(pairs)
    }

    async fn sucker_project_id(&self, chain_id: u64, sucker: Address) -> Result<u64> {
        let provider = self.provider(chain_id)?;
        let contract = Sucker::new(sucker, provider);
        let result = contract
            .projectId()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get project id of sucker {}: {}", sucker, e))?;

        u64::try_from(result._0).map_err(|_| eyre!("Project id out of range: {}", result._0))
    }

    async fn outbox_of(
        &self,
        chain_id: u64,
        sucker: Address,
        token: Address,
    ) -> Result<OutboxSnapshot> {
        let provider = self.provider(chain_id)?;
        let contract = Sucker::new(sucker, provider);
        let result = contract
            .outboxOf(token)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get outbox of {} for token {}: {}", sucker, token, e))?;

        let tree = result._0;
        Ok(OutboxSnapshot {
            nonce: tree.nonce,
            balance: tree.balance,
            tree_count: u64::try_from(tree.tree.count).unwrap_or(u64::MAX),
            number_of_claims_sent: u64::try_from(tree.numberOfClaimsSent).unwrap_or(u64::MAX),
        })
    }

    async fn is_sucker_of(
        &self,
        chain_id: u64,
        deployer: Address,
        sucker: Address,
    ) -> Result<bool> {
        let provider = self.provider(chain_id)?;
        let contract = SuckerDeployer::new(deployer, provider);
        let result = contract
            .isSucker(sucker)
            .call()
            .await
            .map_err(|e| eyre!("Deployer probe {} failed: {}", deployer, e))?;

        Ok(result._0)
    }

    async fn token_decimals(&self, chain_id: u64, token: Address) -> Result<u8> {
        let provider = self.provider(chain_id)?;
        let contract = ERC20::new(token, provider);
        let result = contract
            .decimals()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get decimals of {}: {}", token, e))?;

        Ok(result._0)
    }

    async fn erc20_balance(&self, chain_id: u64, token: Address, owner: Address) -> Result<U256> {
        let provider = self.provider(chain_id)?;
        let contract = ERC20::new(token, provider);
        let result = contract
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get balance of {}: {}", owner, e))?;

        Ok(result._0)
    }

    async fn erc20_allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256> {
        let provider = self.provider(chain_id)?;
        let contract = ERC20::new(token, provider);
        let result = contract
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get allowance: {}", e))?;

        Ok(result._0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_config(chain_id: u64, rpc_url: &str) -> ChainConfig {
        ChainConfig {
            chain_id,
            name: format!("chain_{}", chain_id),
            rpc_url: rpc_url.to_string(),
            registry_address: "0x0000000000000000000000000000000000000001".to_string(),
        }
    }

    #[test]
    fn test_new_builds_provider_per_chain() {
        let query = EvmChainQuery::new(&[
            chain_config(1, "http://localhost:8545"),
            chain_config(10, "http://localhost:8546"),
        ])
        .unwrap();
        assert!(query.provider(1).is_ok());
        assert!(query.provider(10).is_ok());
        assert!(query.provider(8453).is_err());
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        let result = EvmChainQuery::new(&[chain_config(1, "not a url")]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unknown_chain_is_an_error() {
        let query = EvmChainQuery::new(&[]).unwrap();
        let result = query.sucker_project_id(1, Address::ZERO).await;
        assert!(result.is_err());
    }
}
