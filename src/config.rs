//! Monitor configuration
//!
//! Loaded from environment variables (with optional .env file). Chains are
//! declared with the counted env-var pattern: `CHAINS_COUNT=2`,
//! `CHAIN_1_CHAIN_ID=...`, `CHAIN_1_RPC_URL=...`, and so on.

#![allow(dead_code)]

use alloy::primitives::Address;
use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::classifier::{default_mappings, BridgeKind, BridgeProfile, DeployerMapping};
use crate::reconciler::ReconcilerConfig;

/// Main configuration for the monitor
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub chains: Vec<ChainConfig>,
    pub backend: BackendConfig,
    pub reconciler: ReconcilerConfig,
    /// Profile applied to suckers no known deployer claims. Product policy,
    /// kept configurable so it can be tuned without code changes.
    pub unknown_bridge: BridgeProfile,
    /// Deployer probe table; defaults to the known production deployments
    #[serde(skip)]
    pub deployers: Vec<DeployerMapping>,
    pub server_port: u16,
}

/// Database configuration
#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Custom Debug that redacts the database URL (may contain credentials).
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .finish()
    }
}

/// One chain the monitor can read
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Human-readable name (e.g., "ethereum", "base")
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    /// Sucker registry contract on this chain
    pub registry_address: String,
}

impl ChainConfig {
    pub fn registry(&self) -> Result<Address> {
        Address::from_str(&self.registry_address)
            .map_err(|e| eyre!("Invalid registry address for chain {}: {}", self.chain_id, e))
    }
}

/// Claims backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
}

fn default_server_port() -> u16 {
    9090
}

fn default_unknown_bridge() -> BridgeProfile {
    BridgeProfile {
        requires_payment: true,
        has_extra_steps: true,
        estimated_minutes: 10_080,
    }
}

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env").or_else(|_| Self::load_from_env())
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    fn load_from_env() -> Result<Self> {
        let database = DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| eyre!("DATABASE_URL environment variable is required"))?,
        };

        let backend = BackendConfig {
            base_url: env::var("CLAIMS_BACKEND_URL")
                .map_err(|_| eyre!("CLAIMS_BACKEND_URL environment variable is required"))?,
        };

        let chains = load_chains_from_env()?;

        let defaults = ReconcilerConfig::default();
        let reconciler = ReconcilerConfig {
            sweep_interval_secs: env_or("SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs),
            fast_path_interval_secs: env_or(
                "FAST_PATH_INTERVAL_SECS",
                defaults.fast_path_interval_secs,
            ),
            outbox_ttl_secs: env_or("OUTBOX_TTL_SECS", defaults.outbox_ttl_secs),
            backend_min_interval_secs: env_or(
                "BACKEND_MIN_INTERVAL_SECS",
                defaults.backend_min_interval_secs,
            ),
        };

        let unknown_defaults = default_unknown_bridge();
        let unknown_bridge = BridgeProfile {
            requires_payment: env_or(
                "UNKNOWN_BRIDGE_REQUIRES_PAYMENT",
                unknown_defaults.requires_payment,
            ),
            has_extra_steps: env_or(
                "UNKNOWN_BRIDGE_HAS_EXTRA_STEPS",
                unknown_defaults.has_extra_steps,
            ),
            estimated_minutes: env_or(
                "UNKNOWN_BRIDGE_ESTIMATED_MINUTES",
                unknown_defaults.estimated_minutes,
            ),
        };

        let deployers = match env::var("SUCKER_DEPLOYERS") {
            Ok(raw) => parse_deployers(&raw)?,
            Err(_) => default_mappings(),
        };

        let config = Config {
            database,
            chains,
            backend,
            reconciler,
            unknown_bridge,
            deployers,
            server_port: env_or("SERVER_PORT", default_server_port()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Registry contract per configured chain
    pub fn registries(&self) -> Result<HashMap<u64, Address>> {
        self.chains
            .iter()
            .map(|c| Ok((c.chain_id, c.registry()?)))
            .collect()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(eyre!("database.url cannot be empty"));
        }

        if self.backend.base_url.is_empty() {
            return Err(eyre!("backend.base_url cannot be empty"));
        }
        if !self.backend.base_url.starts_with("http") {
            return Err(eyre!("backend.base_url must be an http(s) URL"));
        }

        if self.chains.is_empty() {
            return Err(eyre!("At least one chain must be configured"));
        }
        let mut seen_ids = std::collections::HashSet::new();
        for chain in &self.chains {
            if !seen_ids.insert(chain.chain_id) {
                return Err(eyre!("Duplicate chain ID: {}", chain.chain_id));
            }
            if chain.rpc_url.is_empty() {
                return Err(eyre!("rpc_url cannot be empty for chain {}", chain.chain_id));
            }
            if chain.registry_address.len() != 42 || !chain.registry_address.starts_with("0x") {
                return Err(eyre!(
                    "registry_address for chain {} must be a valid hex address (42 chars with 0x prefix)",
                    chain.chain_id
                ));
            }
        }

        if self.reconciler.sweep_interval_secs == 0 || self.reconciler.fast_path_interval_secs == 0
        {
            return Err(eyre!("Reconciler intervals must be non-zero"));
        }

        if self.unknown_bridge.estimated_minutes == 0 {
            return Err(eyre!("unknown_bridge.estimated_minutes must be non-zero"));
        }

        Ok(())
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn load_chains_from_env() -> Result<Vec<ChainConfig>> {
    let count: usize = env::var("CHAINS_COUNT")
        .map_err(|_| eyre!("CHAINS_COUNT environment variable is required"))?
        .parse()
        .map_err(|_| eyre!("CHAINS_COUNT must be a number"))?;

    let mut chains = Vec::with_capacity(count);
    for i in 1..=count {
        let prefix = format!("CHAIN_{}", i);

        let chain_id: u64 = env::var(format!("{}_CHAIN_ID", prefix))
            .map_err(|_| eyre!("Missing {}_CHAIN_ID", prefix))?
            .parse()
            .map_err(|_| eyre!("Invalid {}_CHAIN_ID", prefix))?;

        let name =
            env::var(format!("{}_NAME", prefix)).unwrap_or_else(|_| format!("chain_{}", chain_id));

        let rpc_url = env::var(format!("{}_RPC_URL", prefix))
            .map_err(|_| eyre!("Missing {}_RPC_URL", prefix))?;

        let registry_address = env::var(format!("{}_REGISTRY_ADDRESS", prefix))
            .map_err(|_| eyre!("Missing {}_REGISTRY_ADDRESS", prefix))?;

        chains.push(ChainConfig {
            name,
            chain_id,
            rpc_url,
            registry_address,
        });
    }
    Ok(chains)
}

/// Parse a deployer table from `"chain:0xaddress:kind"` entries separated
/// by commas, e.g. `"1:0xabc...def:optimism,8453:0x123...456:ccip"`.
fn parse_deployers(raw: &str) -> Result<Vec<DeployerMapping>> {
    let mut mappings = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let parts: Vec<&str> = entry.split(':').collect();
        if parts.len() != 3 {
            return Err(eyre!(
                "Invalid SUCKER_DEPLOYERS entry (want chain:address:kind): {}",
                entry
            ));
        }
        mappings.push(DeployerMapping {
            chain_id: parts[0]
                .parse()
                .map_err(|_| eyre!("Invalid chain id in SUCKER_DEPLOYERS: {}", parts[0]))?,
            deployer: Address::from_str(parts[1])
                .map_err(|e| eyre!("Invalid deployer address {}: {}", parts[1], e))?,
            kind: BridgeKind::parse(parts[2])?,
        });
    }
    if mappings.is_empty() {
        return Err(eyre!("SUCKER_DEPLOYERS is set but contains no entries"));
    }
    Ok(mappings)
}
