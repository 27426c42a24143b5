//! Claims backend client
//!
//! The destination side of a transfer is proven by merkle claim records
//! served over HTTP. `ClaimsBackend` is the collaborator interface; the
//! production implementation posts `POST {base}/claims` and maps the
//! backend's PascalCase payload into domain types. Records that cannot be
//! parsed are logged and dropped rather than failing the whole response.

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::proof::RawProofElement;
use crate::types::{parse_u256, ClaimLeaf, ClaimRecord};

/// Claims request timeout; failures resolve to "no change this cycle"
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("claims request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("claims backend returned HTTP {0}")]
    Status(u16),
}

/// Destination-side claim lookup.
#[async_trait]
pub trait ClaimsBackend: Send + Sync {
    /// All claim records for (chain, sucker, token, beneficiary)
    async fn claims(
        &self,
        chain_id: u64,
        sucker: Address,
        token: Address,
        beneficiary: Address,
    ) -> Result<Vec<ClaimRecord>, BackendError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClaimsRequest {
    chain_id: u64,
    sucker: String,
    token: String,
    beneficiary: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ClaimRecordDto {
    token: String,
    leaf: ClaimLeafDto,
    proof: Vec<RawProofElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ClaimLeafDto {
    index: u64,
    beneficiary: String,
    project_token_count: String,
    terminal_token_amount: String,
}

/// HTTP client for the claims backend.
pub struct HttpClaimsBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClaimsBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ClaimsBackend for HttpClaimsBackend {
    async fn claims(
        &self,
        chain_id: u64,
        sucker: Address,
        token: Address,
        beneficiary: Address,
    ) -> Result<Vec<ClaimRecord>, BackendError> {
        let request = ClaimsRequest {
            chain_id,
            sucker: format!("0x{}", hex::encode(sucker.as_slice())),
            token: format!("0x{}", hex::encode(token.as_slice())),
            beneficiary: format!("0x{}", hex::encode(beneficiary.as_slice())),
        };

        let response = self
            .client
            .post(format!("{}/claims", self.base_url))
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackendError::Status(response.status().as_u16()));
        }

        let records: Vec<ClaimRecordDto> = response.json().await?;

        let mut claims = Vec::with_capacity(records.len());
        for dto in records {
            match parse_record(&dto) {
                Ok(record) => claims.push(record),
                Err(e) => {
                    tracing::warn!(
                        chain_id,
                        index = dto.leaf.index,
                        error = %e,
                        "Dropping unparseable claim record"
                    );
                }
            }
        }
        Ok(claims)
    }
}

fn parse_record(dto: &ClaimRecordDto) -> eyre::Result<ClaimRecord> {
    Ok(ClaimRecord {
        token: Address::from_str(&dto.token)?,
        leaf: ClaimLeaf {
            index: dto.leaf.index,
            beneficiary: Address::from_str(&dto.leaf.beneficiary)?,
            project_token_amount: parse_u256(&dto.leaf.project_token_count)?,
            terminal_token_amount: parse_u256(&dto.leaf.terminal_token_amount)?,
        },
        proof: dto.proof.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    #[test]
    fn test_parse_record_pascal_case_payload() {
        let json = r#"{
            "Token": "0x00000000000000000000000000000000000000aa",
            "Leaf": {
                "Index": 3,
                "Beneficiary": "0x00000000000000000000000000000000000000bb",
                "ProjectTokenCount": "1000",
                "TerminalTokenAmount": "0xff"
            },
            "Proof": ["0x01", [222, 173]]
        }"#;
        let dto: ClaimRecordDto = serde_json::from_str(json).unwrap();
        let record = parse_record(&dto).unwrap();
        assert_eq!(record.leaf.index, 3);
        assert_eq!(record.leaf.project_token_amount, U256::from(1000u64));
        assert_eq!(record.leaf.terminal_token_amount, U256::from(255u64));
        assert_eq!(record.proof.len(), 2);
        assert_eq!(record.proof[1], RawProofElement::Bytes(vec![222, 173]));
    }

    #[test]
    fn test_parse_record_rejects_bad_address() {
        let json = r#"{
            "Token": "not-an-address",
            "Leaf": {
                "Index": 0,
                "Beneficiary": "0x00000000000000000000000000000000000000bb",
                "ProjectTokenCount": "0",
                "TerminalTokenAmount": "0"
            },
            "Proof": []
        }"#;
        let dto: ClaimRecordDto = serde_json::from_str(json).unwrap();
        assert!(parse_record(&dto).is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = HttpClaimsBackend::new("http://localhost:3000/");
        assert_eq!(backend.base_url, "http://localhost:3000");
    }
}
