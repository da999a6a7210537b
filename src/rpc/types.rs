//! CometBFT `/block` response types

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::client::RpcError;

/// One fetched block, reduced to what liveness checks need
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSample {
    pub height: u64,
    pub chain_id: String,
    pub time: DateTime<Utc>,
    /// Validator addresses found in the block's commit signatures
    pub signers: HashSet<String>,
}

impl BlockSample {
    /// Whether `address` signed this block
    pub fn signed_by(&self, address: &str) -> bool {
        self.signers.contains(address)
    }
}

/// JSON-RPC envelope returned by `/block`
#[derive(Debug, Deserialize)]
pub struct BlockResponse {
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub result: Option<BlockResult>,
}

#[derive(Debug, Deserialize)]
pub struct BlockResult {
    pub block: Block,
}

#[derive(Debug, Deserialize)]
pub struct Block {
    pub header: Header,
    #[serde(default)]
    pub last_commit: Option<LastCommit>,
}

#[derive(Debug, Deserialize)]
pub struct Header {
    pub chain_id: String,
    pub height: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LastCommit {
    #[serde(default)]
    pub signatures: Vec<Signature>,
}

#[derive(Debug, Deserialize)]
pub struct Signature {
    #[serde(default)]
    pub validator_address: Option<String>,
}

impl TryFrom<BlockResponse> for BlockSample {
    type Error = RpcError;

    fn try_from(response: BlockResponse) -> Result<Self, Self::Error> {
        if let Some(error) = response.error.filter(|e| !e.is_null()) {
            return Err(RpcError::Node(error.to_string()));
        }

        let block = response
            .result
            .ok_or_else(|| RpcError::Decode("response has no result".to_string()))?
            .block;

        let height = block
            .header
            .height
            .parse::<u64>()
            .map_err(|e| RpcError::Decode(format!("invalid height {:?}: {}", block.header.height, e)))?;

        let signers = block
            .last_commit
            .unwrap_or_default()
            .signatures
            .into_iter()
            .filter_map(|sig| sig.validator_address)
            .filter(|addr| !addr.is_empty())
            .collect();

        Ok(BlockSample {
            height,
            chain_id: block.header.chain_id,
            time: block.header.time,
            signers,
        })
    }
}
