use std::time::Duration;

use async_trait::async_trait;

use super::types::{BlockResponse, BlockSample};

/// Per-request timeout for RPC calls
pub const RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of chain blocks
///
/// Calls are never retried here; the poll loop cadence is the retry.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Fetch the latest block from `url`
    async fn latest_block(&self, url: &str) -> Result<BlockSample, RpcError>;

    /// Fetch the block at `height` from `url`
    async fn block_at(&self, url: &str, height: u64) -> Result<BlockSample, RpcError>;
}

/// HTTP client for CometBFT RPC endpoints
#[derive(Debug, Clone)]
pub struct RpcClient {
    http_client: reqwest::Client,
}

impl RpcClient {
    pub fn new() -> Result<Self, RpcError> {
        Self::with_timeout(RPC_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, RpcError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        Ok(Self { http_client })
    }

    async fn get_block(&self, url: &str) -> Result<BlockSample, RpcError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let body: BlockResponse = response
            .json()
            .await
            .map_err(|e| RpcError::Decode(e.to_string()))?;

        BlockSample::try_from(body)
    }
}

#[async_trait]
impl ChainRpc for RpcClient {
    async fn latest_block(&self, url: &str) -> Result<BlockSample, RpcError> {
        self.get_block(&format!("{}/block", url.trim_end_matches('/')))
            .await
    }

    async fn block_at(&self, url: &str, height: u64) -> Result<BlockSample, RpcError> {
        self.get_block(&format!(
            "{}/block?height={}",
            url.trim_end_matches('/'),
            height
        ))
        .await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Node error: {0}")]
    Node(String),
}
