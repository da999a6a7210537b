//! RPC endpoint selection
//!
//! Endpoints are drawn uniformly at random without replacement, so load is
//! spread across healthy nodes and a pass over N endpoints makes at most N
//! requests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::rpc::{BlockSample, ChainRpc, RpcError};

/// Endpoint that answered for the expected chain, with its latest block
#[derive(Debug, Clone)]
pub struct Selection {
    pub url: String,
    pub latest: BlockSample,
}

/// Pick a working endpoint for `chain_id`
pub async fn select(
    rpc: &dyn ChainRpc,
    chain_id: &str,
    endpoints: &[String],
) -> Result<Selection, SelectError> {
    select_with(rpc, chain_id, endpoints, &mut StdRng::from_entropy()).await
}

/// Same as [`select`] with a caller-provided random source
pub async fn select_with<R: Rng + Send>(
    rpc: &dyn ChainRpc,
    chain_id: &str,
    endpoints: &[String],
    rng: &mut R,
) -> Result<Selection, SelectError> {
    match endpoints {
        [] => Err(SelectError::NoEndpoints),
        [url] => match probe(rpc, chain_id, url).await {
            Ok(latest) => Ok(Selection {
                url: url.clone(),
                latest,
            }),
            Err(e) => {
                tracing::warn!(chain_id = %chain_id, url = %url, error = %e, "Endpoint unusable");
                Err(SelectError::RpcUnavailable {
                    url: url.clone(),
                    reason: e.to_string(),
                })
            }
        },
        _ => {
            let mut candidates: Vec<&String> = endpoints.iter().collect();
            while !candidates.is_empty() {
                let url = candidates.swap_remove(rng.gen_range(0..candidates.len()));
                match probe(rpc, chain_id, url).await {
                    Ok(latest) => {
                        return Ok(Selection {
                            url: url.clone(),
                            latest,
                        })
                    }
                    Err(e) => {
                        tracing::warn!(
                            chain_id = %chain_id,
                            url = %url,
                            error = %e,
                            remaining = candidates.len(),
                            "Endpoint excluded"
                        );
                    }
                }
            }
            Err(SelectError::NoEndpoints)
        }
    }
}

async fn probe(rpc: &dyn ChainRpc, chain_id: &str, url: &str) -> Result<BlockSample, ProbeError> {
    let latest = rpc.latest_block(url).await?;
    if latest.chain_id != chain_id {
        return Err(ProbeError::ChainMismatch {
            expected: chain_id.to_string(),
            found: latest.chain_id,
        });
    }
    Ok(latest)
}

#[derive(Debug, thiserror::Error)]
enum ProbeError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("chain id mismatch: expected {expected}, found {found}")]
    ChainMismatch { expected: String, found: String },
}

/// Endpoint selection errors
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error("No endpoints available")]
    NoEndpoints,

    /// The only configured endpoint is down or serves another chain
    #[error("RPC {url} unavailable: {reason}")]
    RpcUnavailable { url: String, reason: String },
}
