pub mod client;
pub mod types;

pub use client::{ChainRpc, RpcClient, RpcError, RPC_TIMEOUT};
pub use types::BlockSample;
