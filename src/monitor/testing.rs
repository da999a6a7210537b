//! Scripted chain used by monitor tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::rpc::{BlockSample, ChainRpc, RpcError};

/// In-memory chain with a fixed head, per-height signers and injected failures
pub struct ScriptedRpc {
    chain_id: String,
    head: u64,
    head_time: DateTime<Utc>,
    signers: HashMap<u64, HashSet<String>>,
    failing: HashSet<u64>,
    down: HashSet<String>,
    latest_calls: AtomicUsize,
    fetched: Mutex<Vec<u64>>,
}

impl ScriptedRpc {
    pub fn new(chain_id: &str, head: u64) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            head,
            head_time: Utc::now(),
            signers: HashMap::new(),
            failing: HashSet::new(),
            down: HashSet::new(),
            latest_calls: AtomicUsize::new(0),
            fetched: Mutex::new(Vec::new()),
        }
    }

    /// `address` signs every height in `heights`
    pub fn signing(mut self, address: &str, heights: impl IntoIterator<Item = u64>) -> Self {
        for height in heights {
            self.signers
                .entry(height)
                .or_default()
                .insert(address.to_string());
        }
        self
    }

    pub fn failing_heights(mut self, heights: impl IntoIterator<Item = u64>) -> Self {
        self.failing.extend(heights);
        self
    }

    /// Every call to `url` fails with a transport error
    pub fn with_down(mut self, url: &str) -> Self {
        self.down.insert(url.to_string());
        self
    }

    pub fn with_head_time(mut self, time: DateTime<Utc>) -> Self {
        self.head_time = time;
        self
    }

    pub fn latest_calls(&self) -> usize {
        self.latest_calls.load(Ordering::SeqCst)
    }

    pub fn fetched_heights(&self) -> Vec<u64> {
        self.fetched.lock().clone()
    }

    fn sample(&self, height: u64) -> BlockSample {
        BlockSample {
            height,
            chain_id: self.chain_id.clone(),
            time: self.head_time,
            signers: self.signers.get(&height).cloned().unwrap_or_default(),
        }
    }

    fn check_up(&self, url: &str) -> Result<(), RpcError> {
        if self.down.contains(url) {
            return Err(RpcError::Transport(format!("{} unreachable", url)));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainRpc for ScriptedRpc {
    async fn latest_block(&self, url: &str) -> Result<BlockSample, RpcError> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        self.check_up(url)?;
        Ok(self.sample(self.head))
    }

    async fn block_at(&self, url: &str, height: u64) -> Result<BlockSample, RpcError> {
        self.fetched.lock().push(height);
        self.check_up(url)?;
        if self.failing.contains(&height) || height > self.head {
            return Err(RpcError::Node(format!("height {} is not available", height)));
        }
        Ok(self.sample(height))
    }
}
