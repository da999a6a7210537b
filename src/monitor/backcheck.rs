//! Trailing-window signature check

use crate::rpc::ChainRpc;

/// Signature counts over a trailing window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackCheck {
    /// Blocks in the window signed by the validator
    pub signed: u32,
    /// Heights that could not be fetched
    pub rpc_errors: u32,
    /// Window size minus failed heights
    pub effective_window: u32,
}

impl BackCheck {
    /// Fetched blocks the validator did not sign
    pub fn missed(&self) -> u32 {
        self.effective_window.saturating_sub(self.signed)
    }
}

/// Count signatures by `address` in `[height - window + 1, height]`
///
/// A failed height is left out of both counts, so partial RPC outages do not
/// read as missed blocks.
pub async fn back_check(
    rpc: &dyn ChainRpc,
    url: &str,
    address: &str,
    height: u64,
    window: u32,
) -> BackCheck {
    let mut result = BackCheck {
        effective_window: window,
        ..BackCheck::default()
    };

    for offset in (0..u64::from(window)).rev() {
        let Some(check_height) = height.checked_sub(offset).filter(|h| *h > 0) else {
            result.rpc_errors += 1;
            result.effective_window -= 1;
            continue;
        };

        match rpc.block_at(url, check_height).await {
            Ok(block) => {
                if block.signed_by(address) {
                    result.signed += 1;
                }
            }
            Err(e) => {
                tracing::debug!(url = %url, height = check_height, error = %e, "Block fetch failed");
                result.rpc_errors += 1;
                result.effective_window -= 1;
            }
        }
    }

    result
}
