//! Admission gate: pause rounds while acting is too expensive
//!
//! The fee gate samples recent prioritization fees over RPC and compares
//! the median against a configured ceiling. Gate failures always fail open:
//! a broken fee feed must never stall the scheduler indefinitely.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use tracing::{debug, info, warn};

use crate::config::FeeGateConfig;
use crate::error::{Error, Result};

/// Backpressure signal consumed by the round scheduler
#[async_trait]
pub trait AdmissionGate: Send + Sync {
    /// One-shot probe: is the cost to act currently above the ceiling?
    async fn is_too_expensive(&self) -> Result<bool>;

    /// Block, polling on this gate's own cadence, until the cost is
    /// acceptable again. Errors while waiting fail open.
    async fn wait_until_acceptable(&self);
}

/// Priority-fee gate over Solana RPC
pub struct PriorityFeeGate {
    rpc: Arc<RpcClient>,
    config: FeeGateConfig,
}

impl PriorityFeeGate {
    pub fn new(rpc: Arc<RpcClient>, config: FeeGateConfig) -> Self {
        Self { rpc, config }
    }

    /// Median recent prioritization fee in micro-lamports
    pub async fn sample_fee(&self) -> Result<u64> {
        let fees = self
            .rpc
            .get_recent_prioritization_fees(&[])
            .await
            .map_err(|e| Error::FeeGate(e.to_string()))?;

        let samples: Vec<u64> = fees.iter().map(|f| f.prioritization_fee).collect();
        Ok(median(samples))
    }
}

#[async_trait]
impl AdmissionGate for PriorityFeeGate {
    async fn is_too_expensive(&self) -> Result<bool> {
        let fee = self.sample_fee().await?;
        debug!(
            "Median prioritization fee: {} micro-lamports (ceiling {})",
            fee, self.config.max_priority_fee_micro_lamports
        );
        Ok(fee > self.config.max_priority_fee_micro_lamports)
    }

    async fn wait_until_acceptable(&self) {
        let interval = Duration::from_secs(self.config.poll_interval_secs);
        loop {
            tokio::time::sleep(interval).await;

            match self.is_too_expensive().await {
                Ok(false) => {
                    info!("Prioritization fees back under ceiling, resuming");
                    return;
                }
                Ok(true) => {
                    info!(
                        "Fees still above {} micro-lamports, waiting {}s",
                        self.config.max_priority_fee_micro_lamports,
                        self.config.poll_interval_secs
                    );
                }
                Err(e) => {
                    warn!("Fee gate probe failed while waiting: {} (failing open)", e);
                    return;
                }
            }
        }
    }
}

fn median(mut samples: Vec<u64>) -> u64 {
    if samples.is_empty() {
        return 0;
    }
    samples.sort_unstable();
    samples[samples.len() / 2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_of_empty_is_zero() {
        assert_eq!(median(vec![]), 0);
    }

    #[test]
    fn test_median_picks_middle() {
        assert_eq!(median(vec![5, 1, 9]), 5);
        assert_eq!(median(vec![10, 0]), 10);
        assert_eq!(median(vec![3]), 3);
    }
}
