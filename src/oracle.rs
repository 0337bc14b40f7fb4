//! Activity oracle: which wallets still need work today
//!
//! The RPC implementation scans recent signatures per wallet and counts
//! successful transactions in the current UTC day. Lookups are rate limited
//! upstream, so callers probe in bounded batches (see the selector).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_response::RpcConfirmedTransactionStatusWithSignature;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::config::OracleConfig;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Classification of one probe batch
#[derive(Debug, Clone, Default)]
pub struct BatchActivity {
    /// Still eligible for work today
    pub active: Vec<Pubkey>,
    /// Already reached the daily target
    pub completed: Vec<Pubkey>,
}

/// Classifies accounts as still-eligible vs already-complete
#[async_trait]
pub trait ActivityOracle: Send + Sync {
    async fn check_batch(&self, accounts: &[Pubkey]) -> Result<BatchActivity>;
}

/// RPC-backed oracle using signature history
pub struct RpcActivityOracle {
    rpc: Arc<RpcClient>,
    config: OracleConfig,
    retry: RetryPolicy,
}

impl RpcActivityOracle {
    pub fn new(rpc: Arc<RpcClient>, config: OracleConfig, retry: RetryPolicy) -> Self {
        Self { rpc, config, retry }
    }

    /// Count today's successful transactions for one wallet
    async fn completed_today(&self, account: &Pubkey) -> Result<bool> {
        let signatures = self
            .retry
            .run("get_signatures_for_address", || async {
                self.rpc
                    .get_signatures_for_address_with_config(
                        account,
                        GetConfirmedSignaturesForAddress2Config {
                            before: None,
                            until: None,
                            limit: Some(self.config.signature_scan_limit),
                            commitment: Some(CommitmentConfig::confirmed()),
                        },
                    )
                    .await
                    .map_err(|e| Error::Oracle(e.to_string()))
            })
            .await?;

        let today = Utc::now().date_naive();
        let count = count_successes_on(&signatures, today);
        debug!(
            "Account {} has {} successful txs today (target {})",
            account, count, self.config.target_daily_actions
        );
        Ok(count >= self.config.target_daily_actions)
    }
}

#[async_trait]
impl ActivityOracle for RpcActivityOracle {
    /// Check a batch concurrently. A failed lookup classifies the wallet as
    /// active: better to do redundant work than to silently drop a wallet.
    async fn check_batch(&self, accounts: &[Pubkey]) -> Result<BatchActivity> {
        let checks = accounts.iter().map(|account| async move {
            (*account, self.completed_today(account).await)
        });

        let mut batch = BatchActivity::default();
        for (account, result) in join_all(checks).await {
            match result {
                Ok(true) => batch.completed.push(account),
                Ok(false) => batch.active.push(account),
                Err(e) => {
                    warn!("Oracle lookup failed for {}: {} (treating as active)", account, e);
                    batch.active.push(account);
                }
            }
        }
        Ok(batch)
    }
}

/// Successful transactions whose block time falls on `day` (UTC)
fn count_successes_on(
    signatures: &[RpcConfirmedTransactionStatusWithSignature],
    day: NaiveDate,
) -> usize {
    signatures
        .iter()
        .filter(|status| status.err.is_none())
        .filter(|status| {
            status
                .block_time
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .map(|dt| dt.date_naive() == day)
                .unwrap_or(false)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(
        err: Option<solana_sdk::transaction::TransactionError>,
        block_time: Option<i64>,
    ) -> RpcConfirmedTransactionStatusWithSignature {
        RpcConfirmedTransactionStatusWithSignature {
            signature: String::new(),
            slot: 0,
            err,
            memo: None,
            block_time,
            confirmation_status: None,
        }
    }

    #[test]
    fn test_counts_only_todays_successes() {
        let day = NaiveDate::from_ymd_opt(2026, 8, 4).unwrap();
        let midday = day.and_hms_opt(12, 0, 0).unwrap().and_utc().timestamp();
        let yesterday = midday - 86_400;

        let signatures = vec![
            status(None, Some(midday)),
            status(None, Some(yesterday)),
            status(
                Some(solana_sdk::transaction::TransactionError::AccountNotFound),
                Some(midday),
            ),
            status(None, None),
        ];

        assert_eq!(count_successes_on(&signatures, day), 1);
    }
}
