//! Aggregator token swap via the Jupiter HTTP API
//!
//! The aggregator rate-limits aggressively on the free tier, so this module
//! declares a warm-up delay; the dispatcher sleeps that long inside the
//! slot's task before calling here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::transaction::VersionedTransaction;
use tracing::debug;

use crate::config::SwapConfig;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::wallet::Wallet;

use super::{spendable_balance, ModuleOutcome, WorkModule};

#[derive(Debug, Deserialize)]
struct SwapResponse {
    #[serde(rename = "swapTransaction")]
    swap_transaction: String,
}

pub struct AggregatorSwapModule {
    rpc: Arc<RpcClient>,
    http: reqwest::Client,
    retry: RetryPolicy,
    config: SwapConfig,
    min_balance: u64,
}

impl AggregatorSwapModule {
    pub fn new(
        rpc: Arc<RpcClient>,
        http: reqwest::Client,
        retry: RetryPolicy,
        config: SwapConfig,
        min_balance: u64,
    ) -> Self {
        Self {
            rpc,
            http,
            retry,
            config,
            min_balance,
        }
    }

    async fn fetch_quote(&self) -> Result<serde_json::Value> {
        let url = format!(
            "{}/quote?inputMint={}&outputMint={}&amount={}&slippageBps={}",
            self.config.api_url,
            self.config.input_mint,
            self.config.output_mint,
            self.config.amount,
            self.config.slippage_bps
        );

        self.retry
            .run("aggregator_quote", || async {
                let response = self.http.get(&url).send().await?;
                if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    return Err(Error::AggregatorRateLimited("quote".to_string()));
                }
                if !response.status().is_success() {
                    return Err(Error::Aggregator(format!(
                        "quote returned {}",
                        response.status()
                    )));
                }
                Ok(response.json::<serde_json::Value>().await?)
            })
            .await
    }

    async fn fetch_swap_transaction(
        &self,
        quote: &serde_json::Value,
        wallet: &Wallet,
    ) -> Result<VersionedTransaction> {
        let body = serde_json::json!({
            "quoteResponse": quote,
            "userPublicKey": wallet.address(),
            "wrapAndUnwrapSol": true,
        });

        let response = self
            .retry
            .run("aggregator_swap", || async {
                let response = self
                    .http
                    .post(format!("{}/swap", self.config.api_url))
                    .json(&body)
                    .send()
                    .await?;
                if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    return Err(Error::AggregatorRateLimited("swap".to_string()));
                }
                if !response.status().is_success() {
                    return Err(Error::Aggregator(format!(
                        "swap returned {}",
                        response.status()
                    )));
                }
                Ok(response.json::<SwapResponse>().await?)
            })
            .await?;

        let tx_bytes = BASE64
            .decode(&response.swap_transaction)
            .map_err(|e| Error::Aggregator(format!("invalid swap transaction: {}", e)))?;
        let unsigned: VersionedTransaction = bincode::deserialize(&tx_bytes)
            .map_err(|e| Error::Aggregator(format!("undecodable swap transaction: {}", e)))?;

        VersionedTransaction::try_new(unsigned.message, &[wallet.keypair.as_ref()])
            .map_err(|e| Error::TransactionBuild(format!("swap signing failed: {}", e)))
    }
}

#[async_trait]
impl WorkModule for AggregatorSwapModule {
    fn name(&self) -> &'static str {
        "aggregator-swap"
    }

    fn description(&self) -> &'static str {
        "Swap a small amount through the aggregator"
    }

    fn warmup_delay(&self) -> Option<Duration> {
        Some(Duration::from_millis(self.config.warmup_delay_ms))
    }

    async fn execute(&self, wallet: &Wallet) -> ModuleOutcome {
        if let Err(outcome) = spendable_balance(&self.rpc, wallet, self.min_balance).await {
            return outcome;
        }

        let quote = match self.fetch_quote().await {
            Ok(quote) => quote,
            Err(e) => {
                return ModuleOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        // The aggregator reports unroutable pairs inside a 200 response
        if quote.get("routePlan").map(|r| r.as_array().map_or(true, |a| a.is_empty())).unwrap_or(true) {
            return ModuleOutcome::Skipped {
                reason: "no route for configured pair".to_string(),
            };
        }

        let tx = match self.fetch_swap_transaction(&quote, wallet).await {
            Ok(tx) => tx,
            Err(e) => {
                return ModuleOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        match self
            .retry
            .run("send_swap", || async {
                self.rpc
                    .send_transaction(&tx)
                    .await
                    .map_err(|e| Error::TransactionSend(e.to_string()))
            })
            .await
        {
            Ok(signature) => {
                debug!("Swap sent for {}: {}", wallet.name, signature);
                ModuleOutcome::Executed {
                    signature: Some(signature.to_string()),
                }
            }
            Err(e) => ModuleOutcome::Failed {
                error: e.to_string(),
            },
        }
    }
}
