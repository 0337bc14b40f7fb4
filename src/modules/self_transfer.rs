//! Lamport self-transfer: the cheapest possible on-chain action

use std::sync::Arc;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::system_instruction;
use tracing::debug;

use crate::retry::RetryPolicy;
use crate::wallet::Wallet;

use super::{send_instructions, spendable_balance, ModuleOutcome, WorkModule};

pub struct SelfTransferModule {
    rpc: Arc<RpcClient>,
    retry: RetryPolicy,
    lamports: u64,
    min_balance: u64,
}

impl SelfTransferModule {
    pub fn new(rpc: Arc<RpcClient>, retry: RetryPolicy, lamports: u64, min_balance: u64) -> Self {
        Self {
            rpc,
            retry,
            lamports,
            min_balance,
        }
    }
}

#[async_trait]
impl WorkModule for SelfTransferModule {
    fn name(&self) -> &'static str {
        "self-transfer"
    }

    fn description(&self) -> &'static str {
        "Transfer a few lamports from the wallet to itself"
    }

    async fn execute(&self, wallet: &Wallet) -> ModuleOutcome {
        let balance = match spendable_balance(&self.rpc, wallet, self.min_balance).await {
            Ok(balance) => balance,
            Err(outcome) => return outcome,
        };
        debug!(
            "Self-transfer for {} ({} lamports available)",
            wallet.name, balance
        );

        let ix = system_instruction::transfer(&wallet.pubkey(), &wallet.pubkey(), self.lamports);
        match send_instructions(&self.rpc, &self.retry, wallet, &[ix]).await {
            Ok(signature) => ModuleOutcome::Executed {
                signature: Some(signature),
            },
            Err(e) => ModuleOutcome::Failed {
                error: e.to_string(),
            },
        }
    }
}
