//! On-chain memo via the SPL Memo program

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;

use crate::retry::RetryPolicy;
use crate::wallet::Wallet;

use super::{send_instructions, spendable_balance, ModuleOutcome, WorkModule};

const MEMO_PROGRAM_ID: &str = "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr";

pub struct MemoModule {
    rpc: Arc<RpcClient>,
    retry: RetryPolicy,
    text: String,
    min_balance: u64,
}

impl MemoModule {
    pub fn new(rpc: Arc<RpcClient>, retry: RetryPolicy, text: String, min_balance: u64) -> Self {
        Self {
            rpc,
            retry,
            text,
            min_balance,
        }
    }
}

#[async_trait]
impl WorkModule for MemoModule {
    fn name(&self) -> &'static str {
        "memo"
    }

    fn description(&self) -> &'static str {
        "Post a short memo signed by the wallet"
    }

    async fn execute(&self, wallet: &Wallet) -> ModuleOutcome {
        if let Err(outcome) = spendable_balance(&self.rpc, wallet, self.min_balance).await {
            return outcome;
        }

        let program_id = match Pubkey::from_str(MEMO_PROGRAM_ID) {
            Ok(id) => id,
            Err(e) => {
                return ModuleOutcome::Failed {
                    error: format!("bad memo program id: {}", e),
                }
            }
        };

        let ix = Instruction {
            program_id,
            accounts: vec![AccountMeta::new_readonly(wallet.pubkey(), true)],
            data: self.text.as_bytes().to_vec(),
        };

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
