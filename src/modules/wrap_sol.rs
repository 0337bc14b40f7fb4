//! wSOL wrap/unwrap cycle in a single transaction
//!
//! Creates the wallet's native-mint ATA if missing, funds and syncs it,
//! then closes it again so the lamports return to the wallet.

use std::sync::Arc;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::system_instruction;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use spl_token::native_mint;

use crate::retry::RetryPolicy;
use crate::wallet::Wallet;

use super::{send_instructions, spendable_balance, ModuleOutcome, WorkModule};

pub struct WrapSolModule {
    rpc: Arc<RpcClient>,
    retry: RetryPolicy,
    lamports: u64,
    min_balance: u64,
}

impl WrapSolModule {
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
impl WorkModule for WrapSolModule {
    fn name(&self) -> &'static str {
        "wrap-sol"
    }

    fn description(&self) -> &'static str {
        "Wrap SOL into wSOL and unwrap it again"
    }

    async fn execute(&self, wallet: &Wallet) -> ModuleOutcome {
        let balance = match spendable_balance(&self.rpc, wallet, self.min_balance).await {
            Ok(balance) => balance,
            Err(outcome) => return outcome,
        };
        if balance < self.min_balance + self.lamports {
            return ModuleOutcome::Skipped {
                reason: format!(
                    "balance {} too low to wrap {} lamports",
                    balance, self.lamports
                ),
            };
        }

        let owner = wallet.pubkey();
        let ata = get_associated_token_address(&owner, &native_mint::id());

        let sync_ix = match spl_token::instruction::sync_native(&spl_token::id(), &ata) {
            Ok(ix) => ix,
            Err(e) => {
                return ModuleOutcome::Failed {
                    error: format!("sync_native build failed: {}", e),
                }
            }
        };
        let close_ix = match spl_token::instruction::close_account(
            &spl_token::id(),
            &ata,
            &owner,
            &owner,
            &[],
        ) {
            Ok(ix) => ix,
            Err(e) => {
                return ModuleOutcome::Failed {
                    error: format!("close_account build failed: {}", e),
                }
            }
        };

        let instructions = vec![
            create_associated_token_account_idempotent(
                &owner,
                &owner,
                &native_mint::id(),
                &spl_token::id(),
            ),
            system_instruction::transfer(&owner, &ata, self.lamports),
            sync_ix,
            close_ix,
        ];

        match send_instructions(&self.rpc, &self.retry, wallet, &instructions).await {
            Ok(signature) => ModuleOutcome::Executed {
                signature: Some(signature),
            },
            Err(e) => ModuleOutcome::Failed {
                error: e.to_string(),
            },
        }
    }
}
