//! Work modules: self-contained on-chain actions executed by one wallet
//!
//! Each module is stateless between calls and reports business conditions
//! ("balance too low", "no route") as outcomes, never as errors. The
//! registry is fixed at startup; the exclusion set filters it at read time
//! and can never disable everything.

pub mod memo;
pub mod self_transfer;
pub mod swap;
pub mod wrap_sol;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::instruction::Instruction;
use solana_sdk::transaction::Transaction;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::wallet::Wallet;

pub use memo::MemoModule;
pub use self_transfer::SelfTransferModule;
pub use swap::AggregatorSwapModule;
pub use wrap_sol::WrapSolModule;

/// Terminal states a module reports back to the dispatcher
#[derive(Debug, Clone)]
pub enum ModuleOutcome {
    /// An on-chain action happened
    Executed { signature: Option<String> },
    /// Nothing to do for this wallet right now; not a failure
    Skipped { reason: String },
    /// The action was attempted and failed
    Failed { error: String },
}

/// One unit of work executable against a single wallet
#[async_trait]
pub trait WorkModule: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Delay before this module's first upstream call in a round. Used by
    /// rate-limit-sensitive modules; the dispatcher applies it inside the
    /// slot's own task so sibling slots are not held up.
    fn warmup_delay(&self) -> Option<Duration> {
        None
    }

    async fn execute(&self, wallet: &Wallet) -> ModuleOutcome;
}

/// Fixed module list plus a runtime exclusion set
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn WorkModule>>,
    excluded: HashSet<String>,
}

impl ModuleRegistry {
    pub fn new(modules: Vec<Arc<dyn WorkModule>>) -> Result<Self> {
        if modules.is_empty() {
            return Err(Error::EmptyModuleSet(0));
        }
        Ok(Self {
            modules,
            excluded: HashSet::new(),
        })
    }

    pub fn all(&self) -> &[Arc<dyn WorkModule>] {
        &self.modules
    }

    /// Modules with the exclusion set applied; never empty by invariant
    pub fn enabled(&self) -> Vec<Arc<dyn WorkModule>> {
        self.modules
            .iter()
            .filter(|m| !self.excluded.contains(m.name()))
            .cloned()
            .collect()
    }

    pub fn enabled_count(&self) -> usize {
        self.modules
            .iter()
            .filter(|m| !self.excluded.contains(m.name()))
            .count()
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(name)
    }

    /// Replace the exclusion set.
    ///
    /// Rejects unknown names and any set that would leave zero modules
    /// enabled; on rejection the previous exclusions stay in force.
    pub fn set_exclusions(&mut self, names: &[String]) -> Result<()> {
        let known: HashSet<&str> = self.modules.iter().map(|m| m.name()).collect();
        for name in names {
            if !known.contains(name.as_str()) {
                return Err(Error::UnknownModule(name.clone()));
            }
        }

        let candidate: HashSet<String> = names.iter().cloned().collect();
        if candidate.len() >= self.modules.len() {
            return Err(Error::EmptyModuleSet(self.modules.len()));
        }

        self.excluded = candidate;
        Ok(())
    }
}

/// Shared send path: build, sign, and confirm one legacy transaction
pub(crate) async fn send_instructions(
    rpc: &RpcClient,
    retry: &RetryPolicy,
    wallet: &Wallet,
    instructions: &[Instruction],
) -> Result<String> {
    let signature = retry
        .run("send_transaction", || async {
            let blockhash = rpc
                .get_latest_blockhash()
                .await
                .map_err(|e| Error::Rpc(e.to_string()))?;
            let tx = Transaction::new_signed_with_payer(
                instructions,
                Some(&wallet.pubkey()),
                &[wallet.keypair.as_ref()],
                blockhash,
            );
            rpc.send_and_confirm_transaction(&tx)
                .await
                .map_err(|e| Error::TransactionSend(e.to_string()))
        })
        .await?;

    Ok(signature.to_string())
}

/// Balance probe used by every module's "nothing to do" check
pub(crate) async fn spendable_balance(
    rpc: &RpcClient,
    wallet: &Wallet,
    min_balance: u64,
) -> std::result::Result<u64, ModuleOutcome> {
    match rpc.get_balance(&wallet.pubkey()).await {
        Ok(balance) if balance >= min_balance => Ok(balance),
        Ok(balance) => Err(ModuleOutcome::Skipped {
            reason: format!(
                "balance {} below minimum {} lamports",
                balance, min_balance
            ),
        }),
        Err(e) => Err(ModuleOutcome::Failed {
            error: format!("balance lookup failed: {}", e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubModule(&'static str);

    #[async_trait]
    impl WorkModule for StubModule {
        fn name(&self) -> &'static str {
            self.0
        }

        fn description(&self) -> &'static str {
            "stub"
        }

        async fn execute(&self, _wallet: &Wallet) -> ModuleOutcome {
            ModuleOutcome::Skipped {
                reason: "stub".to_string(),
            }
        }
    }

    fn registry() -> ModuleRegistry {
        ModuleRegistry::new(vec![
            Arc::new(StubModule("transfer")),
            Arc::new(StubModule("memo")),
            Arc::new(StubModule("swap")),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_registry_rejected() {
        assert!(ModuleRegistry::new(Vec::new()).is_err());
    }

    #[test]
    fn test_exclusions_filter_enabled() {
        let mut registry = registry();
        registry
            .set_exclusions(&["memo".to_string()])
            .unwrap();
        let enabled: Vec<_> = registry.enabled().iter().map(|m| m.name()).collect();
        assert_eq!(enabled, vec!["transfer", "swap"]);
        assert!(registry.is_excluded("memo"));
    }

    #[test]
    fn test_excluding_everything_is_rejected_and_leaves_state() {
        let mut registry = registry();
        registry.set_exclusions(&["memo".to_string()]).unwrap();

        let all = vec![
            "transfer".to_string(),
            "memo".to_string(),
            "swap".to_string(),
        ];
        assert!(matches!(
            registry.set_exclusions(&all),
            Err(Error::EmptyModuleSet(3))
        ));

        // Previous exclusion set is unchanged
        assert!(registry.is_excluded("memo"));
        assert_eq!(registry.enabled_count(), 2);
    }

    #[test]
    fn test_unknown_module_rejected() {
        let mut registry = registry();
        assert!(matches!(
            registry.set_exclusions(&["nope".to_string()]),
            Err(Error::UnknownModule(_))
        ));
        assert_eq!(registry.enabled_count(), 3);
    }
}
