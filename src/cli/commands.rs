//! CLI command implementations

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::gate::{AdmissionGate, PriorityFeeGate};
use crate::modules::{
    AggregatorSwapModule, MemoModule, ModuleRegistry, SelfTransferModule, WorkModule,
    WrapSolModule,
};
use crate::oracle::RpcActivityOracle;
use crate::retry::RetryPolicy;
use crate::scheduler::{BatchRunner, RoundScheduler, WalletSelector};
use crate::scheduler::round::SchedulerHandles;
use crate::wallet::{CredentialCache, FileStore, Wallet};

fn build_rpc(config: &Config) -> Arc<RpcClient> {
    Arc::new(RpcClient::new_with_timeout(
        config.rpc.endpoint.clone(),
        Duration::from_millis(config.rpc.timeout_ms),
    ))
}

fn build_registry(config: &Config, rpc: Arc<RpcClient>) -> Result<ModuleRegistry> {
    let retry = RetryPolicy::from_config(&config.rpc);
    let min_balance = config.modules.min_balance_lamports;

    let modules: Vec<Arc<dyn WorkModule>> = vec![
        Arc::new(SelfTransferModule::new(
            rpc.clone(),
            retry.clone(),
            config.modules.transfer_lamports,
            min_balance,
        )) as Arc<dyn WorkModule>,
        Arc::new(WrapSolModule::new(
            rpc.clone(),
            retry.clone(),
            config.modules.wrap_lamports,
            min_balance,
        )),
        Arc::new(MemoModule::new(
            rpc.clone(),
            retry.clone(),
            config.modules.memo_text.clone(),
            min_balance,
        )),
        Arc::new(AggregatorSwapModule::new(
            rpc,
            reqwest::Client::new(),
            retry,
            config.swap.clone(),
            min_balance,
        )),
    ];

    let mut registry = ModuleRegistry::new(modules)?;
    registry.set_exclusions(&config.modules.exclude)?;
    Ok(registry)
}

/// Resolve roster entries given as wallet names or base58 addresses
fn resolve_roster(entries: &[String], pool: &[Wallet]) -> Vec<Pubkey> {
    let mut roster = Vec::new();
    for entry in entries {
        let found = pool
            .iter()
            .find(|w| w.name == *entry)
            .map(|w| w.pubkey())
            .or_else(|| Pubkey::from_str(entry).ok());
        match found {
            Some(account) => roster.push(account),
            None => warn!("Roster entry {} matches no wallet, dropping", entry),
        }
    }
    roster
}

/// Start the infinite round scheduler
pub async fn start(config: &Config, workers: Option<usize>, roster: Vec<String>) -> Result<()> {
    let mut scheduler_config = config.scheduler.clone();
    if let Some(workers) = workers {
        anyhow::ensure!((1..=10).contains(&workers), "workers must be 1-10");
        scheduler_config.workers = workers;
    }

    // Credential load happens first so any interactive unlock is done
    // before fee gating starts counting time
    let cache = CredentialCache::new(FileStore::new(&config.wallet.credentials_dir));
    let pool = cache.load()?;
    info!("Wallet pool: {} wallets", pool.len());

    let rpc = build_rpc(config);
    let registry = build_registry(config, rpc.clone())?;
    info!(
        "Modules enabled: {}",
        registry
            .enabled()
            .iter()
            .map(|m| m.name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let retry = RetryPolicy::from_config(&config.rpc);
    let oracle = Arc::new(RpcActivityOracle::new(
        rpc.clone(),
        config.oracle.clone(),
        retry,
    ));

    let roster = if roster.is_empty() {
        None
    } else {
        let resolved = resolve_roster(&roster, pool.as_slice());
        anyhow::ensure!(!resolved.is_empty(), "No roster entries resolved");
        info!("Preselected roster: {} wallets", resolved.len());
        Some(resolved)
    };
    let selector = WalletSelector::new(oracle, &config.selector, roster);

    let gate: Option<Arc<dyn AdmissionGate>> = if config.fee_gate.enabled {
        Some(Arc::new(PriorityFeeGate::new(
            rpc,
            config.fee_gate.clone(),
        )))
    } else {
        info!("Fee gate disabled");
        None
    };

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, finishing current round");
            signal_token.cancel();
        }
    });

    let mut scheduler = RoundScheduler::new(
        SchedulerHandles {
            pool,
            registry,
            selector,
            gate,
        },
        scheduler_config,
    );
    scheduler.run(cancel).await;

    Ok(())
}

/// Run every wallet exactly once with bounded concurrency
pub async fn sweep(config: &Config, concurrency: usize) -> Result<()> {
    let cache = CredentialCache::new(FileStore::new(&config.wallet.credentials_dir));
    let pool = cache.load()?;

    let rpc = build_rpc(config);
    let registry = build_registry(config, rpc)?;

    let runner = BatchRunner::new(
        registry,
        Duration::from_secs(config.scheduler.batch_pause_secs),
    );
    let summary = runner.run_once(pool.as_slice(), concurrency).await;

    if summary.failed > 0 {
        warn!("{} of {} sweeps failed", summary.failed, summary.dispatched);
    }
    Ok(())
}

/// List wallets with current balances
pub async fn wallets(config: &Config) -> Result<()> {
    let cache = CredentialCache::new(FileStore::new(&config.wallet.credentials_dir));
    let pool = cache.load()?;
    let rpc = build_rpc(config);

    println!("{:<16} {:<44} {:>14}", "NAME", "ADDRESS", "BALANCE (SOL)");
    for wallet in pool.iter() {
        match rpc.get_balance(&wallet.pubkey()).await {
            Ok(lamports) => println!(
                "{:<16} {:<44} {:>14.6}",
                wallet.name,
                wallet.address(),
                lamports as f64 / 1e9
            ),
            Err(e) => {
                error!("Balance lookup failed for {}: {}", wallet.name, e);
                println!("{:<16} {:<44} {:>14}", wallet.name, wallet.address(), "?");
            }
        }
    }
    Ok(())
}

/// List modules and their exclusion state
pub fn modules(config: &Config) -> Result<()> {
    let rpc = build_rpc(config);
    let registry = build_registry(config, rpc)?;

    println!("{:<18} {:<10} DESCRIPTION", "MODULE", "STATE");
    for module in registry.all() {
        let state = if registry.is_excluded(module.name()) {
            "excluded"
        } else {
            "enabled"
        };
        println!("{:<18} {:<10} {}", module.name(), state, module.description());
    }
    Ok(())
}

/// Show current configuration (no secrets are stored in config)
pub fn show_config(config: &Config) -> Result<()> {
    println!("RPC endpoint:        {}", config.rpc.endpoint);
    println!("Credentials dir:     {}", config.wallet.credentials_dir);
    println!("Workers:             {}", config.scheduler.workers);
    println!("Round delay:         {}s", config.scheduler.round_delay_secs);
    println!(
        "Fee gate:            {} (ceiling {} micro-lamports, poll {}s)",
        if config.fee_gate.enabled { "on" } else { "off" },
        config.fee_gate.max_priority_fee_micro_lamports,
        config.fee_gate.poll_interval_secs
    );
    println!(
        "Oracle target:       {} tx/day (scan limit {})",
        config.oracle.target_daily_actions, config.oracle.signature_scan_limit
    );
    println!(
        "Selector:            {} probes x{} batch multiplier",
        config.selector.max_probe_rounds, config.selector.batch_multiplier
    );
    println!("Excluded modules:    {:?}", config.modules.exclude);
    Ok(())
}

/// Check RPC connectivity and the fee gate
pub async fn health(config: &Config) -> Result<()> {
    let rpc = build_rpc(config);

    match rpc.get_version().await {
        Ok(version) => info!("RPC OK: solana-core {}", version.solana_core),
        Err(e) => {
            error!("RPC check failed: {}", e);
            anyhow::bail!("RPC unreachable: {}", e);
        }
    }

    let gate = PriorityFeeGate::new(rpc, config.fee_gate.clone());
    match gate.sample_fee().await {
        Ok(fee) => info!(
            "Fee gate OK: median prioritization fee {} micro-lamports (ceiling {})",
            fee, config.fee_gate.max_priority_fee_micro_lamports
        ),
        Err(e) => warn!("Fee sample failed: {} (gate would fail open)", e),
    }

    Ok(())
}
