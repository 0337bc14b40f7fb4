//! The infinite round loop: gate, select, dispatch, await, aggregate, pace
//!
//! One round runs to completion before the next begins; slots inside a
//! round run concurrently and independently. A slot failure is data, a
//! round failure is a short pause, and nothing short of a credential-load
//! failure or cancellation ends the loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::gate::AdmissionGate;
use crate::modules::{ModuleOutcome, ModuleRegistry, WorkModule};
use crate::wallet::Wallet;

use super::ledger::DailyActivityLedger;
use super::rotator::ModuleRotator;
use super::selector::WalletSelector;
use super::types::{ExecutionOutcome, RoundState, RoundSummary};

/// Everything a scheduler needs, wired up by the CLI layer
pub struct SchedulerHandles {
    pub pool: Arc<Vec<Wallet>>,
    pub registry: ModuleRegistry,
    pub selector: WalletSelector,
    pub gate: Option<Arc<dyn AdmissionGate>>,
}

/// Result of one round, before pacing
#[derive(Debug)]
pub enum RoundOutcome {
    /// Slots were dispatched; counts live in the summary
    Completed { summary: RoundSummary },
    /// No eligible wallets this round; nothing dispatched
    Skipped,
}

pub struct RoundScheduler {
    pool: Arc<Vec<Wallet>>,
    registry: ModuleRegistry,
    selector: WalletSelector,
    rotator: ModuleRotator,
    gate: Option<Arc<dyn AdmissionGate>>,
    ledger: DailyActivityLedger,
    state: RoundState,
    config: SchedulerConfig,
}

impl RoundScheduler {
    pub fn new(handles: SchedulerHandles, config: SchedulerConfig) -> Self {
        Self {
            pool: handles.pool,
            registry: handles.registry,
            selector: handles.selector,
            rotator: ModuleRotator::new(),
            gate: handles.gate,
            ledger: DailyActivityLedger::new(),
            state: RoundState::new(),
            config,
        }
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn ledger(&self) -> &DailyActivityLedger {
        &self.ledger
    }

    /// Run rounds until cancelled. Cancellation is honored between rounds
    /// only; in-flight slots always finish so no wallet is left mid-action.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(
            "Round scheduler starting: {} workers, {} modules enabled, {} wallets in pool",
            self.config.workers,
            self.registry.enabled_count(),
            self.pool.len()
        );

        loop {
            if cancel.is_cancelled() {
                info!("Shutdown requested, stopping between rounds");
                break;
            }

            let delay = match self.execute_round().await {
                Ok(RoundOutcome::Completed { summary }) => {
                    self.state
                        .advance(summary.dispatched, self.registry.enabled_count());
                    Duration::from_secs(self.config.round_delay_secs)
                }
                Ok(RoundOutcome::Skipped) => {
                    self.state.advance(0, self.registry.enabled_count());
                    Duration::from_secs(self.config.round_delay_secs)
                }
                Err(e) => {
                    error!("Round {} failed: {}", self.state.iteration, e);
                    self.state.advance(0, self.registry.enabled_count());
                    Duration::from_secs(self.config.error_delay_secs)
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Shutdown requested during pacing");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// One full round minus pacing. Slot failures are recorded in the
    /// outcomes; only a failure of the round machinery itself returns Err.
    pub async fn execute_round(&mut self) -> Result<RoundOutcome> {
        let started = Instant::now();

        // GATE
        if let Some(gate) = &self.gate {
            match gate.is_too_expensive().await {
                Ok(true) => {
                    info!("Cost to act above ceiling, holding round");
                    gate.wait_until_acceptable().await;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("Admission gate probe failed: {} (failing open)", e);
                }
            }
        }

        // SELECT
        let selected = self
            .selector
            .select_for_round(self.pool.as_slice(), self.config.workers, &self.ledger)
            .await;
        if selected.is_empty() {
            info!(
                "Round {}: no active wallets found, skipping",
                self.state.iteration
            );
            return Ok(RoundOutcome::Skipped);
        }

        // DISPATCH
        let enabled = self.registry.enabled();
        let mut slots = Vec::with_capacity(selected.len());
        for (index, wallet) in selected.into_iter().enumerate() {
            let module = self.rotator.assign(&enabled, index, &self.state)?;
            slots.push((wallet, module));
        }
        let stagger = Duration::from_millis(self.config.slot_stagger_ms);
        let outcomes = dispatch_slots(slots, stagger).await;

        // AGGREGATE
        let today = Utc::now().date_naive();
        for outcome in &outcomes {
            if outcome.success {
                self.ledger.record_success(outcome.account, today);
            }
        }
        let summary = RoundSummary::from_outcomes(self.state.iteration, &outcomes, started.elapsed());
        summary.log();

        Ok(RoundOutcome::Completed { summary })
    }
}

/// Launch every slot as its own task and join them all, collecting both
/// successes and failures. A panicked slot becomes a failed outcome and
/// never takes its siblings down.
///
/// Slot `i` waits `i * stagger` before acting so concurrent slots do not
/// land on the RPC at the same instant.
pub(crate) async fn dispatch_slots(
    slots: Vec<(Wallet, Arc<dyn WorkModule>)>,
    stagger: Duration,
) -> Vec<ExecutionOutcome> {
    let mut handles = Vec::with_capacity(slots.len());
    let mut labels = Vec::with_capacity(slots.len());

    for (index, (wallet, module)) in slots.into_iter().enumerate() {
        labels.push((wallet.pubkey(), wallet.name.clone(), module.name().to_string()));

        let pacing = stagger * index as u32;
        handles.push(tokio::spawn(async move {
            let started = Instant::now();
            // Pacing and warm-up run inside this slot's task; siblings
            // keep going
            if !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }
            if let Some(delay) = module.warmup_delay() {
                tokio::time::sleep(delay).await;
            }
            let result = module.execute(&wallet).await;
            into_outcome(&wallet, module.name(), result, started.elapsed())
        }));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (handle, (account, wallet_name, module)) in
        handles.into_iter().zip(labels.into_iter())
    {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                error!("Worker slot for {} panicked: {}", wallet_name, e);
                outcomes.push(ExecutionOutcome {
                    account,
                    wallet_name,
                    module,
                    success: false,
                    skipped: false,
                    signature: None,
                    error: Some(format!("worker panicked: {}", e)),
                    elapsed: Duration::ZERO,
                });
            }
        }
    }
    outcomes
}

fn into_outcome(
    wallet: &Wallet,
    module: &str,
    result: ModuleOutcome,
    elapsed: Duration,
) -> ExecutionOutcome {
    let (success, skipped, signature, error) = match result {
        ModuleOutcome::Executed { signature } => (true, false, signature, None),
        ModuleOutcome::Skipped { reason } => (false, true, None, Some(reason)),
        ModuleOutcome::Failed { error } => (false, false, None, Some(error)),
    };

    ExecutionOutcome {
        account: wallet.pubkey(),
        wallet_name: wallet.name.clone(),
        module: module.to_string(),
        success,
        skipped,
        signature,
        error,
        elapsed,
    }
}
