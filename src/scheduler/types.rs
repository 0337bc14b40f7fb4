//! Shared scheduler data model: outcomes, round state, summaries

use std::collections::BTreeMap;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;
use tracing::info;

/// Terminal result of one worker slot's module execution.
///
/// `skipped` is the "nothing to do" state (below minimum balance, no route);
/// it is not a failure and never marks the wallet active in the ledger,
/// because no on-chain action happened.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub account: Pubkey,
    pub wallet_name: String,
    pub module: String,
    pub success: bool,
    pub skipped: bool,
    pub signature: Option<String>,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl ExecutionOutcome {
    /// Success or skip; the only two non-failure terminal states
    pub fn is_ok(&self) -> bool {
        self.success || self.skipped
    }
}

/// Mutable state threaded across rounds.
///
/// `module_offset` advances by the dispatched slot count modulo the enabled
/// module count, which is what rotates modules across slot positions.
#[derive(Debug, Clone, Default)]
pub struct RoundState {
    pub iteration: u64,
    pub module_offset: usize,
}

impl RoundState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance after a completed round
    pub fn advance(&mut self, dispatched: usize, enabled_modules: usize) {
        self.iteration += 1;
        if enabled_modules > 0 {
            self.module_offset = (self.module_offset + dispatched) % enabled_modules;
        }
    }
}

/// Per-module tally inside a summary
#[derive(Debug, Clone, Default)]
pub struct ModuleTally {
    pub ok: u32,
    pub failed: u32,
}

impl ModuleTally {
    pub fn success_rate(&self) -> f64 {
        let total = self.ok + self.failed;
        if total == 0 {
            return 0.0;
        }
        (self.ok as f64 / total as f64) * 100.0
    }
}

/// Aggregate view of one round or sweep batch
#[derive(Debug, Clone, Default)]
pub struct RoundSummary {
    pub iteration: u64,
    pub dispatched: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub per_module: BTreeMap<String, ModuleTally>,
    pub elapsed: Duration,
}

impl RoundSummary {
    pub fn from_outcomes(iteration: u64, outcomes: &[ExecutionOutcome], elapsed: Duration) -> Self {
        let mut summary = Self {
            iteration,
            dispatched: outcomes.len(),
            elapsed,
            ..Default::default()
        };

        for outcome in outcomes {
            let tally = summary.per_module.entry(outcome.module.clone()).or_default();
            if outcome.success {
                summary.succeeded += 1;
                tally.ok += 1;
            } else if outcome.skipped {
                summary.skipped += 1;
                tally.ok += 1;
            } else {
                summary.failed += 1;
                tally.failed += 1;
            }
        }

        summary
    }

    /// Skips count toward the ok tally; only real failures count against it
    pub fn ok_count(&self) -> usize {
        self.succeeded + self.skipped
    }

    /// Emit the per-round report
    pub fn log(&self) {
        info!(
            "Round {} complete: {} dispatched, {} ok ({} succeeded, {} skipped), {} failed in {:.1}s",
            self.iteration,
            self.dispatched,
            self.ok_count(),
            self.succeeded,
            self.skipped,
            self.failed,
            self.elapsed.as_secs_f64()
        );
        for (module, tally) in &self.per_module {
            info!(
                "  {}: {} ok, {} failed ({:.0}% success)",
                module,
                tally.ok,
                tally.failed,
                tally.success_rate()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(module: &str, success: bool, skipped: bool) -> ExecutionOutcome {
        ExecutionOutcome {
            account: Pubkey::new_unique(),
            wallet_name: "w".to_string(),
            module: module.to_string(),
            success,
            skipped,
            signature: None,
            error: if success || skipped {
                None
            } else {
                Some("boom".to_string())
            },
            elapsed: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_counts_partition_dispatched() {
        let outcomes = vec![
            outcome("transfer", true, false),
            outcome("transfer", false, true),
            outcome("memo", false, false),
            outcome("swap", true, false),
        ];
        let summary = RoundSummary::from_outcomes(1, &outcomes, Duration::ZERO);

        assert_eq!(summary.dispatched, 4);
        assert_eq!(
            summary.succeeded + summary.skipped + summary.failed,
            summary.dispatched
        );
        assert_eq!(summary.ok_count(), 3);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_skipped_counts_as_ok_per_module() {
        let outcomes = vec![outcome("swap", false, true), outcome("swap", false, false)];
        let summary = RoundSummary::from_outcomes(1, &outcomes, Duration::ZERO);
        let tally = &summary.per_module["swap"];
        assert_eq!(tally.ok, 1);
        assert_eq!(tally.failed, 1);
        assert_eq!(tally.success_rate(), 50.0);
    }

    #[test]
    fn test_offset_advances_modulo_enabled() {
        let mut state = RoundState::new();
        state.advance(3, 5);
        assert_eq!(state.iteration, 1);
        assert_eq!(state.module_offset, 3);
        state.advance(3, 5);
        assert_eq!(state.module_offset, 1);
        // No enabled modules: offset stays put rather than dividing by zero
        state.advance(3, 0);
        assert_eq!(state.module_offset, 1);
    }
}
