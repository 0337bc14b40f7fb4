//! Deterministic module assignment per worker slot
//!
//! `enabled[(offset + slot) % len]` gives distinct modules within a round
//! whenever the slot count stays at or below the enabled count, and the
//! per-round offset advance walks every module through every slot position
//! over time.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::modules::WorkModule;

use super::types::RoundState;

#[derive(Debug, Default)]
pub struct ModuleRotator;

impl ModuleRotator {
    pub fn new() -> Self {
        Self
    }

    /// Pick the module for `slot_index` (0-based) in the current round
    pub fn assign(
        &self,
        enabled: &[Arc<dyn WorkModule>],
        slot_index: usize,
        state: &RoundState,
    ) -> Result<Arc<dyn WorkModule>> {
        if enabled.is_empty() {
            // Unreachable while the registry invariant holds
            return Err(Error::EmptyModuleSet(0));
        }
        let index = (state.module_offset + slot_index) % enabled.len();
        Ok(enabled[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::{ModuleOutcome, WorkModule};
    use crate::wallet::Wallet;
    use async_trait::async_trait;
    use std::collections::HashMap;

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

    fn modules(names: &[&'static str]) -> Vec<Arc<dyn WorkModule>> {
        names
            .iter()
            .map(|n| Arc::new(StubModule(n)) as Arc<dyn WorkModule>)
            .collect()
    }

    #[test]
    fn test_distinct_modules_within_a_round() {
        let enabled = modules(&["a", "b", "c", "d", "e"]);
        let rotator = ModuleRotator::new();
        let state = RoundState {
            iteration: 0,
            module_offset: 3,
        };

        let assigned: Vec<_> = (0..3)
            .map(|slot| rotator.assign(&enabled, slot, &state).unwrap().name())
            .collect();

        assert_eq!(assigned, vec!["d", "e", "a"]);
    }

    #[test]
    fn test_assignment_is_deterministic() {
        let enabled = modules(&["a", "b", "c"]);
        let rotator = ModuleRotator::new();
        let state = RoundState {
            iteration: 7,
            module_offset: 2,
        };

        let first = rotator.assign(&enabled, 1, &state).unwrap().name();
        let second = rotator.assign(&enabled, 1, &state).unwrap().name();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_enabled_set_errors() {
        let rotator = ModuleRotator::new();
        let state = RoundState::new();
        assert!(rotator.assign(&[], 0, &state).is_err());
    }

    #[test]
    fn test_long_run_rotation_is_fair() {
        // k=5 modules, s=3 slots, m=100 rounds: every module must lead
        // slot 0 at least floor(m*s/k)/s = 20 times.
        let enabled = modules(&["a", "b", "c", "d", "e"]);
        let rotator = ModuleRotator::new();
        let mut state = RoundState::new();
        let slots = 3;
        let rounds = 100;

        let mut lead_counts: HashMap<&str, usize> = HashMap::new();
        for _ in 0..rounds {
            let lead = rotator.assign(&enabled, 0, &state).unwrap().name();
            *lead_counts.entry(lead).or_default() += 1;
            state.advance(slots, enabled.len());
        }

        let min_expected = rounds * slots / enabled.len() / slots;
        for name in ["a", "b", "c", "d", "e"] {
            let count = lead_counts.get(name).copied().unwrap_or(0);
            assert!(
                count >= min_expected,
                "module {} led only {} rounds (expected >= {})",
                name,
                count,
                min_expected
            );
        }
    }
}
