//! Wallet selection for a round
//!
//! Fixed-roster mode takes accounts from a caller-supplied list; adaptive
//! mode probes the shuffled pool through the activity oracle in bounded
//! batches. Either way, wallets that have not succeeded today come first.
//! Selection must never fail a round: oracle trouble degrades to an
//! unfiltered prefix of the pool.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::thread_rng;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info, warn};

use crate::config::SelectorConfig;
use crate::error::Result;
use crate::oracle::ActivityOracle;
use crate::wallet::Wallet;

use super::ledger::DailyActivityLedger;

pub struct WalletSelector {
    oracle: Arc<dyn ActivityOracle>,
    /// Fixed roster; `None` enables adaptive search over the whole pool
    roster: Option<Vec<Pubkey>>,
    max_probe_rounds: usize,
    batch_multiplier: usize,
}

impl WalletSelector {
    pub fn new(
        oracle: Arc<dyn ActivityOracle>,
        config: &SelectorConfig,
        roster: Option<Vec<Pubkey>>,
    ) -> Self {
        Self {
            oracle,
            roster,
            max_probe_rounds: config.max_probe_rounds.max(1),
            batch_multiplier: config.batch_multiplier.max(1),
        }
    }

    /// Pick up to `desired` wallets for this round.
    ///
    /// An empty result means "skip this round"; it is never an error.
    pub async fn select_for_round(
        &self,
        pool: &[Wallet],
        desired: usize,
        ledger: &DailyActivityLedger,
    ) -> Vec<Wallet> {
        if let Some(roster) = &self.roster {
            return self.select_from_roster(roster, pool, desired, ledger);
        }

        match self.adaptive_search(pool, desired, ledger).await {
            Ok(selected) => selected,
            Err(e) => {
                warn!(
                    "Adaptive selection failed: {} (falling back to unfiltered pool)",
                    e
                );
                pool.iter().take(desired).cloned().collect()
            }
        }
    }

    fn select_from_roster(
        &self,
        roster: &[Pubkey],
        pool: &[Wallet],
        desired: usize,
        ledger: &DailyActivityLedger,
    ) -> Vec<Wallet> {
        let by_pubkey: HashMap<Pubkey, &Wallet> =
            pool.iter().map(|w| (w.pubkey(), w)).collect();

        let mut candidates = Vec::new();
        for account in roster {
            match by_pubkey.get(account) {
                Some(wallet) => candidates.push((*wallet).clone()),
                None => warn!("Roster account {} not in loaded pool, dropping", account),
            }
        }

        if candidates.len() < desired {
            info!(
                "Roster has {} usable wallets, running round with fewer than {} workers",
                candidates.len(),
                desired
            );
        }

        prioritize(candidates, desired, ledger)
    }

    /// Probe the shuffled pool in batches until enough active wallets are
    /// found, the probe limit is hit, or the pool is exhausted.
    async fn adaptive_search(
        &self,
        pool: &[Wallet],
        desired: usize,
        ledger: &DailyActivityLedger,
    ) -> Result<Vec<Wallet>> {
        let by_pubkey: HashMap<Pubkey, &Wallet> =
            pool.iter().map(|w| (w.pubkey(), w)).collect();

        let mut shuffled: Vec<Pubkey> = pool.iter().map(|w| w.pubkey()).collect();
        shuffled.shuffle(&mut thread_rng());

        let batch_size = (desired * self.batch_multiplier).max(1);
        let mut active: Vec<Pubkey> = Vec::new();

        for (probe, batch) in shuffled.chunks(batch_size).enumerate() {
            if probe >= self.max_probe_rounds || active.len() >= desired {
                break;
            }

            let result = self.oracle.check_batch(batch).await?;
            debug!(
                "Probe {}: {} active, {} completed",
                probe + 1,
                result.active.len(),
                result.completed.len()
            );
            active.extend(result.active);
        }

        if active.is_empty() {
            return Ok(Vec::new());
        }

        active.shuffle(&mut thread_rng());
        let candidates: Vec<Wallet> = active
            .iter()
            .filter_map(|account| by_pubkey.get(account).map(|w| (*w).clone()))
            .collect();

        Ok(prioritize(candidates, desired, ledger))
    }
}

/// Wallets still needing activity today first, the rest as padding
fn prioritize(candidates: Vec<Wallet>, desired: usize, ledger: &DailyActivityLedger) -> Vec<Wallet> {
    let today = Utc::now().date_naive();
    let (mut needs, done): (Vec<Wallet>, Vec<Wallet>) = candidates
        .into_iter()
        .partition(|w| ledger.needs_activity(&w.pubkey(), today));

    needs.extend(done);
    needs.truncate(desired);
    needs
}
