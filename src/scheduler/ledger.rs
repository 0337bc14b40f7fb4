//! In-memory record of which wallets succeeded today
//!
//! Written only from the single-threaded aggregate phase, after all slots
//! join, so plain maps are enough. Biases selection; never blocks it.

use std::collections::HashMap;

use chrono::NaiveDate;
use solana_sdk::pubkey::Pubkey;

#[derive(Debug, Default)]
pub struct DailyActivityLedger {
    last_active: HashMap<Pubkey, NaiveDate>,
}

impl DailyActivityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful on-chain action for `account` on `day`
    pub fn record_success(&mut self, account: Pubkey, day: NaiveDate) {
        self.last_active.insert(account, day);
    }

    /// True when the account has not succeeded yet on `day`.
    ///
    /// Such accounts are prioritized by the selector; the rest stay
    /// eligible but fill only leftover slots.
    pub fn needs_activity(&self, account: &Pubkey, day: NaiveDate) -> bool {
        self.last_active.get(account) != Some(&day)
    }

    pub fn len(&self) -> usize {
        self.last_active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_accounts_need_activity() {
        let ledger = DailyActivityLedger::new();
        let today = NaiveDate::from_ymd_opt(2026, 8, 4).unwrap();
        assert!(ledger.needs_activity(&Pubkey::new_unique(), today));
    }

    #[test]
    fn test_success_today_clears_need_until_tomorrow() {
        let mut ledger = DailyActivityLedger::new();
        let today = NaiveDate::from_ymd_opt(2026, 8, 4).unwrap();
        let tomorrow = today.succ_opt().unwrap();
        let account = Pubkey::new_unique();

        ledger.record_success(account, today);
        assert!(!ledger.needs_activity(&account, today));
        assert!(ledger.needs_activity(&account, tomorrow));
    }

    #[test]
    fn test_stale_entries_need_activity_again() {
        let mut ledger = DailyActivityLedger::new();
        let yesterday = NaiveDate::from_ymd_opt(2026, 8, 3).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 8, 4).unwrap();
        let account = Pubkey::new_unique();

        ledger.record_success(account, yesterday);
        assert!(ledger.needs_activity(&account, today));
    }
}
