//! Round-based concurrent scheduler
//!
//! Drives the infinite gate/select/dispatch/aggregate loop over the wallet
//! pool, plus the one-shot bounded sweep variant.

pub mod batch;
pub mod ledger;
pub mod rotator;
pub mod round;
pub mod selector;
pub mod types;

pub use batch::BatchRunner;
pub use ledger::DailyActivityLedger;
pub use rotator::ModuleRotator;
pub use round::{RoundScheduler, SchedulerHandles};
pub use selector::WalletSelector;
pub use types::{ExecutionOutcome, RoundState, RoundSummary};
