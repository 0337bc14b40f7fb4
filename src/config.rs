//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub rpc: RpcConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub selector: SelectorConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub fee_gate: FeeGateConfig,
    #[serde(default)]
    pub modules: ModulesConfig,
    #[serde(default)]
    pub swap: SwapConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Directory holding wallets.json plus keypair files or keystore.json
    #[serde(default = "default_credentials_dir")]
    pub credentials_dir: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            credentials_dir: default_credentials_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Concurrent worker slots per round (1-10)
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Pause between normal rounds
    #[serde(default = "default_round_delay_secs")]
    pub round_delay_secs: u64,
    /// Shorter pause after a failed round
    #[serde(default = "default_error_delay_secs")]
    pub error_delay_secs: u64,
    /// Pause between sweep batches
    #[serde(default = "default_batch_pause_secs")]
    pub batch_pause_secs: u64,
    /// Per-slot dispatch stagger, so concurrent slots do not hit the RPC
    /// at the same instant
    #[serde(default = "default_slot_stagger_ms")]
    pub slot_stagger_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            round_delay_secs: default_round_delay_secs(),
            error_delay_secs: default_error_delay_secs(),
            batch_pause_secs: default_batch_pause_secs(),
            slot_stagger_ms: default_slot_stagger_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Maximum oracle probe rounds before giving up on adaptive search
    #[serde(default = "default_max_probe_rounds")]
    pub max_probe_rounds: usize,
    /// Probe batch size = workers * batch_multiplier
    #[serde(default = "default_batch_multiplier")]
    pub batch_multiplier: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_probe_rounds: default_max_probe_rounds(),
            batch_multiplier: default_batch_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    /// A wallet is "completed" once it has this many successful txs today
    #[serde(default = "default_target_daily_actions")]
    pub target_daily_actions: usize,
    /// How many recent signatures to scan per wallet
    #[serde(default = "default_signature_scan_limit")]
    pub signature_scan_limit: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            target_daily_actions: default_target_daily_actions(),
            signature_scan_limit: default_signature_scan_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeeGateConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Ceiling on the median recent prioritization fee (micro-lamports)
    #[serde(default = "default_max_priority_fee")]
    pub max_priority_fee_micro_lamports: u64,
    /// Poll cadence while waiting for fees to come down
    #[serde(default = "default_gate_poll_secs")]
    pub poll_interval_secs: u64,
}

impl Default for FeeGateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_priority_fee_micro_lamports: default_max_priority_fee(),
            poll_interval_secs: default_gate_poll_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModulesConfig {
    /// Module names disabled at startup (must leave at least one enabled)
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Lamports moved by the self-transfer module
    #[serde(default = "default_transfer_lamports")]
    pub transfer_lamports: u64,
    /// Lamports wrapped and unwrapped by the wSOL module
    #[serde(default = "default_wrap_lamports")]
    pub wrap_lamports: u64,
    /// Text posted by the memo module
    #[serde(default = "default_memo_text")]
    pub memo_text: String,
    /// Minimum wallet balance before a module acts at all
    #[serde(default = "default_min_balance_lamports")]
    pub min_balance_lamports: u64,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            transfer_lamports: default_transfer_lamports(),
            wrap_lamports: default_wrap_lamports(),
            memo_text: default_memo_text(),
            min_balance_lamports: default_min_balance_lamports(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwapConfig {
    /// Aggregator API base URL
    #[serde(default = "default_swap_api_url")]
    pub api_url: String,
    #[serde(default = "default_input_mint")]
    pub input_mint: String,
    #[serde(default = "default_output_mint")]
    pub output_mint: String,
    /// Swap size in input-mint base units
    #[serde(default = "default_swap_amount")]
    pub amount: u64,
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u32,
    /// Warm-up before the first aggregator call, to stay under its rate limit
    #[serde(default = "default_swap_warmup_ms")]
    pub warmup_delay_ms: u64,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            api_url: default_swap_api_url(),
            input_mint: default_input_mint(),
            output_mint: default_output_mint(),
            amount: default_swap_amount(),
            slippage_bps: default_slippage_bps(),
            warmup_delay_ms: default_swap_warmup_ms(),
        }
    }
}

// Default value functions

fn default_rpc_endpoint() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_credentials_dir() -> String {
    "credentials".to_string()
}

fn default_workers() -> usize {
    3
}

fn default_round_delay_secs() -> u64 {
    5
}

fn default_error_delay_secs() -> u64 {
    2
}

fn default_batch_pause_secs() -> u64 {
    2
}

fn default_slot_stagger_ms() -> u64 {
    250
}

fn default_max_probe_rounds() -> usize {
    5
}

fn default_batch_multiplier() -> usize {
    1
}

fn default_target_daily_actions() -> usize {
    1
}

fn default_signature_scan_limit() -> usize {
    50
}

fn default_true() -> bool {
    true
}

fn default_max_priority_fee() -> u64 {
    10_000
}

fn default_gate_poll_secs() -> u64 {
    15
}

fn default_transfer_lamports() -> u64 {
    5_000
}

fn default_wrap_lamports() -> u64 {
    100_000
}

fn default_memo_text() -> String {
    "gm".to_string()
}

fn default_min_balance_lamports() -> u64 {
    1_000_000
}

fn default_swap_api_url() -> String {
    "https://quote-api.jup.ag/v6".to_string()
}

fn default_input_mint() -> String {
    // Native SOL mint
    "So11111111111111111111111111111111111111112".to_string()
}

fn default_output_mint() -> String {
    // USDC
    "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string()
}

fn default_swap_amount() -> u64 {
    1_000_000
}

fn default_slippage_bps() -> u32 {
    50
}

fn default_swap_warmup_ms() -> u64 {
    2_000
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("rpc.endpoint", default_rpc_endpoint())?
            .set_default("rpc.timeout_ms", default_timeout_ms() as i64)?
            .set_default("rpc.max_retries", default_max_retries() as i64)?
            .set_default("rpc.retry_delay_ms", default_retry_delay_ms() as i64)?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix HARVESTER_)
            .add_source(
                config::Environment::with_prefix("HARVESTER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.scheduler.workers == 0 || self.scheduler.workers > 10 {
            anyhow::bail!(
                "scheduler.workers must be 1-10, got {}",
                self.scheduler.workers
            );
        }

        if self.selector.max_probe_rounds == 0 {
            anyhow::bail!("selector.max_probe_rounds must be at least 1");
        }

        if self.selector.batch_multiplier == 0 {
            anyhow::bail!("selector.batch_multiplier must be at least 1");
        }

        if self.oracle.target_daily_actions == 0 {
            anyhow::bail!("oracle.target_daily_actions must be at least 1");
        }

        if self.swap.slippage_bps > 10_000 {
            anyhow::bail!(
                "swap.slippage_bps must be <= 10000, got {}",
                self.swap.slippage_bps
            );
        }

        self.swap
            .input_mint
            .parse::<solana_sdk::pubkey::Pubkey>()
            .map_err(|e| anyhow::anyhow!("swap.input_mint is not a valid mint: {}", e))?;
        self.swap
            .output_mint
            .parse::<solana_sdk::pubkey::Pubkey>()
            .map_err(|e| anyhow::anyhow!("swap.output_mint is not a valid mint: {}", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config {
            rpc: RpcConfig {
                endpoint: default_rpc_endpoint(),
                timeout_ms: default_timeout_ms(),
                max_retries: default_max_retries(),
                retry_delay_ms: default_retry_delay_ms(),
            },
            wallet: WalletConfig::default(),
            scheduler: SchedulerConfig::default(),
            selector: SelectorConfig::default(),
            oracle: OracleConfig::default(),
            fee_gate: FeeGateConfig::default(),
            modules: ModulesConfig::default(),
            swap: SwapConfig::default(),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_workers() {
        let mut config = Config {
            rpc: RpcConfig {
                endpoint: default_rpc_endpoint(),
                timeout_ms: default_timeout_ms(),
                max_retries: default_max_retries(),
                retry_delay_ms: default_retry_delay_ms(),
            },
            wallet: WalletConfig::default(),
            scheduler: SchedulerConfig::default(),
            selector: SelectorConfig::default(),
            oracle: OracleConfig::default(),
            fee_gate: FeeGateConfig::default(),
            modules: ModulesConfig::default(),
            swap: SwapConfig::default(),
        };
        config.scheduler.workers = 0;
        assert!(config.validate().is_err());
        config.scheduler.workers = 11;
        assert!(config.validate().is_err());
    }
}
