//! Error types for the harvester

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harvester
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // Credential errors
    #[error("No wallets loaded from {0}")]
    NoWallets(String),

    #[error("Invalid keypair: {0}")]
    InvalidKeypair(String),

    #[error("Insecure keypair permissions: {0}")]
    InsecureKeypair(String),

    #[error("Wrong keystore passphrase")]
    WrongPassphrase,

    #[error("Keystore error: {0}")]
    Keystore(String),

    // RPC errors
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("RPC timeout after {0}ms")]
    RpcTimeout(u64),

    // Activity oracle errors
    #[error("Activity oracle error: {0}")]
    Oracle(String),

    // Fee gate errors
    #[error("Fee gate error: {0}")]
    FeeGate(String),

    // Aggregator (swap API) errors
    #[error("Aggregator error: {0}")]
    Aggregator(String),

    #[error("Aggregator rate limited: {0}")]
    AggregatorRateLimited(String),

    // Module registry errors
    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Exclusion set would disable every module ({0} total)")]
    EmptyModuleSet(usize),

    // Transaction errors
    #[error("Transaction build failed: {0}")]
    TransactionBuild(String),

    #[error("Transaction send failed: {0}")]
    TransactionSend(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Rpc(_)
                | Error::RpcTimeout(_)
                | Error::Oracle(_)
                | Error::FeeGate(_)
                | Error::AggregatorRateLimited(_)
                | Error::TransactionSend(_)
        )
    }
}

// Conversion from solana_client errors
impl From<solana_client::client_error::ClientError> for Error {
    fn from(e: solana_client::client_error::ClientError) -> Self {
        Error::Rpc(e.to_string())
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Aggregator(e.to_string())
    }
}
