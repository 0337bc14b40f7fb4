//! Wallet pool: loading, caching, and handing keypairs to worker slots

pub mod store;

use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;

pub use store::{CredentialCache, FileStore};

/// One funded account: a name from the registry plus its keypair.
///
/// Cloning is cheap; the keypair itself is shared and never duplicated.
#[derive(Clone)]
pub struct Wallet {
    pub name: String,
    pub keypair: Arc<Keypair>,
}

impl Wallet {
    pub fn new(name: impl Into<String>, keypair: Keypair) -> Self {
        Self {
            name: name.into(),
            keypair: Arc::new(keypair),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn address(&self) -> String {
        self.pubkey().to_string()
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print secret material
        f.debug_struct("Wallet")
            .field("name", &self.name)
            .field("address", &self.address())
            .finish()
    }
}
