//! Credential storage for the wallet pool
//!
//! Two layouts under the credentials directory:
//! - plain store: wallets.json registry pointing at per-wallet keypair
//!   files (JSON byte arrays, 0600 permissions enforced)
//! - secret store: keystore.json with passphrase-protected secrets
//!
//! The secret store wins when both exist. Loading happens exactly once per
//! process; any interactive unlock must finish before scheduling starts.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use solana_sdk::signature::Keypair;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::Wallet;

const KEYSTORE_MAGIC: &[u8] = b"harvester-keystore-v1";

/// Plain-store registry (wallets.json)
#[derive(Debug, Default, Serialize, Deserialize)]
struct WalletRegistry {
    version: String,
    wallets: Vec<RegistryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryEntry {
    name: String,
    keypair_path: PathBuf,
}

/// Secret-store layout (keystore.json)
#[derive(Debug, Serialize, Deserialize)]
struct Keystore {
    version: String,
    /// Detects a wrong passphrase before touching any secret
    fingerprint: String,
    nonce: String,
    wallets: Vec<KeystoreEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct KeystoreEntry {
    name: String,
    secret: String,
}

/// File-backed credential source
pub struct FileStore {
    credentials_dir: PathBuf,
}

impl FileStore {
    pub fn new(credentials_dir: impl AsRef<Path>) -> Self {
        Self {
            credentials_dir: credentials_dir.as_ref().to_path_buf(),
        }
    }

    pub fn has_secret_store(&self) -> bool {
        self.credentials_dir.join("keystore.json").exists()
    }

    pub fn has_plain_store(&self) -> bool {
        self.credentials_dir.join("wallets.json").exists()
    }

    /// Load wallets from the plain registry.
    ///
    /// Entries that fail to load are skipped with a warning; an empty
    /// result is an error because the pool would be unusable.
    pub fn load_plain(&self) -> Result<Vec<Wallet>> {
        let registry_path = self.credentials_dir.join("wallets.json");
        let content = std::fs::read_to_string(&registry_path)
            .map_err(|e| Error::Config(format!("Failed to read wallets.json: {}", e)))?;
        let registry: WalletRegistry = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse wallets.json: {}", e)))?;

        let mut wallets = Vec::new();
        for entry in &registry.wallets {
            match self.load_keypair(entry) {
                Ok(keypair) => {
                    let wallet = Wallet::new(entry.name.clone(), keypair);
                    debug!("Loaded wallet {}: {}", wallet.name, wallet.address());
                    wallets.push(wallet);
                }
                Err(e) => {
                    warn!("Skipping wallet {}: {}", entry.name, e);
                }
            }
        }

        if wallets.is_empty() {
            return Err(Error::NoWallets(
                self.credentials_dir.display().to_string(),
            ));
        }

        info!("Loaded {} wallets from plain store", wallets.len());
        Ok(wallets)
    }

    /// Load wallets from the encrypted keystore.
    ///
    /// A bad passphrase fails fast with `WrongPassphrase` so the caller can
    /// re-prompt without partial state.
    pub fn load_encrypted(&self, passphrase: &str) -> Result<Vec<Wallet>> {
        let keystore_path = self.credentials_dir.join("keystore.json");
        check_permissions(&keystore_path)?;

        let content = std::fs::read_to_string(&keystore_path)
            .map_err(|e| Error::Keystore(format!("Failed to read keystore.json: {}", e)))?;
        let keystore: Keystore = serde_json::from_str(&content)
            .map_err(|e| Error::Keystore(format!("Failed to parse keystore.json: {}", e)))?;

        if keystore.fingerprint != passphrase_fingerprint(passphrase) {
            return Err(Error::WrongPassphrase);
        }

        let nonce = BASE64
            .decode(&keystore.nonce)
            .map_err(|e| Error::Keystore(format!("Invalid nonce: {}", e)))?;

        let mut wallets = Vec::new();
        for entry in &keystore.wallets {
            let ciphertext = BASE64
                .decode(&entry.secret)
                .map_err(|e| Error::Keystore(format!("Invalid secret for {}: {}", entry.name, e)))?;
            let secret = keystream_xor(passphrase, &nonce, &ciphertext);
            let keypair = Keypair::from_bytes(&secret).map_err(|e| {
                Error::InvalidKeypair(format!("Keystore entry {}: {}", entry.name, e))
            })?;
            wallets.push(Wallet::new(entry.name.clone(), keypair));
        }

        if wallets.is_empty() {
            return Err(Error::NoWallets(
                self.credentials_dir.display().to_string(),
            ));
        }

        info!("Unlocked {} wallets from keystore", wallets.len());
        Ok(wallets)
    }

    /// Write a keystore from a set of wallets (used by tooling and tests)
    pub fn write_keystore(&self, wallets: &[Wallet], passphrase: &str, nonce: &[u8]) -> Result<()> {
        let entries = wallets
            .iter()
            .map(|w| KeystoreEntry {
                name: w.name.clone(),
                secret: BASE64.encode(keystream_xor(passphrase, nonce, &w.keypair.to_bytes())),
            })
            .collect();

        let keystore = Keystore {
            version: "1.0".to_string(),
            fingerprint: passphrase_fingerprint(passphrase),
            nonce: BASE64.encode(nonce),
            wallets: entries,
        };

        let json = serde_json::to_string_pretty(&keystore)
            .map_err(|e| Error::Keystore(format!("Failed to serialize keystore: {}", e)))?;
        std::fs::write(self.credentials_dir.join("keystore.json"), json)
            .map_err(|e| Error::Keystore(format!("Failed to write keystore.json: {}", e)))?;
        Ok(())
    }

    fn load_keypair(&self, entry: &RegistryEntry) -> Result<Keypair> {
        let full_path = if entry.keypair_path.is_absolute() {
            entry.keypair_path.clone()
        } else {
            self.credentials_dir.join(&entry.keypair_path)
        };

        check_permissions(&full_path)?;

        let keypair_bytes = std::fs::read(&full_path).map_err(|e| {
            Error::InvalidKeypair(format!("Failed to read keypair for {}: {}", entry.name, e))
        })?;
        let keypair_json: Vec<u8> = serde_json::from_slice(&keypair_bytes).map_err(|e| {
            Error::InvalidKeypair(format!("Failed to parse keypair JSON for {}: {}", entry.name, e))
        })?;
        Keypair::from_bytes(&keypair_json).map_err(|e| {
            Error::InvalidKeypair(format!("Invalid keypair bytes for {}: {}", entry.name, e))
        })
    }
}

/// Refuse key material readable by group or others (Unix)
fn check_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(path) {
            let mode = metadata.permissions().mode();
            if mode & 0o077 != 0 {
                return Err(Error::InsecureKeypair(format!(
                    "{} has insecure permissions {:o}. Run 'chmod 600 {}'",
                    path.display(),
                    mode & 0o777,
                    path.display()
                )));
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

fn passphrase_fingerprint(passphrase: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(KEYSTORE_MAGIC);
    hasher.update(passphrase.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// SHA-256 counter-mode keystream XOR. Symmetric: encrypts and decrypts.
fn keystream_xor(passphrase: &str, nonce: &[u8], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut counter: u64 = 0;
    while out.len() < data.len() {
        let mut hasher = Sha256::new();
        hasher.update(passphrase.as_bytes());
        hasher.update(nonce);
        hasher.update(counter.to_le_bytes());
        let block = hasher.finalize();
        for byte in block.iter() {
            if out.len() == data.len() {
                break;
            }
            out.push(data[out.len()] ^ byte);
        }
        counter += 1;
    }
    out
}

/// Process-lifetime wallet cache
///
/// The first `load` performs the (possibly interactive) store read and
/// memoizes; every later call returns the cached pool with no side effects.
pub struct CredentialCache {
    store: FileStore,
    cached: Mutex<Option<Arc<Vec<Wallet>>>>,
}

impl CredentialCache {
    pub fn new(store: FileStore) -> Self {
        Self {
            store,
            cached: Mutex::new(None),
        }
    }

    /// Load the pool, prompting for the keystore passphrase when a secret
    /// store is present. Wrong passphrases are re-prompted up to 3 times;
    /// any other failure is fatal and propagates.
    pub fn load(&self) -> Result<Arc<Vec<Wallet>>> {
        if let Some(cached) = self.cached.lock().expect("cache lock").as_ref() {
            return Ok(cached.clone());
        }

        let wallets = if self.store.has_secret_store() {
            self.unlock_interactive()?
        } else if self.store.has_plain_store() {
            self.store.load_plain()?
        } else {
            return Err(Error::NoWallets(
                "no wallets.json or keystore.json found".to_string(),
            ));
        };

        let wallets = Arc::new(wallets);
        *self.cached.lock().expect("cache lock") = Some(wallets.clone());
        Ok(wallets)
    }

    /// Non-interactive unlock for callers that already hold the passphrase
    pub fn load_with_passphrase(&self, passphrase: &str) -> Result<Arc<Vec<Wallet>>> {
        if let Some(cached) = self.cached.lock().expect("cache lock").as_ref() {
            return Ok(cached.clone());
        }

        let wallets = Arc::new(self.store.load_encrypted(passphrase)?);
        *self.cached.lock().expect("cache lock") = Some(wallets.clone());
        Ok(wallets)
    }

    fn unlock_interactive(&self) -> Result<Vec<Wallet>> {
        for attempt in 1..=3 {
            let passphrase = dialoguer::Password::new()
                .with_prompt("Keystore passphrase")
                .interact()
                .map_err(|e| Error::Keystore(format!("Passphrase prompt failed: {}", e)))?;

            match self.store.load_encrypted(&passphrase) {
                Ok(wallets) => return Ok(wallets),
                Err(Error::WrongPassphrase) if attempt < 3 => {
                    warn!("Wrong passphrase (attempt {}/3)", attempt);
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::WrongPassphrase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_plain_store(dir: &Path, count: usize) {
        let mut entries = Vec::new();
        for i in 0..count {
            let keypair = Keypair::new();
            let name = format!("wallet-{}", i + 1);
            let file = format!("{}.json", name);
            let bytes: Vec<u8> = keypair.to_bytes().to_vec();
            let path = dir.join(&file);
            std::fs::write(&path, serde_json::to_string(&bytes).unwrap()).unwrap();
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
            }
            entries.push(serde_json::json!({ "name": name, "keypair_path": file }));
        }
        let registry = serde_json::json!({ "version": "1.0", "wallets": entries });
        std::fs::write(dir.join("wallets.json"), registry.to_string()).unwrap();
    }

    #[test]
    fn test_plain_store_roundtrip() {
        let dir = tempdir().unwrap();
        write_plain_store(dir.path(), 3);

        let store = FileStore::new(dir.path());
        assert!(store.has_plain_store());
        assert!(!store.has_secret_store());

        let wallets = store.load_plain().unwrap();
        assert_eq!(wallets.len(), 3);
    }

    #[test]
    fn test_missing_stores_error() {
        let dir = tempdir().unwrap();
        let cache = CredentialCache::new(FileStore::new(dir.path()));
        assert!(matches!(cache.load(), Err(Error::NoWallets(_))));
    }

    #[test]
    fn test_keystore_roundtrip_and_wrong_passphrase() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let wallets = vec![
            Wallet::new("alpha", Keypair::new()),
            Wallet::new("beta", Keypair::new()),
        ];
        let nonce = [7u8; 16];
        store.write_keystore(&wallets, "hunter2", &nonce).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(
                dir.path().join("keystore.json"),
                std::fs::Permissions::from_mode(0o600),
            )
            .unwrap();
        }

        let loaded = store.load_encrypted("hunter2").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].pubkey(), wallets[0].pubkey());
        assert_eq!(loaded[1].pubkey(), wallets[1].pubkey());

        assert!(matches!(
            store.load_encrypted("wrong"),
            Err(Error::WrongPassphrase)
        ));
    }

    #[test]
    fn test_cache_is_memoized() {
        let dir = tempdir().unwrap();
        write_plain_store(dir.path(), 2);

        let cache = CredentialCache::new(FileStore::new(dir.path()));
        let first = cache.load().unwrap();

        // Removing the backing files must not affect later loads
        std::fs::remove_file(dir.path().join("wallets.json")).unwrap();
        let second = cache.load().unwrap();

        assert_eq!(first.len(), 2);
        assert!(Arc::ptr_eq(&first, &second));
    }
}
