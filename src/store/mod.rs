//! Secure at-rest storage for the bearer credential and cached profile.
//!
//! Three independent entries under the app data directory, mirroring the
//! mobile secure-store keys `auth_token` / `user` / `auth_expiresUtc`:
//! each is a separate file sealed with AES-256-GCM under a key generated
//! into the same directory on first use.
//!
//! ## Crash policy
//! Writes are forward-only.  A crash between the token and user writes is
//! not corruption: `load` reads whatever entries decode, and a token with
//! no user entry comes back as "logged in, profile unknown".  An entry
//! that fails to unseal is dropped with a warning, never a hard error.

use crate::api::User;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// AES-GCM nonce size (12 bytes / 96 bits).
const NONCE_SIZE: usize = 12;

/// Prefix marking a sealed value.
const SEALED_PREFIX: &str = "aes256:";

/// Sealing key file inside the store directory.
const KEY_FILE: &str = "credential.key";

/// Entry holding the bearer token.
const TOKEN_ENTRY: &str = "auth_token.sec";

/// Entry holding the JSON user snapshot.
const USER_ENTRY: &str = "user.sec";

/// Entry holding the RFC 3339 token expiry.
const EXPIRY_ENTRY: &str = "auth_expires_utc.sec";

/// Credential store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential store I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credential store crypto: {0}")]
    Crypto(String),

    #[error("credential store serialization: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable projection of a session.  `user` stays optional: a token whose
/// companion user entry was lost mid-write reads back as a session with an
/// unknown profile rather than as corruption.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAuthRecord {
    pub token: String,
    pub user: Option<User>,
    pub expires_utc: Option<DateTime<Utc>>,
}

/// Encrypted key-value store for the three auth entries.  Only the session
/// controller writes through it.
pub struct SecureCredentialStore {
    dir: PathBuf,
    key: [u8; 32],
}

impl SecureCredentialStore {
    /// Open the store under the app data directory, generating the sealing
    /// key on first use.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;

        let key_path = dir.join(KEY_FILE);
        let key = if key_path.exists() {
            let bytes = std::fs::read(&key_path).map_err(|e| io_err(&key_path, e))?;
            if bytes.len() != 32 {
                return Err(StoreError::Crypto(format!(
                    "sealing key must be 32 bytes, got {}",
                    bytes.len()
                )));
            }
            let mut key = [0u8; 32];
            key.copy_from_slice(&bytes);
            key
        } else {
            let mut key = [0u8; 32];
            OsRng.fill_bytes(&mut key);
            std::fs::write(&key_path, key).map_err(|e| io_err(&key_path, e))?;
            key
        };

        Ok(Self { dir, key })
    }

    /// Persist a record.  Token first, then user, then expiry; a failure
    /// part-way is left for the next `load` to clarify.
    pub fn save(&self, record: &StoredAuthRecord) -> Result<(), StoreError> {
        self.write_entry(TOKEN_ENTRY, &record.token)?;

        match &record.user {
            Some(user) => self.write_entry(USER_ENTRY, &serde_json::to_string(user)?)?,
            None => self.remove_entry(USER_ENTRY)?,
        }

        match record.expires_utc {
            Some(ts) => self.write_entry(EXPIRY_ENTRY, &ts.to_rfc3339())?,
            None => self.remove_entry(EXPIRY_ENTRY)?,
        }

        Ok(())
    }

    /// Load the persisted record, if any.  No token entry means logged out.
    pub fn load(&self) -> Result<Option<StoredAuthRecord>, StoreError> {
        let Some(token) = self.read_entry(TOKEN_ENTRY)? else {
            return Ok(None);
        };

        let user = match self.read_entry(USER_ENTRY)? {
            Some(json) => match serde_json::from_str(&json) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::warn!("Cached user entry is undecodable, profile unknown: {e}");
                    None
                }
            },
            None => None,
        };

        let expires_utc = match self.read_entry(EXPIRY_ENTRY)? {
            Some(text) => match DateTime::parse_from_rfc3339(&text) {
                Ok(ts) => Some(ts.with_timezone(&Utc)),
                Err(e) => {
                    tracing::warn!("Cached expiry entry is undecodable, dropping it: {e}");
                    None
                }
            },
            None => None,
        };

        Ok(Some(StoredAuthRecord {
            token,
            user,
            expires_utc,
        }))
    }

    /// Remove all three entries.  Token goes first so a partial clear still
    /// reads back as logged out.  Missing entries are not errors; the first
    /// real I/O error is reported after every entry was attempted.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut first_err = None;
        for entry in [TOKEN_ENTRY, USER_ENTRY, EXPIRY_ENTRY] {
            if let Err(e) = self.remove_entry(entry) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn write_entry(&self, name: &str, plaintext: &str) -> Result<(), StoreError> {
        let path = self.dir.join(name);
        let sealed = self.seal(plaintext)?;
        std::fs::write(&path, sealed).map_err(|e| io_err(&path, e))
    }

    fn read_entry(&self, name: &str) -> Result<Option<String>, StoreError> {
        let path = self.dir.join(name);
        let sealed = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path, e)),
        };

        match self.unseal(&sealed) {
            Ok(plaintext) => Ok(Some(plaintext)),
            Err(e) => {
                tracing::warn!("Entry {name} failed to unseal, ignoring it: {e}");
                Ok(None)
            }
        }
    }

    fn remove_entry(&self, name: &str) -> Result<(), StoreError> {
        let path = self.dir.join(name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&path, e)),
        }
    }

    /// Seal plaintext as `aes256:<base64(nonce + ciphertext)>`.
    fn seal(&self, plaintext: &str) -> Result<String, StoreError> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| StoreError::Crypto(format!("cipher init failed: {e}")))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| StoreError::Crypto(format!("encryption failed: {e}")))?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        let encoded = base64::engine::general_purpose::STANDARD.encode(&combined);
        Ok(format!("{SEALED_PREFIX}{encoded}"))
    }

    fn unseal(&self, sealed: &str) -> Result<String, StoreError> {
        let encoded = sealed
            .strip_prefix(SEALED_PREFIX)
            .ok_or_else(|| StoreError::Crypto("missing sealed-value prefix".into()))?;

        let combined = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| StoreError::Crypto(format!("base64 decode failed: {e}")))?;

        if combined.len() < NONCE_SIZE {
            return Err(StoreError::Crypto("sealed value too short".into()));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| StoreError::Crypto(format!("cipher init failed: {e}")))?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| StoreError::Crypto(format!("decryption failed: {e}")))?;

        String::from_utf8(plaintext).map_err(|e| StoreError::Crypto(format!("invalid UTF-8: {e}")))
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}
