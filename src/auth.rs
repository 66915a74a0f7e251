use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

// 32 bytes = 256 bits of entropy
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("failed to write token file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to encode token file: {0}")]
    Encode(#[from] serde_json::Error),
}

// One stored token - only the digest ever reaches disk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenRecord {
    pub hash: String,
    pub created: f64, // unix seconds
}

// Token name -> record, kept in a JSON file
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Generate a token, store its digest under `name` (replacing any earlier
    // one) and hand back the raw token. It cannot be recovered later.
    pub fn issue(&self, name: &str) -> Result<String, TokenStoreError> {
        let token = generate_token();

        let mut records = self.load();
        records.insert(
            name.to_string(),
            TokenRecord {
                hash: hash_token(&token),
                created: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
            },
        );

        let json = serde_json::to_string_pretty(&records)?;
        std::fs::write(&self.path, json).map_err(|source| TokenStoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        tracing::info!(name = %name, path = %self.path.display(), "issued API token");
        Ok(token)
    }

    pub fn validate(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }

        let digest = hash_token(token);
        self.load().values().any(|record| record.hash == digest)
    }

    // Missing, unreadable or corrupt files all read as "no tokens"
    pub fn load(&self) -> BTreeMap<String, TokenRecord> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), "cannot read token file: {}", e);
                }
                return BTreeMap::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), "ignoring corrupt token file: {}", e);
            BTreeMap::new()
        })
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

// hex sha-256 of the token text
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
