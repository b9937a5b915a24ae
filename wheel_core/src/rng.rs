use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::entropy::{Clock, EntropySource};

// Provably-fair construction:
// server_seed + ":" + client_seed + ":" + nonce -> SHA-256 -> first 4 bytes as u32

pub const SEED_BYTES: usize = 16;
pub const MAX_CLIENT_SEED_LEN: usize = 128;

pub fn derive_hash_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

/// First 8 hex characters of a SHA-256 digest read as an unsigned integer.
pub fn hash_prefix_u32(digest: &[u8; 32]) -> u32 {
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

pub fn random_seed_hex(entropy: &dyn EntropySource) -> String {
    let mut bytes = [0u8; SEED_BYTES];
    entropy.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeedError {
    #[error("client seed must be 1..={MAX_CLIENT_SEED_LEN} characters, got {0}")]
    InvalidClientSeed(usize),
}

/// Seed material for a single spin. Disclosing all three values lets anyone
/// recompute the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinSeeds {
    pub server_seed: String,
    pub client_seed: String,
    pub nonce: u64,
}

impl SpinSeeds {
    pub fn new(server_seed: impl Into<String>, client_seed: impl Into<String>, nonce: u64) -> Self {
        Self {
            server_seed: server_seed.into(),
            client_seed: client_seed.into(),
            nonce,
        }
    }

    /// Fresh server and client seeds, nonce from the clock in milliseconds.
    pub fn generate(entropy: &dyn EntropySource, clock: &dyn Clock) -> Self {
        Self {
            server_seed: random_seed_hex(entropy),
            client_seed: random_seed_hex(entropy),
            nonce: nonce_from(clock),
        }
    }

    /// Like [`SpinSeeds::generate`] but keeps a client-supplied seed when present.
    pub fn with_client_seed(
        entropy: &dyn EntropySource,
        clock: &dyn Clock,
        client_seed: Option<&str>,
    ) -> Result<Self, SeedError> {
        match client_seed {
            None => Ok(Self::generate(entropy, clock)),
            Some(seed) => {
                let len = seed.chars().count();
                if len == 0 || len > MAX_CLIENT_SEED_LEN {
                    return Err(SeedError::InvalidClientSeed(len));
                }
                Ok(Self {
                    server_seed: random_seed_hex(entropy),
                    client_seed: seed.to_string(),
                    nonce: nonce_from(clock),
                })
            }
        }
    }

    pub fn combined(&self) -> String {
        format!("{}:{}:{}", self.server_seed, self.client_seed, self.nonce)
    }

    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.combined().as_bytes());
        hasher.finalize().into()
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.digest())
    }

    pub fn hash_int(&self) -> u32 {
        hash_prefix_u32(&self.digest())
    }

    /// Commitment to the server seed that can be published before reveal.
    pub fn server_seed_hash_hex(&self) -> String {
        derive_hash_hex(self.server_seed.as_bytes())
    }
}

fn nonce_from(clock: &dyn Clock) -> u64 {
    u64::try_from(clock.now().timestamp_millis()).unwrap_or(0)
}
