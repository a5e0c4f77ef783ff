use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::Difficulty;
use crate::mining::{Seal, UNSOLVED};
use crate::wallet::SignedMessage;

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Block data carried by the genesis block.
pub const GENESIS_MESSAGE: &str = "No messages";

/// SHA-256 over the concatenation `id || timestamp || nonce || previous_hash`,
/// lowercase hex.
pub fn compute_hash(id: u64, timestamp: i64, nonce: i32, previous_hash: &str) -> String {
    let preimage = format!("{id}{timestamp}{nonce}{previous_hash}");
    let mut hasher = Sha256::new();
    hasher.update(preimage.as_bytes());
    hex::encode(hasher.finalize())
}

/// Everything about a block that is fixed before the proof-of-work search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTemplate {
    pub id: u64,
    pub timestamp: i64, // nanoseconds since the Unix epoch
    pub previous_hash: String,
    pub message: String,
    pub signed: Option<SignedMessage>,
}

impl BlockTemplate {
    /// The first block: sentinel predecessor, placeholder data, no signature.
    pub fn genesis(timestamp: i64) -> Self {
        Self {
            id: 1,
            timestamp,
            previous_hash: String::from(GENESIS_PREVIOUS_HASH),
            message: String::from(GENESIS_MESSAGE),
            signed: None,
        }
    }

    pub fn new(
        id: u64,
        timestamp: i64,
        previous_hash: String,
        message: String,
        signed: SignedMessage,
    ) -> Self {
        Self {
            id,
            timestamp,
            previous_hash,
            message,
            signed: Some(signed),
        }
    }

    /// Hash this template would have under `nonce`.
    pub fn hash_with(&self, nonce: i32) -> String {
        compute_hash(self.id, self.timestamp, nonce, &self.previous_hash)
    }

    /// Freeze the template with the winning seal.
    pub fn seal(self, seal: Seal, difficulty: usize, generation_time: Duration) -> Block {
        Block {
            id: self.id,
            miner: seal.miner,
            timestamp: self.timestamp,
            nonce: seal.nonce,
            previous_hash: self.previous_hash,
            hash: seal.hash,
            message: self.message,
            signed: self.signed,
            difficulty,
            generation_time,
        }
    }
}

/// A sealed block. Never mutated once appended to a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: u64,
    pub miner: usize, // index of the winning worker
    pub timestamp: i64,
    pub nonce: i32, // "magic number"
    pub previous_hash: String,
    pub hash: String,
    pub message: String,
    pub signed: Option<SignedMessage>,
    /// Number of leading zeros required when this block was sealed.
    pub difficulty: usize,
    pub generation_time: Duration,
}

impl Block {
    pub fn is_genesis(&self) -> bool {
        self.id == 1
    }

    pub fn created_by(&self) -> String {
        format!("miner{}", self.miner)
    }

    /// Recompute the hash from the block's own fields.
    pub fn compute_hash(&self) -> String {
        compute_hash(self.id, self.timestamp, self.nonce, &self.previous_hash)
    }

    /// Hash integrity plus proof-of-work at the recorded difficulty.
    /// (Does NOT check linkage or signatures.)
    pub fn is_valid(&self) -> bool {
        self.nonce != UNSOLVED && self.hash == self.compute_hash() && self.meets_difficulty()
    }

    /// Stored hash carries the recorded number of leading zeros.
    pub fn meets_difficulty(&self) -> bool {
        Difficulty::new(self.difficulty).is_met_by(&self.hash)
    }
}
