use std::io;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, info, warn};

use super::difficulty::{self, Adjustment, Difficulty, TimeLimits};
use super::{Block, BlockTemplate, GENESIS_PREVIOUS_HASH};
use crate::config::Config;
use crate::error::{Error, ValidationError};
use crate::mining::{self, UNSOLVED};
use crate::wallet::{self, Identity};

/// Supplies the data of every non-genesis block.
pub trait MessageSource {
    fn read_message(&mut self) -> io::Result<String>;
}

/// Receives every sealed block; owns all presentation.
pub trait BlockSink {
    /// `difficulty` is what the next block will be sealed under.
    fn block_sealed(&mut self, block: &Block, adjustment: Adjustment, difficulty: &Difficulty);

    /// The message source failed; the block continues with an empty message.
    fn message_failed(&mut self, err: &io::Error);
}

/// Time source for block timestamps and sealing durations.
pub trait Clock {
    /// Nanoseconds since the Unix epoch.
    fn now_nanos(&mut self) -> i64;

    /// Sealing time of a search that started at `since`.
    fn elapsed(&mut self, since: Instant) -> Duration;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_nanos(&mut self) -> i64 {
        Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
    }

    fn elapsed(&mut self, since: Instant) -> Duration {
        since.elapsed()
    }
}

/// Simple in-memory blockchain with adaptive Proof-of-Work.
#[derive(Debug)]
pub struct Blockchain {
    pub chain: Vec<Block>,
    pub difficulty: Difficulty,
}

impl Blockchain {
    /// Empty chain; the first mined block becomes the genesis block.
    pub fn new(initial_zeros: usize) -> Self {
        Self {
            chain: Vec::new(),
            difficulty: Difficulty::new(initial_zeros),
        }
    }

    /// Build `config.chain_length` blocks one after another, reporting each
    /// to `sink` as soon as it is sealed.
    pub fn build<S, K>(config: &Config, source: &mut S, sink: &mut K) -> Result<Self, Error>
    where
        S: MessageSource,
        K: BlockSink,
    {
        Self::build_with(config, source, sink, &mut SystemClock)
    }

    /// [`Blockchain::build`] with an explicit time source.
    pub fn build_with<S, K, C>(
        config: &Config,
        source: &mut S,
        sink: &mut K,
        clock: &mut C,
    ) -> Result<Self, Error>
    where
        S: MessageSource,
        K: BlockSink,
        C: Clock,
    {
        config.validate()?;
        let mut bc = Self::new(config.initial_zeros);

        while bc.len() < config.chain_length {
            // The block exists (and is stamped) before its message is read.
            let timestamp = clock.now_nanos();
            let message = if bc.chain.is_empty() {
                None
            } else {
                Some(read_message(source, sink))
            };
            let adjustment =
                bc.mine_block(timestamp, message, config.miners, config.limits, clock)?;
            if let Some(block) = bc.last_block() {
                sink.block_sealed(block, adjustment, bc.difficulty());
            }
        }

        info!(
            "chain complete: {} blocks, next difficulty {}",
            bc.len(),
            bc.difficulty()
        );
        Ok(bc)
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.chain.last()
    }

    /// Seal and append the next block, then adjust the difficulty for the
    /// one after it. `message` is ignored for the genesis block.
    pub fn mine_block<C: Clock>(
        &mut self,
        timestamp: i64,
        message: Option<String>,
        miners: usize,
        limits: TimeLimits,
        clock: &mut C,
    ) -> Result<Adjustment, Error> {
        let template = self.next_template(timestamp, message)?;

        let start = Instant::now();
        let seal = mining::seal(&template, &self.difficulty, miners)?;
        let elapsed = clock.elapsed(start);

        let block = template.seal(seal, self.difficulty.zeros(), elapsed);
        debug_assert!(block.is_valid());
        let adjustment = self.difficulty.adjust(elapsed, limits);
        debug!(
            "block #{} took {:?}; difficulty {:?} -> {:?}",
            block.id,
            elapsed,
            adjustment,
            self.difficulty.prefix()
        );

        self.chain.push(block);
        Ok(adjustment)
    }

    fn next_template(&self, timestamp: i64, message: Option<String>) -> Result<BlockTemplate, Error> {
        match self.last_block() {
            None => Ok(BlockTemplate::genesis(timestamp)),
            Some(prev) => {
                let message = message.unwrap_or_default();
                let signed = Identity::generate().sign(&message)?;
                Ok(BlockTemplate::new(
                    prev.id + 1,
                    timestamp,
                    prev.hash.clone(),
                    message,
                    signed,
                ))
            }
        }
    }

    /// Re-check the whole chain: ids, proof-of-work, linkage, signatures,
    /// the genesis difficulty against `initial_zeros`, and that each later
    /// difficulty step follows from the previous block's generation time.
    pub fn validate(&self, initial_zeros: usize, limits: TimeLimits) -> Result<(), ValidationError> {
        for (i, block) in self.chain.iter().enumerate() {
            if block.id != i as u64 + 1 {
                return Err(ValidationError::OutOfOrder(block.id));
            }
            if block.nonce == UNSOLVED {
                return Err(ValidationError::Unsolved(block.id));
            }
            let computed = block.compute_hash();
            if block.hash != computed {
                return Err(ValidationError::HashMismatch {
                    id: block.id,
                    stored: block.hash.clone(),
                    computed,
                });
            }
            if !block.meets_difficulty() {
                return Err(ValidationError::DifficultyNotMet(block.id));
            }

            match i.checked_sub(1).map(|p| &self.chain[p]) {
                None => {
                    if block.previous_hash != GENESIS_PREVIOUS_HASH {
                        return Err(ValidationError::BrokenLink(block.id));
                    }
                    if block.difficulty != initial_zeros {
                        return Err(ValidationError::DifficultyStep(block.id));
                    }
                    if block.signed.is_some() {
                        return Err(ValidationError::SignedGenesis);
                    }
                }
                Some(prev) => {
                    if block.previous_hash != prev.hash {
                        return Err(ValidationError::BrokenLink(block.id));
                    }
                    let prefix = "0".repeat(prev.difficulty);
                    let (expected, _) = difficulty::adjust(&prefix, prev.generation_time, limits);
                    if expected.len() != block.difficulty {
                        return Err(ValidationError::DifficultyStep(block.id));
                    }
                    verify_signed(block)?;
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn difficulty(&self) -> &Difficulty {
        &self.difficulty
    }
}

fn verify_signed(block: &Block) -> Result<(), ValidationError> {
    let signed = block
        .signed
        .as_ref()
        .ok_or(ValidationError::MissingSignature(block.id))?;

    let expected = wallet::message_id(&block.message, &signed.public_key, &signed.signature);
    if signed.message_id != expected {
        return Err(ValidationError::MessageIdMismatch(block.id));
    }
    match wallet::verify(&block.message, &signed.public_key, &signed.signature) {
        Ok(true) => Ok(()),
        _ => Err(ValidationError::BadSignature(block.id)),
    }
}

fn read_message<S: MessageSource, K: BlockSink>(source: &mut S, sink: &mut K) -> String {
    match source.read_message() {
        Ok(message) => message,
        Err(err) => {
            warn!("message read failed, continuing with empty message: {err}");
            sink.message_failed(&err);
            String::new()
        }
    }
}
