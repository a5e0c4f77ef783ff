//! Parallel proof-of-work search.
//!
//! A sealing call races a fixed pool of miners. Each miner samples random
//! nonces until one yields a hash with the required prefix; the first miner
//! to claim the shared [`StopFlag`] publishes its result on a single-slot
//! channel and everyone else stops at the top of their next iteration.
//!
//! There is no timeout: a prefix close to the full hash length will keep the
//! miners busy indefinitely.

mod flag;

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use flume::{Receiver, Sender};
use log::debug;
use rand::Rng;

use crate::blockchain::{BlockTemplate, Difficulty};
use crate::error::Error;

pub use flag::StopFlag;

/// Nonce of a block that has not been sealed. Never accepted as a solution.
pub const UNSOLVED: i32 = -1;

/// Winning proof-of-work for one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seal {
    pub nonce: i32,
    pub hash: String,
    pub miner: usize,
}

/// Seal `template` with `miners` workers drawing nonces uniformly from
/// `[0, i32::MAX]`.
pub fn seal(template: &BlockTemplate, difficulty: &Difficulty, miners: usize) -> Result<Seal, Error> {
    seal_with(template, difficulty, miners, |_| {
        rand::thread_rng().gen_range(0..=i32::MAX)
    })
}

/// Same as [`seal`] with a caller-supplied nonce sampler, called with the
/// miner index for every attempt.
pub fn seal_with<F>(
    template: &BlockTemplate,
    difficulty: &Difficulty,
    miners: usize,
    sample: F,
) -> Result<Seal, Error>
where
    F: Fn(usize) -> i32 + Sync,
{
    if miners == 0 {
        return Err(Error::InvalidConfig("miners must be >= 1".into()));
    }
    let stop = StopFlag::new();
    let tries = AtomicU64::new(0);
    let (tx, rx): (Sender<Seal>, Receiver<Seal>) = flume::bounded(1);

    let result = thread::scope(|s| {
        for miner in 0..miners {
            let worker_tx = tx.clone();
            let (stop, tries, sample) = (&stop, &tries, &sample);
            s.spawn(move || {
                worker_loop(miner, template, difficulty, stop, tries, sample, worker_tx);
            });
        }
        drop(tx);

        let result = rx.recv();
        stop.force_stop();
        result
    });

    let seal = result.map_err(|_| Error::ChannelClosed)?;
    debug!(
        "block #{} sealed by miner{} nonce={} diff={} tries={}",
        template.id,
        seal.miner,
        seal.nonce,
        difficulty.zeros(),
        tries.load(Ordering::Relaxed)
    );
    Ok(seal)
}

fn worker_loop<F>(
    miner: usize,
    template: &BlockTemplate,
    difficulty: &Difficulty,
    stop: &StopFlag,
    tries: &AtomicU64,
    sample: &F,
    tx: Sender<Seal>,
) where
    F: Fn(usize) -> i32 + Sync,
{
    while !stop.should_stop() {
        let nonce = sample(miner);
        let hash = template.hash_with(nonce);
        tries.fetch_add(1, Ordering::Relaxed);

        if nonce == UNSOLVED || !difficulty.is_met_by(&hash) {
            continue;
        }
        // Losers of the claim drop their hit.
        if stop.claim() {
            let _ = tx.send(Seal { nonce, hash, miner });
        }
        break;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn template() -> BlockTemplate {
        BlockTemplate::genesis(1_700_000_000_000_000_000)
    }

    /// First non-negative nonce whose hash does / does not start with `prefix`.
    fn find_nonce(t: &BlockTemplate, prefix: &str, matching: bool) -> i32 {
        (0..i32::MAX)
            .find(|n| t.hash_with(*n).starts_with(prefix) == matching)
            .unwrap()
    }

    #[test]
    fn zero_difficulty_takes_one_attempt() {
        let attempts = AtomicUsize::new(0);
        let t = template();
        let seal = seal_with(&t, &Difficulty::default(), 1, |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            42
        })
        .unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(seal.nonce, 42);
        assert_eq!(seal.hash, t.hash_with(42));
        assert_eq!(seal.miner, 0);
    }

    #[test]
    fn sentinel_nonce_never_wins_even_at_zero_difficulty() {
        let t = template();
        let seal = seal_with(&t, &Difficulty::default(), 2, |miner| {
            if miner == 0 { UNSOLVED } else { 9 }
        })
        .unwrap();

        assert_eq!(seal.miner, 1);
        assert_eq!(seal.nonce, 9);
    }

    #[test]
    fn rigged_miner_always_wins() {
        let t = template();
        let difficulty = Difficulty::new(1);
        let good = find_nonce(&t, "0", true);
        let bad = find_nonce(&t, "0", false);

        let seal = seal_with(&t, &difficulty, 10, |miner| if miner == 7 { good } else { bad })
            .unwrap();

        assert_eq!(seal.miner, 7);
        assert_eq!(seal.nonce, good);
        assert_eq!(seal.hash, t.hash_with(good));
    }

    #[test]
    fn random_search_meets_difficulty() {
        let t = template();
        let difficulty = Difficulty::new(2);
        let seal = seal(&t, &difficulty, 4).unwrap();

        assert!(seal.hash.starts_with("00"));
        assert_ne!(seal.nonce, UNSOLVED);
        assert!(seal.nonce >= 0);
        assert!(seal.miner < 4);
        assert_eq!(seal.hash, t.hash_with(seal.nonce));
    }

    #[test]
    fn empty_pool_is_rejected() {
        let err = seal(&template(), &Difficulty::default(), 0).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
