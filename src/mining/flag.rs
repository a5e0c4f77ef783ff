use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative stop signal shared by the miners of one sealing call.
///
/// The first miner to `claim` it owns the result; every other miner sees
/// `should_stop` at the top of its next iteration and leaves.
#[derive(Debug)]
pub struct StopFlag {
    stop: AtomicBool,
}

impl StopFlag {
    pub const fn new() -> Self {
        Self {
            stop: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Returns `true` for exactly one caller.
    pub fn claim(&self) -> bool {
        self.stop
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn force_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl Default for StopFlag {
    fn default() -> Self {
        Self::new()
    }
}
