pub mod block;
pub mod difficulty;
pub mod model;

pub use block::{Block, BlockTemplate, GENESIS_PREVIOUS_HASH};
pub use difficulty::{Adjustment, Difficulty, TimeLimits};
pub use model::{BlockSink, Blockchain, MessageSource};
