use thiserror::Error;

/// Errors that abort a chain build.
#[derive(Debug, Error)]
pub enum Error {
    #[error("crypto failure: {0}")]
    Crypto(#[from] secp256k1::Error),

    #[error("invalid encoding: {0}")]
    Encoding(#[from] hex::FromHexError),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("miner channel closed before a seal was found")]
    ChannelClosed,
}

/// First broken invariant found while re-checking a built chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("block #{0} has no solved nonce")]
    Unsolved(u64),

    #[error("block #{id} hash mismatch: stored {stored}, computed {computed}")]
    HashMismatch {
        id: u64,
        stored: String,
        computed: String,
    },

    #[error("block #{0} hash does not meet its difficulty")]
    DifficultyNotMet(u64),

    #[error("block #{0} difficulty does not follow from the previous block")]
    DifficultyStep(u64),

    #[error("block #{0} does not link to its predecessor")]
    BrokenLink(u64),

    #[error("block #{0} has an unexpected id")]
    OutOfOrder(u64),

    #[error("block #{0} is missing its signed message")]
    MissingSignature(u64),

    #[error("genesis block must not carry a signed message")]
    SignedGenesis,

    #[error("block #{0} message id mismatch")]
    MessageIdMismatch(u64),

    #[error("block #{0} signature does not verify")]
    BadSignature(u64),
}
