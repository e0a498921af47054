use crate::address::Address;
use std::io;
use thiserror::Error;

/// Represents all possible errors that can occur while building a transaction
#[derive(Error, Debug)]
pub enum BuilderError {
    /// IO errors that occur when reading/writing data
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A ledger account lookup failed for transport reasons; the caller may retry
    #[error("account lookup failed: {0}")]
    AccountLookup(String),

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Errors from the off-chain content store
    #[error("content store error: {0}")]
    ContentStore(String),

    /// The ledger has no collectible record for the given mint
    #[error("no collectible record for mint {0}")]
    CollectibleNotFound(Address),

    /// The asset carries no collection reference, or the reference is unverified
    #[error("collection reference is missing or unverified")]
    UnverifiedCollection,

    /// The asset belongs to a different collection than the flow expects
    #[error("collection {found} does not match expected collection {expected}")]
    WrongCollection { expected: Address, found: Address },

    /// The named counter trait is absent from the attribute document, or its
    /// value does not parse as an integer
    #[error("counter trait {0:?} is missing or not an integer")]
    TraitNotFound(String),

    /// Transfer amounts are fixed positive integers
    #[error("transfer amount must be a positive integer, got {0}")]
    InvalidAmount(u64),

    /// An instruction references an account before the instruction creating it
    #[error("instruction ordering violation: {0}")]
    InstructionOrdering(String),

    /// Signature production or verification failed
    #[error("signing failed: {0}")]
    Signing(String),

    /// The transaction is missing a required signature
    #[error("missing signature for {0}")]
    MissingSignature(Address),

    /// An asset flow was invoked without an asset mint
    #[error("flow requires an asset mint")]
    MissingAssetMint,

    /// The transaction's freshness anchor expired before submission
    #[error("freshness anchor bound at slot {0} has expired")]
    StaleAnchor(u64),

    /// Generic errors that don't fit in other categories
    #[error("Other error: {0}")]
    Other(String),

    /// Anyhow error wrapper for error context
    #[error(transparent)]
    Context(#[from] anyhow::Error),
}

// Additional From conversions for common error types

impl From<bincode::Error> for BuilderError {
    fn from(err: bincode::Error) -> Self {
        BuilderError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for BuilderError {
    fn from(err: serde_json::Error) -> Self {
        BuilderError::Serialization(err.to_string())
    }
}

impl From<String> for BuilderError {
    fn from(err: String) -> Self {
        BuilderError::Other(err)
    }
}

impl From<&str> for BuilderError {
    fn from(err: &str) -> Self {
        BuilderError::Other(err.to_string())
    }
}
