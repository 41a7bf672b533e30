//! Error types for every fallible boundary in the consumer core.

use thiserror::Error;

/// Errors returned by [`crate::sequence_index::SequenceIndex`] operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SequenceIndexError {
    #[error("key {0:?} already present in sequence index")]
    AlreadyPresent(dafka_proto::SequenceKey),
    #[error("key {0:?} absent from sequence index")]
    Absent(dafka_proto::SequenceKey),
    #[error("update of {key:?} would regress sequence from {current} to {attempted}")]
    Regression {
        key: dafka_proto::SequenceKey,
        current: u64,
        attempted: u64,
    },
}

/// Errors surfaced by the transport layer (subscriber/publisher/beacon).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("subscriber socket error: {0}")]
    Subscribe(String),
    #[error("publisher send failed: {0}")]
    Send(String),
    #[error("beacon error: {0}")]
    Beacon(String),
    #[error("transport channel closed")]
    Closed,
}

/// Errors from loading a [`crate::config::ConsumerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for consumer/offset/reset: {0:?} (expected \"earliest\" or \"latest\")")]
    InvalidReset(String),
    #[error("invalid value for consumer/verbose: {0:?} (expected \"0\" or \"1\")")]
    InvalidVerbose(String),
}
