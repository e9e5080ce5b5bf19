//! Error types for the GSM bridge

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Top-level bridge error
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tracing initialization failed: {0}")]
    TracingInit(String),
}

/// Control channel and voice transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Voice channel {0} already open")]
    AlreadyOpen(usize),

    #[error("Bind of {path:?} failed: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Activation of channel {index} failed: {source}")]
    Activate {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Connect to {path:?} failed: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Peer closed connection")]
    PeerClosed,

    #[error("Queue allocation failed for {0} bytes")]
    QueueExhausted(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// MNCC wire protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Truncated message: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("Frame length {0} exceeds limit")]
    FrameTooLarge(usize),
}

/// Voice codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Codec state allocation failed")]
    Allocation,

    #[error("Invalid frame length: expected {expected}, got {actual}")]
    FrameLength { expected: usize, actual: usize },

    #[error("Invalid frame magic 0x{0:x}")]
    BadMagic(u8),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Load failed: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
