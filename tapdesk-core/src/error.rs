//! Error types for `Tapdesk`
//!
//! This module defines the error types used by the input translation,
//! protocol encoding, clipboard and configuration layers.
//!
//! Missing key mappings are not errors: the translator drops those events.
//! Malformed clipboard messages are logged and skipped by the reader; only
//! failures that a caller must act on are represented here.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for `Tapdesk` operations
#[derive(Debug, Error)]
pub enum TapdeskError {
    /// Protocol encoder errors
    #[error("Encoder error: {0}")]
    Encode(#[from] EncodeError),

    /// Extended Clipboard errors
    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),

    /// Keyboard layout errors
    #[error("Keyboard layout error: {0}")]
    Layout(#[from] LayoutError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while transmitting input events to the remote side
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The underlying stream or session handle failed
    #[error("Transmission failed: {0}")]
    Io(#[from] std::io::Error),

    /// The key belongs to another protocol's code space
    #[error("{protocol} encoder cannot send key {key}")]
    UnsupportedKey {
        /// Protocol name of the encoder
        protocol: &'static str,
        /// Description of the rejected key
        key: String,
    },

    /// The per-session output lock was poisoned by a panicking writer
    #[error("Output lock poisoned")]
    LockPoisoned,
}

/// Errors related to the Extended Clipboard protocol
#[derive(Debug, Error)]
pub enum ClipboardError {
    /// Reading or writing the RFB stream failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Inflating a PROVIDE payload failed
    #[error("Failed to decompress clipboard data: {0}")]
    Decompress(String),

    /// Deflating outbound clipboard text failed
    #[error("Failed to compress clipboard data: {0}")]
    Compress(String),

    /// The per-session output lock was poisoned by a panicking writer
    #[error("Output lock poisoned")]
    LockPoisoned,
}

/// Errors related to SPICE keyboard layout tables
#[derive(Debug, Error)]
pub enum LayoutError {
    /// Neither the requested nor the default layout could be found
    #[error("Keyboard layout not found: {0}")]
    NotFound(PathBuf),

    /// The layout name is not a plain file name
    #[error("Invalid keyboard layout name: {0:?}")]
    InvalidName(String),

    /// A line of the layout table could not be parsed
    #[error("Invalid layout entry on line {line}: {reason}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// The reason for the parse failure
        reason: String,
    },

    /// I/O error while reading a layout file
    #[error("IO error reading layout: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to configuration file operations
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration file
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {reason}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// The reason for validation failure
        reason: String,
    },

    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to write configuration file
    #[error("Failed to write configuration: {0}")]
    Write(String),

    /// Failed to serialize configuration
    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),

    /// Failed to deserialize configuration
    #[error("Failed to deserialize configuration: {0}")]
    Deserialize(String),
}

/// Result type alias for `Tapdesk` operations
pub type Result<T> = std::result::Result<T, TapdeskError>;

/// Result type alias for encoder operations
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;

/// Result type alias for clipboard operations
pub type ClipboardResult<T> = std::result::Result<T, ClipboardError>;

/// Result type alias for layout operations
pub type LayoutResult<T> = std::result::Result<T, LayoutError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
