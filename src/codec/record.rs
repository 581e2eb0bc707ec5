//! Log record definitions
//!
//! Represents one consensus log entry as handed over by the consensus layer.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Log entry kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum LogKind {
    /// Application command
    #[default]
    Command = 0x00,

    /// Leader no-op asserting leadership
    Noop = 0x01,

    /// Barrier used to wait for preceding entries to apply
    Barrier = 0x02,

    /// Cluster membership configuration
    Configuration = 0x03,
}

/// A single consensus log entry
///
/// Everything except `index` is payload owned by the consensus layer; the
/// store only round-trips it through the codec.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogRecord {
    /// Position in the log (assigned by the consensus layer)
    pub index: u64,

    /// Election term the entry was created in
    pub term: u64,

    /// Entry kind
    pub kind: LogKind,

    /// Opaque entry data
    pub data: Bytes,

    /// Opaque extension data
    pub extensions: Bytes,

    /// When the leader appended the entry, if recorded
    pub appended_at: Option<DateTime<Utc>>,
}

impl LogRecord {
    /// Create a command entry with the given data
    pub fn new(index: u64, term: u64, data: impl Into<Bytes>) -> Self {
        Self {
            index,
            term,
            data: data.into(),
            ..Self::default()
        }
    }

    /// Set the entry kind
    pub fn with_kind(mut self, kind: LogKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the extension data
    pub fn with_extensions(mut self, extensions: impl Into<Bytes>) -> Self {
        self.extensions = extensions.into();
        self
    }

    /// Set the append timestamp
    pub fn with_appended_at(mut self, at: DateTime<Utc>) -> Self {
        self.appended_at = Some(at);
        self
    }
}
