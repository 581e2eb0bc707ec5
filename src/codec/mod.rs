//! Codec Module
//!
//! Serialization of log records into engine values.
//!
//! The store treats everything but the index as an opaque payload: records go
//! in through `encode` and come back out of `decode` unchanged. A single switch,
//! [`TimeFormat`], picks how timestamps are written; both layouts decode.

mod record;
mod wire;

pub use record::{LogKind, LogRecord};
pub use wire::{decode, encode, TimeFormat, HEADER_SIZE};
