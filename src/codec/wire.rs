//! Record codec
//!
//! Encoding and decoding of log records for storage.
//!
//! ## Value Format
//! ```text
//! ┌────────────┬────────────┬─────────────────────────────┐
//! │ Format (1) │ CRC32 (4)  │   Body (bincode)            │
//! └────────────┴────────────┴─────────────────────────────┘
//! ```
//!
//! The format byte only decides how `appended_at` is laid out in the body:
//! - 0x01: legacy, RFC 3339 text with nanoseconds
//! - 0x02: current, seconds + nanoseconds since the Unix epoch
//!
//! Decoding accepts both, whatever format the writer was configured with.

use bytes::{Buf, BufMut, Bytes};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

use super::{LogKind, LogRecord};

/// Header size: format (1) + CRC32 (4)
pub const HEADER_SIZE: usize = 5;

const FORMAT_LEGACY_TIME: u8 = 0x01;
const FORMAT_CURRENT_TIME: u8 = 0x02;

/// Timestamp layout written by the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFormat {
    /// RFC 3339 text, readable by every historical decoder
    #[default]
    Legacy,

    /// Compact seconds + nanoseconds pair
    Current,
}

impl TimeFormat {
    fn format_byte(self) -> u8 {
        match self {
            TimeFormat::Legacy => FORMAT_LEGACY_TIME,
            TimeFormat::Current => FORMAT_CURRENT_TIME,
        }
    }

    fn from_format_byte(byte: u8) -> Option<Self> {
        match byte {
            FORMAT_LEGACY_TIME => Some(TimeFormat::Legacy),
            FORMAT_CURRENT_TIME => Some(TimeFormat::Current),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct UnixTime {
    secs: i64,
    nanos: u32,
}

#[derive(Serialize, Deserialize)]
struct WireRecord<T> {
    index: u64,
    term: u64,
    kind: LogKind,
    data: Bytes,
    extensions: Bytes,
    appended_at: Option<T>,
}

impl<T> WireRecord<T> {
    fn from_record(record: &LogRecord, appended_at: Option<T>) -> Self {
        Self {
            index: record.index,
            term: record.term,
            kind: record.kind,
            data: record.data.clone(),
            extensions: record.extensions.clone(),
            appended_at,
        }
    }

    fn into_record(self, appended_at: Option<DateTime<Utc>>) -> LogRecord {
        LogRecord {
            index: self.index,
            term: self.term,
            kind: self.kind,
            data: self.data,
            extensions: self.extensions,
            appended_at,
        }
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a record to bytes
///
/// Format: format (1) + crc32 of body (4) + body
pub fn encode(record: &LogRecord, time_format: TimeFormat) -> Result<Vec<u8>> {
    let body = match time_format {
        TimeFormat::Legacy => {
            let at = record
                .appended_at
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Nanos, true));
            bincode::serialize(&WireRecord::from_record(record, at))
        }
        TimeFormat::Current => {
            let at = record.appended_at.map(|at| UnixTime {
                secs: at.timestamp(),
                nanos: at.timestamp_subsec_nanos(),
            });
            bincode::serialize(&WireRecord::from_record(record, at))
        }
    }
    .map_err(|e| StoreError::Encode(format!("log {}: {}", record.index, e)))?;

    let mut message = Vec::with_capacity(HEADER_SIZE + body.len());
    message.put_u8(time_format.format_byte());
    message.put_u32(crc32fast::hash(&body));
    message.put_slice(&body);

    Ok(message)
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a record from bytes written in either time format
pub fn decode(bytes: &[u8]) -> Result<LogRecord> {
    if bytes.len() < HEADER_SIZE {
        return Err(StoreError::Decode(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let (mut header, body) = bytes.split_at(HEADER_SIZE);
    let format_byte = header.get_u8();
    let expected_crc = header.get_u32();

    let time_format = TimeFormat::from_format_byte(format_byte).ok_or_else(|| {
        StoreError::Decode(format!("Unknown record format: 0x{:02x}", format_byte))
    })?;

    let actual_crc = crc32fast::hash(body);
    if actual_crc != expected_crc {
        return Err(StoreError::Decode(format!(
            "Checksum mismatch: stored {:08x}, computed {:08x}",
            expected_crc, actual_crc
        )));
    }

    match time_format {
        TimeFormat::Legacy => {
            let wire: WireRecord<String> = deserialize_body(body)?;
            let appended_at = wire.appended_at.as_deref().map(parse_rfc3339).transpose()?;
            Ok(wire.into_record(appended_at))
        }
        TimeFormat::Current => {
            let wire: WireRecord<UnixTime> = deserialize_body(body)?;
            let appended_at = wire.appended_at.as_ref().map(from_unix).transpose()?;
            Ok(wire.into_record(appended_at))
        }
    }
}

fn deserialize_body<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<WireRecord<T>> {
    bincode::deserialize(body).map_err(|e| StoreError::Decode(format!("Malformed body: {}", e)))
}

/// Layout chrono falls back to for years outside 0000..=9999 (`+10000-…`, `-0001-…`)
const SIGNED_YEAR_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

fn parse_rfc3339(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(text, SIGNED_YEAR_LAYOUT)
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
        .map_err(|e| StoreError::Decode(format!("Invalid timestamp {:?}: {}", text, e)))
}

fn from_unix(time: &UnixTime) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs, time.nanos).ok_or_else(|| {
        StoreError::Decode(format!(
            "Timestamp out of range: {}s {}ns",
            time.secs, time.nanos
        ))
    })
}
