//! Bounded incremental iteration over a hash's fields.
//!
//! One [`ScanSession`] covers one call into the access layer. The session is
//! held on the calling stack only; resumption across calls happens through
//! the cursor the caller replays verbatim.
//!
//! Ref: <https://redis.io/docs/latest/commands/hscan>

use bytes::Bytes;
use itertools::Itertools;

use crate::client::{ClientError, ClientHandle};
use crate::command;
use crate::hash::HashField;
use crate::value::Value;

/// Cursor value the store returns once a scan has covered every field.
pub const SCAN_COMPLETE: u64 = 0;

/// Progress of one scan session.
#[derive(Clone, Copy, Debug, PartialEq)]
enum ScanState {
    /// No scan command issued yet; holds the caller-supplied cursor.
    Pending { cursor: u64 },
    /// At least one page consumed; holds the server-issued cursor.
    Scanning { cursor: u64 },
    /// The store reported the completion sentinel.
    Complete,
}

impl ScanState {
    fn cursor(self) -> Option<u64> {
        match self {
            ScanState::Pending { cursor } | ScanState::Scanning { cursor } => Some(cursor),
            ScanState::Complete => None,
        }
    }
}

/// Accumulated result of a scan session. `next_cursor == SCAN_COMPLETE`
/// tells the caller iteration is finished.
#[derive(Debug, PartialEq)]
pub struct ScanOutcome {
    pub next_cursor: u64,
    pub fields: Vec<HashField>,
}

pub struct ScanSession {
    key: Bytes,
    pattern: String,
    count: u64,
    state: ScanState,
    fields: Vec<HashField>,
}

impl ScanSession {
    /// `pattern` defaults to the match-everything wildcard.
    pub fn new(key: Bytes, cursor: u64, pattern: Option<&str>, count: u64) -> Self {
        Self {
            key,
            pattern: pattern.unwrap_or("*").to_string(),
            count,
            state: ScanState::Pending { cursor },
            fields: Vec::new(),
        }
    }

    /// Drives the scan until the store reports completion or the accumulator
    /// reaches the requested count.
    ///
    /// The last page is always kept whole, so the result may overshoot
    /// `count`; it may also undershoot when the scan completes first. Both
    /// are contractual: callers must not assume exact counts.
    pub async fn run(mut self, client: &dyn ClientHandle) -> Result<ScanOutcome, ClientError> {
        while let Some(cursor) = self.state.cursor() {
            if self.fields.len() as u64 >= self.count {
                break;
            }

            let reply = client
                .send_command(command::hscan(&self.key, cursor, &self.pattern, self.count))
                .await?;
            let (next_cursor, page) = parse_scan_reply(reply)?;

            self.fields.extend(page);
            self.state = if next_cursor == SCAN_COMPLETE {
                ScanState::Complete
            } else {
                ScanState::Scanning {
                    cursor: next_cursor,
                }
            };
        }

        let next_cursor = self.state.cursor().unwrap_or(SCAN_COMPLETE);
        Ok(ScanOutcome {
            next_cursor,
            fields: self.fields,
        })
    }
}

/// Splits a scan reply into the next cursor and the page of fields. The
/// store returns field names and values as one flat sequence, grouped here
/// in pairs.
fn parse_scan_reply(reply: Value) -> Result<(u64, Vec<HashField>), ClientError> {
    let malformed = |what: &str| ClientError::UnexpectedReply(format!("scan reply: {}", what));

    let mut items = reply
        .into_array()
        .ok_or_else(|| malformed("not an array"))?
        .into_iter();

    let cursor = items
        .next()
        .and_then(|v| v.as_integer())
        .filter(|cursor| *cursor >= 0)
        .ok_or_else(|| malformed("missing cursor"))? as u64;

    let flat = items
        .next()
        .and_then(Value::into_array)
        .ok_or_else(|| malformed("missing field list"))?;

    let fields = flat
        .into_iter()
        .tuples()
        .map(|(field, value)| {
            Ok(HashField {
                field: field.as_bytes().ok_or_else(|| malformed("non-string field"))?,
                value: value.as_bytes().ok_or_else(|| malformed("non-string value"))?,
                expire: None,
            })
        })
        .collect::<Result<Vec<_>, ClientError>>()?;

    Ok((cursor, fields))
}
