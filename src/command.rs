//! Command-vector builders for the hash operations the browser issues.
//!
//! Builders are pure: they produce the exact argument vectors submitted to
//! the adapter, so batch composition stays deterministic and testable
//! without a live connection.

use bytes::Bytes;

use crate::client::CommandVec;
use crate::hash::HashField;

/// Requested expiration meaning "remove the expiration" rather than set one.
pub const PERSIST_SENTINEL: i64 = -1;

fn arg(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

fn int_arg(i: i64) -> Bytes {
    Bytes::from(i.to_string())
}

// https://redis.io/commands/hset
pub fn hset(key: &Bytes, fields: &[HashField]) -> CommandVec {
    let mut cmd = Vec::with_capacity(2 + fields.len() * 2);
    cmd.push(arg("HSET"));
    cmd.push(key.clone());
    for field in fields {
        cmd.push(field.field.clone());
        cmd.push(field.value.clone());
    }
    cmd
}

// https://redis.io/commands/hlen
pub fn hlen(key: &Bytes) -> CommandVec {
    vec![arg("HLEN"), key.clone()]
}

// https://redis.io/commands/hget
pub fn hget(key: &Bytes, field: &Bytes) -> CommandVec {
    vec![arg("HGET"), key.clone(), field.clone()]
}

// https://redis.io/commands/hdel
pub fn hdel(key: &Bytes, fields: &[Bytes]) -> CommandVec {
    let mut cmd = Vec::with_capacity(2 + fields.len());
    cmd.push(arg("HDEL"));
    cmd.push(key.clone());
    cmd.extend(fields.iter().cloned());
    cmd
}

// https://redis.io/commands/hscan
pub fn hscan(key: &Bytes, cursor: u64, pattern: &str, count: u64) -> CommandVec {
    vec![
        arg("HSCAN"),
        key.clone(),
        int_arg(cursor as i64),
        arg("MATCH"),
        arg(pattern),
        arg("COUNT"),
        int_arg(count as i64),
    ]
}

// https://redis.io/commands/exists
pub fn exists(key: &Bytes) -> CommandVec {
    vec![arg("EXISTS"), key.clone()]
}

// https://redis.io/commands/expire
pub fn expire(key: &Bytes, seconds: i64) -> CommandVec {
    vec![arg("EXPIRE"), key.clone(), int_arg(seconds)]
}

// https://redis.io/commands/hexpire
pub fn hexpire(key: &Bytes, seconds: i64, field: &Bytes) -> CommandVec {
    vec![
        arg("HEXPIRE"),
        key.clone(),
        int_arg(seconds),
        arg("FIELDS"),
        arg("1"),
        field.clone(),
    ]
}

// https://redis.io/commands/hpersist
pub fn hpersist(key: &Bytes, field: &Bytes) -> CommandVec {
    vec![
        arg("HPERSIST"),
        key.clone(),
        arg("FIELDS"),
        arg("1"),
        field.clone(),
    ]
}

// https://redis.io/commands/httl
pub fn httl(key: &Bytes, fields: &[Bytes]) -> CommandVec {
    let mut cmd = Vec::with_capacity(4 + fields.len());
    cmd.push(arg("HTTL"));
    cmd.push(key.clone());
    cmd.push(arg("FIELDS"));
    cmd.push(int_arg(fields.len() as i64));
    cmd.extend(fields.iter().cloned());
    cmd
}

/// Expire commands for every field carrying a positive per-field expiration.
///
/// Fields without an expiration and the [`PERSIST_SENTINEL`] are skipped;
/// a fresh field has nothing to persist. Callers check the
/// `HashFieldExpiration` feature flag before appending these to a batch, so
/// on servers lacking the capability no field-level command is emitted at
/// all.
pub fn field_expire_commands(key: &Bytes, fields: &[HashField]) -> Vec<CommandVec> {
    fields
        .iter()
        .filter_map(|field| match field.expire {
            Some(seconds) if seconds > 0 => Some(hexpire(key, seconds, &field.field)),
            _ => None,
        })
        .collect()
}
