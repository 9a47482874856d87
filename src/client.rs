//! Collaborator contracts for the command client adapter.
//!
//! The access layer never touches the wire protocol. It builds command
//! vectors and hands them to a [`ClientHandle`] resolved per call from a
//! [`ClientFactory`]; the adapter owns encoding, decoding, deadlines and
//! reconnection.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error as ThisError;

use crate::value::Value;

/// A single command as submitted to the adapter: name followed by its
/// arguments, every part binary-safe.
pub type CommandVec = Vec<Bytes>;

/// Identifies the logical connection a call runs against: a configured
/// database plus its logical db index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClientIdentity {
    pub database_id: String,
    pub db: u32,
}

impl ClientIdentity {
    pub fn new(database_id: impl Into<String>, db: u32) -> Self {
        Self {
            database_id: database_id.into(),
            db,
        }
    }
}

/// Capabilities that differ across server versions. Resolved once per
/// connection by the adapter and cached for the connection's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, Display, EnumString)]
pub enum Feature {
    /// Per-field TTLs on hashes (HEXPIRE / HPERSIST / HTTL).
    #[strum(serialize = "hashFieldExpiration")]
    HashFieldExpiration,
}

#[derive(Clone, Debug, ThisError, PartialEq)]
pub enum ClientError {
    /// An error reply from the store, verbatim (e.g. "WRONGTYPE ...").
    #[error("{0}")]
    Store(String),
    #[error("connection error: {0}")]
    Connection(String),
    /// The reply did not have the shape the issued command implies.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

impl ClientError {
    pub fn message(&self) -> &str {
        match self {
            ClientError::Store(message)
            | ClientError::Connection(message)
            | ClientError::UnexpectedReply(message) => message,
        }
    }
}

/// One logical connection to the store.
#[async_trait]
pub trait ClientHandle: Send + Sync {
    async fn send_command(&self, command: CommandVec) -> Result<Value, ClientError>;

    /// Submits an ordered batch. The transport executes every entry in
    /// submission order and reports each outcome independently; applied
    /// writes are not rolled back when a later entry fails.
    async fn send_pipeline(
        &self,
        commands: Vec<CommandVec>,
    ) -> Result<Vec<Result<Value, ClientError>>, ClientError>;

    async fn is_feature_supported(&self, feature: Feature) -> bool;
}

/// Resolves a ready client handle for an identity. Pooling and session
/// affinity live behind this trait; the access layer asks for a fresh handle
/// on every call and caches nothing between calls.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn get_or_create_client(
        &self,
        identity: &ClientIdentity,
    ) -> Result<Arc<dyn ClientHandle>, ClientError>;
}
