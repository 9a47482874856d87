//! Field-level CRUD over hash-typed keys.
//!
//! [`HashBrowser`] is a pure orchestrator: it owns no persistent state,
//! resolves a fresh client handle per call and translates each request into
//! an ordered command batch. Commands within a batch execute in submission
//! order with no rollback; partial failures are reported, never undone.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::client::{ClientError, ClientFactory, ClientHandle, ClientIdentity, Feature};
use crate::command;
use crate::error::{check_batch, classify, BrowserError};
use crate::pattern;
use crate::recommendation::{RecommendationName, RecommendationService};
use crate::scan::{ScanOutcome, ScanSession, SCAN_COMPLETE};
use crate::Result;

/// Page hint for incremental scans when the caller does not supply one.
pub const SCAN_COUNT_DEFAULT: u64 = 500;

/// Tunables for incremental scanning.
#[derive(Clone, Copy, Debug)]
pub struct ScanConfig {
    pub count_default: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            count_default: SCAN_COUNT_DEFAULT,
        }
    }
}

/// One named sub-value of a hash key. `expire` carries the requested
/// per-field TTL (seconds) on writes and the observed remaining TTL on
/// reads.
#[derive(Clone, Debug, PartialEq)]
pub struct HashField {
    pub field: Bytes,
    pub value: Bytes,
    pub expire: Option<i64>,
}

impl HashField {
    pub fn new(field: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            expire: None,
        }
    }

    pub fn with_expire(field: impl Into<Bytes>, value: impl Into<Bytes>, expire: i64) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            expire: Some(expire),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateHashRequest {
    pub key: Bytes,
    pub fields: Vec<HashField>,
    /// Whole-key expiration, applied alongside creation.
    pub expire: Option<i64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AddFieldsRequest {
    pub key: Bytes,
    pub fields: Vec<HashField>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GetFieldsRequest {
    pub key: Bytes,
    /// Starting cursor; replay the previous response's `next_cursor` to
    /// resume.
    pub cursor: u64,
    pub match_pattern: Option<String>,
    pub count: Option<u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GetFieldsResponse {
    pub key: Bytes,
    /// Total number of fields in the hash, not just the returned page.
    pub total: u64,
    /// Zero when iteration is finished.
    pub next_cursor: u64,
    pub fields: Vec<HashField>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldTtlUpdate {
    pub field: Bytes,
    /// Seconds, or [`command::PERSIST_SENTINEL`] to remove the expiration.
    pub expire: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpdateFieldsTtlRequest {
    pub key: Bytes,
    pub fields: Vec<FieldTtlUpdate>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeleteFieldsRequest {
    pub key: Bytes,
    pub fields: Vec<Bytes>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeleteFieldsResponse {
    /// Number of fields actually removed; missing fields are not an error.
    pub affected: u64,
}

/// The field-collection service.
pub struct HashBrowser {
    factory: Arc<dyn ClientFactory>,
    recommendations: RecommendationService,
    scan_config: ScanConfig,
}

impl HashBrowser {
    pub fn new(factory: Arc<dyn ClientFactory>, recommendations: RecommendationService) -> Self {
        Self {
            factory,
            recommendations,
            scan_config: ScanConfig::default(),
        }
    }

    pub fn with_scan_config(mut self, scan_config: ScanConfig) -> Self {
        self.scan_config = scan_config;
        self
    }

    async fn client(&self, identity: &ClientIdentity) -> Result<Arc<dyn ClientHandle>> {
        self.factory
            .get_or_create_client(identity)
            .await
            .map_err(|err| BrowserError::Connection(err.message().to_string()))
    }

    async fn key_exists(client: &dyn ClientHandle, key: &Bytes) -> Result<bool> {
        let reply = client
            .send_command(command::exists(key))
            .await
            .map_err(classify)?;
        Ok(reply.as_integer().unwrap_or(0) > 0)
    }

    /// Creates a hash key with the given fields. Fails with
    /// [`BrowserError::AlreadyExists`] when the key is present.
    ///
    /// The batch is ordered: set-fields first, then the optional whole-key
    /// expire, then per-field expires when the connection supports them.
    pub async fn create_hash(
        &self,
        identity: &ClientIdentity,
        request: CreateHashRequest,
    ) -> Result<()> {
        debug!("creating hash data type");
        let client = self.client(identity).await?;

        if Self::key_exists(client.as_ref(), &request.key).await? {
            return Err(BrowserError::AlreadyExists);
        }

        let mut commands = vec![command::hset(&request.key, &request.fields)];
        if let Some(expire) = request.expire {
            commands.push(command::expire(&request.key, expire));
        }
        if client.is_feature_supported(Feature::HashFieldExpiration).await {
            commands.extend(command::field_expire_commands(&request.key, &request.fields));
        }

        let results = client.send_pipeline(commands).await.map_err(classify)?;
        check_batch(results)?;

        info!("created hash with {} fields", request.fields.len());
        Ok(())
    }

    /// Returns a page of fields. A literal (non-glob) match pattern takes a
    /// direct point-lookup path with the cursor forced to completion;
    /// anything else runs an incremental scan.
    ///
    /// Remaining per-field TTLs are enrichment only: a failed lookup is
    /// logged and the response still returned.
    pub async fn get_fields(
        &self,
        identity: &ClientIdentity,
        request: GetFieldsRequest,
    ) -> Result<GetFieldsResponse> {
        debug!("getting fields of hash data type");
        let client = self.client(identity).await?;

        let total = client
            .send_command(command::hlen(&request.key))
            .await
            .map_err(classify)?
            .as_integer()
            .unwrap_or(0);
        if total <= 0 {
            return Err(BrowserError::NotFound);
        }
        let total = total as u64;

        let (next_cursor, mut fields) = match request.match_pattern.as_deref() {
            Some(match_pattern) if !pattern::is_glob(match_pattern) => {
                let field = Bytes::from(pattern::unescape(match_pattern));
                let value = client
                    .send_command(command::hget(&request.key, &field))
                    .await
                    .map_err(classify)?;
                let fields = match value.as_bytes() {
                    Some(value) => vec![HashField {
                        field,
                        value,
                        expire: None,
                    }],
                    None => Vec::new(),
                };
                (SCAN_COMPLETE, fields)
            }
            match_pattern => {
                let count = request.count.unwrap_or(self.scan_config.count_default);
                let session =
                    ScanSession::new(request.key.clone(), request.cursor, match_pattern, count);
                let ScanOutcome {
                    next_cursor,
                    fields,
                } = session.run(client.as_ref()).await.map_err(classify)?;
                (next_cursor, fields)
            }
        };

        if let Err(err) =
            Self::enrich_field_ttls(client.as_ref(), &request.key, &mut fields).await
        {
            warn!("unable to get ttl for hash fields: {}", err);
        }

        self.recommendations
            .check(
                identity,
                RecommendationName::BigHashes,
                &json!({
                    "total": total,
                    "keyName": String::from_utf8_lossy(&request.key),
                }),
            )
            .await;

        Ok(GetFieldsResponse {
            key: request.key,
            total,
            next_cursor,
            fields,
        })
    }

    /// Best-effort TTL enrichment. Applied uniformly after both the
    /// point-lookup and the scan path.
    async fn enrich_field_ttls(
        client: &dyn ClientHandle,
        key: &Bytes,
        fields: &mut [HashField],
    ) -> std::result::Result<(), ClientError> {
        if fields.is_empty()
            || !client.is_feature_supported(Feature::HashFieldExpiration).await
        {
            return Ok(());
        }

        let names: Vec<Bytes> = fields.iter().map(|f| f.field.clone()).collect();
        let reply = client.send_command(command::httl(key, &names)).await?;
        let ttls = reply.into_array().ok_or_else(|| {
            ClientError::UnexpectedReply("ttl reply is not an array".to_string())
        })?;

        // Index-wise assignment; fields past the reply length stay untouched.
        for (field, ttl) in fields.iter_mut().zip(ttls) {
            field.expire = ttl.as_integer();
        }
        Ok(())
    }

    /// Adds fields to an existing hash. Fails with
    /// [`BrowserError::NotFound`] when the key is absent, which is what
    /// distinguishes this from [`HashBrowser::create_hash`].
    pub async fn add_fields(
        &self,
        identity: &ClientIdentity,
        request: AddFieldsRequest,
    ) -> Result<()> {
        debug!("adding fields to hash data type");
        let client = self.client(identity).await?;

        if !Self::key_exists(client.as_ref(), &request.key).await? {
            return Err(BrowserError::NotFound);
        }

        let mut commands = vec![command::hset(&request.key, &request.fields)];
        if client.is_feature_supported(Feature::HashFieldExpiration).await {
            commands.extend(command::field_expire_commands(&request.key, &request.fields));
        }

        let results = client.send_pipeline(commands).await.map_err(classify)?;
        check_batch(results)?;
        Ok(())
    }

    /// Updates per-field expirations. The sentinel `-1` removes a field's
    /// expiration; any other value sets it. An empty update list returns
    /// immediately with zero network operations.
    pub async fn update_fields_ttl(
        &self,
        identity: &ClientIdentity,
        request: UpdateFieldsTtlRequest,
    ) -> Result<()> {
        if request.fields.is_empty() {
            return Ok(());
        }

        debug!("updating hash fields ttl");
        let client = self.client(identity).await?;

        if !Self::key_exists(client.as_ref(), &request.key).await? {
            return Err(BrowserError::NotFound);
        }

        let commands = request
            .fields
            .iter()
            .map(|update| {
                if update.expire == command::PERSIST_SENTINEL {
                    command::hpersist(&request.key, &update.field)
                } else {
                    command::hexpire(&request.key, update.expire, &update.field)
                }
            })
            .collect();

        let results = client.send_pipeline(commands).await.map_err(classify)?;
        check_batch(results)?;
        Ok(())
    }

    /// Deletes fields from an existing hash and returns how many were
    /// actually removed.
    pub async fn delete_fields(
        &self,
        identity: &ClientIdentity,
        request: DeleteFieldsRequest,
    ) -> Result<DeleteFieldsResponse> {
        debug!("deleting fields from hash data type");
        let client = self.client(identity).await?;

        if !Self::key_exists(client.as_ref(), &request.key).await? {
            return Err(BrowserError::NotFound);
        }

        let reply = client
            .send_command(command::hdel(&request.key, &request.fields))
            .await
            .map_err(classify)?;
        let affected = reply.as_integer().unwrap_or(0).max(0) as u64;

        Ok(DeleteFieldsResponse { affected })
    }
}
