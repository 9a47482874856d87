//! In-memory fakes for the collaborator contracts: a hash-only store client
//! and a recommendation store, both instrumented for assertions on what was
//! actually sent over the (fake) wire.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use glob_match::glob_match;

use hashlens::client::{
    ClientError, ClientFactory, ClientHandle, ClientIdentity, CommandVec, Feature,
};
use hashlens::recommendation::{Recommendation, RecommendationStore, StoreError};
use hashlens::value::Value;

#[derive(Clone, Debug)]
struct Entry {
    value: Vec<u8>,
    /// Remaining per-field TTL in seconds, when one is set.
    ttl: Option<i64>,
}

/// Emulates a hash-typed keyspace behind the adapter contract.
///
/// Scans page deterministically over the (sorted) matching fields in steps
/// of `scan_page_size`, with the cursor encoding the next offset; this keeps
/// iteration counts predictable for the termination and overshoot tests.
pub struct FakeClient {
    hashes: Mutex<BTreeMap<Vec<u8>, BTreeMap<Vec<u8>, Entry>>>,
    key_ttls: Mutex<BTreeMap<Vec<u8>, i64>>,
    /// Uppercased command names in execution order.
    pub commands: Mutex<Vec<String>>,
    field_expiration: bool,
    scan_page_size: usize,
    fail_on: Mutex<Option<(String, String)>>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self {
            hashes: Mutex::new(BTreeMap::new()),
            key_ttls: Mutex::new(BTreeMap::new()),
            commands: Mutex::new(Vec::new()),
            field_expiration: true,
            scan_page_size: 10,
            fail_on: Mutex::new(None),
        }
    }

    pub fn without_field_expiration(mut self) -> Self {
        self.field_expiration = false;
        self
    }

    pub fn with_scan_page_size(mut self, scan_page_size: usize) -> Self {
        self.scan_page_size = scan_page_size;
        self
    }

    /// Makes every subsequent occurrence of `command` fail with `message`.
    pub fn fail_command(&self, command: &str, message: &str) {
        *self.fail_on.lock().unwrap() = Some((command.to_uppercase(), message.to_string()));
    }

    pub fn command_count(&self, name: &str) -> usize {
        let name = name.to_uppercase();
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == name)
            .count()
    }

    pub fn seed_hash(&self, key: &str, fields: &[(&str, &str)]) {
        let mut hashes = self.hashes.lock().unwrap();
        let hash = hashes.entry(key.as_bytes().to_vec()).or_default();
        for (field, value) in fields {
            hash.insert(
                field.as_bytes().to_vec(),
                Entry {
                    value: value.as_bytes().to_vec(),
                    ttl: None,
                },
            );
        }
    }

    pub fn field_ttl(&self, key: &str, field: &str) -> Option<i64> {
        self.hashes
            .lock()
            .unwrap()
            .get(key.as_bytes())
            .and_then(|hash| hash.get(field.as_bytes()))
            .and_then(|entry| entry.ttl)
    }

    pub fn key_ttl(&self, key: &str) -> Option<i64> {
        self.key_ttls.lock().unwrap().get(key.as_bytes()).copied()
    }

    fn execute(&self, command: &CommandVec) -> Result<Value, ClientError> {
        let name = String::from_utf8_lossy(&command[0]).to_uppercase();
        self.commands.lock().unwrap().push(name.clone());

        if let Some((target, message)) = &*self.fail_on.lock().unwrap() {
            if *target == name {
                return Err(ClientError::Store(message.clone()));
            }
        }

        let key = command[1].to_vec();
        let mut hashes = self.hashes.lock().unwrap();

        match name.as_str() {
            "EXISTS" => Ok(Value::Integer(i64::from(hashes.contains_key(&key)))),
            "HLEN" => Ok(Value::Integer(
                hashes.get(&key).map_or(0, |hash| hash.len() as i64),
            )),
            "HSET" => {
                let hash = hashes.entry(key).or_default();
                let mut added = 0;
                for pair in command[2..].chunks(2) {
                    if hash
                        .insert(
                            pair[0].to_vec(),
                            Entry {
                                value: pair[1].to_vec(),
                                ttl: None,
                            },
                        )
                        .is_none()
                    {
                        added += 1;
                    }
                }
                Ok(Value::Integer(added))
            }
            "HGET" => {
                let value = hashes
                    .get(&key)
                    .and_then(|hash| hash.get(&command[2].to_vec()));
                Ok(match value {
                    Some(entry) => Value::Bulk(Bytes::copy_from_slice(&entry.value)),
                    None => Value::Null,
                })
            }
            "HDEL" => {
                let mut removed = 0;
                if let Some(hash) = hashes.get_mut(&key) {
                    for field in &command[2..] {
                        if hash.remove(&field.to_vec()).is_some() {
                            removed += 1;
                        }
                    }
                }
                Ok(Value::Integer(removed))
            }
            "HSCAN" => {
                // HSCAN key cursor MATCH pattern COUNT n
                let cursor: usize = String::from_utf8_lossy(&command[2]).parse().unwrap();
                let pattern = String::from_utf8_lossy(&command[4]).to_string();

                let matching: Vec<(Vec<u8>, Vec<u8>)> = hashes
                    .get(&key)
                    .map(|hash| {
                        hash.iter()
                            .filter(|(field, _)| {
                                glob_match(&pattern, &String::from_utf8_lossy(field))
                            })
                            .map(|(field, entry)| (field.clone(), entry.value.clone()))
                            .collect()
                    })
                    .unwrap_or_default();

                let page_end = (cursor + self.scan_page_size).min(matching.len());
                let mut flat = Vec::new();
                for (field, value) in &matching[cursor.min(matching.len())..page_end] {
                    flat.push(Value::Bulk(Bytes::copy_from_slice(field)));
                    flat.push(Value::Bulk(Bytes::copy_from_slice(value)));
                }
                let next_cursor = if page_end >= matching.len() { 0 } else { page_end };

                Ok(Value::Array(vec![
                    Value::Bulk(Bytes::from(next_cursor.to_string())),
                    Value::Array(flat),
                ]))
            }
            "EXPIRE" => {
                let seconds: i64 = String::from_utf8_lossy(&command[2]).parse().unwrap();
                self.key_ttls.lock().unwrap().insert(key, seconds);
                Ok(Value::Integer(1))
            }
            "HEXPIRE" => {
                // HEXPIRE key seconds FIELDS 1 field
                let seconds: i64 = String::from_utf8_lossy(&command[2]).parse().unwrap();
                let field = command[5].to_vec();
                let applied = hashes
                    .get_mut(&key)
                    .and_then(|hash| hash.get_mut(&field))
                    .map(|entry| {
                        entry.ttl = Some(seconds);
                        1
                    })
                    .unwrap_or(-2);
                Ok(Value::Array(vec![Value::Integer(applied)]))
            }
            "HPERSIST" => {
                let field = command[4].to_vec();
                let applied = hashes
                    .get_mut(&key)
                    .and_then(|hash| hash.get_mut(&field))
                    .map(|entry| {
                        entry.ttl = None;
                        1
                    })
                    .unwrap_or(-2);
                Ok(Value::Array(vec![Value::Integer(applied)]))
            }
            "HTTL" => {
                // HTTL key FIELDS n field...
                let hash = hashes.get(&key);
                let ttls = command[4..]
                    .iter()
                    .map(|field| {
                        let ttl = hash
                            .and_then(|hash| hash.get(&field.to_vec()))
                            .map_or(-2, |entry| entry.ttl.unwrap_or(-1));
                        Value::Integer(ttl)
                    })
                    .collect();
                Ok(Value::Array(ttls))
            }
            other => Err(ClientError::UnexpectedReply(format!(
                "fake client does not implement {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl ClientHandle for FakeClient {
    async fn send_command(&self, command: CommandVec) -> Result<Value, ClientError> {
        self.execute(&command)
    }

    async fn send_pipeline(
        &self,
        commands: Vec<CommandVec>,
    ) -> Result<Vec<Result<Value, ClientError>>, ClientError> {
        Ok(commands.iter().map(|c| self.execute(c)).collect())
    }

    async fn is_feature_supported(&self, feature: Feature) -> bool {
        match feature {
            Feature::HashFieldExpiration => self.field_expiration,
        }
    }
}

pub struct FakeFactory {
    pub client: Arc<FakeClient>,
}

#[async_trait]
impl ClientFactory for FakeFactory {
    async fn get_or_create_client(
        &self,
        _identity: &ClientIdentity,
    ) -> Result<Arc<dyn ClientHandle>, ClientError> {
        Ok(self.client.clone())
    }
}

/// Factory that never connects, for connection-error propagation tests.
pub struct OfflineFactory;

#[async_trait]
impl ClientFactory for OfflineFactory {
    async fn get_or_create_client(
        &self,
        _identity: &ClientIdentity,
    ) -> Result<Arc<dyn ClientHandle>, ClientError> {
        Err(ClientError::Connection("connection refused".to_string()))
    }
}

#[derive(Default)]
pub struct FakeRecommendationStore {
    pub entries: Mutex<Vec<(ClientIdentity, Recommendation)>>,
}

#[async_trait]
impl RecommendationStore for FakeRecommendationStore {
    async fn is_exist(&self, scope: &ClientIdentity, name: &str) -> Result<bool, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .any(|(s, r)| s == scope && r.name == name && !r.read))
    }

    async fn create(
        &self,
        scope: &ClientIdentity,
        recommendation: Recommendation,
    ) -> Result<Recommendation, StoreError> {
        self.entries
            .lock()
            .unwrap()
            .push((scope.clone(), recommendation.clone()));
        Ok(recommendation)
    }

    async fn list(&self, scope: &ClientIdentity) -> Result<Vec<Recommendation>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == scope)
            .map(|(_, r)| r.clone())
            .collect())
    }
}
