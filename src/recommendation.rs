//! Heuristic recommendations over observed key metadata.
//!
//! Rules are pure predicates evaluated opportunistically after data-access
//! operations. The scanner is stateless and may be called redundantly; the
//! once-per-scope guard lives in [`RecommendationService::check`], and
//! persistence belongs to the external [`RecommendationStore`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use strum_macros::{AsRefStr, Display, EnumString};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::ClientIdentity;

/// Fields-per-hash count above which the `bigHashes` rule fires.
pub const BIG_HASHES_THRESHOLD: u64 = 5_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, Display, EnumString)]
pub enum RecommendationName {
    #[strum(serialize = "bigHashes")]
    BigHashes,
}

/// An advisory finding produced by a rule. Created once; marked read or
/// deleted later by the store, never mutated here after creation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub id: Uuid,
    pub name: String,
    pub key_name: Option<String>,
    pub params: JsonValue,
    pub read: bool,
}

impl Recommendation {
    pub fn new(name: RecommendationName, key_name: Option<String>, params: JsonValue) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            key_name,
            params,
            read: false,
        }
    }
}

/// What a rule reports when its condition is reached.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleMatch {
    pub key_name: Option<String>,
    pub params: JsonValue,
}

/// A pure predicate over observed data. Returns `None` when the condition is
/// not reached. Implementations must not perform I/O.
pub trait RecommendationRule: Send + Sync {
    fn evaluate(&self, data: &JsonValue) -> Option<RuleMatch>;
}

/// Fires when an observed hash carries more fields than
/// [`BIG_HASHES_THRESHOLD`].
struct BigHashesRule;

impl RecommendationRule for BigHashesRule {
    fn evaluate(&self, data: &JsonValue) -> Option<RuleMatch> {
        let total = data.get("total")?.as_u64()?;
        if total <= BIG_HASHES_THRESHOLD {
            return None;
        }
        let key_name = data
            .get("keyName")
            .and_then(JsonValue::as_str)
            .map(str::to_string);
        let keys: Vec<&String> = key_name.iter().collect();
        Some(RuleMatch {
            params: json!({ "keys": keys }),
            key_name,
        })
    }
}

/// Stateless rule evaluator. Rules are registered under unique names; a
/// lookup miss yields `None` rather than an error, since callers invoke the
/// scanner opportunistically from unrelated code paths.
pub struct RecommendationScanner {
    rules: HashMap<RecommendationName, Box<dyn RecommendationRule>>,
}

impl RecommendationScanner {
    pub fn new() -> Self {
        let mut scanner = Self {
            rules: HashMap::new(),
        };
        scanner.register(RecommendationName::BigHashes, Box::new(BigHashesRule));
        scanner
    }

    /// Replaces any rule previously registered under the same name.
    pub fn register(&mut self, name: RecommendationName, rule: Box<dyn RecommendationRule>) {
        self.rules.insert(name, rule);
    }

    pub fn determine(&self, name: RecommendationName, data: &JsonValue) -> Option<Recommendation> {
        let rule = self.rules.get(&name)?;
        let matched = rule.evaluate(data)?;
        Some(Recommendation::new(name, matched.key_name, matched.params))
    }
}

impl Default for RecommendationScanner {
    fn default() -> Self {
        Self::new()
    }
}

pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// External persistence of recommendations. "Exists" means an un-read
/// recommendation with that name is already stored for the scope.
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    async fn is_exist(&self, scope: &ClientIdentity, name: &str) -> Result<bool, StoreError>;

    async fn create(
        &self,
        scope: &ClientIdentity,
        recommendation: Recommendation,
    ) -> Result<Recommendation, StoreError>;

    async fn list(&self, scope: &ClientIdentity) -> Result<Vec<Recommendation>, StoreError>;
}

/// Evaluates rules and persists new findings, once per (scope, rule name).
pub struct RecommendationService {
    store: Arc<dyn RecommendationStore>,
    scanner: RecommendationScanner,
}

impl RecommendationService {
    pub fn new(store: Arc<dyn RecommendationStore>) -> Self {
        Self {
            store,
            scanner: RecommendationScanner::default(),
        }
    }

    pub fn with_scanner(store: Arc<dyn RecommendationStore>, scanner: RecommendationScanner) -> Self {
        Self { store, scanner }
    }

    /// Checks one rule against observed data and persists the finding when
    /// it is new for the scope.
    ///
    /// Never fails: the check runs piggybacked on primary operations, so any
    /// error here is logged and swallowed instead of surfacing to the
    /// caller.
    pub async fn check(
        &self,
        scope: &ClientIdentity,
        name: RecommendationName,
        data: &JsonValue,
    ) -> Option<Recommendation> {
        match self.try_check(scope, name, data).await {
            Ok(result) => result,
            Err(err) => {
                warn!("unable to check {} recommendation: {}", name, err);
                None
            }
        }
    }

    async fn try_check(
        &self,
        scope: &ClientIdentity,
        name: RecommendationName,
        data: &JsonValue,
    ) -> Result<Option<Recommendation>, StoreError> {
        if self.store.is_exist(scope, name.as_ref()).await? {
            return Ok(None);
        }
        let Some(recommendation) = self.scanner.determine(name, data) else {
            return Ok(None);
        };
        debug!("creating {} recommendation", name);
        let stored = self.store.create(scope, recommendation).await?;
        Ok(Some(stored))
    }

    pub async fn list(&self, scope: &ClientIdentity) -> Result<Vec<Recommendation>, StoreError> {
        self.store.list(scope).await
    }
}
