//! Verification service: registry fan-out, merge, cache and batching
//!
//! One long-lived `VerificationService` owns the registry clients and the
//! result cache. Construct it once at startup and share it by reference;
//! every method takes `&self` and is safe to call from concurrent tasks.

use crate::cache::TtlCache;
use crate::config::{Config, ConfigError, RegistryConfig};
use crate::extract::extract_citations;
use crate::judilibre::JudilibreClient;
use crate::legifrance::LegifranceClient;
use crate::registry::RegistryClient;
use crate::schema::{
    CandidateReference, FailureKind, RegistryResult, SourceFailure, SourceId, VerificationRecord,
    VerificationStatus,
};
use crate::token::{ClientCredentials, TokenManager};
use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Tunables that do not belong to a particular registry
#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    pub ttl: Duration,
    pub cache_capacity: usize,
    /// Candidates verified concurrently per wave
    pub batch_size: usize,
    /// Confidence of a match whose registry gives no score
    pub default_confidence: f64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            cache_capacity: 1000,
            batch_size: 5,
            default_confidence: 0.8,
        }
    }
}

impl From<&Config> for ServiceSettings {
    fn from(config: &Config) -> Self {
        Self {
            ttl: config.ttl(),
            cache_capacity: config.cache_capacity,
            batch_size: config.batch_size,
            default_confidence: config.default_confidence,
        }
    }
}

pub struct VerificationService {
    /// Enabled registries in configured order
    clients: Vec<Arc<dyn RegistryClient>>,
    /// Source of each client, read once at construction
    sources: Vec<SourceId>,
    cache: TtlCache<VerificationRecord>,
    batch_size: usize,
    default_confidence: f64,
}

impl VerificationService {
    pub fn new(clients: Vec<Arc<dyn RegistryClient>>, settings: ServiceSettings) -> Self {
        let sources = clients.iter().map(|c| c.source()).collect();
        Self {
            clients,
            sources,
            cache: TtlCache::new(settings.ttl, settings.cache_capacity),
            batch_size: settings.batch_size.max(1),
            default_confidence: settings.default_confidence,
        }
    }

    /// Validate the configuration and build one client per enabled registry
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("jurischeck/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let retry = config.retry.policy();
        let timeout = config.timeout();

        let mut clients: Vec<Arc<dyn RegistryClient>> = Vec::new();
        for registry in config.enabled_registries() {
            match registry {
                RegistryConfig::Judilibre(c) => {
                    clients.push(Arc::new(JudilibreClient::new(
                        http.clone(),
                        c.search_url()?,
                        c.decision_url.clone(),
                        c.api_key.clone(),
                        c.filter_by_year,
                        retry,
                        timeout,
                    )));
                }
                RegistryConfig::Legifrance(c) => {
                    let tokens = TokenManager::new(
                        http.clone(),
                        ClientCredentials {
                            token_url: c.token_url()?,
                            client_id: c.client_id.clone(),
                            client_secret: c.client_secret.clone(),
                            scope: c.scope.clone(),
                        },
                        timeout,
                    );
                    clients.push(Arc::new(LegifranceClient::new(
                        http.clone(),
                        c.search_url()?,
                        c.decision_url.clone(),
                        tokens,
                        retry,
                        timeout,
                    )));
                }
            }
        }

        if clients.is_empty() {
            warn!("no registry enabled, every reference will be reported not_found");
        }
        Ok(Self::new(clients, ServiceSettings::from(config)))
    }

    /// Registries asked for every candidate, in configured order
    pub fn sources(&self) -> Vec<SourceId> {
        self.sources.clone()
    }

    /// Verify one candidate against every registry.
    ///
    /// A live cache entry is returned as is, without any registry call and
    /// without touching `candidate`. Otherwise the candidate is updated in
    /// place when at least one registry confirms it. Never fails: registries
    /// that could not answer are listed in `failures` and the outcome falls
    /// back to `not_found`.
    pub async fn verify(&self, candidate: &mut CandidateReference) -> VerificationRecord {
        let key = candidate.cache_key();
        if let Some(record) = self.cache.get(&key).await {
            debug!(key = %key, "cache hit");
            return record;
        }

        let tasks: Vec<_> = self
            .clients
            .iter()
            .map(|client| {
                let client = Arc::clone(client);
                let candidate = candidate.clone();
                tokio::spawn(async move { client.search(&candidate).await })
            })
            .collect();

        // join_all keeps configured order whatever the completion order
        let outcomes = join_all(tasks).await;

        let mut matches = Vec::new();
        let mut failures = Vec::new();
        for (client, outcome) in self.clients.iter().zip(outcomes) {
            let source = client.source();
            match outcome {
                Ok(Ok(Some(result))) if result.found => matches.push(result),
                Ok(Ok(_)) => debug!(source = %source, key = %key, "no matching row"),
                Ok(Err(e)) => {
                    warn!(source = %source, key = %key, error = %e, "registry gave no answer");
                    failures.push(SourceFailure {
                        source,
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    error!(source = %source, key = %key, error = %e, "registry task failed");
                    failures.push(SourceFailure {
                        source,
                        kind: FailureKind::Internal,
                        message: e.to_string(),
                    });
                }
            }
        }

        let now = Utc::now();
        apply_matches(candidate, &matches, now);

        let status = if matches.is_empty() {
            VerificationStatus::NotFound
        } else {
            VerificationStatus::Verified
        };
        let record = VerificationRecord {
            reference: candidate.clone(),
            status,
            confidence: confidence(&matches, self.default_confidence),
            sources_checked: self.sources(),
            matches,
            failures,
            error: None,
            timestamp: now,
        };

        info!(
            citation = %candidate.citation(),
            status = %record.status,
            confidence = record.confidence,
            found_on = ?candidate.found_on,
            "verified reference"
        );
        self.cache.insert(key, record.clone()).await;
        record
    }

    /// Verify a list in waves, results in input order
    pub async fn verify_all(&self, references: &mut [CandidateReference]) -> Vec<VerificationRecord> {
        self.verify_all_with_progress(references, |_, _| {}).await
    }

    /// Like `verify_all`, calling `on_progress(completed, total)` after each wave.
    ///
    /// A candidate whose verification panics gets a degraded `not_found`
    /// record in its slot; the rest of the wave and later waves still run.
    pub async fn verify_all_with_progress<F>(
        &self,
        references: &mut [CandidateReference],
        mut on_progress: F,
    ) -> Vec<VerificationRecord>
    where
        F: FnMut(usize, usize),
    {
        let total = references.len();
        let mut records = Vec::with_capacity(total);

        for wave in references.chunks_mut(self.batch_size) {
            let outcomes = join_all(wave.iter_mut().map(|candidate| {
                let snapshot = candidate.clone();
                async move {
                    match AssertUnwindSafe(self.verify(candidate)).catch_unwind().await {
                        Ok(record) => record,
                        Err(panic) => {
                            let reason = panic_message(panic.as_ref());
                            error!(citation = %snapshot.citation(), reason = %reason, "verification panicked");
                            VerificationRecord::degraded(
                                snapshot,
                                self.sources.clone(),
                                format!("internal error: {}", reason),
                            )
                        }
                    }
                }
            }))
            .await;

            records.extend(outcomes);
            on_progress(records.len(), total);
        }

        records
    }

    /// Extract every citation from `text` and verify them
    pub async fn extract_and_verify(&self, text: &str) -> Vec<VerificationRecord> {
        let mut references = extract_citations(text);
        debug!(count = references.len(), "extracted citations");
        self.verify_all(&mut references).await
    }

    /// Drop every cached record
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}

/// Fold confirmed matches into the candidate, in configured order.
///
/// URL, summary and full text are only filled when the candidate has none,
/// from the first match supplying them.
fn apply_matches(
    candidate: &mut CandidateReference,
    matches: &[RegistryResult],
    now: chrono::DateTime<Utc>,
) {
    if matches.is_empty() {
        return;
    }

    candidate.verified = true;
    candidate.verification_date = Some(now);
    for result in matches {
        if !candidate.found_on.contains(&result.source) {
            candidate.found_on.push(result.source);
        }
    }

    if candidate.url_source.is_none() {
        candidate.url_source = matches.iter().find_map(|m| m.url.clone());
    }
    if candidate.summary.is_none() {
        candidate.summary = matches.iter().find_map(|m| m.summary.clone());
    }
    if candidate.full_text.is_none() {
        candidate.full_text = matches.iter().find_map(|m| m.full_text.clone());
    }
}

/// Highest match score; unscored matches count as `default`
fn confidence(matches: &[RegistryResult], default: f64) -> f64 {
    matches
        .iter()
        .map(|m| m.score.unwrap_or(default))
        .fold(0.0, f64::max)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
