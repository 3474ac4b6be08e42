//! Légifrance: case-law search behind an OAuth2 client-credentials gateway

use crate::matcher::{self, RowFields};
use crate::registry::{clamp_score, result_rows, row_id, send_json, RegistryClient, SearchError};
use crate::retry::RetryPolicy;
use crate::schema::{CandidateReference, RegistryResult, SourceId};
use crate::token::TokenManager;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Rows requested per search
const PAGE_SIZE: u32 = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Row {
    numero: Option<String>,
    #[serde(alias = "dateDecision", alias = "date_decision")]
    date: Option<String>,
    juridiction: Option<String>,
    titre: Option<String>,
    texte: Option<String>,
    pertinence: Option<f64>,
}

pub struct LegifranceClient {
    http: reqwest::Client,
    search_url: Url,
    decision_url: String,
    tokens: TokenManager,
    retry: RetryPolicy,
    timeout: Duration,
}

impl LegifranceClient {
    pub fn new(
        http: reqwest::Client,
        search_url: Url,
        decision_url: String,
        tokens: TokenManager,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            search_url,
            decision_url,
            tokens,
            retry,
            timeout,
        }
    }

    /// One attempt: reuse or refresh the token, then search
    async fn attempt(&self, candidate: &CandidateReference) -> Result<Value, SearchError> {
        let token = self.tokens.bearer().await?;
        let request = self
            .http
            .post(self.search_url.clone())
            .bearer_auth(&token)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&search_body(candidate));

        match send_json(request, self.timeout).await {
            Err(SearchError::Auth(reason)) => {
                warn!(%reason, "legifrance rejected bearer token, dropping it");
                self.tokens.invalidate(&token).await;
                Err(SearchError::Auth(reason))
            }
            other => other,
        }
    }

    fn first_match(&self, body: &Value, candidate: &CandidateReference) -> Result<Option<RegistryResult>, SearchError> {
        for raw in result_rows(body)? {
            let row: Row = match serde_json::from_value(raw.clone()) {
                Ok(row) => row,
                Err(e) => {
                    debug!(error = %e, "skipping malformed legifrance row");
                    continue;
                }
            };

            let fields = RowFields {
                docket: row.numero.as_deref().unwrap_or_default(),
                date: row.date.as_deref().unwrap_or_default(),
                jurisdiction: row.juridiction.as_deref().unwrap_or_default(),
            };
            let Some(rule) = matcher::matched_rule(&fields, candidate) else {
                continue;
            };

            info!(
                citation = %candidate.citation(),
                numero = fields.docket,
                ?rule,
                "legifrance match"
            );
            return Ok(Some(RegistryResult {
                found: true,
                source: SourceId::Legifrance,
                url: row_id(raw).map(|id| format!("{}{}", self.decision_url, id)),
                summary: row.titre.filter(|s| !s.trim().is_empty()),
                full_text: row.texte,
                raw: raw.clone(),
                score: clamp_score(row.pertinence),
            }));
        }
        Ok(None)
    }
}

#[async_trait]
impl RegistryClient for LegifranceClient {
    fn source(&self) -> SourceId {
        SourceId::Legifrance
    }

    async fn search(
        &self,
        candidate: &CandidateReference,
    ) -> Result<Option<RegistryResult>, SearchError> {
        let body = self
            .retry
            .run(SourceId::Legifrance, || self.attempt(candidate))
            .await?;
        self.first_match(&body, candidate)
    }
}

/// Exact-phrase search over the case-law fund
fn search_body(candidate: &CandidateReference) -> Value {
    json!({
        "fond": "JURI",
        "recherche": {
            "typeRecherche": "exacte",
            "mots": candidate.search_query(),
            "champRecherche": "ALL",
            "operateur": "ET"
        },
        "nbResultat": PAGE_SIZE
    })
}
