//! Judilibre: Cour de cassation open data, authenticated with a fixed key

use crate::matcher::{self, RowFields};
use crate::registry::{clamp_score, result_rows, row_id, send_json, RegistryClient, SearchError};
use crate::retry::RetryPolicy;
use crate::schema::{CandidateReference, RegistryResult, SourceId};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Static-key header expected by the API gateway
const KEY_HEADER: &str = "KeyId";

/// Rows requested per search
const PAGE_SIZE: &str = "10";

const FIELDS: [&str; 4] = ["numero", "date_creation", "sommaire", "texte_integral"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Row {
    numero: Option<String>,
    date_creation: Option<String>,
    juridiction: Option<String>,
    sommaire: Option<String>,
    texte_integral: Option<String>,
    score: Option<f64>,
}

pub struct JudilibreClient {
    http: reqwest::Client,
    search_url: Url,
    decision_url: String,
    api_key: String,
    filter_by_year: bool,
    retry: RetryPolicy,
    timeout: Duration,
}

impl JudilibreClient {
    pub fn new(
        http: reqwest::Client,
        search_url: Url,
        decision_url: String,
        api_key: String,
        filter_by_year: bool,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            search_url,
            decision_url,
            api_key,
            filter_by_year,
            retry,
            timeout,
        }
    }

    fn request(&self, candidate: &CandidateReference) -> reqwest::RequestBuilder {
        let mut params: Vec<(&str, String)> = vec![("query", candidate.search_query())];
        params.extend(FIELDS.iter().map(|f| ("field", f.to_string())));
        params.push(("size", PAGE_SIZE.to_string()));
        params.push(("sort", "pertinence".to_string()));

        if self.filter_by_year {
            if let Some(year) = year_of(&candidate.date) {
                params.push(("date_start", format!("{}-01-01", year)));
                params.push(("date_end", format!("{}-12-31", year)));
            }
        }

        self.http
            .get(self.search_url.clone())
            .header(KEY_HEADER, &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&params)
    }

    fn first_match(&self, body: &Value, candidate: &CandidateReference) -> Result<Option<RegistryResult>, SearchError> {
        for raw in result_rows(body)? {
            let row: Row = match serde_json::from_value(raw.clone()) {
                Ok(row) => row,
                Err(e) => {
                    debug!(error = %e, "skipping malformed judilibre row");
                    continue;
                }
            };

            let fields = RowFields {
                docket: row.numero.as_deref().unwrap_or_default(),
                date: row.date_creation.as_deref().unwrap_or_default(),
                jurisdiction: row.juridiction.as_deref().unwrap_or_default(),
            };
            let Some(rule) = matcher::matched_rule(&fields, candidate) else {
                continue;
            };

            info!(
                citation = %candidate.citation(),
                numero = fields.docket,
                ?rule,
                "judilibre match"
            );
            return Ok(Some(RegistryResult {
                found: true,
                source: SourceId::Judilibre,
                url: row_id(raw).map(|id| format!("{}{}", self.decision_url, id)),
                summary: row.sommaire.filter(|s| !s.trim().is_empty()),
                full_text: row.texte_integral,
                raw: raw.clone(),
                score: clamp_score(row.score),
            }));
        }
        Ok(None)
    }
}

#[async_trait]
impl RegistryClient for JudilibreClient {
    fn source(&self) -> SourceId {
        SourceId::Judilibre
    }

    async fn search(
        &self,
        candidate: &CandidateReference,
    ) -> Result<Option<RegistryResult>, SearchError> {
        let body = self
            .retry
            .run(SourceId::Judilibre, || send_json(self.request(candidate), self.timeout))
            .await?;
        self.first_match(&body, candidate)
    }
}

fn year_of(date: &str) -> Option<String> {
    date.split(|c: char| !c.is_ascii_digit())
        .find(|part| part.len() == 4)
        .map(str::to_string)
}
