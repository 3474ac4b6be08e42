//! Citation and verification record types
//!
//! Shared by the extractor, the registry clients and the verification service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of an external registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    /// Cour de cassation open data API (static API key)
    Judilibre,
    /// Légifrance API (OAuth2 client credentials)
    Legifrance,
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceId::Judilibre => write!(f, "judilibre"),
            SourceId::Legifrance => write!(f, "legifrance"),
        }
    }
}

/// A case-law citation found in free text, not yet confirmed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReference {
    /// Canonical court label (e.g. "Cass. crim.", "CA Paris")
    pub jurisdiction: String,
    /// Date as written in the source text
    pub date: String,
    /// Docket / pourvoi / decision number as written
    pub docket: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    pub verified: bool,
    /// Registries that confirmed this reference
    pub found_on: Vec<SourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_source: Option<String>,
    /// Produced by extraction rather than entered by hand
    pub ai_proposed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_date: Option<DateTime<Utc>>,
}

impl CandidateReference {
    pub fn new(
        jurisdiction: impl Into<String>,
        date: impl Into<String>,
        docket: impl Into<String>,
    ) -> Self {
        Self {
            jurisdiction: jurisdiction.into(),
            date: date.into(),
            docket: docket.into(),
            summary: None,
            full_text: None,
            verified: false,
            found_on: Vec::new(),
            url_source: None,
            ai_proposed: false,
            verification_date: None,
        }
    }

    /// Human-readable citation: `Cass. crim., 12 janvier 2023, n° 22-81.234`
    pub fn citation(&self) -> String {
        format!("{}, {}, n° {}", self.jurisdiction, self.date, self.docket)
    }

    /// Canonical citation string used for dedup and caching.
    ///
    /// Jurisdiction plus the docket reduced to its alphanumerics, so
    /// `22-81.234` and `22 81 234` collapse to the same key.
    pub fn cache_key(&self) -> String {
        format!(
            "{} n° {}",
            self.jurisdiction.trim(),
            normalize_docket(&self.docket)
        )
    }

    /// Free-text query sent to registries.
    ///
    /// The docket number is the most selective term; fall back to court and
    /// date when it is missing.
    pub fn search_query(&self) -> String {
        let docket = self.docket.trim();
        if docket.is_empty() {
            format!("{} {}", self.jurisdiction.trim(), self.date.trim())
                .trim()
                .to_string()
        } else {
            docket.to_string()
        }
    }
}

/// Uppercased alphanumerics of a docket number
pub fn normalize_docket(docket: &str) -> String {
    docket
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect()
}

/// One accepted row returned by a registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryResult {
    pub found: bool,
    pub source: SourceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    /// Row exactly as the registry returned it
    pub raw: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Outcome of verifying one reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    NotFound,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationStatus::Verified => write!(f, "verified"),
            VerificationStatus::NotFound => write!(f, "not_found"),
        }
    }
}

/// Why a registry gave no answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Transport,
    Timeout,
    Server,
    Auth,
    Rejected,
    Parse,
    Internal,
}

/// A registry that was asked but could not answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: SourceId,
    pub kind: FailureKind,
    pub message: String,
}

/// Verification outcome for one candidate, as cached and returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub reference: CandidateReference,
    pub status: VerificationStatus,
    /// 0..=1
    pub confidence: f64,
    pub sources_checked: Vec<SourceId>,
    pub matches: Vec<RegistryResult>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failures: Vec<SourceFailure>,
    /// Set when the record was substituted after an internal failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl VerificationRecord {
    /// `not_found` stand-in for a reference whose verification itself failed
    pub fn degraded(
        reference: CandidateReference,
        sources_checked: Vec<SourceId>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            reference,
            status: VerificationStatus::NotFound,
            confidence: 0.0,
            sources_checked,
            matches: Vec::new(),
            failures: Vec::new(),
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn is_verified(&self) -> bool {
        self.status == VerificationStatus::Verified
    }
}
