//! Decides whether a registry row is the decision a candidate cites
//!
//! Rules are tried in order and the first one that fires wins:
//! 1. docket numbers agree on their digits (exactly, or on the first six
//!    when both carry at least six);
//! 2. same year and mutually-contained court labels.
//!
//! Docket numbers are the strong signal; year plus court is a weaker
//! fallback and must stay second.

use crate::schema::CandidateReference;
use regex::Regex;
use std::sync::LazyLock;

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}").expect("year pattern is valid"));

/// Number of leading digits compared when docket numbers differ in length
const DOCKET_PREFIX_DIGITS: usize = 6;

/// Fields of a registry row the matcher looks at
#[derive(Debug, Clone, Copy, Default)]
pub struct RowFields<'a> {
    pub docket: &'a str,
    pub date: &'a str,
    pub jurisdiction: &'a str,
}

/// Which rule accepted a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    Docket,
    DateAndJurisdiction,
}

/// Does `row` correspond to `candidate`?
///
/// A docket or court label with no digits or letters corroborates nothing,
/// so two empty dockets are not a match.
pub fn accepts(row: &RowFields<'_>, candidate: &CandidateReference) -> bool {
    matched_rule(row, candidate).is_some()
}

/// The first rule that accepts `row`, if any
pub fn matched_rule(row: &RowFields<'_>, candidate: &CandidateReference) -> Option<MatchRule> {
    if similar_dockets(&candidate.docket, row.docket) {
        return Some(MatchRule::Docket);
    }
    if same_year(&candidate.date, row.date)
        && similar_jurisdictions(&candidate.jurisdiction, row.jurisdiction)
    {
        return Some(MatchRule::DateAndJurisdiction);
    }
    None
}

fn digits(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Digits-only comparison; an empty side never matches.
pub fn similar_dockets(a: &str, b: &str) -> bool {
    let a = digits(a);
    let b = digits(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    a.len() >= DOCKET_PREFIX_DIGITS
        && b.len() >= DOCKET_PREFIX_DIGITS
        && a[..DOCKET_PREFIX_DIGITS] == b[..DOCKET_PREFIX_DIGITS]
}

/// First four-digit run of each date must be equal
pub fn same_year(a: &str, b: &str) -> bool {
    match (YEAR.find(a), YEAR.find(b)) {
        (Some(x), Some(y)) => x.as_str() == y.as_str(),
        _ => false,
    }
}

/// Case, space and punctuation insensitive mutual containment.
///
/// An empty label corroborates nothing.
pub fn similar_jurisdictions(a: &str, b: &str) -> bool {
    let a = fold_label(a);
    let b = fold_label(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

fn fold_label(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
