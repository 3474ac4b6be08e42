//! Citation extraction from free text
//!
//! Each recognizer targets one surface form of a French case-law citation.
//! Matches become [`CandidateReference`]s with a canonical court label,
//! deduplicated on their cache key (first occurrence wins).

use crate::schema::CandidateReference;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

/// Day, spelled-out month, year: `12 janvier 2023`, `1er juin 2023`
const TEXT_DATE: &str = r"\d{1,2}(?:er)?\s+\w+\s+\d{4}";

struct Recognizer {
    name: &'static str,
    pattern: Regex,
}

impl Recognizer {
    fn new(name: &'static str, pattern: &str) -> Self {
        let pattern = pattern.replace("@DATE@", TEXT_DATE);
        Self {
            name,
            pattern: Regex::new(&pattern).expect("citation recognizer pattern is valid"),
        }
    }
}

static RECOGNIZERS: LazyLock<Vec<Recognizer>> = LazyLock::new(|| {
    vec![
        Recognizer::new(
            "cass_abbreviated",
            r"(?i)\b(?P<jurisdiction>Cass\.?\s*(?:civ|crim|com|soc)\.?(?:\s*\d(?:re|e|ème))?)\s*,?\s*(?P<date>@DATE@)\s*,?\s*n[°º]\s*(?P<docket>\d[\d\-\.]*)",
        ),
        Recognizer::new(
            "cass_spelled_out",
            r"(?i)\b(?P<jurisdiction>Cour de cassation)\s*,?\s*(?:(?:chambre\s+)?(?P<chamber>[^\W\d]\w*)\s*,?\s*)?(?P<date>@DATE@)\s*,?\s*(?:n[°º]|pourvoi)\s*(?:n[°º]\s*)?(?P<docket>\d[\d\-\.]*)",
        ),
        Recognizer::new(
            "conseil_etat",
            r"(?i)\b(?P<jurisdiction>C\.?E\.?|Conseil d['’][ÉE]tat)\s*,?\s*(?P<date>@DATE@)\s*,?\s*n[°º]\s*(?P<docket>\d+)",
        ),
        Recognizer::new(
            "conseil_constitutionnel",
            r"(?i)\b(?P<jurisdiction>Cons\.?\s*const\.?|Conseil constitutionnel)\s*,?\s*(?:décision\s*)?(?P<date>@DATE@)\s*,?\s*n[°º]\s*(?P<docket>\d[\d\-]*\s*(?:DC|QPC))",
        ),
        Recognizer::new(
            "cour_appel",
            r"(?i)\b(?P<jurisdiction>CA|C\.A\.|Cour d['’]appel)\s+(?:de\s+|d['’])?(?P<chamber>[\w\-]+)\s*,?\s*(?P<date>@DATE@)\s*,?\s*n[°º]\s*(?P<docket>\d[\d/\-]*)",
        ),
        Recognizer::new(
            "numeric_date",
            r"(?i)\b(?P<jurisdiction>(?:Cass|CE|CA)[\w\s\.]*?)\s*,?\s*(?P<date>\d{1,2}[\s\-/\.]\d{1,2}[\s\-/\.]\d{4})\s*,?\s*(?:n[°º]|pourvoi)\s*(?:n[°º]\s*)?(?P<docket>\d[\d\-\.]*)",
        ),
        Recognizer::new(
            "european_courts",
            r"(?i)\b(?P<jurisdiction>CJUE|CEDH|Cour EDH)\s*,?\s*(?P<date>@DATE@)\s*,?\s*(?:aff\.|affaire|n[°º])\s*(?P<docket>[\w\-/]+)",
        ),
    ]
});

/// Court labels matched exactly (lowercase, trailing dots trimmed)
const EXACT_LABELS: &[(&str, &str)] = &[
    ("cass", "Cass."),
    ("cassation", "Cass."),
    ("cour de cassation", "Cass."),
    ("ce", "CE"),
    ("c.e", "CE"),
    ("conseil d'état", "CE"),
    ("conseil d'etat", "CE"),
    ("conseil detat", "CE"),
    ("ca", "CA"),
    ("c.a", "CA"),
    ("cour d'appel", "CA"),
    ("cons. const", "Cons. const."),
    ("cons.const", "Cons. const."),
    ("cons const", "Cons. const."),
    ("conseil constitutionnel", "Cons. const."),
    ("cjue", "CJUE"),
    ("cedh", "CEDH"),
    ("cour edh", "CEDH"),
];

/// Court label prefixes, longest first
const PREFIX_LABELS: &[(&str, &str)] = &[
    ("conseil constitutionnel", "Cons. const."),
    ("cour de cassation", "Cass."),
    ("conseil d'état", "CE"),
    ("conseil d'etat", "CE"),
    ("cour d'appel", "CA"),
    ("cons. const.", "Cons. const."),
    ("cassation", "Cass."),
    ("cour edh", "CEDH"),
    ("cass.", "Cass."),
    ("cass", "Cass."),
    ("cjue", "CJUE"),
    ("cedh", "CEDH"),
    ("c.e.", "CE"),
    ("c.a.", "CA"),
    ("ce", "CE"),
    ("ca", "CA"),
];

const CHAMBERS: &[(&str, &str)] = &[
    ("civ", "civ."),
    ("civile", "civ."),
    ("crim", "crim."),
    ("criminelle", "crim."),
    ("com", "com."),
    ("commerciale", "com."),
    ("soc", "soc."),
    ("sociale", "soc."),
];

/// Extract candidate citations from text
pub fn extract_citations(text: &str) -> Vec<CandidateReference> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();

    for recognizer in RECOGNIZERS.iter() {
        for cap in recognizer.pattern.captures_iter(text) {
            let Some(reference) = candidate_from(&cap) else {
                debug!(
                    recognizer = recognizer.name,
                    text = &cap[0],
                    "skipping incomplete citation match"
                );
                continue;
            };

            if seen.insert(reference.cache_key()) {
                debug!(
                    recognizer = recognizer.name,
                    citation = %reference.citation(),
                    "extracted citation"
                );
                references.push(reference);
            }
        }
    }

    references
}

fn candidate_from(cap: &regex::Captures<'_>) -> Option<CandidateReference> {
    let court = non_empty(cap.name("jurisdiction"))?;
    let date = non_empty(cap.name("date"))?;
    let docket = non_empty(cap.name("docket"))?
        .trim_end_matches(['.', '-', '/'])
        .to_string();
    if docket.is_empty() {
        return None;
    }

    let label = match non_empty(cap.name("chamber")) {
        Some(chamber) => format!("{} {}", court, chamber),
        None => court.to_string(),
    };

    let mut reference = CandidateReference::new(normalize_jurisdiction(&label), date, docket);
    reference.ai_proposed = true;
    Some(reference)
}

fn non_empty<'t>(m: Option<regex::Match<'t>>) -> Option<&'t str> {
    m.map(|m| m.as_str().trim()).filter(|s| !s.is_empty())
}

/// Map a court label to its canonical abbreviation.
///
/// Exact matches first, then prefixes. For the Cour de cassation the
/// remainder (chamber) is kept, for a Cour d'appel the city is kept;
/// unknown labels are returned unchanged.
pub fn normalize_jurisdiction(raw: &str) -> String {
    let label = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    // One lowercase char per label char so offsets line up
    let key: Vec<char> = label
        .chars()
        .map(|c| match c {
            '’' => '\'',
            c => c.to_lowercase().next().unwrap_or(c),
        })
        .collect();
    let key_str: String = key.iter().collect();

    let exact_key = key_str.trim_end_matches(['.', ',']);
    if let Some((_, canonical)) = EXACT_LABELS.iter().find(|(k, _)| *k == exact_key) {
        return canonical.to_string();
    }

    for (prefix, canonical) in PREFIX_LABELS {
        let prefix_len = prefix.chars().count();
        if !key_str.starts_with(prefix) {
            continue;
        }
        if key.get(prefix_len).is_some_and(|c| c.is_alphanumeric()) {
            continue;
        }

        let rest: String = label.chars().skip(prefix_len).collect();
        let rest = rest
            .trim_start_matches(|c: char| c.is_whitespace() || c == '.' || c == ',')
            .trim_end_matches(|c: char| c.is_whitespace() || c == ',');

        return match (*canonical, rest.is_empty()) {
            (_, true) => canonical.to_string(),
            ("Cass.", false) => format!("Cass. {}", normalize_chamber(rest)),
            ("CA", false) => format!("CA {}", title_case(strip_article(rest))),
            _ => canonical.to_string(),
        };
    }

    label
}

fn normalize_chamber(rest: &str) -> String {
    rest.split_whitespace()
        .filter(|word| !word.eq_ignore_ascii_case("chambre"))
        .map(|word| {
            let bare = word.trim_end_matches('.').to_lowercase();
            CHAMBERS
                .iter()
                .find(|(k, _)| *k == bare)
                .map(|(_, v)| v.to_string())
                .unwrap_or_else(|| word.to_string())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_article(city: &str) -> &str {
    let lower = city.to_lowercase();
    if lower.starts_with("de ") {
        city[3..].trim_start()
    } else if lower.starts_with("d'") {
        &city[2..]
    } else if lower.starts_with("d’") {
        &city["d’".len()..]
    } else {
        city
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = true;
    for c in s.chars() {
        if upper_next {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        upper_next = c.is_whitespace() || c == '-';
    }
    out
}
