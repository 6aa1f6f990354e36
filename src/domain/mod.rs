//! Candidate domain construction
//!
//! Turns free-form names into the `{name: [domain, ..]}` shape the
//! researcher consumes.

pub mod validator;

pub use validator::DomainValidator;

use crate::error::{DomainScoutError, Result};
use crate::types::Candidates;

/// TLDs tried when the caller names none
pub const DEFAULT_TLDS: &[&str] = &["com", "io", "ai"];

/// Common TLD lists
pub const POPULAR_TLDS: &[&str] = &[
    "com", "org", "net", "io", "ai", "co", "me", "app", "dev", "tech", "xyz"
];

pub const STARTUP_TLDS: &[&str] = &[
    "com", "org", "io", "ai", "tech", "app", "dev", "xyz"
];

/// Get TLD list by name
pub fn get_tld_list(name: &str) -> Option<Vec<String>> {
    match name.to_lowercase().as_str() {
        "default" => Some(DEFAULT_TLDS.iter().map(|s| s.to_string()).collect()),
        "popular" => Some(POPULAR_TLDS.iter().map(|s| s.to_string()).collect()),
        "startup" => Some(STARTUP_TLDS.iter().map(|s| s.to_string()).collect()),
        _ => None,
    }
}

/// Reduce a free-form name to a registrable label.
///
/// Lowercases, maps whitespace and underscores to hyphens, drops every
/// other character outside `[a-z0-9-]`, collapses hyphen runs and strips
/// leading and trailing hyphens.
pub fn normalize_label(name: &str) -> Result<String> {
    normalize_with(&DomainValidator::new()?, name)
}

fn normalize_with(validator: &DomainValidator, name: &str) -> Result<String> {
    let mut label = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        let c = match c {
            'a'..='z' | '0'..='9' | '-' => c,
            '_' | ' ' | '\t' => '-',
            _ => continue,
        };
        if c == '-' && (label.is_empty() || label.ends_with('-')) {
            continue;
        }
        label.push(c);
    }
    while label.ends_with('-') {
        label.pop();
    }

    if label.is_empty() {
        return Err(DomainScoutError::validation(format!(
            "'{}' has no usable characters for a domain label",
            name
        )));
    }
    validator.validate_label(&label)?;
    Ok(label)
}

/// Build candidate domains for every name under every TLD.
///
/// TLDs are normalized (leading dots dropped, lowercased, deduplicated) and
/// must all be valid. Names that normalize to nothing are skipped with a
/// warning.
pub fn candidates<N, T>(names: &[N], tlds: &[T]) -> Result<Candidates>
where
    N: AsRef<str>,
    T: AsRef<str>,
{
    let validator = DomainValidator::new()?;
    let mut suffixes: Vec<String> = Vec::with_capacity(tlds.len());
    for tld in tlds {
        let tld = tld.as_ref().trim().trim_start_matches('.').to_lowercase();
        validator.validate_tld(&tld)?;
        if !suffixes.contains(&tld) {
            suffixes.push(tld);
        }
    }
    if suffixes.is_empty() {
        return Err(DomainScoutError::validation("At least one TLD is required"));
    }

    let mut candidates = Candidates::new();
    for name in names {
        let name = name.as_ref().trim();
        let label = match normalize_with(&validator, name) {
            Ok(label) => label,
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "Skipping unusable name");
                continue;
            }
        };
        let domains: Vec<String> = suffixes.iter().map(|tld| format!("{}.{}", label, tld)).collect();
        for domain in &domains {
            validator.validate(domain)?;
        }
        candidates.insert(name.to_string(), domains);
    }
    Ok(candidates)
}
