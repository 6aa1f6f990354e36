//! Label and TLD checks applied while building candidates

use crate::error::{DomainScoutError, Result};
use regex::Regex;

/// Longest label DNS allows.
pub const MAX_LABEL_LEN: usize = 63;
/// Longest full domain DNS allows.
pub const MAX_DOMAIN_LEN: usize = 253;

/// Checks the pieces of `label.tld` candidates before any lookup is spent on them.
pub struct DomainValidator {
    label_chars: Regex,
    tld_chars: Regex,
}

impl DomainValidator {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| DomainScoutError::internal(format!("bad pattern {}: {}", pattern, e)))
        };
        Ok(Self {
            label_chars: compile(r"^[a-z0-9-]+$")?,
            tld_chars: compile(r"^[a-z]{2,63}$")?,
        })
    }

    /// A candidate domain: one label, one TLD, within the length limit.
    pub fn validate(&self, domain: &str) -> Result<()> {
        if domain.len() > MAX_DOMAIN_LEN {
            return Err(DomainScoutError::validation(format!(
                "Domain '{}' is longer than {} characters",
                domain, MAX_DOMAIN_LEN
            )));
        }
        let (label, tld) = domain
            .rsplit_once('.')
            .ok_or_else(|| DomainScoutError::validation(format!("Domain '{}' has no TLD", domain)))?;
        self.validate_label(label)?;
        self.validate_tld(tld)
    }

    /// A single lowercase label
    pub fn validate_label(&self, label: &str) -> Result<()> {
        if label.is_empty() {
            return Err(DomainScoutError::validation("Domain label cannot be empty"));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(DomainScoutError::validation(format!(
                "Domain label '{}' is longer than {} characters",
                label, MAX_LABEL_LEN
            )));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(DomainScoutError::validation("Domain label cannot start or end with hyphen"));
        }
        if !self.label_chars.is_match(label) {
            return Err(DomainScoutError::validation(format!(
                "Domain label '{}' contains invalid characters",
                label
            )));
        }
        Ok(())
    }

    pub fn validate_tld(&self, tld: &str) -> Result<()> {
        if !self.tld_chars.is_match(tld) {
            return Err(DomainScoutError::validation(format!("Invalid TLD: '{}'", tld)));
        }
        Ok(())
    }
}
