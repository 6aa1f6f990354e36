//! Core types and structures for domain-scout

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error recorded when a provider is unconfigured or administratively disabled.
pub const MISSING_CREDENTIALS: &str = "missing_credentials_or_disabled";
/// Error recorded when the run's live-lookup budget is spent.
pub const MAX_CALLS_REACHED: &str = "max_calls_reached";
/// Error recorded for a domain a batch provider silently dropped.
pub const MISSING_RESULT: &str = "missing_result";
/// Error recorded when no provider could determine availability.
pub const NO_PROVIDER: &str = "no_provider";
/// Error recorded by registrars that publish no availability endpoint.
pub const API_NOT_PUBLICLY_AVAILABLE: &str = "api_not_publicly_available";
/// Error recorded when availability is known but pricing needs another call.
pub const PRICING_REQUIRES_SEPARATE_API_CALL: &str = "pricing_requires_separate_api_call";

/// Provider label of quota-blocked outcomes.
pub const QUOTA_PROVIDER: &str = "quota";
/// Provider label of outcomes whose resolution task failed unexpectedly.
pub const ERROR_PROVIDER: &str = "error";
/// Provider label of aggregated outcomes where no registrar answered.
pub const MULTI_REGISTRAR_PROVIDER: &str = "multi-registrar";

/// Candidate domains per logical name, as produced by the name generator.
pub type Candidates = BTreeMap<String, Vec<String>>;

/// Resolved outcomes per logical name.
pub type Research = BTreeMap<String, Vec<(String, DomainOutcome)>>;

/// Domain availability status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityStatus {
    Available,
    Taken,
    Unknown,
}

impl AvailabilityStatus {
    pub fn from_flag(available: Option<bool>) -> Self {
        match available {
            Some(true) => AvailabilityStatus::Available,
            Some(false) => AvailabilityStatus::Taken,
            None => AvailabilityStatus::Unknown,
        }
    }
}

impl std::fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AvailabilityStatus::Available => write!(f, "available"),
            AvailabilityStatus::Taken => write!(f, "taken"),
            AvailabilityStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Everything known about one domain after a lookup.
///
/// `available: None` means indeterminate; it is always paired with an
/// `error` when produced by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainOutcome {
    pub domain: String,
    pub available: Option<bool>,
    pub price_usd: Option<f64>,
    pub provider: String,
    pub error: Option<String>,
    /// Per-registrar detail; returned to callers, never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_comparison: Option<PriceComparison>,
}

impl DomainOutcome {
    pub fn new(
        domain: impl Into<String>,
        available: Option<bool>,
        price_usd: Option<f64>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            available,
            price_usd,
            provider: provider.into(),
            error: None,
            price_comparison: None,
        }
    }

    /// An indeterminate outcome carrying an error.
    pub fn failed(
        domain: impl Into<String>,
        provider: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(domain, None, None, provider)
        }
    }

    pub fn quota_exhausted(domain: impl Into<String>) -> Self {
        Self::failed(domain, QUOTA_PROVIDER, MAX_CALLS_REACHED)
    }

    pub fn missing_result(domain: impl Into<String>, provider: impl Into<String>) -> Self {
        Self::failed(domain, provider, MISSING_RESULT)
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_comparison(mut self, comparison: PriceComparison) -> Self {
        self.price_comparison = Some(comparison);
        self
    }

    pub fn status(&self) -> AvailabilityStatus {
        AvailabilityStatus::from_flag(self.available)
    }

    pub fn is_quota_blocked(&self) -> bool {
        self.provider == QUOTA_PROVIDER && self.error.as_deref() == Some(MAX_CALLS_REACHED)
    }
}

/// One registrar's answer for one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrarPrice {
    pub registrar: String,
    pub price_usd: Option<f64>,
    pub currency: String,
    pub is_available: Option<bool>,
    pub registration_url: Option<String>,
    pub renewal_price_usd: Option<f64>,
    pub transfer_price_usd: Option<f64>,
    pub error: Option<String>,
}

impl RegistrarPrice {
    pub fn new(registrar: impl Into<String>, price_usd: Option<f64>, is_available: Option<bool>) -> Self {
        Self {
            registrar: registrar.into(),
            price_usd,
            currency: "USD".to_string(),
            is_available,
            registration_url: None,
            renewal_price_usd: None,
            transfer_price_usd: None,
            error: None,
        }
    }

    /// A failed query: every value field absent.
    pub fn failed(registrar: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(registrar, None, None)
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_registration_url(mut self, url: Option<String>) -> Self {
        self.registration_url = url;
        self
    }

    pub fn with_renewal_price(mut self, price: Option<f64>) -> Self {
        self.renewal_price_usd = price;
        self
    }

    pub fn with_transfer_price(mut self, price: Option<f64>) -> Self {
        self.transfer_price_usd = price;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Priced and confirmed registerable.
    pub fn is_offer(&self) -> bool {
        self.price_usd.is_some() && self.is_available == Some(true)
    }
}

/// All registrar answers for one domain and the cheapest real offer.
///
/// `best_price` is always derived from `prices`; deserializing recomputes
/// it instead of trusting the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ComparisonRecord")]
pub struct PriceComparison {
    pub domain: String,
    prices: Vec<RegistrarPrice>,
    best_price: Option<RegistrarPrice>,
}

#[derive(Deserialize)]
struct ComparisonRecord {
    domain: String,
    #[serde(default)]
    prices: Vec<RegistrarPrice>,
}

impl From<ComparisonRecord> for PriceComparison {
    fn from(record: ComparisonRecord) -> Self {
        Self::new(record.domain, record.prices)
    }
}

impl PriceComparison {
    pub fn new(domain: impl Into<String>, prices: Vec<RegistrarPrice>) -> Self {
        let best_price = Self::derive_best(&prices);
        Self {
            domain: domain.into(),
            prices,
            best_price,
        }
    }

    /// Lowest `price_usd` among available, priced entries; first wins a tie.
    pub fn derive_best(prices: &[RegistrarPrice]) -> Option<RegistrarPrice> {
        prices
            .iter()
            .filter(|p| p.is_offer())
            .filter_map(|p| p.price_usd.map(|price| (price, p)))
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, p)| p.clone())
    }

    pub fn prices(&self) -> &[RegistrarPrice] {
        &self.prices
    }

    pub fn best_price(&self) -> Option<&RegistrarPrice> {
        self.best_price.as_ref()
    }

    pub fn into_prices(self) -> Vec<RegistrarPrice> {
        self.prices
    }
}
