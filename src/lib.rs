//! Domain Scout - multi-registrar domain availability and price research
//!
//! Checks candidate domains against several rate-limited registrar APIs,
//! picks the best offer for each, and remembers every answer in a local
//! SQLite cache so repeated runs do not spend API quota twice.

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod providers;
pub mod ratelimit;
pub mod research;
pub mod types;

// Re-export commonly used types
pub use cache::DomainCache;
pub use config::ScoutConfig;
pub use error::{DomainScoutError, ErrorKind, Result};
pub use ratelimit::TokenBucket;
pub use types::{
    AvailabilityStatus, Candidates, DomainOutcome, PriceComparison, RegistrarPrice, Research,
};

// Re-export main functionality
pub use providers::{AvailabilityProvider, BatchProvider, PriceProvider};
pub use research::{DomainResearcher, PriceAggregator, Resolution, ResearchOptions};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() -> Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();
    Ok(())
}
