//! Domain research: multi-registrar price comparison and the cache-first,
//! quota-bounded orchestrator built on top of it.

pub mod orchestrator;
pub mod pricing;

pub use orchestrator::{AvailabilityChain, DomainResearcher, Resolution, ResearchOptions};
pub use pricing::PriceAggregator;

use tokio::task::JoinError;

/// Render a failed task as an outcome error string.
pub(crate) fn join_error_message(err: JoinError) -> String {
    if err.is_cancelled() {
        return "task cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {}", message)
    } else {
        "panic: unknown cause".to_string()
    }
}
