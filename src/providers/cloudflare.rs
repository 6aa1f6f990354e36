//! Cloudflare Registrar
//!
//! Cloudflare sells at cost but exposes no public availability or pricing
//! endpoint, so a configured client answers with a pointer to the dashboard
//! without touching the network.

use crate::config::CloudflareConfig;
use crate::providers::PriceProvider;
use crate::types::{RegistrarPrice, API_NOT_PUBLICLY_AVAILABLE, MISSING_CREDENTIALS};
use async_trait::async_trait;

const NAME: &str = "cloudflare";
const DASHBOARD_URL: &str = "https://dash.cloudflare.com/registrar";

pub struct CloudflareClient {
    config: CloudflareConfig,
}

impl CloudflareClient {
    pub fn new(config: CloudflareConfig) -> Self {
        Self { config }
    }

    fn is_configured(&self) -> bool {
        self.config.settings.enabled && self.config.api_token.is_some()
    }
}

#[async_trait]
impl PriceProvider for CloudflareClient {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_enabled(&self) -> bool {
        self.config.settings.enabled
    }

    async fn fetch_price(&self, domain: &str) -> RegistrarPrice {
        if !self.is_configured() {
            return RegistrarPrice::failed(NAME, MISSING_CREDENTIALS);
        }
        tracing::debug!(domain = %domain, "Cloudflare has no public availability API");
        RegistrarPrice::failed(NAME, API_NOT_PUBLICLY_AVAILABLE)
            .with_registration_url(Some(DASHBOARD_URL.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;

    #[tokio::test]
    async fn test_configured_client_points_to_dashboard() {
        let client = CloudflareClient::new(CloudflareConfig {
            api_token: Some(Secret::new("token")),
            ..CloudflareConfig::default()
        });

        let price = client.fetch_price("acme.com").await;
        assert_eq!(price.error.as_deref(), Some(API_NOT_PUBLICLY_AVAILABLE));
        assert_eq!(price.registration_url.as_deref(), Some(DASHBOARD_URL));
        assert!(price.price_usd.is_none());
        assert!(!price.is_offer());
    }

    #[tokio::test]
    async fn test_without_token() {
        let client = CloudflareClient::new(CloudflareConfig::default());
        let price = client.fetch_price("acme.com").await;
        assert_eq!(price.error.as_deref(), Some(MISSING_CREDENTIALS));
        assert!(price.registration_url.is_none());
    }
}
