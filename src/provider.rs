use crate::config::ProviderConfig;
use crate::fetcher::HttpFetcher;
use crate::models::{AvailabilityResult, ProviderKind};
use crate::plugins::traits::Extractor;
use crate::utils::error::Result;

/// A vendor page being watched. Owns the extractor for its vendor.
pub struct Provider {
    kind: ProviderKind,
    url: String,
    extractor: Box<dyn Extractor>,
}

impl Provider {
    pub fn new(kind: ProviderKind, url: impl Into<String>, extractor: Box<dyn Extractor>) -> Self {
        Self {
            kind,
            url: url.into(),
            extractor,
        }
    }

    pub fn from_config(config: &ProviderConfig, fetcher: &HttpFetcher) -> Self {
        let extractor = config.id.extractor(fetcher.clone(), config.product_id.clone());
        Self::new(config.id, config.url.clone(), extractor)
    }

    pub fn id(&self) -> ProviderKind {
        self.kind
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch_availability(&self) -> Result<AvailabilityResult> {
        self.extractor.fetch(&self.url).await
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("kind", &self.kind)
            .field("url", &self.url)
            .finish()
    }
}
