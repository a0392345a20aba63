use async_trait::async_trait;

use crate::models::{AvailabilityResult, ProviderKind};
use crate::utils::error::Result;

/// Vendor-specific size availability extraction.
///
/// Implementations fetch one page and return every size label the selected
/// product record lists, mapped to whether it can be bought right now. A page
/// whose payload can't be located or parsed is an error, never an empty result.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Extractor: Send + Sync {
    fn vendor(&self) -> ProviderKind;

    async fn fetch(&self, url: &str) -> Result<AvailabilityResult>;
}
