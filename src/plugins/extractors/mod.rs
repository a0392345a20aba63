// Vendor extractor implementations
pub mod nike;
pub mod zalando;

pub use nike::NikeExtractor;
pub use zalando::ZalandoExtractor;

use std::collections::BTreeMap;

use crate::fetcher::HttpFetcher;
use crate::models::ProviderKind;
use crate::plugins::traits::Extractor;
use crate::utils::error::{AppError, Result};

impl ProviderKind {
    /// Build the extractor for this vendor. The provider id is resolved to a
    /// concrete type here, once, at configuration time.
    pub fn extractor(&self, fetcher: HttpFetcher, product_id: Option<String>) -> Box<dyn Extractor> {
        match self {
            ProviderKind::Nike => Box::new(NikeExtractor::new(fetcher, product_id)),
            ProviderKind::Zalando => Box::new(ZalandoExtractor::new(fetcher, product_id)),
        }
    }
}

/// Pick one product record out of everything a page exposed.
///
/// With a configured id the record whose key (or any identifier reported by
/// `identifies`) matches is taken. Without one the page must expose exactly
/// one record; several records is an ambiguity error rather than a guess.
pub(crate) fn select_record<T>(
    vendor: ProviderKind,
    mut records: BTreeMap<String, T>,
    wanted: Option<&str>,
    identifies: impl Fn(&T, &str) -> bool,
) -> Result<T> {
    if records.is_empty() {
        return Err(AppError::not_found(vendor.as_str(), "payload contains no product records"));
    }

    match wanted {
        Some(wanted) => {
            let key = records
                .iter()
                .find(|(key, record)| key.as_str() == wanted || identifies(record, wanted))
                .map(|(key, _)| key.clone());

            match key.and_then(|key| records.remove(&key)) {
                Some(record) => Ok(record),
                None => Err(AppError::not_found(
                    vendor.as_str(),
                    format!(
                        "product '{}' not on page (found: {})",
                        wanted,
                        records.keys().cloned().collect::<Vec<_>>().join(", ")
                    ),
                )),
            }
        }
        None if records.len() == 1 => match records.pop_first() {
            Some((_, record)) => Ok(record),
            None => Err(AppError::not_found(vendor.as_str(), "payload contains no product records")),
        },
        None => Err(AppError::malformed(
            vendor.as_str(),
            format!(
                "page lists {} product records ({}); configure product_id to pick one",
                records.len(),
                records.keys().cloned().collect::<Vec<_>>().join(", ")
            ),
        )),
    }
}
