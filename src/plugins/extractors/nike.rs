use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use super::select_record;
use crate::fetcher::HttpFetcher;
use crate::models::{AvailabilityResult, ProviderKind};
use crate::plugins::traits::Extractor;
use crate::utils::error::{AppError, Result};

static INITIAL_STATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<script>window\.INITIAL_REDUX_STATE=(.*?);</script>").expect("valid redux state pattern")
});

#[derive(Debug, Deserialize)]
struct NikeState {
    #[serde(rename = "Threads")]
    threads: NikeThreads,
}

#[derive(Debug, Deserialize)]
struct NikeThreads {
    #[serde(default)]
    products: BTreeMap<String, NikeProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NikeProduct {
    #[serde(default)]
    id: String,
    #[serde(default)]
    style_color: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    skus: Vec<NikeSku>,
    #[serde(default)]
    available_skus: Vec<NikeAvailableSku>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NikeSku {
    sku_id: String,
    #[serde(default)]
    nike_size: String,
    #[serde(default)]
    localized_size: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NikeAvailableSku {
    sku_id: String,
    #[serde(default)]
    available: bool,
}

pub struct NikeExtractor {
    fetcher: HttpFetcher,
    product_id: Option<String>,
}

impl NikeExtractor {
    pub fn new(fetcher: HttpFetcher, product_id: Option<String>) -> Self {
        Self { fetcher, product_id }
    }

    pub fn extract(&self, html: &str) -> Result<AvailabilityResult> {
        extract_availability(html, self.product_id.as_deref())
    }
}

#[async_trait]
impl Extractor for NikeExtractor {
    fn vendor(&self) -> ProviderKind {
        ProviderKind::Nike
    }

    async fn fetch(&self, url: &str) -> Result<AvailabilityResult> {
        let page = self.fetcher.fetch_page(url).await?;
        self.extract(&page.body)
    }
}

/// Parse the redux state embedded in a Nike product page.
///
/// Sizes come from joining the product's `skus` catalog with `availableSkus`
/// on `skuId`; a catalog entry without an availability row is unavailable.
pub fn extract_availability(html: &str, product_id: Option<&str>) -> Result<AvailabilityResult> {
    let vendor = ProviderKind::Nike.as_str();

    let payload = INITIAL_STATE
        .captures(html)
        .and_then(|captures| captures.get(1))
        .ok_or_else(|| AppError::not_found(vendor, "INITIAL_REDUX_STATE script not on page"))?;

    let state: NikeState = serde_json::from_str(payload.as_str())
        .map_err(|e| AppError::malformed(vendor, format!("INITIAL_REDUX_STATE: {}", e)))?;

    let product = select_record(ProviderKind::Nike, state.threads.products, product_id, |product, wanted| {
        product.id == wanted || product.style_color.as_deref() == Some(wanted)
    })?;

    if product.skus.is_empty() {
        return Err(AppError::malformed(
            vendor,
            format!("product '{}' has no size catalog", product.title),
        ));
    }

    let mut stock: HashMap<&str, bool> = HashMap::with_capacity(product.available_skus.len());
    for entry in &product.available_skus {
        *stock.entry(entry.sku_id.as_str()).or_insert(false) |= entry.available;
    }

    let mut result = AvailabilityResult::new();
    for sku in &product.skus {
        let label = if sku.localized_size.is_empty() {
            &sku.nike_size
        } else {
            &sku.localized_size
        };

        if label.is_empty() {
            tracing::debug!(sku = %sku.sku_id, "Skipping Nike SKU without a size label");
            continue;
        }

        result.record(label.clone(), stock.get(sku.sku_id.as_str()).copied().unwrap_or(false));
    }

    if result.is_empty() {
        return Err(AppError::malformed(
            vendor,
            format!("product '{}' has no labelled sizes", product.title),
        ));
    }

    Ok(result)
}
