use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::collections::BTreeMap;

use super::select_record;
use crate::fetcher::HttpFetcher;
use crate::models::{AvailabilityResult, ProviderKind};
use crate::plugins::traits::Extractor;
use crate::utils::error::{AppError, Result};

/// Script elements carrying the page's GraphQL cache snapshots.
pub const SCRIPT_SELECTOR: &str = "script[data-re-asset].re-1-12";

const OUT_OF_STOCK: &str = "OUT_OF_STOCK";

#[derive(Debug, Deserialize)]
struct ZalandoScript {
    #[serde(rename = "graphqlCache", default)]
    graphql_cache: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ZalandoEntry {
    data: ZalandoData,
}

#[derive(Debug, Deserialize)]
struct ZalandoData {
    context: ZalandoContext,
}

#[derive(Debug, Deserialize)]
struct ZalandoContext {
    #[serde(default)]
    entity_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    simples: Vec<ZalandoSimple>,
}

#[derive(Debug, Deserialize)]
struct ZalandoSimple {
    #[serde(default)]
    size: String,
    #[serde(default)]
    offer: ZalandoOffer,
}

#[derive(Debug, Default, Deserialize)]
struct ZalandoOffer {
    #[serde(default)]
    stock: ZalandoStock,
}

#[derive(Debug, Default, Deserialize)]
struct ZalandoStock {
    // OUT_OF_STOCK, ONE, TWO, MANY
    #[serde(default)]
    quantity: String,
}

impl ZalandoStock {
    fn in_stock(&self) -> bool {
        self.quantity != OUT_OF_STOCK
    }
}

pub struct ZalandoExtractor {
    fetcher: HttpFetcher,
    product_id: Option<String>,
}

impl ZalandoExtractor {
    pub fn new(fetcher: HttpFetcher, product_id: Option<String>) -> Self {
        Self { fetcher, product_id }
    }

    pub fn extract(&self, html: &str) -> Result<AvailabilityResult> {
        extract_availability(html, self.product_id.as_deref())
    }
}

#[async_trait]
impl Extractor for ZalandoExtractor {
    fn vendor(&self) -> ProviderKind {
        ProviderKind::Zalando
    }

    async fn fetch(&self, url: &str) -> Result<AvailabilityResult> {
        let page = self.fetcher.fetch_page(url).await?;
        self.extract(&page.body)
    }
}

/// Merge the product records from every GraphQL cache script on a Zalando page
/// and report the selected record's sizes.
pub fn extract_availability(html: &str, product_id: Option<&str>) -> Result<AvailabilityResult> {
    let vendor = ProviderKind::Zalando.as_str();

    let document = Html::parse_document(html);
    let selector = Selector::parse(SCRIPT_SELECTOR)
        .map_err(|e| AppError::malformed(vendor, format!("invalid selector '{}': {:?}", SCRIPT_SELECTOR, e)))?;

    let scripts: Vec<String> = document
        .select(&selector)
        .map(|element| element.text().collect::<String>())
        .collect();

    if scripts.is_empty() {
        return Err(AppError::not_found(vendor, format!("no '{}' payloads on page", SCRIPT_SELECTOR)));
    }

    let mut records: BTreeMap<String, ZalandoContext> = BTreeMap::new();
    let mut parsed = 0usize;
    let mut last_error = None;

    for script in &scripts {
        let content: ZalandoScript = match serde_json::from_str(script.trim()) {
            Ok(content) => content,
            Err(e) => {
                last_error = Some(e);
                continue;
            }
        };
        parsed += 1;

        // graphqlCache keys are opaque query hashes; only some values are product contexts
        for value in content.graphql_cache.into_values() {
            let Ok(entry) = serde_json::from_value::<ZalandoEntry>(value) else {
                continue;
            };

            let context = entry.data.context;
            if context.entity_id.is_empty() {
                continue;
            }

            match records.get_mut(&context.entity_id) {
                Some(existing) => existing.simples.extend(context.simples),
                None => {
                    records.insert(context.entity_id.clone(), context);
                }
            }
        }
    }

    if parsed == 0 {
        let detail = last_error.map(|e| e.to_string()).unwrap_or_default();
        return Err(AppError::malformed(
            vendor,
            format!("none of {} payloads parsed: {}", scripts.len(), detail),
        ));
    }

    let context = select_record(ProviderKind::Zalando, records, product_id, |_, _| false)?;

    if context.simples.is_empty() {
        return Err(AppError::malformed(
            vendor,
            format!("product '{}' has no size catalog", context.name),
        ));
    }

    let result: AvailabilityResult = context
        .simples
        .iter()
        .filter(|simple| !simple.size.is_empty())
        .map(|simple| (simple.size.clone(), simple.offer.stock.in_stock()))
        .collect();

    Ok(result)
}
