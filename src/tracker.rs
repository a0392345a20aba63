use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{AvailabilityResult, FirstPollPolicy, Product, ProviderKind, TransitionKind, WatchedSize};
use crate::plugins::traits::{ImageSource, NotificationEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeTransition {
    pub index: usize,
    pub label: String,
    pub kind: TransitionKind,
}

/// Apply one observation to a watch set and report every edge it produced.
///
/// A label missing from `observed` counts as unavailable. Each entry is judged
/// on its own memory, so duplicate labels never share state. After evaluation
/// `previously_available` is set to the new value for every entry.
pub fn diff_sizes(sizes: &mut [WatchedSize], observed: &AvailabilityResult) -> Vec<SizeTransition> {
    let mut transitions = Vec::new();

    for (index, size) in sizes.iter_mut().enumerate() {
        size.currently_available = observed.is_available(&size.label);

        if let Some(kind) = TransitionKind::from_edge(size.previously_available, size.currently_available) {
            transitions.push(SizeTransition {
                index,
                label: size.label.clone(),
                kind,
            });
        }

        size.previously_available = size.currently_available;
    }

    transitions
}

/// Availability state for one (product, provider) pairing.
#[derive(Debug)]
pub struct AvailabilityTracker {
    product: Arc<Product>,
    provider: ProviderKind,
    target_url: String,
    sizes: Vec<WatchedSize>,
    first_poll: FirstPollPolicy,
    primed: bool,
}

impl AvailabilityTracker {
    pub fn new<L: Into<String>>(
        product: Arc<Product>,
        provider: ProviderKind,
        target_url: impl Into<String>,
        labels: impl IntoIterator<Item = L>,
        first_poll: FirstPollPolicy,
    ) -> Self {
        Self {
            product,
            provider,
            target_url: target_url.into(),
            sizes: labels.into_iter().map(WatchedSize::new).collect(),
            first_poll,
            primed: false,
        }
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn sizes(&self) -> &[WatchedSize] {
        &self.sizes
    }

    pub fn available_sizes(&self) -> Vec<&str> {
        self.sizes
            .iter()
            .filter(|s| s.currently_available)
            .map(|s| s.label.as_str())
            .collect()
    }

    /// Diff an observation against the last processed one and build the events
    /// the dispatcher should send.
    pub fn diff(&mut self, observed: &AvailabilityResult) -> Vec<NotificationEvent> {
        if !self.primed && self.first_poll == FirstPollPolicy::Suppress {
            self.primed = true;
            for size in &mut self.sizes {
                size.currently_available = observed.is_available(&size.label);
                size.previously_available = size.currently_available;
            }
            tracing::debug!(
                product = %self.product.title,
                provider = %self.provider,
                "Seeded availability from first poll without notifying"
            );
            return Vec::new();
        }
        self.primed = true;

        diff_sizes(&mut self.sizes, observed)
            .into_iter()
            .map(|transition| self.build_event(&transition))
            .collect()
    }

    fn build_event(&self, transition: &SizeTransition) -> NotificationEvent {
        let (title, body) = match transition.kind {
            TransitionKind::Restock => (
                format!("{} available 👟", self.product.title),
                format!("Size {} now available at {}", transition.label, self.provider),
            ),
            TransitionKind::Sellout => (
                format!("{} sold out", self.product.title),
                format!("Size {} no longer available at {}", transition.label, self.provider),
            ),
        };

        NotificationEvent {
            id: Uuid::new_v4(),
            kind: transition.kind,
            product_title: self.product.title.clone(),
            provider: self.provider,
            size_label: transition.label.clone(),
            title,
            body,
            target_url: self.target_url.clone(),
            include_image: transition.kind == TransitionKind::Restock,
            image: self.product.image_url.as_ref().map(|url| ImageSource {
                cache_key: self.product.cache_key(),
                url: url.clone(),
            }),
            observed_at: Utc::now(),
        }
    }
}
