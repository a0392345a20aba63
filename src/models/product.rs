use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A watched product. Shared read-only by every provider pairing that tracks it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    pub title: String,
    pub image_url: Option<String>,
}

impl Product {
    pub fn new(title: impl Into<String>, image_url: Option<String>) -> Self {
        Self {
            title: title.into(),
            image_url: image_url.filter(|url| !url.trim().is_empty()),
        }
    }

    /// Stable key for the image cache: a slug of the title, suffixed with a
    /// short digest of the image URL so a new URL gets a new file.
    pub fn cache_key(&self) -> String {
        let slug = self.title_slug();

        match &self.image_url {
            Some(url) => {
                let digest = Uuid::new_v5(&Uuid::NAMESPACE_URL, url.as_bytes()).simple().to_string();
                format!("{}-{}", slug, &digest[..8])
            }
            None => slug,
        }
    }

    fn title_slug(&self) -> String {
        let mut key = String::with_capacity(self.title.len());
        let mut last_dash = true;

        for c in self.title.chars() {
            if c.is_ascii_alphanumeric() {
                key.push(c.to_ascii_lowercase());
                last_dash = false;
            } else if !last_dash {
                key.push('-');
                last_dash = true;
            }
        }

        let key = key.trim_end_matches('-');
        if key.is_empty() {
            "product".to_string()
        } else {
            key.to_string()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchedSize {
    pub label: String,
    pub currently_available: bool,
    pub previously_available: bool,
}

impl WatchedSize {
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_initial(label, false)
    }

    pub fn with_initial(label: impl Into<String>, available: bool) -> Self {
        Self {
            label: label.into(),
            currently_available: available,
            previously_available: available,
        }
    }
}
