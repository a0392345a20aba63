use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Network error: {url}: {message}")]
    Network { url: String, message: String },

    #[error("Extraction payload not found: {vendor}: {message}")]
    ExtractionNotFound { vendor: String, message: String },

    #[error("Extraction payload malformed: {vendor}: {message}")]
    ExtractionMalformed { vendor: String, message: String },

    #[error("Channel delivery error: {channel}: {message}")]
    ChannelDelivery { channel: String, message: String },

    #[error("Image cache error: {0}")]
    ImageCache(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn network(url: impl Into<String>, message: impl ToString) -> Self {
        AppError::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn not_found(vendor: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::ExtractionNotFound {
            vendor: vendor.into(),
            message: message.into(),
        }
    }

    pub fn malformed(vendor: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::ExtractionMalformed {
            vendor: vendor.into(),
            message: message.into(),
        }
    }

    pub fn delivery(channel: impl Into<String>, message: impl ToString) -> Self {
        AppError::ChannelDelivery {
            channel: channel.into(),
            message: message.to_string(),
        }
    }

    /// Errors that abort a single pairing's poll but leave the loop running.
    pub fn is_poll_failure(&self) -> bool {
        matches!(
            self,
            AppError::Network { .. }
                | AppError::ExtractionNotFound { .. }
                | AppError::ExtractionMalformed { .. }
        )
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
