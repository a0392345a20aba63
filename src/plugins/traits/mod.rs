pub mod extractor;
pub mod notifier;

pub use extractor::Extractor;
pub use notifier::{ImageSource, NotifierPlugin, NotificationEvent, NotificationResult};
