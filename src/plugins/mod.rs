pub mod extractors;
pub mod notifiers;
pub mod traits;

pub use notifiers::channels_from_config;
pub use traits::{Extractor, NotifierPlugin};
