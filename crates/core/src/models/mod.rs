//! Value objects produced by response parsing.

pub mod category;
pub mod content;

pub use category::{CategoryAttribution, CategoryClassification, CategoryObject, sort_categories};
pub use content::{ContentObject, ImageReference, ImageVariant};
