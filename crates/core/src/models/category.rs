//! Category objects: named, ordered groupings of stickers.

use std::cmp::Ordering;

use imoji_protocol::{AttributionPayload, CategoryPayload, ClassificationParam};

use super::content::ContentObject;
use crate::error::{Error, Result};

/// High level grouping of categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CategoryClassification {
	/// Time sensitive categories (sporting events, holidays, ...).
	Trending,
	/// Categories that are not time sensitive (emotions, locations, people, ...).
	Generic,
	/// All categories.
	#[default]
	None,
}

impl CategoryClassification {
	pub(crate) fn to_param(self) -> ClassificationParam {
		match self {
			CategoryClassification::Trending => ClassificationParam::Trending,
			CategoryClassification::Generic => ClassificationParam::Generic,
			CategoryClassification::None => ClassificationParam::None,
		}
	}

	fn from_wire(name: &str) -> Option<Self> {
		match name.to_ascii_lowercase().as_str() {
			"trending" => Some(CategoryClassification::Trending),
			"generic" => Some(CategoryClassification::Generic),
			"none" => Some(CategoryClassification::None),
			_ => None,
		}
	}
}

/// Artist credit attached to a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryAttribution {
	pub artist_name: String,
	pub artist_summary: Option<String>,
	pub url: Option<String>,
}

impl From<AttributionPayload> for CategoryAttribution {
	fn from(payload: AttributionPayload) -> Self {
		Self {
			artist_name: payload.artist_name,
			artist_summary: payload.artist_summary,
			url: payload.url,
		}
	}
}

/// A category with its preview stickers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryObject {
	identifier: String,
	title: String,
	classification: CategoryClassification,
	order: u32,
	priority: u32,
	previews: Vec<ContentObject>,
	attribution: Option<CategoryAttribution>,
}

impl CategoryObject {
	pub fn new(
		identifier: impl Into<String>,
		title: impl Into<String>,
		classification: CategoryClassification,
		order: u32,
		priority: u32,
		previews: Vec<ContentObject>,
		attribution: Option<CategoryAttribution>,
	) -> Self {
		Self {
			identifier: identifier.into(),
			title: title.into(),
			classification,
			order,
			priority,
			previews,
			attribution,
		}
	}

	/// Builds a category from its wire payload.
	///
	/// `requested` is used when the payload does not name its own classification.
	pub fn from_payload(payload: CategoryPayload, requested: CategoryClassification) -> Result<Self> {
		if payload.id.trim().is_empty() {
			return Err(Error::Server("category payload is missing an id".to_string()));
		}

		let classification = payload
			.classification
			.as_deref()
			.and_then(CategoryClassification::from_wire)
			.unwrap_or(requested);
		let previews = payload
			.preview_imojis
			.into_iter()
			.map(ContentObject::from_payload)
			.collect::<Result<Vec<_>>>()?;

		Ok(Self::new(
			payload.id,
			payload.title,
			classification,
			payload.order,
			payload.priority,
			previews,
			payload.attribution.map(CategoryAttribution::from),
		))
	}

	pub fn identifier(&self) -> &str {
		&self.identifier
	}

	pub fn title(&self) -> &str {
		&self.title
	}

	pub fn classification(&self) -> CategoryClassification {
		self.classification
	}

	pub fn order(&self) -> u32 {
		self.order
	}

	pub fn priority(&self) -> u32 {
		self.priority
	}

	pub fn previews(&self) -> &[ContentObject] {
		&self.previews
	}

	pub fn attribution(&self) -> Option<&CategoryAttribution> {
		self.attribution.as_ref()
	}

	/// Display ordering: `order` ascending, then `priority` descending.
	pub fn display_cmp(&self, other: &Self) -> Ordering {
		self.order.cmp(&other.order).then_with(|| other.priority.cmp(&self.priority))
	}
}

/// Sorts categories into display order. The sort is stable.
pub fn sort_categories(categories: &mut [CategoryObject]) {
	categories.sort_by(CategoryObject::display_cmp);
}
