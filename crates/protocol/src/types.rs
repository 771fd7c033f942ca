//! Content and category payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One downloadable rendition of an imoji.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
	pub url: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub width: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub height: Option<u32>,
}

/// A sticker as returned by search, fetch and category endpoints.
///
/// `images` is keyed by variant name (`thumbnail`, `full`, `bordered`).
/// Unknown variant names are preserved and ignored by the SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPayload {
	#[serde(rename = "imojiId")]
	pub id: String,
	#[serde(default)]
	pub tags: Option<Vec<String>>,
	#[serde(default)]
	pub images: BTreeMap<String, ImagePayload>,
}

/// Result set for search, sentence, featured, fetch and user content calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetPayload {
	#[serde(default)]
	pub results: Vec<ContentPayload>,
	/// Alternate query suggested by the server.
	#[serde(default, rename = "followupSearchTerm")]
	pub follow_up_term: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionPayload {
	pub artist_name: String,
	#[serde(default)]
	pub artist_summary: Option<String>,
	#[serde(default)]
	pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPayload {
	pub id: String,
	pub title: String,
	/// Classification reported by the server, if any.
	#[serde(default)]
	pub classification: Option<String>,
	#[serde(default)]
	pub order: u32,
	#[serde(default)]
	pub priority: u32,
	#[serde(default)]
	pub preview_imojis: Vec<ContentPayload>,
	#[serde(default)]
	pub attribution: Option<AttributionPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoriesPayload {
	#[serde(default)]
	pub categories: Vec<CategoryPayload>,
}

/// Response to `imoji/create`: the server identifier and where to upload the image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayload {
	#[serde(rename = "imojiId")]
	pub id: String,
	pub upload_url: String,
	#[serde(default)]
	pub tags: Option<Vec<String>>,
	#[serde(default)]
	pub images: BTreeMap<String, ImagePayload>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn content_without_tags_or_images() {
		let payload: ContentPayload = serde_json::from_value(json!({"imojiId": "abc"})).unwrap();
		assert_eq!(payload.id, "abc");
		assert!(payload.tags.is_none());
		assert!(payload.images.is_empty());
	}

	#[test]
	fn result_set_with_follow_up() {
		let payload: ResultSetPayload = serde_json::from_value(json!({
			"status": "SUCCESS",
			"followupSearchTerm": "kitten",
			"results": [
				{"imojiId": "a", "tags": ["cat"], "images": {"thumbnail": {"url": "https://cdn/a-thumb.png", "width": 150}}},
				{"imojiId": "b"}
			]
		}))
		.unwrap();
		assert_eq!(payload.results.len(), 2);
		assert_eq!(payload.follow_up_term.as_deref(), Some("kitten"));
		assert_eq!(payload.results[0].images["thumbnail"].width, Some(150));
	}

	#[test]
	fn category_defaults() {
		let payload: CategoryPayload = serde_json::from_value(json!({"id": "c1", "title": "Happy"})).unwrap();
		assert_eq!(payload.order, 0);
		assert!(payload.preview_imojis.is_empty());
		assert!(payload.attribution.is_none());
	}
}
