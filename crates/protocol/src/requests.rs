//! Request parameter records, one per endpoint.

use serde::{Deserialize, Serialize};

/// Category grouping requested from `imoji/categories/fetch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationParam {
	Trending,
	Generic,
	None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoriesParams {
	pub classification: ClassificationParam,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
	pub query: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub offset: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub num_results: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceParams {
	pub sentence: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub num_results: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedParams {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub num_results: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchByIdsParams {
	pub ids: Vec<String>,
}

/// Parameters for calls that target a single imoji.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImojiRefParams {
	pub imoji_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportParams {
	pub imoji_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateParams {
	#[serde(default)]
	pub tags: Vec<String>,
	/// MIME type of the image that will be uploaded.
	pub content_type: String,
}
