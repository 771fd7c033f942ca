//! Endpoint table for the Imoji REST API.

use serde::{Deserialize, Serialize};

/// HTTP method used by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
	Get,
	Post,
	Put,
	Delete,
}

/// Every API call the SDK issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
	OAuthToken,
	Categories,
	Search,
	SearchSentence,
	Featured,
	FetchByIds,
	UserContent,
	UserCollectionAdd,
	Remove,
	ReportAbusive,
	Create,
}

impl Endpoint {
	/// Path relative to the API base URL.
	pub const fn path(self) -> &'static str {
		match self {
			Endpoint::OAuthToken => "oauth/token",
			Endpoint::Categories => "imoji/categories/fetch",
			Endpoint::Search => "imoji/search",
			Endpoint::SearchSentence => "imoji/search/sentence",
			Endpoint::Featured => "imoji/featured/fetch",
			Endpoint::FetchByIds => "imoji/fetchMultiple",
			Endpoint::UserContent => "user/imoji/fetch",
			Endpoint::UserCollectionAdd => "user/imoji/collection/add",
			Endpoint::Remove => "imoji/remove",
			Endpoint::ReportAbusive => "imoji/reportAbusive",
			Endpoint::Create => "imoji/create",
		}
	}

	pub const fn method(self) -> HttpMethod {
		match self {
			Endpoint::OAuthToken
			| Endpoint::FetchByIds
			| Endpoint::UserCollectionAdd
			| Endpoint::ReportAbusive
			| Endpoint::Create => HttpMethod::Post,
			Endpoint::Remove => HttpMethod::Delete,
			_ => HttpMethod::Get,
		}
	}

	/// Whether the call runs with a user-scoped token.
	pub const fn requires_user(self) -> bool {
		matches!(self, Endpoint::UserContent | Endpoint::UserCollectionAdd | Endpoint::Remove)
	}
}
