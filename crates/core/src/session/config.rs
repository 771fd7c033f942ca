//! Session configuration.

use std::fmt;

use url::Url;

use crate::error::{Error, Result};
use crate::render::RenderingOptions;
use crate::transport::http::DEFAULT_API_URL;

/// Application credentials issued by the Imoji developer portal.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
	pub client_id: String,
	pub api_token: String,
}

impl Credentials {
	pub fn new(client_id: impl Into<String>, api_token: impl Into<String>) -> Self {
		Self {
			client_id: client_id.into(),
			api_token: api_token.into(),
		}
	}
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("client_id", &self.client_id)
			.field("api_token", &"<redacted>")
			.finish()
	}
}

/// Settings for one [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
	pub credentials: Credentials,
	/// Base URL of the REST API.
	pub api_url: String,
	/// Options used by [`Session::render_default`](crate::Session::render_default).
	pub default_render_options: RenderingOptions,
	/// Download each result's thumbnail before its per-item callback fires.
	pub prefetch_previews: bool,
}

impl SessionConfig {
	pub fn new(credentials: Credentials) -> Self {
		Self {
			credentials,
			api_url: DEFAULT_API_URL.to_string(),
			default_render_options: RenderingOptions::default(),
			prefetch_previews: false,
		}
	}

	pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
		self.api_url = api_url.into();
		self
	}

	pub fn with_default_render_options(mut self, options: RenderingOptions) -> Self {
		self.default_render_options = options;
		self
	}

	pub fn with_prefetch_previews(mut self, prefetch: bool) -> Self {
		self.prefetch_previews = prefetch;
		self
	}

	/// Checks the configuration before a session is built.
	///
	/// # Errors
	///
	/// [`Error::InvalidArgument`] for blank credentials or an unparsable API URL.
	pub fn validate(&self) -> Result<()> {
		if self.credentials.client_id.trim().is_empty() {
			return Err(Error::InvalidArgument("client id must not be empty".to_string()));
		}
		if self.credentials.api_token.trim().is_empty() {
			return Err(Error::InvalidArgument("api token must not be empty".to_string()));
		}
		Url::parse(&self.api_url).map_err(|err| Error::InvalidArgument(format!("invalid api url {:?}: {err}", self.api_url)))?;
		self.default_render_options.validate()
	}
}
