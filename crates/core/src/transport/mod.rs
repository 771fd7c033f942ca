//! Transport collaborator: the HTTP boundary of the SDK.
//!
//! The session never talks to the network directly. It builds [`ApiRequest`]s
//! and hands them to a [`Transport`], which returns the decoded JSON body or a
//! [`TransportError`]. [`HttpTransport`] is the production implementation;
//! [`FakeTransport`] scripts responses for tests.

pub mod fake;
pub mod http;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use imoji_protocol::{Endpoint, HttpMethod};
use serde_json::Value;
use thiserror::Error;

pub use fake::{FakeGate, FakeTransport};
pub use http::HttpTransport;

/// Settings for building a transport, usually derived from a
/// [`StoragePolicy`](crate::StoragePolicy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
	/// Directory for the on-disk response cache, `None` to disable it.
	pub response_cache_dir: Option<PathBuf>,
	/// Disk capacity of the response cache. The oldest entries are evicted to
	/// stay within it; a single body larger than this is never cached.
	pub max_cache_bytes: u64,
	pub request_timeout: Duration,
	pub user_agent: String,
}

impl Default for TransportConfig {
	fn default() -> Self {
		Self {
			response_cache_dir: None,
			max_cache_bytes: crate::storage::DEFAULT_RESPONSE_CACHE_BYTES,
			request_timeout: crate::storage::DEFAULT_REQUEST_TIMEOUT,
			user_agent: format!("imoji-rs/{}", env!("CARGO_PKG_VERSION")),
		}
	}
}

/// One API call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
	pub endpoint: Endpoint,
	/// Query parameters for `GET`, JSON body otherwise.
	pub params: Value,
	pub bearer_token: Option<String>,
}

impl ApiRequest {
	pub fn new(endpoint: Endpoint, params: Value) -> Self {
		Self {
			endpoint,
			params,
			bearer_token: None,
		}
	}

	pub fn with_bearer(mut self, token: Option<String>) -> Self {
		self.bearer_token = token;
		self
	}

	pub fn path(&self) -> &'static str {
		self.endpoint.path()
	}

	pub fn method(&self) -> HttpMethod {
		self.endpoint.method()
	}
}

/// Failures reported by a [`Transport`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
	/// The server answered with a non-success HTTP status.
	#[error("HTTP {status}: {body}")]
	Status { status: u16, body: String },

	/// The request never produced a response.
	#[error("Network error: {0}")]
	Network(String),

	/// The response body could not be decoded.
	#[error("Malformed response: {0}")]
	Decode(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
	/// Issues an API call and returns the decoded JSON body.
	async fn send(&self, request: ApiRequest) -> Result<Value, TransportError>;

	/// Downloads raw bytes, typically an image rendition.
	async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError>;

	/// Uploads raw bytes to a pre-signed location.
	async fn upload(&self, url: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), TransportError>;
}
