//! reqwest-backed [`Transport`] with an on-disk cache for downloaded assets.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use imoji_protocol::{Endpoint, HttpMethod};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};
use url::Url;

use super::{ApiRequest, Transport, TransportConfig, TransportError};

/// Default production API root.
pub const DEFAULT_API_URL: &str = "https://api.imoji.io/v1/";

pub struct HttpTransport {
	client: Client,
	base_url: Url,
	config: TransportConfig,
	/// Serializes cache writes so eviction sees a consistent directory.
	cache_writes: Mutex<()>,
}

impl HttpTransport {
	/// Builds a transport rooted at `base_url`.
	///
	/// # Errors
	///
	/// Returns [`TransportError::Network`] if the URL is invalid or the client
	/// cannot be constructed.
	pub fn new(base_url: &str, config: TransportConfig) -> Result<Self, TransportError> {
		let mut base_url = Url::parse(base_url).map_err(|e| TransportError::Network(format!("invalid API url {base_url}: {e}")))?;
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());
			base_url.set_path(&path);
		}

		let client = Client::builder()
			.timeout(config.request_timeout)
			.user_agent(config.user_agent.clone())
			.build()
			.map_err(|e| TransportError::Network(format!("failed to create HTTP client: {e}")))?;

		Ok(Self {
			client,
			base_url,
			config,
			cache_writes: Mutex::new(()),
		})
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url, TransportError> {
		self.base_url
			.join(endpoint.path())
			.map_err(|e| TransportError::Network(format!("invalid endpoint {}: {e}", endpoint.path())))
	}

	fn cache_file(&self, url: &str) -> Option<PathBuf> {
		let dir = self.config.response_cache_dir.as_ref()?;
		Some(dir.join(format!("{:x}", Sha256::digest(url.as_bytes()))))
	}

	fn build(&self, request: &ApiRequest) -> Result<RequestBuilder, TransportError> {
		let url = self.endpoint_url(request.endpoint)?;
		let method = match request.method() {
			HttpMethod::Get => Method::GET,
			HttpMethod::Post => Method::POST,
			HttpMethod::Put => Method::PUT,
			HttpMethod::Delete => Method::DELETE,
		};

		let mut builder = self.client.request(method, url);
		builder = match request.method() {
			HttpMethod::Get => builder.query(&query_pairs(&request.params)),
			_ => builder.json(&request.params),
		};
		if let Some(token) = &request.bearer_token {
			builder = builder.bearer_auth(token);
		}
		Ok(builder)
	}

	async fn read_cached(&self, url: &str) -> Option<Vec<u8>> {
		let path = self.cache_file(url)?;
		match tokio::fs::read(&path).await {
			Ok(bytes) => {
				debug!(target = "imoji.transport", url, "response cache hit");
				Some(bytes)
			}
			Err(_) => None,
		}
	}

	/// Stores `bytes` for `url`, evicting the oldest entries so the cache
	/// directory stays within `max_cache_bytes`. Bodies larger than the whole
	/// capacity are not cached.
	async fn store_cached(&self, url: &str, bytes: &[u8]) {
		let capacity = self.config.max_cache_bytes;
		if bytes.len() as u64 > capacity {
			trace!(target = "imoji.transport", url, size = bytes.len(), "response too large to cache");
			return;
		}
		let Some(path) = self.cache_file(url) else {
			return;
		};
		let Some(dir) = path.parent() else {
			return;
		};

		let _guard = self.cache_writes.lock().await;
		let result = async {
			tokio::fs::create_dir_all(dir).await?;
			let evicted = evict_to_fit(dir, &path, capacity - bytes.len() as u64).await?;
			if evicted > 0 {
				debug!(target = "imoji.transport", evicted, "evicted cached responses");
			}
			tokio::fs::write(&path, bytes).await
		}
		.await;

		if let Err(err) = result {
			warn!(target = "imoji.transport", url, error = %err, "failed to store response in cache");
		}
	}
}

/// Deletes the least recently written files in `dir` until the remaining ones,
/// `replacing` excluded, total at most `budget` bytes. Returns how many files
/// were removed.
async fn evict_to_fit(dir: &Path, replacing: &Path, budget: u64) -> io::Result<usize> {
	let mut entries: Vec<(SystemTime, u64, PathBuf)> = Vec::new();
	let mut listing = tokio::fs::read_dir(dir).await?;
	while let Some(entry) = listing.next_entry().await? {
		let path = entry.path();
		if path == replacing {
			continue;
		}
		let metadata = entry.metadata().await?;
		if !metadata.is_file() {
			continue;
		}
		let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
		entries.push((modified, metadata.len(), path));
	}

	let mut total: u64 = entries.iter().map(|(_, len, _)| len).sum();
	if total <= budget {
		return Ok(0);
	}

	entries.sort();
	let mut evicted = 0;
	for (_, len, path) in entries {
		if total <= budget {
			break;
		}
		match tokio::fs::remove_file(&path).await {
			Ok(()) => evicted += 1,
			Err(err) if err.kind() == io::ErrorKind::NotFound => {}
			Err(err) => return Err(err),
		}
		total -= len;
	}
	Ok(evicted)
}

#[async_trait]
impl Transport for HttpTransport {
	async fn send(&self, request: ApiRequest) -> Result<Value, TransportError> {
		debug!(target = "imoji.transport", path = request.path(), method = ?request.method(), "sending request");

		let response = self.build(&request)?.send().await.map_err(|e| TransportError::Network(e.to_string()))?;
		let status = response.status();
		let body = response.text().await.map_err(|e| TransportError::Network(e.to_string()))?;

		if !status.is_success() {
			return Err(TransportError::Status {
				status: status.as_u16(),
				body,
			});
		}
		if body.trim().is_empty() {
			return Ok(Value::Null);
		}
		serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
	}

	async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
		if let Some(bytes) = self.read_cached(url).await {
			return Ok(bytes);
		}

		let response = self.client.get(url).send().await.map_err(|e| TransportError::Network(e.to_string()))?;
		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(TransportError::Status {
				status: status.as_u16(),
				body,
			});
		}

		let bytes = response.bytes().await.map_err(|e| TransportError::Network(e.to_string()))?.to_vec();
		self.store_cached(url, &bytes).await;
		Ok(bytes)
	}

	async fn upload(&self, url: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), TransportError> {
		let response = self
			.client
			.put(url)
			.header(reqwest::header::CONTENT_TYPE, content_type)
			.body(bytes)
			.send()
			.await
			.map_err(|e| TransportError::Network(e.to_string()))?;

		let status = response.status();
		if status.is_success() {
			Ok(())
		} else {
			Err(TransportError::Status {
				status: status.as_u16(),
				body: response.text().await.unwrap_or_default(),
			})
		}
	}
}

/// Flattens a JSON object into query pairs. Arrays become comma separated lists.
fn query_pairs(params: &Value) -> Vec<(String, String)> {
	let Some(map) = params.as_object() else {
		return Vec::new();
	};

	map.iter()
		.filter_map(|(key, value)| {
			let rendered = match value {
				Value::Null => return None,
				Value::String(s) => s.clone(),
				Value::Array(items) => items
					.iter()
					.map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()))
					.collect::<Vec<_>>()
					.join(","),
				other => other.to_string(),
			};
			Some((key.clone(), rendered))
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn base_url_gains_trailing_slash() {
		let transport = HttpTransport::new("https://api.example.com/v1", TransportConfig::default()).unwrap();
		assert_eq!(transport.base_url().as_str(), "https://api.example.com/v1/");
		let url = transport.endpoint_url(Endpoint::Search).unwrap();
		assert_eq!(url.as_str(), "https://api.example.com/v1/imoji/search");
	}

	#[test]
	fn invalid_base_url_is_rejected() {
		assert!(HttpTransport::new("not a url", TransportConfig::default()).is_err());
	}

	#[test]
	fn query_pairs_flatten_scalars_and_lists() {
		let pairs = query_pairs(&json!({"query": "cat", "numResults": 3, "ids": ["a", "b"], "offset": null}));
		assert!(pairs.contains(&("query".to_string(), "cat".to_string())));
		assert!(pairs.contains(&("numResults".to_string(), "3".to_string())));
		assert!(pairs.contains(&("ids".to_string(), "a,b".to_string())));
		assert_eq!(pairs.len(), 3);
	}

	#[test]
	fn cache_files_are_keyed_by_url() {
		let config = TransportConfig {
			response_cache_dir: Some(PathBuf::from("/c/responses")),
			..TransportConfig::default()
		};
		let transport = HttpTransport::new(DEFAULT_API_URL, config).unwrap();
		let a = transport.cache_file("https://cdn/a.png").unwrap();
		let b = transport.cache_file("https://cdn/b.png").unwrap();
		assert_ne!(a, b);
		assert!(a.starts_with("/c/responses"));
	}

	#[tokio::test]
	async fn cached_bytes_are_served_without_network() {
		let dir = tempfile::tempdir().unwrap();
		let config = TransportConfig {
			response_cache_dir: Some(dir.path().to_path_buf()),
			..TransportConfig::default()
		};
		// Unroutable host: a network attempt would fail.
		let transport = HttpTransport::new("http://127.0.0.1:9/", config).unwrap();
		let url = "http://127.0.0.1:9/a.png";
		transport.store_cached(url, b"png-bytes").await;

		assert_eq!(transport.fetch(url).await.unwrap(), b"png-bytes");
	}

	fn age(path: &Path, seconds: u64) {
		let file = std::fs::File::options().write(true).open(path).unwrap();
		file.set_modified(SystemTime::now() - std::time::Duration::from_secs(seconds)).unwrap();
	}

	fn cached_bytes(dir: &Path) -> u64 {
		std::fs::read_dir(dir).unwrap().map(|entry| entry.unwrap().metadata().unwrap().len()).sum()
	}

	#[tokio::test]
	async fn cache_evicts_oldest_entries_beyond_capacity() {
		let dir = tempfile::tempdir().unwrap();
		let config = TransportConfig {
			response_cache_dir: Some(dir.path().to_path_buf()),
			max_cache_bytes: 10,
			..TransportConfig::default()
		};
		let transport = HttpTransport::new("http://127.0.0.1:9/", config).unwrap();
		let (a, b, c) = ("http://cdn/a.png", "http://cdn/b.png", "http://cdn/c.png");

		transport.store_cached(a, b"aaaa").await;
		transport.store_cached(b, b"bbbb").await;
		age(&transport.cache_file(a).unwrap(), 120);
		age(&transport.cache_file(b).unwrap(), 60);
		transport.store_cached(c, b"cccc").await;

		assert!(!transport.cache_file(a).unwrap().exists());
		assert!(transport.cache_file(b).unwrap().exists());
		assert_eq!(std::fs::read(transport.cache_file(c).unwrap()).unwrap(), b"cccc");
		assert_eq!(cached_bytes(dir.path()), 8);
	}

	#[tokio::test]
	async fn rewriting_an_entry_does_not_count_it_twice() {
		let dir = tempfile::tempdir().unwrap();
		let config = TransportConfig {
			response_cache_dir: Some(dir.path().to_path_buf()),
			max_cache_bytes: 10,
			..TransportConfig::default()
		};
		let transport = HttpTransport::new("http://127.0.0.1:9/", config).unwrap();

		transport.store_cached("http://cdn/a.png", b"aaaaaa").await;
		transport.store_cached("http://cdn/b.png", b"bbbb").await;
		transport.store_cached("http://cdn/b.png", b"BBBB").await;

		assert!(transport.cache_file("http://cdn/a.png").unwrap().exists());
		assert_eq!(cached_bytes(dir.path()), 10);
	}

	#[tokio::test]
	async fn bodies_larger_than_capacity_are_not_cached() {
		let dir = tempfile::tempdir().unwrap();
		let config = TransportConfig {
			response_cache_dir: Some(dir.path().to_path_buf()),
			max_cache_bytes: 4,
			..TransportConfig::default()
		};
		let transport = HttpTransport::new("http://127.0.0.1:9/", config).unwrap();
		transport.store_cached("http://cdn/a.png", b"small").await;

		assert!(!transport.cache_file("http://cdn/a.png").unwrap().exists());
	}
}
