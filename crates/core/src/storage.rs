//! Storage policy: where cached and persistent session data lives.
//!
//! Two roots are resolved once, when the session is built:
//!
//! * `cache_path` holds downloaded and rendered sticker bytes plus the HTTP
//!   response cache. Files idle for longer than [`CACHE_IDLE_EXPIRY`] may be
//!   purged at any time.
//! * `persistent_path` holds long lived artifacts that must survive cache
//!   eviction.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::ImageVariant;
use crate::transport::TransportConfig;

/// Idle time after which cached files are eligible for removal.
pub const CACHE_IDLE_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound for the on-disk HTTP response cache (20 MB).
pub const DEFAULT_RESPONSE_CACHE_BYTES: u64 = 20 * 1024 * 1024;

/// Timeout applied to every network request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CONTENT_DIR: &str = "content";
const RESPONSE_DIR: &str = "responses";

/// Resolved filesystem roots for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePolicy {
	cache_path: PathBuf,
	persistent_path: PathBuf,
}

impl StoragePolicy {
	/// Creates a policy from explicit roots.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidArgument`] if either path is empty or both are the same.
	pub fn new(cache_path: impl Into<PathBuf>, persistent_path: impl Into<PathBuf>) -> Result<Self> {
		let cache_path = cache_path.into();
		let persistent_path = persistent_path.into();

		if cache_path.as_os_str().is_empty() {
			return Err(Error::InvalidArgument("cache path must not be empty".to_string()));
		}
		if persistent_path.as_os_str().is_empty() {
			return Err(Error::InvalidArgument("persistent path must not be empty".to_string()));
		}
		if cache_path == persistent_path {
			return Err(Error::InvalidArgument(format!(
				"cache and persistent paths must differ (both are {})",
				cache_path.display()
			)));
		}

		Ok(Self {
			cache_path,
			persistent_path,
		})
	}

	/// Policy rooted in the operating system's temporary directory.
	pub fn temporary() -> Self {
		let root = std::env::temp_dir().join("imoji");
		Self {
			cache_path: root.join("cache"),
			persistent_path: root.join("persistent"),
		}
	}

	pub fn cache_path(&self) -> &Path {
		&self.cache_path
	}

	pub fn persistent_path(&self) -> &Path {
		&self.persistent_path
	}

	/// Location of the cached bytes for one variant of one imoji.
	///
	/// The path depends only on `(identifier, variant)`, so a variant never
	/// moves once it has been stored.
	pub fn content_path(&self, identifier: &str, variant: ImageVariant) -> PathBuf {
		let safe_id: String = url::form_urlencoded::byte_serialize(identifier.as_bytes()).collect();
		self.cache_path.join(CONTENT_DIR).join(format!("{safe_id}-{variant}.img"))
	}

	pub fn response_cache_dir(&self) -> PathBuf {
		self.cache_path.join(RESPONSE_DIR)
	}

	/// Transport configuration derived from this policy.
	pub fn transport_config(&self) -> TransportConfig {
		TransportConfig {
			response_cache_dir: Some(self.response_cache_dir()),
			max_cache_bytes: DEFAULT_RESPONSE_CACHE_BYTES,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			user_agent: format!("imoji-rs/{}", env!("CARGO_PKG_VERSION")),
		}
	}

	/// Creates both roots if they are missing.
	pub async fn ensure_dirs(&self) -> io::Result<()> {
		tokio::fs::create_dir_all(&self.cache_path).await?;
		tokio::fs::create_dir_all(&self.persistent_path).await
	}

	/// Removes cached files not modified within [`CACHE_IDLE_EXPIRY`] of `now`.
	///
	/// Only `cache_path` is visited. Returns the number of files removed.
	pub fn purge_expired(&self, now: SystemTime) -> io::Result<usize> {
		if !self.cache_path.exists() {
			return Ok(0);
		}
		let removed = purge_dir(&self.cache_path, now)?;
		debug!(target = "imoji.storage", removed, root = %self.cache_path.display(), "purged idle cache files");
		Ok(removed)
	}
}

fn purge_dir(dir: &Path, now: SystemTime) -> io::Result<usize> {
	let mut removed = 0;
	for entry in std::fs::read_dir(dir)? {
		let entry = entry?;
		let file_type = entry.file_type()?;
		let path = entry.path();

		if file_type.is_dir() {
			removed += purge_dir(&path, now)?;
			continue;
		}

		let modified = entry.metadata()?.modified()?;
		let idle = now.duration_since(modified).unwrap_or(Duration::ZERO);
		if idle <= CACHE_IDLE_EXPIRY {
			continue;
		}

		match std::fs::remove_file(&path) {
			Ok(()) => removed += 1,
			Err(err) if err.kind() == io::ErrorKind::NotFound => {}
			Err(err) => warn!(target = "imoji.storage", path = %path.display(), error = %err, "failed to purge cache file"),
		}
	}
	Ok(removed)
}
