//! CLI configuration: a JSON file plus environment overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use imoji::{Credentials, SessionConfig, StoragePolicy};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ENV_CLIENT_ID: &str = "IMOJI_CLIENT_ID";
pub const ENV_API_TOKEN: &str = "IMOJI_API_TOKEN";
pub const ENV_API_URL: &str = "IMOJI_API_URL";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub api_token: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub api_url: Option<String>,
	/// Root for ephemeral files; defaults to the platform cache directory.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cache_dir: Option<PathBuf>,
	/// Root for durable files; defaults to the platform data directory.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data_dir: Option<PathBuf>,
	/// Download thumbnails before listing results.
	#[serde(default)]
	pub prefetch_previews: bool,
}

/// `$CONFIG_DIR/imoji/config.json`, if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("imoji").join("config.json"))
}

impl CliConfig {
	/// Reads `path`, or the default location when `None`.
	///
	/// A missing default file yields an empty config; a missing explicit file
	/// is an error.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let (path, explicit) = match path {
			Some(path) => (path.to_path_buf(), true),
			None => match default_config_path() {
				Some(path) => (path, false),
				None => return Ok(Self::default()),
			},
		};

		if !explicit && !path.exists() {
			debug!(target = "imoji", path = %path.display(), "no config file");
			return Ok(Self::default());
		}

		let content = std::fs::read_to_string(&path).with_context(|| format!("failed to read config {}", path.display()))?;
		let config = serde_json::from_str(&content).with_context(|| format!("invalid config {}", path.display()))?;
		debug!(target = "imoji", path = %path.display(), "loaded config");
		Ok(config)
	}

	/// Applies `IMOJI_*` variables found through `lookup`.
	pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
		let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
		if let Some(client_id) = lookup(ENV_CLIENT_ID) {
			self.client_id = Some(client_id);
		}
		if let Some(api_token) = lookup(ENV_API_TOKEN) {
			self.api_token = Some(api_token);
		}
		if let Some(api_url) = lookup(ENV_API_URL) {
			self.api_url = Some(api_url);
		}
		self
	}

	pub fn with_api_url(mut self, api_url: Option<String>) -> Self {
		if api_url.is_some() {
			self.api_url = api_url;
		}
		self
	}

	pub fn session_config(&self) -> Result<SessionConfig> {
		let Some(client_id) = self.client_id.clone() else {
			bail!("missing client id: set {ENV_CLIENT_ID} or \"clientId\" in the config file");
		};
		let Some(api_token) = self.api_token.clone() else {
			bail!("missing api token: set {ENV_API_TOKEN} or \"apiToken\" in the config file");
		};

		let mut config = SessionConfig::new(Credentials::new(client_id, api_token)).with_prefetch_previews(self.prefetch_previews);
		if let Some(api_url) = &self.api_url {
			config = config.with_api_url(api_url.clone());
		}
		config.validate()?;
		Ok(config)
	}

	pub fn storage_policy(&self) -> Result<StoragePolicy> {
		let cache = self.cache_dir.clone().or_else(|| dirs::cache_dir().map(|dir| dir.join("imoji")));
		let data = self.data_dir.clone().or_else(|| dirs::data_dir().map(|dir| dir.join("imoji")));

		match (cache, data) {
			(Some(cache), Some(data)) => Ok(StoragePolicy::new(cache, data)?),
			_ => Ok(StoragePolicy::temporary()),
		}
	}
}
