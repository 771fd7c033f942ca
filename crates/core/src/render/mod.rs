//! Turning a [`ContentObject`] plus [`RenderingOptions`] into a bitmap.
//!
//! Sources are resolved in order: the in-memory [`ImageCache`], the variant's
//! local file, then the network. Fetched bytes are written under the storage
//! policy so later sessions can skip the download.

pub mod compose;
pub mod options;

use std::path::PathBuf;
use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, trace, warn};

pub use compose::{compose, decode, encode_png};
pub use options::{BorderStyle, Color, RenderingOptions, ShadowStyle, Size};

use crate::cache::{ImageCache, RenderKey, RenderedImage};
use crate::error::{Error, ErrorKind, Result};
use crate::fs::FileStore;
use crate::models::{ContentObject, ImageVariant};
use crate::storage::StoragePolicy;
use crate::transport::{Transport, TransportError};

/// Largest target side for which the thumbnail is an acceptable source.
pub const THUMBNAIL_MAX_SIDE: u32 = 150;

/// Variant lookup order for `options`, best source first.
pub fn preferred_variants(options: &RenderingOptions) -> [ImageVariant; 3] {
	match options.target_size {
		Some(size) if size.longest_side() <= THUMBNAIL_MAX_SIDE => {
			[ImageVariant::Thumbnail, ImageVariant::Full, ImageVariant::Bordered]
		}
		_ => [ImageVariant::Full, ImageVariant::Bordered, ImageVariant::Thumbnail],
	}
}

/// Renders stickers for one session.
#[derive(Clone)]
pub struct Renderer {
	policy: StoragePolicy,
	files: Arc<dyn FileStore>,
	transport: Arc<dyn Transport>,
	cache: Arc<dyn ImageCache>,
}

impl Renderer {
	pub fn new(
		policy: StoragePolicy,
		files: Arc<dyn FileStore>,
		transport: Arc<dyn Transport>,
		cache: Arc<dyn ImageCache>,
	) -> Self {
		Self {
			policy,
			files,
			transport,
			cache,
		}
	}

	pub fn cache(&self) -> &Arc<dyn ImageCache> {
		&self.cache
	}

	/// Renders `item` with `options`.
	///
	/// # Errors
	///
	/// - [`Error::InvalidArgument`] if `options` are out of range.
	/// - [`Error::InvalidImage`] if downloaded bytes do not decode or the
	///   options cannot be applied.
	/// - [`Error::RenderingUnavailable`] if no variant could be loaded.
	pub async fn render(&self, item: &ContentObject, options: &RenderingOptions) -> Result<RenderedImage> {
		options.validate()?;
		let key = RenderKey::new(item.identifier(), *options);
		if let Some(hit) = self.cache.get(&key) {
			trace!(target = "imoji.render", identifier = item.identifier(), "render cache hit");
			return Ok(hit);
		}

		let source = self.load_source(item, options).await?;
		let options = *options;
		let composed = tokio::task::spawn_blocking(move || compose(&source, &options))
			.await
			.map_err(|err| Error::RenderingUnavailable(format!("render task failed: {err}")))??;

		debug!(
			target = "imoji.render",
			identifier = item.identifier(),
			width = composed.width(),
			height = composed.height(),
			"rendered imoji"
		);

		let image = Arc::new(composed);
		self.cache.insert(key, Arc::clone(&image));
		Ok(image)
	}

	/// Makes sure `variant` of `item` is on disk and returns its path.
	///
	/// # Errors
	///
	/// [`Error::RenderingUnavailable`] if the variant is unknown or has no
	/// remote URL, [`Error::Server`] if the download or write fails.
	pub async fn ensure_local(&self, item: &ContentObject, variant: ImageVariant) -> Result<PathBuf> {
		let Some(reference) = item.image(variant) else {
			return Err(Error::RenderingUnavailable(format!("{} has no {variant} image", item.identifier())));
		};

		if let Some(path) = reference.local_path() {
			if self.files.exists(path).await {
				return Ok(path.to_path_buf());
			}
		}

		let path = self.policy.content_path(item.identifier(), variant);
		if !self.files.exists(&path).await {
			let Some(url) = reference.remote_url() else {
				return Err(Error::RenderingUnavailable(format!(
					"{} has no remote {variant} image",
					item.identifier()
				)));
			};
			let bytes = self.transport.fetch(url).await.map_err(|err| Error::Server(err.to_string()))?;
			self.files
				.write(&path, &bytes)
				.await
				.map_err(|err| Error::Server(format!("failed to store {}: {err}", path.display())))?;
		}

		reference.set_local_path(path.clone());
		Ok(path)
	}

	async fn load_source(&self, item: &ContentObject, options: &RenderingOptions) -> Result<RgbaImage> {
		let mut last_failure = None;
		let mut tried = 0;

		for variant in preferred_variants(options) {
			if item.image(variant).is_none() {
				continue;
			}
			tried += 1;
			match self.load_variant(item, variant).await {
				Ok(Some(source)) => return Ok(source),
				Ok(None) => {}
				Err(err) if err.kind() == ErrorKind::InvalidImage => return Err(err),
				Err(err) => {
					debug!(target = "imoji.render", identifier = item.identifier(), %variant, error = %err, "variant unavailable");
					last_failure = Some(err);
				}
			}
		}

		let reason = match (tried, last_failure) {
			(0, _) => "no image variants".to_string(),
			(_, Some(err)) => err.message().to_string(),
			(_, None) => "no local or remote source".to_string(),
		};
		Err(Error::RenderingUnavailable(format!("{}: {reason}", item.identifier())))
	}

	/// Decoded pixels for one variant, or `None` if it has neither a usable
	/// file nor a URL.
	///
	/// Local files that cannot be read or decoded are skipped, and undecodable
	/// ones are deleted, so the download is tried next. Only freshly fetched
	/// bytes that fail to decode surface as [`Error::InvalidImage`].
	async fn load_variant(&self, item: &ContentObject, variant: ImageVariant) -> Result<Option<RgbaImage>> {
		let Some(reference) = item.image(variant) else {
			return Ok(None);
		};

		let cached_path = self.policy.content_path(item.identifier(), variant);
		let recorded = reference.local_path().map(|path| path.to_path_buf());
		for path in recorded.iter().chain(std::iter::once(&cached_path)) {
			if !self.files.exists(path).await {
				continue;
			}
			let bytes = match self.files.read(path).await {
				Ok(bytes) => bytes,
				Err(err) => {
					warn!(target = "imoji.render", path = %path.display(), error = %err, "failed to read cached image");
					continue;
				}
			};
			match decode(&bytes) {
				Ok(source) => {
					reference.set_local_path(path.clone());
					return Ok(Some(source));
				}
				Err(err) => {
					warn!(target = "imoji.render", path = %path.display(), error = %err, "discarding undecodable cached image");
					if let Err(err) = self.files.delete(path).await {
						warn!(target = "imoji.render", path = %path.display(), error = %err, "failed to delete cached image");
					}
				}
			}
		}

		let Some(url) = reference.remote_url() else {
			return Ok(None);
		};

		let bytes = self
			.transport
			.fetch(url)
			.await
			.map_err(|err: TransportError| Error::RenderingUnavailable(err.to_string()))?;
		let source = decode(&bytes)?;
		match self.files.write(&cached_path, &bytes).await {
			Ok(()) => {
				reference.set_local_path(cached_path);
			}
			Err(err) => {
				warn!(target = "imoji.render", path = %cached_path.display(), error = %err, "failed to store downloaded image");
			}
		}
		Ok(Some(source))
	}
}
