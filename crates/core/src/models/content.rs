//! Content objects: one sticker and its downloadable renditions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use imoji_protocol::ContentPayload;

use crate::error::{Error, Result};

/// Prefix used for identifiers of locally synthesized placeholders.
pub const PLACEHOLDER_PREFIX: &str = "local-";

/// Rendition kinds the service publishes for every imoji.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImageVariant {
	/// Small preview, suitable for grids.
	Thumbnail,
	/// Full resolution sticker without decoration.
	Full,
	/// Full resolution sticker with the server-side border baked in.
	Bordered,
}

impl ImageVariant {
	pub const ALL: [ImageVariant; 3] = [ImageVariant::Thumbnail, ImageVariant::Full, ImageVariant::Bordered];

	pub fn as_str(self) -> &'static str {
		match self {
			ImageVariant::Thumbnail => "thumbnail",
			ImageVariant::Full => "full",
			ImageVariant::Bordered => "bordered",
		}
	}

	/// Maps a wire variant name; unknown names yield `None`.
	pub fn from_wire(name: &str) -> Option<Self> {
		match name {
			"thumbnail" | "thumb" => Some(ImageVariant::Thumbnail),
			"full" | "unbordered" => Some(ImageVariant::Full),
			"bordered" => Some(ImageVariant::Bordered),
			_ => None,
		}
	}
}

impl fmt::Display for ImageVariant {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Where the bytes of one variant can be found.
///
/// The local path is set at most once; later downloads overwrite the file at
/// that path instead of pointing the reference somewhere else.
#[derive(Debug, Clone, Default)]
pub struct ImageReference {
	remote_url: Option<String>,
	width: Option<u32>,
	height: Option<u32>,
	local_path: OnceLock<PathBuf>,
}

impl ImageReference {
	pub fn remote(url: impl Into<String>) -> Self {
		Self {
			remote_url: Some(url.into()),
			..Default::default()
		}
	}

	pub fn local(path: PathBuf) -> Self {
		let reference = Self::default();
		let _ = reference.local_path.set(path);
		reference
	}

	pub fn with_dimensions(mut self, width: Option<u32>, height: Option<u32>) -> Self {
		self.width = width;
		self.height = height;
		self
	}

	pub fn remote_url(&self) -> Option<&str> {
		self.remote_url.as_deref()
	}

	pub fn dimensions(&self) -> Option<(u32, u32)> {
		self.width.zip(self.height)
	}

	pub fn local_path(&self) -> Option<&Path> {
		self.local_path.get().map(PathBuf::as_path)
	}

	/// Records the on-disk location of this variant.
	///
	/// Returns `false` when a different path was already recorded.
	pub fn set_local_path(&self, path: PathBuf) -> bool {
		match self.local_path.get() {
			Some(existing) => *existing == path,
			None => {
				let _ = self.local_path.set(path.clone());
				self.local_path.get() == Some(&path)
			}
		}
	}
}

struct ContentInner {
	identifier: String,
	tags: Vec<String>,
	images: BTreeMap<ImageVariant, ImageReference>,
	placeholder: bool,
}

/// Immutable description of one sticker.
///
/// Cloning is cheap; clones share the same image references, so a local path
/// recorded through one clone is visible through all of them.
#[derive(Clone)]
pub struct ContentObject {
	inner: Arc<ContentInner>,
}

impl ContentObject {
	pub fn new(
		identifier: impl Into<String>,
		tags: impl IntoIterator<Item = String>,
		images: BTreeMap<ImageVariant, ImageReference>,
	) -> Self {
		Self::build(identifier.into(), tags, images, false)
	}

	pub(crate) fn placeholder(
		identifier: impl Into<String>,
		tags: impl IntoIterator<Item = String>,
		images: BTreeMap<ImageVariant, ImageReference>,
	) -> Self {
		Self::build(identifier.into(), tags, images, true)
	}

	fn build(
		identifier: String,
		tags: impl IntoIterator<Item = String>,
		images: BTreeMap<ImageVariant, ImageReference>,
		placeholder: bool,
	) -> Self {
		let mut unique: Vec<String> = Vec::new();
		for tag in tags {
			if !unique.contains(&tag) {
				unique.push(tag);
			}
		}

		Self {
			inner: Arc::new(ContentInner {
				identifier,
				tags: unique,
				images,
				placeholder,
			}),
		}
	}

	/// Builds a content object from its wire payload.
	///
	/// # Errors
	///
	/// Returns [`Error::Server`] when the payload has no identifier.
	pub fn from_payload(payload: ContentPayload) -> Result<Self> {
		if payload.id.trim().is_empty() {
			return Err(Error::Server("content payload is missing an imoji id".to_string()));
		}

		let images = payload
			.images
			.into_iter()
			.filter_map(|(name, image)| {
				ImageVariant::from_wire(&name)
					.map(|variant| (variant, ImageReference::remote(image.url).with_dimensions(image.width, image.height)))
			})
			.collect();

		Ok(Self::new(payload.id, payload.tags.unwrap_or_default(), images))
	}

	pub fn identifier(&self) -> &str {
		&self.inner.identifier
	}

	pub fn tags(&self) -> &[String] {
		&self.inner.tags
	}

	pub fn image(&self, variant: ImageVariant) -> Option<&ImageReference> {
		self.inner.images.get(&variant)
	}

	pub fn variants(&self) -> impl Iterator<Item = ImageVariant> + '_ {
		self.inner.images.keys().copied()
	}

	/// Whether this object was synthesized locally while an upload is pending.
	pub fn is_placeholder(&self) -> bool {
		self.inner.placeholder
	}
}

impl PartialEq for ContentObject {
	fn eq(&self, other: &Self) -> bool {
		self.inner.identifier == other.inner.identifier
			&& self.inner.tags == other.inner.tags
			&& self.inner.placeholder == other.inner.placeholder
	}
}

impl Eq for ContentObject {}

impl fmt::Debug for ContentObject {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ContentObject")
			.field("identifier", &self.inner.identifier)
			.field("tags", &self.inner.tags)
			.field("variants", &self.inner.images.keys().collect::<Vec<_>>())
			.field("placeholder", &self.inner.placeholder)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn payload(value: serde_json::Value) -> ContentPayload {
		serde_json::from_value(value).unwrap()
	}

	#[test]
	fn parses_known_variants_and_skips_unknown() {
		let item = ContentObject::from_payload(payload(json!({
			"imojiId": "abc",
			"tags": ["cat", "happy"],
			"images": {
				"thumbnail": {"url": "https://cdn/abc-thumb.png", "width": 150, "height": 150},
				"full": {"url": "https://cdn/abc.png"},
				"animated": {"url": "https://cdn/abc.gif"}
			}
		})))
		.unwrap();

		assert_eq!(item.identifier(), "abc");
		assert_eq!(item.variants().collect::<Vec<_>>(), vec![ImageVariant::Thumbnail, ImageVariant::Full]);
		assert_eq!(item.image(ImageVariant::Thumbnail).unwrap().dimensions(), Some((150, 150)));
		assert!(!item.is_placeholder());
	}

	#[test]
	fn missing_tags_are_empty() {
		let item = ContentObject::from_payload(payload(json!({"imojiId": "abc"}))).unwrap();
		assert!(item.tags().is_empty());
	}

	#[test]
	fn duplicate_tags_collapse_in_order() {
		let item = ContentObject::new("x", ["b".to_string(), "a".to_string(), "b".to_string()], BTreeMap::new());
		assert_eq!(item.tags(), ["b".to_string(), "a".to_string()]);
	}

	#[test]
	fn empty_identifier_is_rejected() {
		let err = ContentObject::from_payload(payload(json!({"imojiId": " "}))).unwrap_err();
		assert_eq!(err.kind(), crate::ErrorKind::ServerError);
	}

	#[test]
	fn local_path_is_set_once() {
		let reference = ImageReference::remote("https://cdn/a.png");
		assert!(reference.set_local_path(PathBuf::from("/cache/a.png")));
		assert!(reference.set_local_path(PathBuf::from("/cache/a.png")));
		assert!(!reference.set_local_path(PathBuf::from("/cache/other.png")));
		assert_eq!(reference.local_path(), Some(Path::new("/cache/a.png")));
	}

	#[test]
	fn clones_share_local_paths() {
		let mut images = BTreeMap::new();
		images.insert(ImageVariant::Full, ImageReference::remote("https://cdn/a.png"));
		let item = ContentObject::new("a", Vec::new(), images);
		let clone = item.clone();

		item.image(ImageVariant::Full).unwrap().set_local_path(PathBuf::from("/cache/a-full.png"));
		assert_eq!(clone.image(ImageVariant::Full).unwrap().local_path(), Some(Path::new("/cache/a-full.png")));
	}
}
