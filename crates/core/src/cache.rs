//! Bounded in-memory cache of rendered stickers.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;

use crate::render::RenderingOptions;

/// Default maximum number of rendered images kept in memory.
pub const DEFAULT_CACHE_ENTRIES: usize = 256;

/// A rendered sticker shared between the cache and callers.
pub type RenderedImage = Arc<RgbaImage>;

/// Cache key: which sticker, rendered how.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderKey {
	pub identifier: String,
	pub options: RenderingOptions,
}

impl RenderKey {
	pub fn new(identifier: impl Into<String>, options: RenderingOptions) -> Self {
		Self {
			identifier: identifier.into(),
			options,
		}
	}
}

/// Storage for rendered images, shared by every render of a session.
///
/// Implementations must be internally synchronized and must never block on
/// I/O. Applications can supply their own implementation to share memory with
/// an existing image cache.
pub trait ImageCache: Send + Sync {
	fn get(&self, key: &RenderKey) -> Option<RenderedImage>;

	/// Stores `image`, evicting other entries as needed. Never fails.
	fn insert(&self, key: RenderKey, image: RenderedImage);

	fn remove(&self, key: &RenderKey) -> Option<RenderedImage>;

	fn clear(&self);
}

struct CacheInner {
	entries: LruCache<RenderKey, RenderedImage>,
	weight: u64,
}

/// Least-recently-used [`ImageCache`] bounded by entry count and, optionally,
/// by total pixel bytes.
pub struct ContentCache {
	inner: Mutex<CacheInner>,
	max_weight: Option<u64>,
	hits: AtomicU64,
	misses: AtomicU64,
}

impl ContentCache {
	/// Creates a cache holding at most `max_entries` images (minimum one).
	pub fn new(max_entries: usize) -> Self {
		let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
		Self {
			inner: Mutex::new(CacheInner {
				entries: LruCache::new(capacity),
				weight: 0,
			}),
			max_weight: None,
			hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
		}
	}

	/// Additionally bounds the cache by the total size of stored pixel data.
	///
	/// A single image heavier than the bound is still admitted on its own.
	pub fn with_max_weight(mut self, bytes: u64) -> Self {
		self.max_weight = Some(bytes);
		self
	}

	pub fn len(&self) -> usize {
		self.inner.lock().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Total pixel bytes currently stored.
	pub fn weight(&self) -> u64 {
		self.inner.lock().weight
	}

	/// Checks for `key` without refreshing its recency.
	pub fn contains(&self, key: &RenderKey) -> bool {
		self.inner.lock().entries.contains(key)
	}

	/// `(hits, misses)` recorded by [`ImageCache::get`].
	pub fn hit_stats(&self) -> (u64, u64) {
		(self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
	}
}

impl Default for ContentCache {
	fn default() -> Self {
		Self::new(DEFAULT_CACHE_ENTRIES)
	}
}

fn weight_of(image: &RgbaImage) -> u64 {
	image.as_raw().len() as u64
}

impl ImageCache for ContentCache {
	fn get(&self, key: &RenderKey) -> Option<RenderedImage> {
		let found = self.inner.lock().entries.get(key).cloned();
		let counter = if found.is_some() { &self.hits } else { &self.misses };
		counter.fetch_add(1, Ordering::Relaxed);
		found
	}

	fn insert(&self, key: RenderKey, image: RenderedImage) {
		let mut inner = self.inner.lock();
		inner.weight += weight_of(&image);

		// `push` hands back either the replaced value for this key or the evicted LRU entry.
		if let Some((_, displaced)) = inner.entries.push(key, image) {
			inner.weight -= weight_of(&displaced);
		}

		if let Some(max_weight) = self.max_weight {
			while inner.weight > max_weight && inner.entries.len() > 1 {
				let Some((evicted_key, evicted)) = inner.entries.pop_lru() else {
					break;
				};
				inner.weight -= weight_of(&evicted);
				trace!(target = "imoji.cache", identifier = %evicted_key.identifier, "evicted rendered image");
			}
		}
	}

	fn remove(&self, key: &RenderKey) -> Option<RenderedImage> {
		let mut inner = self.inner.lock();
		let removed = inner.entries.pop(key)?;
		inner.weight -= weight_of(&removed);
		Some(removed)
	}

	fn clear(&self) {
		let mut inner = self.inner.lock();
		inner.entries.clear();
		inner.weight = 0;
	}
}
