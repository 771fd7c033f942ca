// Shared fixtures for session integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use imoji::{
	ContentCache, ContentObject, Credentials, Error, ErrorKind, FakeTransport, MemoryFileStore, ResultSet, Session,
	SessionConfig, SessionDelegate, StoragePolicy,
};
use parking_lot::Mutex;
use serde_json::{Value, json};

pub struct Harness {
	pub session: Session,
	pub transport: Arc<FakeTransport>,
	pub files: Arc<MemoryFileStore>,
	pub cache: Arc<ContentCache>,
	pub policy: StoragePolicy,
}

impl Harness {
	pub fn new() -> Self {
		Self::build(config(), None)
	}

	pub fn with_config(config: SessionConfig) -> Self {
		Self::build(config, None)
	}

	pub fn with_delegate(delegate: &Arc<dyn SessionDelegate>) -> Self {
		Self::build(config(), Some(delegate))
	}

	fn build(config: SessionConfig, delegate: Option<&Arc<dyn SessionDelegate>>) -> Self {
		let transport = Arc::new(FakeTransport::new());
		let files = Arc::new(MemoryFileStore::new());
		let cache = Arc::new(ContentCache::default());
		let policy = StoragePolicy::new("/cache", "/persistent").expect("valid policy");

		let mut builder = Session::builder(config)
			.transport(transport.clone())
			.file_store(files.clone())
			.content_cache(cache.clone())
			.storage_policy(policy.clone());
		if let Some(delegate) = delegate {
			builder = builder.delegate(Arc::downgrade(delegate));
		}
		let session = builder.build().expect("session builds");

		Self {
			session,
			transport,
			files,
			cache,
			policy,
		}
	}
}

pub fn config() -> SessionConfig {
	SessionConfig::new(Credentials::new("test-client", "test-token"))
}

/// Wire payload for one imoji with thumbnail and full renditions.
pub fn content(id: &str) -> Value {
	json!({
		"imojiId": id,
		"tags": ["test", id],
		"images": {
			"thumbnail": {"url": format!("https://cdn.test/{id}-thumb.png"), "width": 150, "height": 150},
			"full": {"url": format!("https://cdn.test/{id}.png")}
		}
	})
}

pub fn results(ids: &[&str]) -> Value {
	json!({
		"status": "SUCCESS",
		"results": ids.iter().map(|id| content(id)).collect::<Vec<_>>(),
	})
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
	imoji::render::encode_png(&RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]))).expect("encodes")
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
	ResultSet(Result<ResultSet, ErrorKind>),
	Item(String, usize, Option<ErrorKind>),
}

/// Collects callbacks in the order they fire.
#[derive(Clone, Default)]
pub struct Events(Arc<Mutex<Vec<Event>>>);

impl Events {
	pub fn on_result_set(&self) -> impl FnOnce(imoji::Result<ResultSet>) + Send + 'static {
		let events = self.0.clone();
		move |result| events.lock().push(Event::ResultSet(result.map_err(|err| err.kind())))
	}

	pub fn on_item(&self) -> impl FnMut(ContentObject, usize, Option<Error>) + Send + 'static {
		let events = self.0.clone();
		move |item, index, error| {
			events
				.lock()
				.push(Event::Item(item.identifier().to_string(), index, error.map(|err| err.kind())))
		}
	}

	pub fn take(&self) -> Vec<Event> {
		std::mem::take(&mut *self.0.lock())
	}

	pub fn len(&self) -> usize {
		self.0.lock().len()
	}
}

/// Captures a single callback value.
pub struct Slot<T>(Arc<Mutex<Vec<T>>>);

impl<T> Clone for Slot<T> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<T: Send + 'static> Slot<T> {
	pub fn new() -> Self {
		Self(Arc::new(Mutex::new(Vec::new())))
	}

	pub fn setter(&self) -> impl FnOnce(T) + Send + 'static {
		let values = self.0.clone();
		move |value| values.lock().push(value)
	}

	pub fn take(&self) -> Vec<T> {
		std::mem::take(&mut *self.0.lock())
	}
}
