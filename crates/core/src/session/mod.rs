//! The session: one long-lived handle to the Imoji service.
//!
//! A [`Session`] tracks the connection state, starts cancellable operations
//! and routes their results to caller-supplied callbacks. Callbacks run on the
//! session's tokio runtime, never on the calling thread, except for argument
//! validation failures which are delivered before the method returns.

/// Authenticated request channel and error mapping.
mod channel;
/// User collection management and account linking.
mod collection;
/// Session configuration and credentials.
pub mod config;
/// Two-phase sticker creation.
mod creation;
/// Search, featured, category and fetch operations.
mod fetching;
/// Connection state and delegate dispatch.
pub mod state;

use std::future::Future;
use std::sync::{Arc, Weak};

use tokio::runtime::Handle;
use tracing::debug;

pub use config::{Credentials, SessionConfig};
pub use fetching::ResultSet;
pub use state::{SessionDelegate, SessionState};

use self::channel::ApiChannel;
use self::state::StateTracker;
use crate::cache::{ContentCache, ImageCache, RenderedImage};
use crate::error::{Error, Result};
use crate::fs::{DiskFileStore, FileStore};
use crate::models::ContentObject;
use crate::operation::{OperationRegistry, PendingOperation};
use crate::render::{Renderer, RenderingOptions};
use crate::storage::StoragePolicy;
use crate::transport::{HttpTransport, Transport};

pub(crate) struct SessionInner {
	config: SessionConfig,
	channel: ApiChannel,
	renderer: Renderer,
	files: Arc<dyn FileStore>,
	policy: StoragePolicy,
	operations: OperationRegistry,
	runtime: Handle,
}

/// Assembles a [`Session`] from its collaborators.
///
/// Anything not supplied falls back to the production default: an
/// [`HttpTransport`] against `config.api_url`, a [`DiskFileStore`], a
/// [`StoragePolicy::temporary`] policy and a fresh [`ContentCache`].
pub struct SessionBuilder {
	config: SessionConfig,
	transport: Option<Arc<dyn Transport>>,
	files: Option<Arc<dyn FileStore>>,
	policy: Option<StoragePolicy>,
	cache: Option<Arc<dyn ImageCache>>,
	delegate: Option<Weak<dyn SessionDelegate>>,
	runtime: Option<Handle>,
}

impl SessionBuilder {
	pub fn new(config: SessionConfig) -> Self {
		Self {
			config,
			transport: None,
			files: None,
			policy: None,
			cache: None,
			delegate: None,
			runtime: None,
		}
	}

	pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.transport = Some(transport);
		self
	}

	pub fn file_store(mut self, files: Arc<dyn FileStore>) -> Self {
		self.files = Some(files);
		self
	}

	pub fn storage_policy(mut self, policy: StoragePolicy) -> Self {
		self.policy = Some(policy);
		self
	}

	/// Shares `cache` with this session instead of creating a private one.
	pub fn content_cache(mut self, cache: Arc<dyn ImageCache>) -> Self {
		self.cache = Some(cache);
		self
	}

	/// Registers a delegate. Only a weak reference is kept.
	pub fn delegate(mut self, delegate: Weak<dyn SessionDelegate>) -> Self {
		self.delegate = Some(delegate);
		self
	}

	/// Runtime for operation tasks; defaults to the current runtime.
	pub fn runtime(mut self, runtime: Handle) -> Self {
		self.runtime = Some(runtime);
		self
	}

	/// # Errors
	///
	/// [`Error::InvalidArgument`] if the configuration is invalid or no tokio
	/// runtime is available.
	pub fn build(self) -> Result<Session> {
		self.config.validate()?;

		let runtime = match self.runtime {
			Some(runtime) => runtime,
			None => Handle::try_current()
				.map_err(|err| Error::InvalidArgument(format!("a session must be built inside a tokio runtime: {err}")))?,
		};
		let policy = self.policy.unwrap_or_else(StoragePolicy::temporary);
		let transport = match self.transport {
			Some(transport) => transport,
			None => Arc::new(
				HttpTransport::new(&self.config.api_url, policy.transport_config())
					.map_err(|err| Error::InvalidArgument(err.to_string()))?,
			),
		};
		let files = self.files.unwrap_or_else(|| Arc::new(DiskFileStore));
		let cache = self.cache.unwrap_or_else(|| Arc::new(ContentCache::default()));

		let state = StateTracker::new(&runtime, self.delegate);
		let channel = ApiChannel::new(Arc::clone(&transport), self.config.credentials.clone(), state);
		let renderer = Renderer::new(policy.clone(), Arc::clone(&files), transport, cache);

		debug!(target = "imoji.session", client_id = %self.config.credentials.client_id, cache = %policy.cache_path().display(), "session created");

		Ok(Session {
			inner: Arc::new(SessionInner {
				config: self.config,
				channel,
				renderer,
				files,
				policy,
				operations: OperationRegistry::new(),
				runtime,
			}),
		})
	}
}

/// Client session for the Imoji service.
///
/// Dropping the session cancels every operation it started.
pub struct Session {
	inner: Arc<SessionInner>,
}

impl Session {
	/// Builds a session with default collaborators.
	pub fn new(config: SessionConfig) -> Result<Self> {
		SessionBuilder::new(config).build()
	}

	pub fn builder(config: SessionConfig) -> SessionBuilder {
		SessionBuilder::new(config)
	}

	pub fn state(&self) -> SessionState {
		self.inner.channel.state()
	}

	pub fn config(&self) -> &SessionConfig {
		&self.inner.config
	}

	pub fn storage_policy(&self) -> &StoragePolicy {
		&self.inner.policy
	}

	pub fn content_cache(&self) -> &Arc<dyn ImageCache> {
		self.inner.renderer.cache()
	}

	/// Number of operations that have neither finished nor been cancelled.
	pub fn active_operations(&self) -> usize {
		self.inner.operations.active()
	}

	/// Obtains an application access token ahead of the first request.
	pub fn connect(&self, callback: impl FnOnce(Result<SessionState>) + Send + 'static) -> PendingOperation {
		self.start("connect", |inner, operation| async move {
			let result = inner.channel.ensure_connected().await.map(|_| inner.channel.state());
			operation.complete(|| callback(result));
		})
	}

	/// Drops the access token. The next request reconnects from scratch.
	pub fn invalidate(&self) {
		self.inner.channel.invalidate();
	}

	/// Cancels every outstanding operation and returns how many were live.
	pub fn close(&self) -> usize {
		let cancelled = self.inner.operations.cancel_all();
		if cancelled > 0 {
			debug!(target = "imoji.session", cancelled, "cancelled outstanding operations");
		}
		cancelled
	}

	/// Renders `item` with `options`, resolving its bytes through the cache,
	/// local storage and finally the network.
	///
	/// Out of range options are rejected with [`Error::InvalidArgument`] before
	/// this returns.
	pub fn render(
		&self,
		item: &ContentObject,
		options: RenderingOptions,
		callback: impl FnOnce(Result<RenderedImage>) + Send + 'static,
	) -> PendingOperation {
		if let Err(err) = options.validate() {
			return self.reject("render", err, callback);
		}
		let item = item.clone();
		self.start("render", move |inner, operation| async move {
			let result = inner.renderer.render(&item, &options).await;
			if let Err(err) = &result {
				debug!(target = "imoji.render", identifier = item.identifier(), error = %err, "render failed");
			}
			operation.complete(|| callback(result));
		})
	}

	/// Renders `item` with the session's default rendering options.
	pub fn render_default(
		&self,
		item: &ContentObject,
		callback: impl FnOnce(Result<RenderedImage>) + Send + 'static,
	) -> PendingOperation {
		self.render(item, self.inner.config.default_render_options, callback)
	}

	/// Spawns `work` as a new operation.
	fn start<F, Fut>(&self, name: &'static str, work: F) -> PendingOperation
	where
		F: FnOnce(Arc<SessionInner>, PendingOperation) -> Fut,
		Fut: Future<Output = ()> + Send + 'static,
	{
		let operation = self.inner.operations.create(name);
		let task = work(Arc::clone(&self.inner), operation.clone());
		self.inner.operations.spawn(&self.inner.runtime, &operation, task);
		operation
	}

	/// Completes a new operation with `error` before returning it.
	fn reject<T>(&self, name: &'static str, error: Error, callback: impl FnOnce(Result<T>)) -> PendingOperation {
		debug!(target = "imoji.session", operation = name, error = %error, "rejected before dispatch");
		let operation = self.inner.operations.create(name);
		operation.complete(|| callback(Err(error)));
		operation
	}

	fn require_synchronized(&self) -> Result<()> {
		match self.state() {
			SessionState::ConnectedSynchronized => Ok(()),
			state => Err(Error::SessionNotSynchronized(format!(
				"operation needs a synchronized user session (session is {state})"
			))),
		}
	}
}

impl Drop for Session {
	fn drop(&mut self) {
		self.close();
	}
}
