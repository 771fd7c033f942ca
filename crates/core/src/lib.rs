//! Client SDK for the Imoji sticker service.
//!
//! The entry point is [`Session`]: it authenticates lazily, runs every
//! request as a cancellable [`PendingOperation`], and reports results through
//! callbacks. Result sets are delivered in two phases: one aggregate
//! [`ResultSet`] callback followed by a callback per item in server order.
//!
//! ```no_run
//! # use imoji::{Credentials, Session, SessionConfig};
//! # #[tokio::main]
//! # async fn main() -> imoji::Result<()> {
//! let session = Session::new(SessionConfig::new(Credentials::new("client-id", "api-token")))?;
//! let search = session.search(
//! 	"happy",
//! 	0,
//! 	Some(20),
//! 	|result| println!("{result:?}"),
//! 	|item, index, _| println!("{index}: {}", item.identifier()),
//! );
//! search.finished().await;
//! # Ok(())
//! # }
//! ```
//!
//! Collaborators are injectable through [`SessionBuilder`]: a [`Transport`]
//! for HTTP, a [`FileStore`] for cached bytes and an [`ImageCache`] for
//! rendered bitmaps. [`FakeTransport`] and [`MemoryFileStore`] back the tests.

pub mod cache;
pub mod error;
pub mod fs;
pub mod models;
pub mod operation;
pub mod render;
pub mod session;
pub mod storage;
pub mod transport;

pub use cache::{ContentCache, DEFAULT_CACHE_ENTRIES, ImageCache, RenderKey, RenderedImage};
pub use error::{Error, ErrorKind, Result};
pub use fs::{DiskFileStore, FileStore, FileStoreStats, MemoryFileStore};
pub use models::{
	CategoryAttribution, CategoryClassification, CategoryObject, ContentObject, ImageReference, ImageVariant,
};
pub use operation::{OperationOutcome, OperationState, PendingOperation};
pub use render::{BorderStyle, Color, Renderer, RenderingOptions, ShadowStyle, Size};
pub use session::{Credentials, ResultSet, Session, SessionBuilder, SessionConfig, SessionDelegate, SessionState};
pub use storage::{CACHE_IDLE_EXPIRY, StoragePolicy};
pub use transport::{ApiRequest, FakeGate, FakeTransport, HttpTransport, Transport, TransportConfig, TransportError};
