//! Filesystem collaborator used for cached image bytes.
//!
//! The session only needs four primitives on paths under the storage policy
//! roots. [`DiskFileStore`] backs them with `tokio::fs`; [`MemoryFileStore`]
//! keeps everything in memory and counts calls, for tests.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

#[async_trait]
pub trait FileStore: Send + Sync {
	async fn exists(&self, path: &Path) -> bool;

	async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

	/// Writes `bytes` to `path`, replacing any previous content and creating
	/// parent directories as needed.
	async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

	/// Removes `path`. Returns `false` when nothing was there.
	async fn delete(&self, path: &Path) -> io::Result<bool>;
}

/// [`FileStore`] over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileStore;

#[async_trait]
impl FileStore for DiskFileStore {
	async fn exists(&self, path: &Path) -> bool {
		tokio::fs::try_exists(path).await.unwrap_or(false)
	}

	async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
		tokio::fs::read(path).await
	}

	async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
		if let Some(parent) = path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}

		// Write beside the target and rename so readers never observe a partial file.
		let mut staging = path.as_os_str().to_owned();
		staging.push(format!(".{}.part", uuid::Uuid::new_v4().simple()));
		let staging = PathBuf::from(staging);

		tokio::fs::write(&staging, bytes).await?;
		if let Err(err) = tokio::fs::rename(&staging, path).await {
			let _ = tokio::fs::remove_file(&staging).await;
			return Err(err);
		}
		Ok(())
	}

	async fn delete(&self, path: &Path) -> io::Result<bool> {
		match tokio::fs::remove_file(path).await {
			Ok(()) => Ok(true),
			Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
			Err(err) => Err(err),
		}
	}
}

/// Call counters recorded by [`MemoryFileStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStoreStats {
	pub exists: usize,
	pub reads: usize,
	pub writes: usize,
	pub deletes: usize,
}

impl FileStoreStats {
	pub fn total(&self) -> usize {
		self.exists + self.reads + self.writes + self.deletes
	}
}

/// In-memory [`FileStore`] that counts every call.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
	files: Mutex<HashMap<PathBuf, Vec<u8>>>,
	fail_reads: AtomicBool,
	fail_deletes: AtomicBool,
	exists_calls: AtomicUsize,
	read_calls: AtomicUsize,
	write_calls: AtomicUsize,
	delete_calls: AtomicUsize,
}

impl MemoryFileStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Seeds a file without counting it as a write.
	pub fn insert(&self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
		self.files.lock().insert(path.into(), bytes);
	}

	pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
		self.files.lock().get(path).cloned()
	}

	pub fn paths(&self) -> Vec<PathBuf> {
		self.files.lock().keys().cloned().collect()
	}

	/// Makes every subsequent read fail with an I/O error.
	pub fn fail_reads(&self, fail: bool) {
		self.fail_reads.store(fail, Ordering::SeqCst);
	}

	/// Makes every subsequent delete fail with an I/O error.
	pub fn fail_deletes(&self, fail: bool) {
		self.fail_deletes.store(fail, Ordering::SeqCst);
	}

	pub fn stats(&self) -> FileStoreStats {
		FileStoreStats {
			exists: self.exists_calls.load(Ordering::SeqCst),
			reads: self.read_calls.load(Ordering::SeqCst),
			writes: self.write_calls.load(Ordering::SeqCst),
			deletes: self.delete_calls.load(Ordering::SeqCst),
		}
	}
}

#[async_trait]
impl FileStore for MemoryFileStore {
	async fn exists(&self, path: &Path) -> bool {
		self.exists_calls.fetch_add(1, Ordering::SeqCst);
		self.files.lock().contains_key(path)
	}

	async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
		self.read_calls.fetch_add(1, Ordering::SeqCst);
		if self.fail_reads.load(Ordering::SeqCst) {
			return Err(io::Error::other("simulated read failure"));
		}
		self.files
			.lock()
			.get(path)
			.cloned()
			.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
	}

	async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
		self.write_calls.fetch_add(1, Ordering::SeqCst);
		self.files.lock().insert(path.to_path_buf(), bytes.to_vec());
		Ok(())
	}

	async fn delete(&self, path: &Path) -> io::Result<bool> {
		self.delete_calls.fetch_add(1, Ordering::SeqCst);
		if self.fail_deletes.load(Ordering::SeqCst) {
			return Err(io::Error::other("simulated delete failure"));
		}
		Ok(self.files.lock().remove(path).is_some())
	}
}
