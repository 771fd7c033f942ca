//! Error types surfaced through session callbacks.

use thiserror::Error;

/// Result type alias for imoji-rs operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported to operation callbacks.
///
/// Exactly one variant is reported per failed callback invocation. Server
/// error codes the SDK does not recognise are reported as [`Error::Server`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
	/// The client id and api token were not recognised by the server.
	#[error("Invalid credentials: {0}")]
	InvalidCredentials(String),

	/// Fallback for server failures with no more specific kind.
	#[error("Server error: {0}")]
	Server(String),

	/// The referenced imoji does not exist.
	#[error("Imoji does not exist: {0}")]
	ContentDoesNotExist(String),

	/// Client-side validation failed; no network call was issued.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// An image failed to decode, encode or compose.
	#[error("Invalid image: {0}")]
	InvalidImage(String),

	/// The operation needs a session synchronized with a user account.
	#[error("Session not synchronized: {0}")]
	SessionNotSynchronized(String),

	/// Associating the session with an end user failed.
	#[error("User authentication failed: {0}")]
	UserAuthenticationFailed(String),

	/// The companion Imoji application required for the request is missing.
	#[error("Imoji application not installed: {0}")]
	ApplicationNotInstalled(String),

	/// No usable image source could be resolved for rendering.
	#[error("Rendering unavailable: {0}")]
	RenderingUnavailable(String),
}

/// Field-less discriminant of [`Error`], convenient for matching in callers and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	InvalidCredentials,
	ServerError,
	ContentDoesNotExist,
	InvalidArgument,
	InvalidImage,
	SessionNotSynchronized,
	UserAuthenticationFailed,
	ApplicationNotInstalled,
	RenderingUnavailable,
}

impl Error {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::InvalidCredentials(_) => ErrorKind::InvalidCredentials,
			Error::Server(_) => ErrorKind::ServerError,
			Error::ContentDoesNotExist(_) => ErrorKind::ContentDoesNotExist,
			Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
			Error::InvalidImage(_) => ErrorKind::InvalidImage,
			Error::SessionNotSynchronized(_) => ErrorKind::SessionNotSynchronized,
			Error::UserAuthenticationFailed(_) => ErrorKind::UserAuthenticationFailed,
			Error::ApplicationNotInstalled(_) => ErrorKind::ApplicationNotInstalled,
			Error::RenderingUnavailable(_) => ErrorKind::RenderingUnavailable,
		}
	}

	pub fn message(&self) -> &str {
		match self {
			Error::InvalidCredentials(msg)
			| Error::Server(msg)
			| Error::ContentDoesNotExist(msg)
			| Error::InvalidArgument(msg)
			| Error::InvalidImage(msg)
			| Error::SessionNotSynchronized(msg)
			| Error::UserAuthenticationFailed(msg)
			| Error::ApplicationNotInstalled(msg)
			| Error::RenderingUnavailable(msg) => msg,
		}
	}

	/// Whether this error should drop the session back to `NotConnected`.
	pub fn is_authentication_failure(&self) -> bool {
		matches!(self, Error::InvalidCredentials(_) | Error::UserAuthenticationFailed(_))
	}
}
