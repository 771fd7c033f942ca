//! Authenticated request channel.
//!
//! Owns the access token, performs the OAuth exchanges lazily, and maps
//! transport failures and server faults into [`Error`]s. Every state
//! transition of the session goes through here.

use std::sync::Arc;

use imoji_protocol::{Endpoint, ServerErrorCode, ServerFault, TokenRequest, TokenResponse, detect_fault};
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::config::Credentials;
use super::state::{SessionState, StateTracker};
use crate::error::{Error, Result};
use crate::transport::{ApiRequest, Transport, TransportError};

/// Which credential a request was authenticated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Exchange {
	Client,
	User,
}

#[derive(Clone)]
struct AccessToken {
	value: String,
	scope: Exchange,
}

pub(crate) struct ApiChannel {
	transport: Arc<dyn Transport>,
	credentials: Credentials,
	state: StateTracker,
	token: RwLock<Option<AccessToken>>,
	exchange_lock: tokio::sync::Mutex<()>,
}

impl ApiChannel {
	pub(crate) fn new(transport: Arc<dyn Transport>, credentials: Credentials, state: StateTracker) -> Self {
		Self {
			transport,
			credentials,
			state,
			token: RwLock::new(None),
			exchange_lock: tokio::sync::Mutex::new(()),
		}
	}

	pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
		&self.transport
	}

	pub(crate) fn state(&self) -> SessionState {
		self.state.current()
	}

	fn current_token(&self) -> Option<String> {
		self.token.read().as_ref().map(|token| token.value.clone())
	}

	/// Returns a usable bearer token, exchanging client credentials if needed.
	pub(crate) async fn ensure_connected(&self) -> Result<String> {
		if let Some(token) = self.current_token() {
			return Ok(token);
		}

		let _exchange = self.exchange_lock.lock().await;
		if let Some(token) = self.current_token() {
			return Ok(token);
		}

		let request = TokenRequest::client_credentials(&self.credentials.client_id, &self.credentials.api_token);
		let response = self.exchange(request, Exchange::Client).await?;
		let value = response.access_token.clone();
		*self.token.write() = Some(AccessToken {
			value: value.clone(),
			scope: Exchange::Client,
		});
		self.state.transition(SessionState::Connected);
		Ok(value)
	}

	/// Links the session to an end user, moving it to `ConnectedSynchronized`.
	pub(crate) async fn synchronize_user(&self, user_token: &str) -> Result<()> {
		self.ensure_connected().await?;

		let _exchange = self.exchange_lock.lock().await;
		let request = TokenRequest::external_user(&self.credentials.client_id, &self.credentials.api_token, user_token);
		let response = self.exchange(request, Exchange::User).await?;
		*self.token.write() = Some(AccessToken {
			value: response.access_token,
			scope: Exchange::User,
		});
		self.state.transition(SessionState::ConnectedSynchronized);
		Ok(())
	}

	/// Forgets the access token and drops back to `NotConnected`.
	pub(crate) fn invalidate(&self) {
		self.token.write().take();
		self.state.transition(SessionState::NotConnected);
	}

	/// Issues an authenticated API call and returns the body of a successful envelope.
	pub(crate) async fn call(&self, endpoint: Endpoint, params: &impl Serialize) -> Result<Value> {
		let params = serde_json::to_value(params).map_err(|err| Error::InvalidArgument(format!("unserializable parameters: {err}")))?;
		let bearer = self.ensure_connected().await?;
		let scope = self.token.read().as_ref().map_or(Exchange::Client, |token| token.scope);

		debug!(target = "imoji.session", endpoint = endpoint.path(), "sending request");
		let request = ApiRequest::new(endpoint, params).with_bearer(Some(bearer));
		let result = match self.transport.send(request).await {
			Ok(body) => check_envelope(body),
			Err(err) => Err(map_transport_error(err, scope)),
		};

		if let Err(err) = &result {
			if err.is_authentication_failure() {
				warn!(target = "imoji.session", endpoint = endpoint.path(), error = %err, "access token rejected");
				self.invalidate();
			}
		}
		result
	}

	/// Like [`call`](Self::call), decoding the body into `T`.
	pub(crate) async fn call_decoded<T: DeserializeOwned>(&self, endpoint: Endpoint, params: &impl Serialize) -> Result<T> {
		let body = self.call(endpoint, params).await?;
		decode_body(endpoint, body)
	}

	async fn exchange(&self, request: TokenRequest, exchange: Exchange) -> Result<TokenResponse> {
		let params = serde_json::to_value(&request).map_err(|err| Error::InvalidArgument(format!("unserializable token request: {err}")))?;
		let outcome = match self.transport.send(ApiRequest::new(Endpoint::OAuthToken, params)).await {
			Ok(body) => check_envelope(body).and_then(|body| decode_body::<TokenResponse>(Endpoint::OAuthToken, body)),
			Err(err) => Err(map_transport_error(err, exchange)),
		};

		match outcome {
			Ok(response) if response.access_token.is_empty() => {
				Err(Error::Server("token exchange returned an empty access token".to_string()))
			}
			Ok(response) => Ok(response),
			Err(err) => {
				warn!(target = "imoji.session", ?exchange, error = %err, "token exchange failed");
				if err.is_authentication_failure() {
					self.invalidate();
				}
				Err(match (exchange, err) {
					(Exchange::User, Error::InvalidCredentials(message)) => Error::UserAuthenticationFailed(message),
					(_, err) => err,
				})
			}
		}
	}
}

fn decode_body<T: DeserializeOwned>(endpoint: Endpoint, body: Value) -> Result<T> {
	serde_json::from_value(body).map_err(|err| Error::Server(format!("malformed {} response: {err}", endpoint.path())))
}

/// Turns an `ERROR` envelope into the matching [`Error`].
pub(crate) fn check_envelope(body: Value) -> Result<Value> {
	match detect_fault(&body) {
		Some(fault) => Err(map_fault(&fault)),
		None => Ok(body),
	}
}

pub(crate) fn map_fault(fault: &ServerFault) -> Error {
	let message = fault.message.clone().unwrap_or_default();
	match fault.error_code() {
		ServerErrorCode::InvalidCredentials => Error::InvalidCredentials(message),
		ServerErrorCode::ImojiDoesNotExist => Error::ContentDoesNotExist(message),
		ServerErrorCode::InvalidArgument => Error::InvalidArgument(message),
		ServerErrorCode::InvalidImage => Error::InvalidImage(message),
		ServerErrorCode::SessionNotSynchronized => Error::SessionNotSynchronized(message),
		ServerErrorCode::UserAuthenticationFailed => Error::UserAuthenticationFailed(message),
		ServerErrorCode::ApplicationNotInstalled => Error::ApplicationNotInstalled(message),
		ServerErrorCode::Unknown => match &fault.code {
			Some(code) => Error::Server(format!("{code}: {message}")),
			None => Error::Server(message),
		},
	}
}

pub(crate) fn map_transport_error(err: TransportError, exchange: Exchange) -> Error {
	match err {
		TransportError::Status { status, body } => {
			if let Some(fault) = serde_json::from_str::<Value>(&body).ok().as_ref().and_then(detect_fault) {
				return map_fault(&fault);
			}
			match status {
				401 if exchange == Exchange::User => Error::UserAuthenticationFailed(body),
				401 => Error::InvalidCredentials(body),
				404 => Error::ContentDoesNotExist(body),
				_ => Error::Server(format!("HTTP {status}: {body}")),
			}
		}
		TransportError::Network(message) => Error::Server(message),
		TransportError::Decode(message) => Error::Server(format!("malformed response: {message}")),
	}
}
