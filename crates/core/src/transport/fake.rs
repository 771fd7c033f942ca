//! Fake transport for unit testing session orchestration.
//!
//! Provides an in-memory transport that answers API calls from a per-endpoint
//! script and serves asset bytes per URL, without any network access.
//!
//! # Example
//!
//! ```ignore
//! let transport = Arc::new(FakeTransport::new());
//! transport.respond(Endpoint::Search, json!({"status": "SUCCESS", "results": []}));
//! transport.fail_status(Endpoint::Categories, 500);
//!
//! let session = Session::builder().transport(transport.clone()).build()?;
//! // ... issue operations ...
//! assert_eq!(transport.sent_to(Endpoint::Search).len(), 1);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use imoji_protocol::Endpoint;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::{Notify, watch};

use super::{ApiRequest, Transport, TransportError};

/// Token returned by the default `oauth/token` script.
pub const FAKE_ACCESS_TOKEN: &str = "fake-access-token";

#[derive(Debug, Clone)]
enum Scripted {
	Payload(Value),
	Failure(TransportError),
}

/// Holds requests to one endpoint until released.
pub struct FakeGate {
	release: watch::Sender<bool>,
	arrived: Arc<Notify>,
}

impl FakeGate {
	/// Lets every held and future request through.
	pub fn release(&self) {
		let _ = self.release.send(true);
	}

	/// Resolves once a request has reached the gate.
	pub async fn arrived(&self) {
		self.arrived.notified().await;
	}
}

struct Hold {
	released: watch::Receiver<bool>,
	arrived: Arc<Notify>,
}

/// Scripted in-memory [`Transport`].
///
/// Each endpoint has a queue of responses. Responses are consumed in order and
/// the last one is repeated. Endpoints without a script answer with HTTP 404.
/// `oauth/token` is pre-scripted to succeed with [`FAKE_ACCESS_TOKEN`].
pub struct FakeTransport {
	scripts: Mutex<HashMap<Endpoint, VecDeque<Scripted>>>,
	assets: Mutex<HashMap<String, Vec<u8>>>,
	holds: Mutex<HashMap<Endpoint, Hold>>,
	sent: Mutex<Vec<ApiRequest>>,
	fetched: Mutex<Vec<String>>,
	uploads: Mutex<Vec<(String, Vec<u8>, String)>>,
	upload_failure: Mutex<Option<TransportError>>,
	send_calls: AtomicUsize,
	fetch_calls: AtomicUsize,
}

impl FakeTransport {
	pub fn new() -> Self {
		let transport = Self {
			scripts: Mutex::new(HashMap::new()),
			assets: Mutex::new(HashMap::new()),
			holds: Mutex::new(HashMap::new()),
			sent: Mutex::new(Vec::new()),
			fetched: Mutex::new(Vec::new()),
			uploads: Mutex::new(Vec::new()),
			upload_failure: Mutex::new(None),
			send_calls: AtomicUsize::new(0),
			fetch_calls: AtomicUsize::new(0),
		};
		transport.respond(
			Endpoint::OAuthToken,
			json!({"access_token": FAKE_ACCESS_TOKEN, "token_type": "bearer", "expires_in": 3600}),
		);
		transport
	}

	fn script(&self, endpoint: Endpoint, scripted: Scripted) {
		let mut queue = VecDeque::new();
		queue.push_back(scripted);
		self.scripts.lock().insert(endpoint, queue);
	}

	fn push(&self, endpoint: Endpoint, scripted: Scripted) {
		self.scripts.lock().entry(endpoint).or_default().push_back(scripted);
	}

	/// Replaces the script for `endpoint` with a single payload.
	pub fn respond(&self, endpoint: Endpoint, payload: Value) {
		self.script(endpoint, Scripted::Payload(payload));
	}

	/// Appends a payload to the script for `endpoint`.
	pub fn enqueue(&self, endpoint: Endpoint, payload: Value) {
		self.push(endpoint, Scripted::Payload(payload));
	}

	/// Replaces the script for `endpoint` with an HTTP failure.
	pub fn fail_status(&self, endpoint: Endpoint, status: u16) {
		self.script(
			endpoint,
			Scripted::Failure(TransportError::Status {
				status,
				body: String::new(),
			}),
		);
	}

	/// Replaces the script for `endpoint` with a service error envelope.
	pub fn fail_code(&self, endpoint: Endpoint, code: &str, message: &str) {
		self.script(endpoint, Scripted::Payload(json!({"status": "ERROR", "code": code, "message": message})));
	}

	/// Replaces the script for `endpoint` with a connection failure.
	pub fn fail_network(&self, endpoint: Endpoint, message: &str) {
		self.script(endpoint, Scripted::Failure(TransportError::Network(message.to_string())));
	}

	/// Serves `bytes` for downloads of `url`.
	pub fn serve(&self, url: impl Into<String>, bytes: Vec<u8>) {
		self.assets.lock().insert(url.into(), bytes);
	}

	/// Makes every upload fail with `error`.
	pub fn fail_uploads(&self, error: TransportError) {
		*self.upload_failure.lock() = Some(error);
	}

	/// Parks requests to `endpoint` until the returned gate is released.
	pub fn hold(&self, endpoint: Endpoint) -> FakeGate {
		let (release, released) = watch::channel(false);
		let arrived = Arc::new(Notify::new());
		self.holds.lock().insert(
			endpoint,
			Hold {
				released,
				arrived: Arc::clone(&arrived),
			},
		);
		FakeGate { release, arrived }
	}

	/// Every API request sent so far.
	pub fn sent(&self) -> Vec<ApiRequest> {
		self.sent.lock().clone()
	}

	pub fn sent_to(&self, endpoint: Endpoint) -> Vec<ApiRequest> {
		self.sent.lock().iter().filter(|request| request.endpoint == endpoint).cloned().collect()
	}

	/// Number of API requests, excluding token exchanges.
	pub fn request_count(&self) -> usize {
		self.sent.lock().iter().filter(|request| request.endpoint != Endpoint::OAuthToken).count()
	}

	pub fn send_count(&self) -> usize {
		self.send_calls.load(Ordering::SeqCst)
	}

	pub fn fetch_count(&self) -> usize {
		self.fetch_calls.load(Ordering::SeqCst)
	}

	pub fn fetched(&self) -> Vec<String> {
		self.fetched.lock().clone()
	}

	/// Uploads received so far as `(url, bytes, content_type)`.
	pub fn uploads(&self) -> Vec<(String, Vec<u8>, String)> {
		self.uploads.lock().clone()
	}

	fn next_response(&self, endpoint: Endpoint) -> Scripted {
		let mut scripts = self.scripts.lock();
		match scripts.get_mut(&endpoint) {
			Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(not_scripted),
			Some(queue) => queue.front().cloned().unwrap_or_else(not_scripted),
			None => not_scripted(),
		}
	}

	async fn wait_for_release(&self, endpoint: Endpoint) {
		let hold = self
			.holds
			.lock()
			.get(&endpoint)
			.map(|hold| (hold.released.clone(), Arc::clone(&hold.arrived)));

		if let Some((mut released, arrived)) = hold {
			arrived.notify_one();
			let _ = released.wait_for(|released| *released).await;
		}
	}
}

impl Default for FakeTransport {
	fn default() -> Self {
		Self::new()
	}
}

fn not_scripted() -> Scripted {
	Scripted::Failure(TransportError::Status {
		status: 404,
		body: "no scripted response".to_string(),
	})
}

#[async_trait]
impl Transport for FakeTransport {
	async fn send(&self, request: ApiRequest) -> Result<Value, TransportError> {
		self.send_calls.fetch_add(1, Ordering::SeqCst);
		let endpoint = request.endpoint;
		self.sent.lock().push(request);

		self.wait_for_release(endpoint).await;

		match self.next_response(endpoint) {
			Scripted::Payload(payload) => Ok(payload),
			Scripted::Failure(error) => Err(error),
		}
	}

	async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
		self.fetch_calls.fetch_add(1, Ordering::SeqCst);
		self.fetched.lock().push(url.to_string());
		self.assets.lock().get(url).cloned().ok_or_else(|| TransportError::Status {
			status: 404,
			body: format!("no asset served for {url}"),
		})
	}

	async fn upload(&self, url: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), TransportError> {
		if let Some(error) = self.upload_failure.lock().clone() {
			return Err(error);
		}
		self.uploads.lock().push((url.to_string(), bytes, content_type.to_string()));
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn token_exchange_is_prescripted() {
		let transport = FakeTransport::new();
		let value = transport.send(ApiRequest::new(Endpoint::OAuthToken, json!({}))).await.unwrap();
		assert_eq!(value["access_token"], FAKE_ACCESS_TOKEN);
		assert_eq!(transport.request_count(), 0);
		assert_eq!(transport.send_count(), 1);
	}

	#[tokio::test]
	async fn unscripted_endpoints_answer_404() {
		let transport = FakeTransport::new();
		let err = transport.send(ApiRequest::new(Endpoint::Search, json!({}))).await.unwrap_err();
		assert!(matches!(err, TransportError::Status { status: 404, .. }));
	}

	#[tokio::test]
	async fn queued_responses_are_consumed_then_last_repeats() {
		let transport = FakeTransport::new();
		transport.respond(Endpoint::Featured, json!({"n": 1}));
		transport.enqueue(Endpoint::Featured, json!({"n": 2}));

		for expected in [1, 2, 2] {
			let value = transport.send(ApiRequest::new(Endpoint::Featured, json!({}))).await.unwrap();
			assert_eq!(value["n"], expected);
		}
		assert_eq!(transport.sent_to(Endpoint::Featured).len(), 3);
	}

	#[tokio::test]
	async fn held_requests_wait_for_release() {
		let transport = Arc::new(FakeTransport::new());
		transport.respond(Endpoint::Search, json!({"ok": true}));
		let gate = transport.hold(Endpoint::Search);

		let task = tokio::spawn({
			let transport = Arc::clone(&transport);
			async move { transport.send(ApiRequest::new(Endpoint::Search, json!({}))).await }
		});

		gate.arrived().await;
		assert!(!task.is_finished());
		gate.release();
		assert_eq!(task.await.unwrap().unwrap()["ok"], true);
	}

	#[tokio::test]
	async fn assets_and_uploads() {
		let transport = FakeTransport::new();
		transport.serve("https://cdn/a.png", vec![1, 2, 3]);
		assert_eq!(transport.fetch("https://cdn/a.png").await.unwrap(), vec![1, 2, 3]);
		assert!(transport.fetch("https://cdn/missing.png").await.is_err());
		assert_eq!(transport.fetch_count(), 2);

		transport.upload("https://upload/x", vec![9], "image/png").await.unwrap();
		assert_eq!(transport.uploads().len(), 1);
	}
}
