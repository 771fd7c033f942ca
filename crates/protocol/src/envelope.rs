//! Response envelope and server error codes.
//!
//! Every API response is a JSON object with a `status` field. Successful
//! responses carry their payload alongside it:
//!
//! ```json
//! { "status": "SUCCESS", "results": [ ... ] }
//! ```
//!
//! Failures carry a machine-readable code and a message:
//!
//! ```json
//! { "status": "ERROR", "code": "ImojiDoesNotExist", "message": "no such imoji" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope status marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
	Success,
	Error,
}

/// Error codes the service reports in failed envelopes.
///
/// Codes this crate does not know about parse to [`ServerErrorCode::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorCode {
	InvalidCredentials,
	ImojiDoesNotExist,
	InvalidArgument,
	InvalidImage,
	SessionNotSynchronized,
	UserAuthenticationFailed,
	ApplicationNotInstalled,
	Unknown,
}

impl ServerErrorCode {
	pub fn parse(code: &str) -> Self {
		match code {
			"InvalidCredentials" => ServerErrorCode::InvalidCredentials,
			"ImojiDoesNotExist" => ServerErrorCode::ImojiDoesNotExist,
			"InvalidArgument" => ServerErrorCode::InvalidArgument,
			"InvalidImage" => ServerErrorCode::InvalidImage,
			"SessionNotSynchronized" => ServerErrorCode::SessionNotSynchronized,
			"UserAuthenticationFailed" => ServerErrorCode::UserAuthenticationFailed,
			"ApplicationNotInstalled" => ServerErrorCode::ApplicationNotInstalled,
			_ => ServerErrorCode::Unknown,
		}
	}
}

/// Error details extracted from a failed envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFault {
	#[serde(default)]
	pub code: Option<String>,
	#[serde(default)]
	pub message: Option<String>,
}

impl ServerFault {
	pub fn error_code(&self) -> ServerErrorCode {
		self.code.as_deref().map(ServerErrorCode::parse).unwrap_or(ServerErrorCode::Unknown)
	}
}

/// Returns the fault carried by `payload` when its status is `ERROR`.
///
/// Payloads without a `status` field are treated as successful.
pub fn detect_fault(payload: &Value) -> Option<ServerFault> {
	let status = payload.get("status")?;
	match serde_json::from_value::<ResponseStatus>(status.clone()) {
		Ok(ResponseStatus::Error) => Some(serde_json::from_value(payload.clone()).unwrap_or(ServerFault {
			code: None,
			message: None,
		})),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn known_codes_parse() {
		assert_eq!(ServerErrorCode::parse("ImojiDoesNotExist"), ServerErrorCode::ImojiDoesNotExist);
		assert_eq!(ServerErrorCode::parse("InvalidCredentials"), ServerErrorCode::InvalidCredentials);
	}

	#[test]
	fn unknown_codes_fall_back() {
		assert_eq!(ServerErrorCode::parse("QuotaExceeded"), ServerErrorCode::Unknown);
		assert_eq!(ServerErrorCode::parse(""), ServerErrorCode::Unknown);
	}

	#[test]
	fn fault_detected_on_error_status() {
		let fault = detect_fault(&json!({"status": "ERROR", "code": "InvalidArgument", "message": "bad"})).unwrap();
		assert_eq!(fault.error_code(), ServerErrorCode::InvalidArgument);
		assert_eq!(fault.message.as_deref(), Some("bad"));
	}

	#[test]
	fn success_and_bare_payloads_have_no_fault() {
		assert!(detect_fault(&json!({"status": "SUCCESS", "results": []})).is_none());
		assert!(detect_fault(&json!({"results": []})).is_none());
	}

	#[test]
	fn error_status_without_code_is_unknown() {
		let fault = detect_fault(&json!({"status": "ERROR"})).unwrap();
		assert_eq!(fault.error_code(), ServerErrorCode::Unknown);
	}
}
