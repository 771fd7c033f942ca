//! OAuth token exchange payloads.

use serde::{Deserialize, Serialize};

/// Grant used when exchanging credentials for a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Application-only access using the client id and api token.
	ClientCredentials,
	/// Access on behalf of an end user identified by an external token.
	ExternalUser,
}

/// Body of `POST oauth/token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
	pub grant_type: GrantType,
	pub client_id: String,
	pub client_secret: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_token: Option<String>,
}

impl TokenRequest {
	pub fn client_credentials(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self {
			grant_type: GrantType::ClientCredentials,
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			user_token: None,
		}
	}

	pub fn external_user(client_id: impl Into<String>, client_secret: impl Into<String>, user_token: impl Into<String>) -> Self {
		Self {
			grant_type: GrantType::ExternalUser,
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			user_token: Some(user_token.into()),
		}
	}
}

/// Successful token exchange result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
	pub access_token: String,
	#[serde(default)]
	pub token_type: Option<String>,
	/// Lifetime of the token in seconds.
	#[serde(default)]
	pub expires_in: Option<u64>,
	#[serde(default)]
	pub refresh_token: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn client_credentials_omits_user_token() {
		let request = TokenRequest::client_credentials("client", "secret");
		let value = serde_json::to_value(&request).unwrap();
		assert_eq!(value["grant_type"], "client_credentials");
		assert!(value.get("user_token").is_none());
	}

	#[test]
	fn external_user_carries_token() {
		let request = TokenRequest::external_user("client", "secret", "user-abc");
		let value = serde_json::to_value(&request).unwrap();
		assert_eq!(value["grant_type"], "external_user");
		assert_eq!(value["user_token"], "user-abc");
	}

	#[test]
	fn token_response_tolerates_missing_optionals() {
		let response: TokenResponse = serde_json::from_str(r#"{"access_token": "t-1"}"#).unwrap();
		assert_eq!(response.access_token, "t-1");
		assert!(response.expires_in.is_none());
	}
}
