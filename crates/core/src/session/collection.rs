//! Account linking and per-user collection changes.

use imoji_protocol::{Endpoint, ImojiRefParams, ReportParams};
use serde::Serialize;

use super::{Session, SessionState};
use crate::error::{Error, Result};
use crate::models::ContentObject;
use crate::operation::PendingOperation;

fn require_remote(item: &ContentObject) -> Result<()> {
	if item.is_placeholder() {
		return Err(Error::InvalidArgument(format!(
			"{} is a local placeholder and has not been uploaded",
			item.identifier()
		)));
	}
	Ok(())
}

impl Session {
	/// Links the session to an end user identified by `user_token`.
	pub fn synchronize_user(
		&self,
		user_token: &str,
		callback: impl FnOnce(Result<SessionState>) + Send + 'static,
	) -> PendingOperation {
		if user_token.trim().is_empty() {
			return self.reject(
				"synchronize_user",
				Error::InvalidArgument("user token must not be empty".to_string()),
				callback,
			);
		}

		let user_token = user_token.to_string();
		self.start("synchronize_user", move |inner, operation| async move {
			let result = inner.channel.synchronize_user(&user_token).await.map(|()| inner.channel.state());
			operation.complete(|| callback(result));
		})
	}

	/// Adds `item` to the synchronized user's collection.
	pub fn add_to_user_collection(
		&self,
		item: &ContentObject,
		callback: impl FnOnce(Result<bool>) + Send + 'static,
	) -> PendingOperation {
		self.collection_call("add_to_user_collection", Endpoint::UserCollectionAdd, item, callback)
	}

	/// Deletes `item`, which must belong to the synchronized user.
	pub fn remove_item(&self, item: &ContentObject, callback: impl FnOnce(Result<bool>) + Send + 'static) -> PendingOperation {
		self.collection_call("remove_item", Endpoint::Remove, item, callback)
	}

	/// Flags `item` for moderation. Does not need a synchronized user.
	pub fn report_abusive(
		&self,
		item: &ContentObject,
		reason: Option<&str>,
		callback: impl FnOnce(Result<bool>) + Send + 'static,
	) -> PendingOperation {
		let params = ReportParams {
			imoji_id: item.identifier().to_string(),
			reason: reason.map(str::to_string).filter(|reason| !reason.trim().is_empty()),
		};
		self.acknowledged_call("report_abusive", Endpoint::ReportAbusive, item, params, callback)
	}

	fn collection_call(
		&self,
		name: &'static str,
		endpoint: Endpoint,
		item: &ContentObject,
		callback: impl FnOnce(Result<bool>) + Send + 'static,
	) -> PendingOperation {
		let params = ImojiRefParams {
			imoji_id: item.identifier().to_string(),
		};
		self.acknowledged_call(name, endpoint, item, params, callback)
	}

	fn acknowledged_call<P>(
		&self,
		name: &'static str,
		endpoint: Endpoint,
		item: &ContentObject,
		params: P,
		callback: impl FnOnce(Result<bool>) + Send + 'static,
	) -> PendingOperation
	where
		P: Serialize + Send + Sync + 'static,
	{
		let checked = if endpoint.requires_user() { self.require_synchronized() } else { Ok(()) };
		if let Err(err) = checked.and_then(|()| require_remote(item)) {
			return self.reject(name, err, callback);
		}

		self.start(name, move |inner, operation| async move {
			let result = inner.channel.call(endpoint, &params).await.map(|_| true);
			operation.complete(|| callback(result));
		})
	}
}
