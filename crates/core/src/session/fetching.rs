//! Read operations with two-phase delivery.
//!
//! Result-set operations report the aggregate first and then each item in
//! server order. A failed aggregate is never followed by item callbacks.

use std::sync::Arc;

use imoji_protocol::{
	CategoriesParams, CategoriesPayload, Endpoint, FeaturedParams, FetchByIdsParams, ResultSetPayload, SearchParams,
	SentenceParams,
};
use serde::Serialize;
use tracing::{debug, warn};

use super::{Session, SessionInner};
use crate::error::{Error, Result};
use crate::models::{CategoryClassification, CategoryObject, ContentObject, ImageVariant, sort_categories};
use crate::operation::PendingOperation;

/// Aggregate outcome of a result-set operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultSet {
	/// Number of per-item callbacks that follow.
	pub count: usize,
	/// Alternative query suggested by the server. Always `None` when `count` is zero.
	pub follow_up_term: Option<String>,
}

fn parse_result_set(payload: ResultSetPayload) -> Result<(ResultSet, Vec<ContentObject>)> {
	let items = payload
		.results
		.into_iter()
		.map(ContentObject::from_payload)
		.collect::<Result<Vec<_>>>()?;

	let follow_up_term = payload.follow_up_term.filter(|term| !items.is_empty() && !term.trim().is_empty());
	let set = ResultSet {
		count: items.len(),
		follow_up_term,
	};
	Ok((set, items))
}

fn check_limit(limit: Option<u32>) -> Result<()> {
	match limit {
		Some(0) => Err(Error::InvalidArgument("limit must be greater than zero".to_string())),
		_ => Ok(()),
	}
}

impl SessionInner {
	/// Downloads the thumbnail so the caller can display it straight away.
	async fn prefetch_preview(&self, item: &ContentObject) -> Option<Error> {
		if !self.config.prefetch_previews || item.image(ImageVariant::Thumbnail).is_none() {
			return None;
		}
		match self.renderer.ensure_local(item, ImageVariant::Thumbnail).await {
			Ok(_) => None,
			Err(err) => {
				warn!(target = "imoji.session", identifier = item.identifier(), error = %err, "preview prefetch failed");
				Some(err)
			}
		}
	}

	async fn deliver_result_set<R, I>(
		&self,
		operation: &PendingOperation,
		outcome: Result<ResultSetPayload>,
		on_result_set: R,
		mut on_item: I,
	) where
		R: FnOnce(Result<ResultSet>),
		I: FnMut(ContentObject, usize, Option<Error>),
	{
		let (set, items) = match outcome.and_then(parse_result_set) {
			Ok(parsed) => parsed,
			Err(err) => {
				debug!(target = "imoji.session", operation = operation.name(), error = %err, "result set failed");
				operation.complete(|| on_result_set(Err(err)));
				return;
			}
		};

		debug!(target = "imoji.session", operation = operation.name(), count = set.count, "result set received");
		if items.is_empty() {
			operation.complete(|| on_result_set(Ok(set)));
			return;
		}
		if !operation.deliver(|| on_result_set(Ok(set))) {
			return;
		}

		let last = items.len() - 1;
		for (index, item) in items.into_iter().enumerate() {
			let error = self.prefetch_preview(&item).await;
			let delivered = if index == last {
				operation.complete(|| on_item(item, index, error))
			} else {
				operation.deliver(|| on_item(item, index, error))
			};
			if !delivered {
				return;
			}
		}
	}
}

impl Session {
	/// Fetches sticker categories, sorted by display order.
	pub fn get_categories(
		&self,
		classification: CategoryClassification,
		callback: impl FnOnce(Result<Vec<CategoryObject>>) + Send + 'static,
	) -> PendingOperation {
		self.start("get_categories", move |inner, operation| async move {
			let params = CategoriesParams {
				classification: classification.to_param(),
			};
			let result = inner
				.channel
				.call_decoded::<CategoriesPayload>(Endpoint::Categories, &params)
				.await
				.and_then(|payload| {
					let mut categories = payload
						.categories
						.into_iter()
						.map(|category| CategoryObject::from_payload(category, classification))
						.collect::<Result<Vec<_>>>()?;
					sort_categories(&mut categories);
					Ok(categories)
				});
			operation.complete(|| callback(result));
		})
	}

	/// Searches by keyword. A blank `term` returns featured content instead.
	pub fn search(
		&self,
		term: &str,
		offset: u32,
		limit: Option<u32>,
		on_result_set: impl FnOnce(Result<ResultSet>) + Send + 'static,
		on_item: impl FnMut(ContentObject, usize, Option<Error>) + Send + 'static,
	) -> PendingOperation {
		let term = term.trim();
		if term.is_empty() {
			return self.get_featured(limit, on_result_set, on_item);
		}
		if let Err(err) = check_limit(limit) {
			return self.reject("search", err, on_result_set);
		}

		let params = SearchParams {
			query: term.to_string(),
			offset: Some(offset),
			num_results: limit,
		};
		self.run_result_set("search", Endpoint::Search, params, on_result_set, on_item)
	}

	/// Finds stickers matching the words of a whole sentence.
	pub fn search_by_sentence(
		&self,
		sentence: &str,
		limit: Option<u32>,
		on_result_set: impl FnOnce(Result<ResultSet>) + Send + 'static,
		on_item: impl FnMut(ContentObject, usize, Option<Error>) + Send + 'static,
	) -> PendingOperation {
		let sentence = sentence.trim();
		if sentence.is_empty() {
			return self.reject(
				"search_by_sentence",
				Error::InvalidArgument("sentence must not be empty".to_string()),
				on_result_set,
			);
		}
		if let Err(err) = check_limit(limit) {
			return self.reject("search_by_sentence", err, on_result_set);
		}

		let params = SentenceParams {
			sentence: sentence.to_string(),
			num_results: limit,
		};
		self.run_result_set("search_by_sentence", Endpoint::SearchSentence, params, on_result_set, on_item)
	}

	/// Fetches the currently featured stickers.
	pub fn get_featured(
		&self,
		limit: Option<u32>,
		on_result_set: impl FnOnce(Result<ResultSet>) + Send + 'static,
		on_item: impl FnMut(ContentObject, usize, Option<Error>) + Send + 'static,
	) -> PendingOperation {
		if let Err(err) = check_limit(limit) {
			return self.reject("get_featured", err, on_result_set);
		}
		let params = FeaturedParams { num_results: limit };
		self.run_result_set("get_featured", Endpoint::Featured, params, on_result_set, on_item)
	}

	/// Fetches specific stickers by identifier.
	pub fn fetch_by_identifiers(
		&self,
		identifiers: &[String],
		on_result_set: impl FnOnce(Result<ResultSet>) + Send + 'static,
		on_item: impl FnMut(ContentObject, usize, Option<Error>) + Send + 'static,
	) -> PendingOperation {
		if identifiers.is_empty() {
			return self.reject(
				"fetch_by_identifiers",
				Error::InvalidArgument("at least one identifier is required".to_string()),
				on_result_set,
			);
		}
		if identifiers.iter().any(|id| id.trim().is_empty()) {
			return self.reject(
				"fetch_by_identifiers",
				Error::InvalidArgument("identifiers must not be empty".to_string()),
				on_result_set,
			);
		}

		let params = FetchByIdsParams {
			ids: identifiers.to_vec(),
		};
		self.run_result_set("fetch_by_identifiers", Endpoint::FetchByIds, params, on_result_set, on_item)
	}

	/// Fetches the synchronized user's collection.
	pub fn get_authenticated_user_content(
		&self,
		on_result_set: impl FnOnce(Result<ResultSet>) + Send + 'static,
		on_item: impl FnMut(ContentObject, usize, Option<Error>) + Send + 'static,
	) -> PendingOperation {
		if let Err(err) = self.require_synchronized() {
			return self.reject("get_authenticated_user_content", err, on_result_set);
		}
		self.run_result_set(
			"get_authenticated_user_content",
			Endpoint::UserContent,
			serde_json::json!({}),
			on_result_set,
			on_item,
		)
	}

	fn run_result_set<P, R, I>(
		&self,
		name: &'static str,
		endpoint: Endpoint,
		params: P,
		on_result_set: R,
		on_item: I,
	) -> PendingOperation
	where
		P: Serialize + Send + Sync + 'static,
		R: FnOnce(Result<ResultSet>) + Send + 'static,
		I: FnMut(ContentObject, usize, Option<Error>) + Send + 'static,
	{
		self.start(name, move |inner: Arc<SessionInner>, operation| async move {
			let outcome = inner.channel.call_decoded::<ResultSetPayload>(endpoint, &params).await;
			inner.deliver_result_set(&operation, outcome, on_result_set, on_item).await;
		})
	}
}
