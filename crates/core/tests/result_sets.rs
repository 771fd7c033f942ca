// Aggregate and per-item delivery for read operations.

mod common;

use common::{Event, Events, Harness, content, results};
use imoji::transport::fake::FAKE_ACCESS_TOKEN;
use imoji::{CategoryClassification, ErrorKind, OperationOutcome, ResultSet};
use imoji_protocol::Endpoint;
use serde_json::json;

#[tokio::test]
async fn search_delivers_aggregate_then_items_in_order() {
	let h = Harness::new();
	let mut payload = results(&["a", "b"]);
	payload["followupSearchTerm"] = json!("kitten");
	h.transport.respond(Endpoint::Search, payload);
	let events = Events::default();

	let operation = h.session.search("cat", 0, Some(10), events.on_result_set(), events.on_item());

	assert_eq!(operation.finished().await, OperationOutcome::Completed);
	assert_eq!(
		events.take(),
		vec![
			Event::ResultSet(Ok(ResultSet {
				count: 2,
				follow_up_term: Some("kitten".to_string()),
			})),
			Event::Item("a".to_string(), 0, None),
			Event::Item("b".to_string(), 1, None),
		]
	);

	let sent = h.transport.sent_to(Endpoint::Search);
	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].params, json!({"query": "cat", "offset": 0, "numResults": 10}));
	assert_eq!(sent[0].bearer_token.as_deref(), Some(FAKE_ACCESS_TOKEN));
}

#[tokio::test]
async fn empty_result_set_has_no_items_and_no_follow_up() {
	let h = Harness::new();
	h.transport
		.respond(Endpoint::Search, json!({"status": "SUCCESS", "results": [], "followupSearchTerm": "dogs"}));
	let events = Events::default();

	let operation = h.session.search("cat", 0, None, events.on_result_set(), events.on_item());

	assert_eq!(operation.finished().await, OperationOutcome::Completed);
	assert_eq!(
		events.take(),
		vec![Event::ResultSet(Ok(ResultSet {
			count: 0,
			follow_up_term: None,
		}))]
	);
}

#[tokio::test]
async fn blank_search_term_fetches_featured() {
	let h = Harness::new();
	h.transport.respond(Endpoint::Featured, results(&["f"]));
	let events = Events::default();

	h.session
		.search("   ", 25, Some(5), events.on_result_set(), events.on_item())
		.finished()
		.await;

	assert!(h.transport.sent_to(Endpoint::Search).is_empty());
	let featured = h.transport.sent_to(Endpoint::Featured);
	assert_eq!(featured.len(), 1);
	assert_eq!(featured[0].params, json!({"numResults": 5}));
	assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn invalid_arguments_fail_before_returning() {
	let h = Harness::new();
	let events = Events::default();

	let zero_limit = h.session.search("cat", 0, Some(0), events.on_result_set(), events.on_item());
	assert!(zero_limit.is_finished());

	let no_ids = h.session.fetch_by_identifiers(&[], events.on_result_set(), events.on_item());
	assert!(no_ids.is_finished());

	let blank_id = h
		.session
		.fetch_by_identifiers(&["a".to_string(), String::new()], events.on_result_set(), events.on_item());
	assert!(blank_id.is_finished());

	let blank_sentence = h.session.search_by_sentence(" ", None, events.on_result_set(), events.on_item());
	assert!(blank_sentence.is_finished());

	assert_eq!(events.take(), vec![Event::ResultSet(Err(ErrorKind::InvalidArgument)); 4]);
	assert_eq!(h.transport.send_count(), 0);
}

#[tokio::test]
async fn server_fault_fails_aggregate_without_items() {
	let h = Harness::new();
	h.transport.fail_code(Endpoint::FetchByIds, "ImojiDoesNotExist", "no such imoji");
	let events = Events::default();

	h.session
		.fetch_by_identifiers(&["gone".to_string()], events.on_result_set(), events.on_item())
		.finished()
		.await;

	assert_eq!(events.take(), vec![Event::ResultSet(Err(ErrorKind::ContentDoesNotExist))]);
}

#[tokio::test]
async fn unknown_server_code_is_a_server_error() {
	let h = Harness::new();
	h.transport.fail_code(Endpoint::SearchSentence, "QuotaExceeded", "slow down");
	let events = Events::default();

	h.session
		.search_by_sentence("i am happy", Some(3), events.on_result_set(), events.on_item())
		.finished()
		.await;

	assert_eq!(events.take(), vec![Event::ResultSet(Err(ErrorKind::ServerError))]);
}

#[tokio::test]
async fn categories_failure_reports_server_error() {
	let h = Harness::new();
	h.transport.fail_status(Endpoint::Categories, 500);
	let slot = common::Slot::new();

	h.session.get_categories(CategoryClassification::Trending, slot.setter()).finished().await;

	let results = slot.take();
	assert_eq!(results.len(), 1);
	assert_eq!(results[0].as_ref().map_err(|err| err.kind()).err(), Some(ErrorKind::ServerError));
}

#[tokio::test]
async fn categories_are_sorted_for_display() {
	let h = Harness::new();
	h.transport.respond(
		Endpoint::Categories,
		json!({
			"status": "SUCCESS",
			"categories": [
				{"id": "late", "title": "Late", "order": 2, "priority": 9},
				{"id": "low", "title": "Low", "order": 1, "priority": 1},
				{"id": "high", "title": "High", "order": 1, "priority": 5, "previewImojis": [content("p")]}
			]
		}),
	);
	let slot = common::Slot::new();

	h.session.get_categories(CategoryClassification::Generic, slot.setter()).finished().await;

	let categories = slot.take().pop().expect("callback fired").expect("categories");
	let ids: Vec<_> = categories.iter().map(|category| category.identifier().to_string()).collect();
	assert_eq!(ids, ["high", "low", "late"]);
	assert_eq!(categories[0].previews()[0].identifier(), "p");
	assert_eq!(categories[0].classification(), CategoryClassification::Generic);
	assert_eq!(h.transport.sent_to(Endpoint::Categories)[0].params, json!({"classification": "generic"}));
}

#[tokio::test]
async fn prefetch_reports_per_item_download_errors() {
	let h = Harness::with_config(common::config().with_prefetch_previews(true));
	h.transport.respond(Endpoint::Featured, results(&["ok", "broken"]));
	h.transport.serve("https://cdn.test/ok-thumb.png", common::png(4, 4));
	let events = Events::default();

	h.session
		.get_featured(None, events.on_result_set(), events.on_item())
		.finished()
		.await;

	let events = events.take();
	assert_eq!(events[1], Event::Item("ok".to_string(), 0, None));
	assert_eq!(events[2], Event::Item("broken".to_string(), 1, Some(ErrorKind::ServerError)));
	assert!(h.files.contents(&h.policy.content_path("ok", imoji::ImageVariant::Thumbnail)).is_some());
}

#[tokio::test]
async fn user_content_requires_synchronization() {
	let h = Harness::new();
	let events = Events::default();

	let operation = h.session.get_authenticated_user_content(events.on_result_set(), events.on_item());

	assert!(operation.is_finished());
	assert_eq!(events.take(), vec![Event::ResultSet(Err(ErrorKind::SessionNotSynchronized))]);
	assert_eq!(h.transport.send_count(), 0);
}
