// Two-phase sticker creation.

mod common;

use common::{Harness, Slot, png};
use imoji::{ContentObject, ErrorKind, ImageVariant, OperationOutcome, TransportError};
use imoji_protocol::Endpoint;
use serde_json::json;

fn created(id: &str) -> serde_json::Value {
	json!({
		"status": "SUCCESS",
		"imojiId": id,
		"uploadUrl": format!("https://upload.test/{id}"),
		"images": {"full": {"url": format!("https://cdn.test/{id}.png")}}
	})
}

#[tokio::test]
async fn begin_then_finish_with_confirmed_object() {
	let h = Harness::new();
	h.transport.respond(Endpoint::Create, created("srv-1"));
	let begun: Slot<ContentObject> = Slot::new();
	let finished = Slot::new();

	let operation = h.session.create(
		&png(32, 32),
		&png(40, 40),
		vec!["wave".to_string(), "hello".to_string()],
		begun.setter(),
		finished.setter(),
	);
	assert_eq!(operation.finished().await, OperationOutcome::Completed);

	let placeholder = begun.take().pop().expect("begin fired");
	assert!(placeholder.is_placeholder());
	assert!(placeholder.identifier().starts_with("local-"));

	let mut finishes = finished.take();
	assert_eq!(finishes.len(), 1);
	let confirmed = finishes.pop().expect("finish fired").expect("created");
	assert_eq!(confirmed.identifier(), "srv-1");
	assert_ne!(confirmed.identifier(), placeholder.identifier());
	assert!(!confirmed.is_placeholder());
	assert_eq!(confirmed.tags(), ["wave".to_string(), "hello".to_string()]);

	let uploads = h.transport.uploads();
	assert_eq!(uploads.len(), 1);
	assert_eq!(uploads[0].0, "https://upload.test/srv-1");
	assert_eq!(uploads[0].2, "image/png");
	assert_eq!(h.transport.sent_to(Endpoint::Create)[0].params, json!({"tags": ["wave", "hello"], "contentType": "image/png"}));

	let final_path = h.policy.content_path("srv-1", ImageVariant::Bordered);
	assert_eq!(h.files.contents(&final_path), Some(png(40, 40)));
	assert_eq!(confirmed.image(ImageVariant::Bordered).and_then(|image| image.local_path()), Some(final_path.as_path()));
}

#[tokio::test]
async fn placeholder_renders_from_local_bytes() {
	let h = Harness::new();
	let gate = h.transport.hold(Endpoint::Create);
	let begun: Slot<ContentObject> = Slot::new();
	let finished = Slot::new();

	let operation = h.session.create(&png(8, 8), &png(10, 10), Vec::new(), begun.setter(), finished.setter());
	gate.arrived().await;

	let placeholder = begun.take().pop().expect("begin fired before upload");
	let rendered = Slot::new();
	h.session
		.render(&placeholder, imoji::RenderingOptions::default(), rendered.setter())
		.finished()
		.await;
	let image = rendered.take().pop().expect("rendered").expect("image");
	assert_eq!(image.dimensions(), (10, 10));
	assert_eq!(h.transport.fetch_count(), 0);

	operation.cancel();
	gate.release();
}

#[tokio::test]
async fn upload_failure_finishes_once_with_error() {
	let h = Harness::new();
	h.transport.respond(Endpoint::Create, created("srv-2"));
	h.transport.fail_uploads(TransportError::Network("connection reset".to_string()));
	let begun: Slot<ContentObject> = Slot::new();
	let finished: Slot<imoji::Result<ContentObject>> = Slot::new();

	h.session
		.create(&png(8, 8), &png(8, 8), Vec::new(), begun.setter(), finished.setter())
		.finished()
		.await;

	let placeholder = begun.take().pop().expect("begin fired");
	let finishes = finished.take();
	assert_eq!(finishes.len(), 1);
	assert_eq!(finishes[0].as_ref().unwrap_err().kind(), ErrorKind::ServerError);

	let placeholder_path = h.policy.content_path(placeholder.identifier(), ImageVariant::Bordered);
	assert!(h.files.contents(&placeholder_path).is_none());
}

#[tokio::test]
async fn failed_cleanup_keeps_the_upload_error() {
	let h = Harness::new();
	h.transport.respond(Endpoint::Create, created("srv-3"));
	h.transport.fail_uploads(TransportError::Network("connection reset".to_string()));
	h.files.fail_deletes(true);
	let begun: Slot<ContentObject> = Slot::new();
	let finished: Slot<imoji::Result<ContentObject>> = Slot::new();

	h.session
		.create(&png(8, 8), &png(8, 8), Vec::new(), begun.setter(), finished.setter())
		.finished()
		.await;

	let placeholder = begun.take().pop().expect("begin fired");
	let finishes = finished.take();
	assert_eq!(finishes.len(), 1);
	assert_eq!(finishes[0].as_ref().unwrap_err().kind(), ErrorKind::ServerError);
	assert_eq!(h.files.stats().deletes, 1);

	let placeholder_path = h.policy.content_path(placeholder.identifier(), ImageVariant::Bordered);
	assert!(h.files.contents(&placeholder_path).is_some());
}

#[tokio::test]
async fn undecodable_image_is_rejected_synchronously() {
	let h = Harness::new();
	let begun: Slot<ContentObject> = Slot::new();
	let finished: Slot<imoji::Result<ContentObject>> = Slot::new();

	let operation = h
		.session
		.create(b"not an image", &png(4, 4), Vec::new(), begun.setter(), finished.setter());

	assert!(operation.is_finished());
	assert!(begun.take().is_empty());
	assert_eq!(finished.take()[0].as_ref().unwrap_err().kind(), ErrorKind::InvalidImage);
	assert_eq!(h.transport.send_count(), 0);
}
