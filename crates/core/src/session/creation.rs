//! Creating new stickers: placeholder first, upload second.

use std::collections::BTreeMap;

use imoji_protocol::{ContentPayload, CreateParams, CreatePayload, Endpoint};
use tracing::{debug, info, warn};

use super::channel::{Exchange, map_transport_error};
use super::{Session, SessionInner};
use crate::error::{Error, Result};
use crate::models::content::PLACEHOLDER_PREFIX;
use crate::models::{ContentObject, ImageReference, ImageVariant};
use crate::operation::PendingOperation;
use crate::render::{decode, encode_png};

const UPLOAD_CONTENT_TYPE: &str = "image/png";

impl Session {
	/// Creates a sticker from `raw_image`, with `bordered_image` as its
	/// decorated rendition.
	///
	/// `on_begin` receives a local placeholder before anything is uploaded.
	/// `on_finish` fires once with the server-confirmed object or the error,
	/// unless the operation is cancelled first. Images that do not decode are
	/// rejected with [`Error::InvalidImage`] before this returns.
	pub fn create(
		&self,
		raw_image: &[u8],
		bordered_image: &[u8],
		tags: Vec<String>,
		on_begin: impl FnOnce(ContentObject) + Send + 'static,
		on_finish: impl FnOnce(Result<ContentObject>) + Send + 'static,
	) -> PendingOperation {
		let upload = match decode(raw_image).and_then(|image| encode_png(&image)) {
			Ok(bytes) => bytes,
			Err(err) => return self.reject("create", err, on_finish),
		};
		if let Err(err) = decode(bordered_image) {
			return self.reject("create", err, on_finish);
		}

		let identifier = format!("{PLACEHOLDER_PREFIX}{}", uuid::Uuid::new_v4());
		let placeholder_path = self.inner.policy.content_path(&identifier, ImageVariant::Bordered);
		let placeholder = ContentObject::placeholder(
			identifier,
			tags.clone(),
			BTreeMap::from([(ImageVariant::Bordered, ImageReference::local(placeholder_path))]),
		);
		let bordered = bordered_image.to_vec();

		self.start("create", move |inner, operation| async move {
			inner.store_placeholder(&placeholder, &bordered).await;
			if !operation.deliver(|| on_begin(placeholder.clone())) {
				return;
			}

			let result = inner.upload_new(&placeholder, tags, upload).await;
			match &result {
				Ok(created) => {
					info!(target = "imoji.session", placeholder = placeholder.identifier(), identifier = created.identifier(), "imoji created");
				}
				Err(err) => {
					warn!(target = "imoji.session", placeholder = placeholder.identifier(), error = %err, "imoji creation failed");
					inner.discard_placeholder(&placeholder).await;
				}
			}
			operation.complete(|| on_finish(result));
		})
	}
}

impl SessionInner {
	async fn store_placeholder(&self, placeholder: &ContentObject, bordered: &[u8]) {
		let Some(path) = placeholder.image(ImageVariant::Bordered).and_then(ImageReference::local_path) else {
			return;
		};
		if let Err(err) = self.files.write(path, bordered).await {
			warn!(target = "imoji.session", path = %path.display(), error = %err, "failed to store placeholder image");
		}
	}

	async fn discard_placeholder(&self, placeholder: &ContentObject) {
		let Some(path) = placeholder.image(ImageVariant::Bordered).and_then(ImageReference::local_path) else {
			return;
		};
		if let Err(err) = self.files.delete(path).await {
			warn!(target = "imoji.session", path = %path.display(), error = %err, "failed to discard placeholder image");
		}
	}

	/// `POST imoji/create`, then `PUT` the image to the returned upload URL.
	async fn upload_new(&self, placeholder: &ContentObject, tags: Vec<String>, image: Vec<u8>) -> Result<ContentObject> {
		let params = CreateParams {
			tags: tags.clone(),
			content_type: UPLOAD_CONTENT_TYPE.to_string(),
		};
		let created: CreatePayload = self.channel.call_decoded(Endpoint::Create, &params).await?;
		if created.upload_url.trim().is_empty() {
			return Err(Error::Server("create response is missing an upload url".to_string()));
		}

		debug!(target = "imoji.session", identifier = %created.id, bytes = image.len(), "uploading image");
		self.channel
			.transport()
			.upload(&created.upload_url, image, UPLOAD_CONTENT_TYPE)
			.await
			.map_err(|err| map_transport_error(err, Exchange::Client))?;

		let confirmed = ContentObject::from_payload(ContentPayload {
			id: created.id,
			tags: Some(created.tags.unwrap_or(tags)),
			images: created.images,
		})?;
		Ok(self.adopt_placeholder_bitmap(placeholder, confirmed).await)
	}

	/// Copies the placeholder's bordered bitmap to the confirmed object's cache path.
	async fn adopt_placeholder_bitmap(&self, placeholder: &ContentObject, confirmed: ContentObject) -> ContentObject {
		let Some(source) = placeholder.image(ImageVariant::Bordered).and_then(ImageReference::local_path) else {
			return confirmed;
		};
		let target = self.policy.content_path(confirmed.identifier(), ImageVariant::Bordered);

		let copied = match self.files.read(source).await {
			Ok(bytes) => self.files.write(&target, &bytes).await,
			Err(err) => Err(err),
		};
		if let Err(err) = copied {
			warn!(target = "imoji.session", path = %target.display(), error = %err, "failed to copy placeholder image");
			return confirmed;
		}

		if let Some(reference) = confirmed.image(ImageVariant::Bordered) {
			reference.set_local_path(target);
			return confirmed;
		}

		let mut images: BTreeMap<ImageVariant, ImageReference> = confirmed
			.variants()
			.filter_map(|variant| confirmed.image(variant).map(|reference| (variant, reference.clone())))
			.collect();
		images.insert(ImageVariant::Bordered, ImageReference::local(target));
		ContentObject::new(confirmed.identifier(), confirmed.tags().to_vec(), images)
	}
}
