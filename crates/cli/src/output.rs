//! JSON rendering of SDK objects for stdout.

use imoji::{CategoryObject, ContentObject, ResultSet};
use serde_json::{Map, Value, json};

pub fn content_json(item: &ContentObject) -> Value {
	let images: Map<String, Value> = item
		.variants()
		.filter_map(|variant| {
			let image = item.image(variant)?;
			let mut entry = Map::new();
			if let Some(url) = image.remote_url() {
				entry.insert("url".into(), json!(url));
			}
			if let Some(path) = image.local_path() {
				entry.insert("path".into(), json!(path));
			}
			if let Some((width, height)) = image.dimensions() {
				entry.insert("width".into(), json!(width));
				entry.insert("height".into(), json!(height));
			}
			Some((variant.to_string(), Value::Object(entry)))
		})
		.collect();

	json!({
		"id": item.identifier(),
		"tags": item.tags(),
		"images": images,
	})
}

pub fn category_json(category: &CategoryObject) -> Value {
	let mut value = json!({
		"id": category.identifier(),
		"title": category.title(),
		"order": category.order(),
		"priority": category.priority(),
		"previews": category.previews().iter().map(|item| item.identifier()).collect::<Vec<_>>(),
	});
	if let Some(attribution) = category.attribution() {
		value["attribution"] = json!({
			"artist": attribution.artist_name,
			"summary": attribution.artist_summary,
			"url": attribution.url,
		});
	}
	value
}

pub fn result_set_json(set: &ResultSet, items: &[(ContentObject, Option<String>)]) -> Value {
	let results: Vec<Value> = items
		.iter()
		.map(|(item, error)| {
			let mut value = content_json(item);
			if let Some(error) = error {
				value["previewError"] = json!(error);
			}
			value
		})
		.collect();

	json!({
		"count": set.count,
		"followUpTerm": set.follow_up_term,
		"results": results,
	})
}

pub fn print_json(value: &Value) -> anyhow::Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use imoji::{ImageReference, ImageVariant};

	use super::*;

	#[test]
	fn content_lists_known_variants() {
		let item = ContentObject::new(
			"abc",
			vec!["cat".to_string()],
			BTreeMap::from([(
				ImageVariant::Thumbnail,
				ImageReference::remote("https://cdn.test/abc.png").with_dimensions(Some(150), Some(150)),
			)]),
		);

		let value = content_json(&item);
		assert_eq!(value["id"], "abc");
		assert_eq!(value["tags"], json!(["cat"]));
		assert_eq!(value["images"]["thumbnail"]["width"], 150);
	}

	#[test]
	fn result_sets_carry_preview_errors() {
		let item = ContentObject::new("x", Vec::new(), BTreeMap::new());
		let set = ResultSet {
			count: 1,
			follow_up_term: None,
		};
		let value = result_set_json(&set, &[(item, Some("offline".to_string()))]);
		assert_eq!(value["count"], 1);
		assert_eq!(value["results"][0]["previewError"], "offline");
	}
}
