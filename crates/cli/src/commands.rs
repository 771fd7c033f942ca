//! Subcommand execution: one session per invocation, JSON on stdout.

use std::time::SystemTime;

use anyhow::{Context, Result, anyhow, bail};
use imoji::render::encode_png;
use imoji::{
	BorderStyle, CategoryClassification, Color, ContentObject, PendingOperation, RenderingOptions, ResultSet, Session,
	ShadowStyle, Size,
};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::cli::{Commands, RenderArgs};
use crate::config::CliConfig;
use crate::output::{category_json, content_json, print_json, result_set_json};

pub async fn dispatch(command: Commands, config: &CliConfig) -> Result<()> {
	match command {
		Commands::Categories { classification } => {
			let session = open_session(config)?;
			categories(&session, classification.into()).await
		}
		Commands::Search { term, offset, limit } => {
			let session = open_session(config)?;
			let (on_set, on_item, rx) = result_set_channel();
			let operation = session.search(&term, offset, limit, on_set, on_item);
			print_json(&collect_result_set(operation, rx).await?)
		}
		Commands::Sentence { sentence, limit } => {
			let session = open_session(config)?;
			let (on_set, on_item, rx) = result_set_channel();
			let operation = session.search_by_sentence(&sentence, limit, on_set, on_item);
			print_json(&collect_result_set(operation, rx).await?)
		}
		Commands::Featured { limit } => {
			let session = open_session(config)?;
			let (on_set, on_item, rx) = result_set_channel();
			let operation = session.get_featured(limit, on_set, on_item);
			print_json(&collect_result_set(operation, rx).await?)
		}
		Commands::Fetch { ids } => {
			let session = open_session(config)?;
			let (on_set, on_item, rx) = result_set_channel();
			let operation = session.fetch_by_identifiers(&ids, on_set, on_item);
			print_json(&collect_result_set(operation, rx).await?)
		}
		Commands::Render(args) => {
			let session = open_session(config)?;
			render(&session, &args).await
		}
		Commands::Purge => purge(config),
	}
}

/// Builds the session for commands that talk to the service.
fn open_session(config: &CliConfig) -> Result<Session> {
	let session = Session::builder(config.session_config()?)
		.storage_policy(config.storage_policy()?)
		.build()?;
	debug!(target = "imoji", cache = %session.storage_policy().cache_path().display(), "session ready");
	Ok(session)
}

async fn categories(session: &Session, classification: CategoryClassification) -> Result<()> {
	let (callback, rx) = oneshot_callback();
	session.get_categories(classification, callback);
	let categories = rx.await.context("categories request ended without a result")??;
	print_json(&json!(categories.iter().map(category_json).collect::<Vec<_>>()))
}

async fn render(session: &Session, args: &RenderArgs) -> Result<()> {
	let options = render_options(args)?;

	let (on_set, on_item, rx) = result_set_channel();
	let operation = session.fetch_by_identifiers(std::slice::from_ref(&args.id), on_set, on_item);
	let (_, items) = drain_result_set(operation, rx).await?;
	let Some((item, _)) = items.into_iter().next() else {
		bail!("imoji {} was not found", args.id);
	};

	let (callback, rx) = oneshot_callback();
	session.render(&item, options, callback);
	let image = rx.await.context("render ended without a result")??;

	let bytes = encode_png(&image)?;
	tokio::fs::write(&args.output, &bytes)
		.await
		.with_context(|| format!("failed to write {}", args.output.display()))?;
	info!(target = "imoji", id = %args.id, output = %args.output.display(), "rendered imoji");

	print_json(&json!({
		"id": item.identifier(),
		"output": args.output,
		"width": image.width(),
		"height": image.height(),
	}))
}

fn render_options(args: &RenderArgs) -> Result<RenderingOptions> {
	let border = match args.border {
		Some(width) => {
			let color = Color::parse_hex(&args.border_color).ok_or_else(|| anyhow!("invalid border color {:?}", args.border_color))?;
			Some(BorderStyle { width, color })
		}
		None => None,
	};

	Ok(RenderingOptions::default()
		.with_target_size(args.size.map(Size::square))
		.with_border(border)
		.with_shadow(args.shadow.then(ShadowStyle::default)))
}

fn purge(config: &CliConfig) -> Result<()> {
	let policy = config.storage_policy()?;
	let removed = policy.purge_expired(SystemTime::now()).context("failed to purge cache")?;
	print_json(&json!({
		"cache": policy.cache_path(),
		"removed": removed,
	}))
}

fn oneshot_callback<T: Send + 'static>() -> (impl FnOnce(T) + Send + 'static, oneshot::Receiver<T>) {
	let (tx, rx) = oneshot::channel();
	let callback = move |value: T| {
		let _ = tx.send(value);
	};
	(callback, rx)
}

enum Delivery {
	Set(imoji::Result<ResultSet>),
	Item(ContentObject, Option<imoji::Error>),
}

type OnResultSet = Box<dyn FnOnce(imoji::Result<ResultSet>) + Send>;
type OnItem = Box<dyn FnMut(ContentObject, usize, Option<imoji::Error>) + Send>;

fn result_set_channel() -> (OnResultSet, OnItem, mpsc::UnboundedReceiver<Delivery>) {
	let (tx, rx) = mpsc::unbounded_channel();
	let set_tx = tx.clone();
	let on_set: OnResultSet = Box::new(move |result| {
		let _ = set_tx.send(Delivery::Set(result));
	});
	let on_item: OnItem = Box::new(move |item, _, error| {
		let _ = tx.send(Delivery::Item(item, error));
	});
	(on_set, on_item, rx)
}

async fn drain_result_set(
	operation: PendingOperation,
	mut rx: mpsc::UnboundedReceiver<Delivery>,
) -> Result<(ResultSet, Vec<(ContentObject, Option<String>)>)> {
	operation.finished().await;

	let mut set = None;
	let mut items = Vec::new();
	while let Ok(delivery) = rx.try_recv() {
		match delivery {
			Delivery::Set(result) => set = Some(result?),
			Delivery::Item(item, error) => items.push((item, error.map(|err| err.to_string()))),
		}
	}

	let set = set.context("request ended without a result")?;
	Ok((set, items))
}

async fn collect_result_set(operation: PendingOperation, rx: mpsc::UnboundedReceiver<Delivery>) -> Result<serde_json::Value> {
	let (set, items) = drain_result_set(operation, rx).await?;
	Ok(result_set_json(&set, &items))
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;

	fn args(border: Option<u32>, color: &str) -> RenderArgs {
		RenderArgs {
			id: "abc".into(),
			output: PathBuf::from("out.png"),
			size: Some(96),
			border,
			border_color: color.into(),
			shadow: true,
		}
	}

	#[test]
	fn render_options_follow_flags() {
		let options = render_options(&args(Some(3), "#000000")).unwrap();
		assert_eq!(options.target_size, Some(Size::square(96)));
		assert_eq!(options.border, Some(BorderStyle { width: 3, color: Color::BLACK }));
		assert_eq!(options.shadow, Some(ShadowStyle::default()));
	}

	#[tokio::test]
	async fn purge_runs_without_credentials() {
		let dir = tempfile::tempdir().unwrap();
		let config = CliConfig {
			cache_dir: Some(dir.path().join("cache")),
			data_dir: Some(dir.path().join("data")),
			..CliConfig::default()
		};

		dispatch(Commands::Purge, &config).await.unwrap();

		let err = dispatch(Commands::Featured { limit: None }, &config).await.unwrap_err();
		assert!(err.to_string().contains("missing client id"));
	}

	#[test]
	fn bad_border_color_is_rejected() {
		assert!(render_options(&args(Some(3), "blue")).is_err());
		assert!(render_options(&args(None, "blue")).unwrap().border.is_none());
	}
}
