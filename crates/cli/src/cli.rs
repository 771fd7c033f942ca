use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use imoji::CategoryClassification;

#[derive(Parser, Debug)]
#[command(name = "imoji")]
#[command(about = "Search, browse and render stickers from the Imoji service")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Config file (defaults to $CONFIG_DIR/imoji/config.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Override the API base URL
	#[arg(long, global = true, value_name = "URL")]
	pub api_url: Option<String>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// List sticker categories
	#[command(alias = "cat")]
	Categories {
		#[arg(value_enum, default_value = "none")]
		classification: ClassificationArg,
	},

	/// Search stickers by keyword (blank term lists featured stickers)
	Search {
		term: String,
		#[arg(long, default_value = "0")]
		offset: u32,
		#[arg(short, long)]
		limit: Option<u32>,
	},

	/// Find stickers matching a sentence
	Sentence {
		sentence: String,
		#[arg(short, long)]
		limit: Option<u32>,
	},

	/// List featured stickers
	Featured {
		#[arg(short, long)]
		limit: Option<u32>,
	},

	/// Fetch stickers by identifier
	Fetch {
		#[arg(required = true)]
		ids: Vec<String>,
	},

	/// Render a sticker to a PNG file
	Render(RenderArgs),

	/// Delete cached files idle for more than a day
	Purge,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
	/// Sticker identifier
	pub id: String,

	/// Output file path
	#[arg(short, long, default_value = "imoji.png")]
	pub output: PathBuf,

	/// Bounding box side in pixels
	#[arg(short, long)]
	pub size: Option<u32>,

	/// Draw an outline of this many pixels
	#[arg(long, value_name = "PX")]
	pub border: Option<u32>,

	/// Outline color as #RRGGBB or #RRGGBBAA
	#[arg(long, default_value = "#ffffff")]
	pub border_color: String,

	/// Add a drop shadow
	#[arg(long)]
	pub shadow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClassificationArg {
	Trending,
	Generic,
	None,
}

impl From<ClassificationArg> for CategoryClassification {
	fn from(arg: ClassificationArg) -> Self {
		match arg {
			ClassificationArg::Trending => CategoryClassification::Trending,
			ClassificationArg::Generic => CategoryClassification::Generic,
			ClassificationArg::None => CategoryClassification::None,
		}
	}
}
