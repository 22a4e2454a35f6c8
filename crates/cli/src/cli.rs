//! Command-line schema for the glossa binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "glossa")]
#[command(about = "Inspect and check syntax grammar catalogs")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Verbose logging
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Registry options as a JSON file
	#[arg(long, value_name = "FILE", global = true)]
	pub options: Option<PathBuf>,

	/// Reject duplicate names and fail on unresolved embedded languages
	#[arg(long, global = true)]
	pub strict: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Print every grammar in a catalog
	List {
		/// Catalog file
		catalog: PathBuf,
	},
	/// Find the grammar for an extension, name, or scope
	Resolve {
		/// Catalog file
		catalog: PathBuf,

		#[command(flatten)]
		target: Target,
	},
	/// Register every grammar against the in-memory engine
	Check {
		/// Catalog file
		catalog: PathBuf,

		/// Grammar search root, tried in order (defaults to the catalog's directory)
		#[arg(long = "root", value_name = "DIR")]
		roots: Vec<PathBuf>,
	},
}

/// What `resolve` looks up. Exactly one is required.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct Target {
	/// File extension, with or without the leading dot
	#[arg(long, value_name = "EXT")]
	pub ext: Option<String>,

	/// Grammar name
	#[arg(long)]
	pub name: Option<String>,

	/// Scope name
	#[arg(long)]
	pub scope: Option<String>,
}
