//! Glossa command-line tool.
//!
//! Lists, resolves, and checks grammar catalogs using the in-memory engine.

mod cli;
mod commands;
mod logging;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command};

fn main() -> anyhow::Result<ExitCode> {
	let cli = Cli::parse();
	logging::init(cli.verbose);

	let options = commands::load_options(cli.options.as_deref(), cli.strict)?;
	let mut out = io::stdout().lock();

	let ok = match cli.command {
		Command::List { catalog } => commands::list(&catalog, options, &mut out)?,
		Command::Resolve { catalog, target } => commands::resolve(&catalog, &target, options, &mut out)?,
		Command::Check { catalog, roots } => commands::check(&catalog, roots, options, &mut out)?,
	};

	Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
