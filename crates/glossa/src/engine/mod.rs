//! Boundary with the tokenizer engine.
//!
//! The registry never touches files or the engine directly. It talks to an
//! [`EngineBinding`], whose standard implementation, [`TokenizerBinding`], opens
//! grammar and language configuration streams through a [`FileProvider`] and
//! hands them to a [`TokenizerEngine`].

use std::io::{self, Read};
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::descriptor::Descriptor;

mod files;
mod memory;

pub use files::{ENV_GRAMMAR_PATH, FsFileProvider, MemoryFileProvider};
pub use memory::{FIRST_GRAMMAR_ID, GrammarId, LoadedGrammar, MemoryEngine};

/// Errors raised while loading a grammar into the engine.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("failed to open `{reference}`: {source}")]
	Io {
		reference: String,
		#[source]
		source: io::Error,
	},

	#[error("grammar `{name}` is not a valid grammar document: {reason}")]
	InvalidGrammar { name: String, reason: String },

	#[error("grammar `{name}` declares scope `{found}` but the catalog expects `{declared}`")]
	ScopeMismatch { name: String, declared: String, found: String },

	#[error("engine rejected grammar `{name}`: {reason}")]
	Rejected { name: String, reason: String },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Readable contents of a grammar or language configuration file.
pub type ByteStream = Box<dyn Read + Send>;

/// Resolves opaque file references into byte streams.
pub trait FileProvider: Send + Sync {
	fn open_stream(&self, reference: &str) -> io::Result<ByteStream>;
}

impl<T: FileProvider + ?Sized> FileProvider for Arc<T> {
	fn open_stream(&self, reference: &str) -> io::Result<ByteStream> {
		(**self).open_stream(reference)
	}
}

/// Everything the engine needs to load one grammar.
pub struct GrammarLoad<'a> {
	pub name: &'a str,
	pub scope_name: &'a str,
	pub grammar: ByteStream,
	pub language_configuration: Option<ByteStream>,
	/// Embedding key to the scope of the embedded grammar.
	pub embedded_scopes: &'a IndexMap<String, String>,
}

/// The external tokenizing engine.
pub trait TokenizerEngine: Send + Sync {
	/// Whether a grammar with this name is already loaded.
	fn contains_grammar(&self, name: &str) -> bool;

	fn load_grammar(&self, load: GrammarLoad<'_>) -> Result<()>;
}

impl<T: TokenizerEngine + ?Sized> TokenizerEngine for Arc<T> {
	fn contains_grammar(&self, name: &str) -> bool {
		(**self).contains_grammar(name)
	}

	fn load_grammar(&self, load: GrammarLoad<'_>) -> Result<()> {
		(**self).load_grammar(load)
	}
}

/// The registry's only way to reach the engine.
pub trait EngineBinding: Send + Sync {
	/// Whether the engine already holds a grammar with this name.
	fn contains(&self, name: &str) -> bool;

	/// Loads `descriptor` with its embedded languages resolved to scopes.
	fn load(&self, descriptor: &Descriptor, embedded_scopes: &IndexMap<String, String>) -> Result<()>;
}

/// [`EngineBinding`] over a file provider and a tokenizer engine.
pub struct TokenizerBinding<E, F> {
	engine: E,
	files: F,
}

impl<E, F> TokenizerBinding<E, F>
where
	E: TokenizerEngine,
	F: FileProvider,
{
	pub fn new(engine: E, files: F) -> Self {
		Self { engine, files }
	}

	pub fn engine(&self) -> &E {
		&self.engine
	}

	pub fn files(&self) -> &F {
		&self.files
	}

	/// Opens the language configuration, treating an unreadable file as absent.
	fn open_language_configuration(&self, descriptor: &Descriptor) -> Option<ByteStream> {
		let reference = descriptor.language_configuration()?;
		match self.files.open_stream(reference) {
			Ok(stream) => Some(stream),
			Err(e) => {
				warn!(
					grammar = descriptor.name(),
					reference,
					error = %e,
					"language configuration unavailable, loading grammar without it"
				);
				None
			}
		}
	}
}

impl<E, F> EngineBinding for TokenizerBinding<E, F>
where
	E: TokenizerEngine,
	F: FileProvider,
{
	fn contains(&self, name: &str) -> bool {
		self.engine.contains_grammar(name)
	}

	fn load(&self, descriptor: &Descriptor, embedded_scopes: &IndexMap<String, String>) -> Result<()> {
		let grammar = self.files.open_stream(descriptor.grammar_source()).map_err(|source| EngineError::Io {
			reference: descriptor.grammar_source().to_string(),
			source,
		})?;
		let language_configuration = self.open_language_configuration(descriptor);

		debug!(
			grammar = descriptor.name(),
			scope = descriptor.scope_name(),
			embedded = embedded_scopes.len(),
			"loading grammar into engine"
		);

		self.engine.load_grammar(GrammarLoad {
			name: descriptor.name(),
			scope_name: descriptor.scope_name(),
			grammar,
			language_configuration,
			embedded_scopes,
		})
	}
}
