//! In-process tokenizer engine.
//!
//! `MemoryEngine` keeps loaded grammar documents in memory. It validates that a
//! grammar is a JSON object whose declared `scopeName` agrees with the catalog,
//! hands out numeric grammar ids per scope, and keeps parsed language
//! configurations keyed by scope. It backs the CLI's catalog checks and is
//! usable wherever a real tokenizer is not available.

use std::collections::HashMap;
use std::io::Read;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use super::{EngineError, GrammarLoad, Result, TokenizerEngine};

/// First id handed out; lower values are reserved by tokenizers for the
/// null and root grammars.
pub const FIRST_GRAMMAR_ID: u32 = 2;

/// Numeric grammar identifier, stable per scope for the engine's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GrammarId(pub u32);

/// A grammar held by the engine.
#[derive(Debug, Clone)]
pub struct LoadedGrammar {
	pub name: String,
	pub scope_name: String,
	pub id: GrammarId,
	/// Embedding key to the id of the embedded grammar's scope.
	pub embedded: IndexMap<String, GrammarId>,
	/// The grammar document.
	pub document: Value,
}

#[derive(Debug, Default)]
struct EngineState {
	grammars: HashMap<String, LoadedGrammar>,
	scope_to_name: HashMap<String, String>,
	scope_ids: HashMap<String, GrammarId>,
	language_configurations: HashMap<String, Value>,
	load_order: Vec<String>,
}

impl EngineState {
	fn grammar_id(&mut self, scope: &str) -> GrammarId {
		if let Some(id) = self.scope_ids.get(scope) {
			return *id;
		}
		let id = GrammarId(self.scope_ids.len() as u32 + FIRST_GRAMMAR_ID);
		self.scope_ids.insert(scope.to_string(), id);
		id
	}
}

/// Reference [`TokenizerEngine`] that stores grammars in memory.
#[derive(Debug, Default)]
pub struct MemoryEngine {
	state: RwLock<EngineState>,
}

impl MemoryEngine {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn grammar(&self, name: &str) -> Option<LoadedGrammar> {
		self.state.read().grammars.get(name).cloned()
	}

	pub fn grammar_for_scope(&self, scope: &str) -> Option<LoadedGrammar> {
		let state = self.state.read();
		let name = state.scope_to_name.get(scope)?;
		state.grammars.get(name).cloned()
	}

	/// Parsed language configuration registered for `scope`.
	pub fn language_configuration(&self, scope: &str) -> Option<Value> {
		self.state.read().language_configurations.get(scope).cloned()
	}

	/// Id assigned to `scope`, if it has been loaded or referenced by an embedding.
	pub fn grammar_id(&self, scope: &str) -> Option<GrammarId> {
		self.state.read().scope_ids.get(scope).copied()
	}

	/// Grammar names in the order they were loaded.
	pub fn load_order(&self) -> Vec<String> {
		self.state.read().load_order.clone()
	}

	pub fn len(&self) -> usize {
		self.state.read().grammars.len()
	}

	pub fn is_empty(&self) -> bool {
		self.state.read().grammars.is_empty()
	}
}

impl TokenizerEngine for MemoryEngine {
	fn contains_grammar(&self, name: &str) -> bool {
		self.state.read().grammars.contains_key(name)
	}

	fn load_grammar(&self, load: GrammarLoad<'_>) -> Result<()> {
		if self.contains_grammar(load.name) {
			debug!(grammar = load.name, "grammar already loaded");
			return Ok(());
		}

		let document = parse_grammar(load.name, load.grammar)?;
		if let Some(found) = document.get("scopeName").and_then(Value::as_str)
			&& found != load.scope_name
		{
			return Err(EngineError::ScopeMismatch {
				name: load.name.to_string(),
				declared: load.scope_name.to_string(),
				found: found.to_string(),
			});
		}

		let language_configuration = load.language_configuration.and_then(|stream| match read_json(stream) {
			Ok(value) => Some(value),
			Err(reason) => {
				warn!(grammar = load.name, %reason, "ignoring unreadable language configuration");
				None
			}
		});

		let mut state = self.state.write();
		if state.grammars.contains_key(load.name) {
			return Ok(());
		}

		let id = state.grammar_id(load.scope_name);
		let embedded = load
			.embedded_scopes
			.iter()
			.map(|(key, scope)| (key.clone(), state.grammar_id(scope)))
			.collect();

		if let Some(config) = language_configuration {
			state.language_configurations.insert(load.scope_name.to_string(), config);
		}
		state.scope_to_name.entry(load.scope_name.to_string()).or_insert_with(|| load.name.to_string());
		state.load_order.push(load.name.to_string());
		state.grammars.insert(
			load.name.to_string(),
			LoadedGrammar {
				name: load.name.to_string(),
				scope_name: load.scope_name.to_string(),
				id,
				embedded,
				document,
			},
		);

		debug!(grammar = load.name, scope = load.scope_name, id = id.0, "grammar loaded");
		Ok(())
	}
}

fn parse_grammar(name: &str, stream: impl Read) -> Result<Value> {
	let document = read_json(stream).map_err(|reason| EngineError::InvalidGrammar {
		name: name.to_string(),
		reason,
	})?;
	if !document.is_object() {
		return Err(EngineError::InvalidGrammar {
			name: name.to_string(),
			reason: "expected a JSON object".to_string(),
		});
	}
	Ok(document)
}

fn read_json(mut stream: impl Read) -> std::result::Result<Value, String> {
	let mut bytes = Vec::new();
	stream.read_to_end(&mut bytes).map_err(|e| e.to_string())?;
	serde_json::from_slice(&bytes).map_err(|e| e.to_string())
}
