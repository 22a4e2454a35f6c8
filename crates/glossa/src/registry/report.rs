use std::fmt;

/// Why an embedded language was left out of a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
	/// The referenced name is not in the catalog.
	Missing,
	/// The referenced grammar is already being registered higher up the chain.
	Cycle,
	/// Recursing would exceed the configured embedding depth.
	DepthExceeded,
	/// The referenced grammar failed to load.
	Failed(String),
}

impl fmt::Display for SkipReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Missing => f.write_str("not in catalog"),
			Self::Cycle => f.write_str("cyclic embedding"),
			Self::DepthExceeded => f.write_str("embedding depth limit reached"),
			Self::Failed(reason) => write!(f, "failed to load: {reason}"),
		}
	}
}

/// An embedding skipped while registering `host`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEmbedding {
	pub host: String,
	pub key: String,
	pub target: String,
	pub reason: SkipReason,
}

/// Outcome of one `ensure_registered` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
	/// The grammar that was requested.
	pub name: String,
	/// Grammars handed to the engine by this call, in load order.
	pub loaded: Vec<String>,
	/// Embeddings that were skipped anywhere below the requested grammar.
	pub skipped: Vec<SkippedEmbedding>,
}

impl Registration {
	pub(crate) fn new(name: &str) -> Self {
		Self {
			name: name.to_string(),
			loaded: Vec::new(),
			skipped: Vec::new(),
		}
	}

	/// Nothing was newly loaded by this call.
	///
	/// Also true when every engine call the call made failed; see [`Self::skipped`].
	pub fn is_noop(&self) -> bool {
		self.loaded.is_empty()
	}

	/// Whether the requested grammar was loaded by this call.
	pub fn loaded_requested(&self) -> bool {
		self.loaded.iter().any(|n| *n == self.name)
	}

	pub(crate) fn skip(&mut self, host: &str, key: &str, target: &str, reason: SkipReason) {
		self.skipped.push(SkippedEmbedding {
			host: host.to_string(),
			key: key.to_string(),
			target: target.to_string(),
			reason,
		});
	}
}
