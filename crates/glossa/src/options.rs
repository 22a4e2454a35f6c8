//! Registry options.
//!
//! Options control the policies the registry applies to imperfect catalogs. The
//! defaults are lenient: duplicates keep the first definition and unresolved
//! embedded languages are skipped. Options can be deserialized from a config
//! file and overridden from the environment.

use serde::Deserialize;
use tracing::warn;

/// Overrides [`RegistryOptions::max_embedding_depth`].
pub const ENV_MAX_EMBED_DEPTH: &str = "GLOSSA_MAX_EMBED_DEPTH";
/// When truthy, switches both catalog policies to their strict variants.
pub const ENV_STRICT: &str = "GLOSSA_STRICT";

/// Default ceiling on embedded-language recursion.
pub const DEFAULT_MAX_EMBEDDING_DEPTH: usize = 16;

/// What the catalog loader does with a record whose name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
	/// Keep the first-seen descriptor and report the later one.
	#[default]
	KeepFirst,
	/// Fail the whole catalog load.
	Reject,
}

/// What registration does when an embedded language is not in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingEmbedded {
	/// Register the host without that embedding.
	#[default]
	Skip,
	/// Fail the host registration.
	Fail,
}

/// Tunable registry behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryOptions {
	/// Maximum embedded-language nesting below the requested grammar.
	///
	/// `0` registers the requested grammar without recursing into embeddings.
	pub max_embedding_depth: usize,
	pub duplicate_names: DuplicatePolicy,
	pub missing_embedded: MissingEmbedded,
	/// Match file extensions case-insensitively.
	pub fold_extension_case: bool,
}

impl Default for RegistryOptions {
	fn default() -> Self {
		Self {
			max_embedding_depth: DEFAULT_MAX_EMBEDDING_DEPTH,
			duplicate_names: DuplicatePolicy::KeepFirst,
			missing_embedded: MissingEmbedded::Skip,
			fold_extension_case: true,
		}
	}
}

impl RegistryOptions {
	/// Rejects duplicate names and fails on unresolved embeddings.
	pub fn strict() -> Self {
		Self {
			duplicate_names: DuplicatePolicy::Reject,
			missing_embedded: MissingEmbedded::Fail,
			..Self::default()
		}
	}

	/// Default options with environment overrides applied.
	pub fn from_env() -> Self {
		Self::default().with_overrides(|key| std::env::var(key).ok())
	}

	/// Applies overrides from `lookup`, which maps a variable name to its value.
	///
	/// Unparseable values are logged and ignored.
	pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
		if let Some(raw) = lookup(ENV_MAX_EMBED_DEPTH) {
			match raw.trim().parse() {
				Ok(depth) => self.max_embedding_depth = depth,
				Err(e) => warn!(var = ENV_MAX_EMBED_DEPTH, value = %raw, error = %e, "ignoring invalid override"),
			}
		}

		if let Some(raw) = lookup(ENV_STRICT) {
			match raw.trim().to_ascii_lowercase().as_str() {
				"1" | "true" | "yes" | "on" => {
					self.duplicate_names = DuplicatePolicy::Reject;
					self.missing_embedded = MissingEmbedded::Fail;
				}
				"0" | "false" | "no" | "off" | "" => {}
				_ => warn!(var = ENV_STRICT, value = %raw, "ignoring invalid override"),
			}
		}

		self
	}
}
