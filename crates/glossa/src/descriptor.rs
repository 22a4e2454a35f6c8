//! Grammar descriptors.
//!
//! A [`DescriptorRecord`] mirrors one raw catalog entry exactly as serde decodes
//! it. Records are validated once into a [`Descriptor`], which the index and the
//! registration path treat as an immutable value and never re-check.

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

/// Reasons a catalog record cannot become a [`Descriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
	#[error("missing or empty field `{0}`")]
	MissingField(&'static str),

	#[error("embedded language key must not be empty")]
	EmptyEmbeddingKey,

	#[error("embedded language `{key}` references an empty name")]
	EmptyEmbeddedName { key: String },
}

/// One catalog entry as it appears in the configuration blob.
///
/// Required fields default to empty strings so that a missing field is reported
/// by validation with its name rather than as a generic decode error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorRecord {
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub scope_name: String,
	#[serde(default)]
	pub file_extensions: Option<Vec<String>>,
	/// Grammar rule file reference. Catalogs spell this `grammar` or `grammarSource`.
	#[serde(default, alias = "grammarSource")]
	pub grammar: String,
	#[serde(default)]
	pub language_configuration: Option<String>,
	#[serde(default)]
	pub embedded_languages: Option<IndexMap<String, String>>,
}

/// A validated, registrable language grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
	name: String,
	scope_name: String,
	file_extensions: Vec<String>,
	grammar_source: String,
	language_configuration: Option<String>,
	embedded_languages: IndexMap<String, String>,
}

impl Descriptor {
	/// Creates a descriptor with no extensions, configuration, or embeddings.
	pub fn new(name: impl Into<String>, scope_name: impl Into<String>, grammar_source: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			scope_name: scope_name.into(),
			file_extensions: Vec::new(),
			grammar_source: grammar_source.into(),
			language_configuration: None,
			embedded_languages: IndexMap::new(),
		}
	}

	/// Adds file extensions; entries are normalized to a leading `.`.
	pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		for ext in extensions {
			if let Some(ext) = normalize_extension(ext.as_ref())
				&& !self.file_extensions.contains(&ext)
			{
				self.file_extensions.push(ext);
			}
		}
		self
	}

	pub fn with_language_configuration(mut self, reference: impl Into<String>) -> Self {
		self.language_configuration = Some(reference.into());
		self
	}

	/// Appends an embedding of language `name` under the scope `key`.
	pub fn with_embedded(mut self, key: impl Into<String>, name: impl Into<String>) -> Self {
		self.embedded_languages.insert(key.into(), name.into());
		self
	}

	/// Canonical language name, unique within a catalog.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Highlighting scope identifier (e.g. `source.js`).
	pub fn scope_name(&self) -> &str {
		&self.scope_name
	}

	/// File extensions, each with a leading `.`.
	pub fn file_extensions(&self) -> &[String] {
		&self.file_extensions
	}

	/// Opaque reference to the grammar rule file.
	pub fn grammar_source(&self) -> &str {
		&self.grammar_source
	}

	pub fn language_configuration(&self) -> Option<&str> {
		self.language_configuration.as_deref()
	}

	/// Embedding key (a scope used inside this grammar) to referenced language name,
	/// in catalog order.
	pub fn embedded_languages(&self) -> &IndexMap<String, String> {
		&self.embedded_languages
	}

	pub fn has_embedded_languages(&self) -> bool {
		!self.embedded_languages.is_empty()
	}
}

impl TryFrom<DescriptorRecord> for Descriptor {
	type Error = DescriptorError;

	fn try_from(record: DescriptorRecord) -> Result<Self, Self::Error> {
		let name = required(record.name, "name")?;
		let scope_name = required(record.scope_name, "scopeName")?;
		let grammar_source = required(record.grammar, "grammar")?;

		let mut embedded_languages = IndexMap::new();
		for (key, target) in record.embedded_languages.unwrap_or_default() {
			let key = key.trim();
			if key.is_empty() {
				return Err(DescriptorError::EmptyEmbeddingKey);
			}
			let target = target.trim();
			if target.is_empty() {
				return Err(DescriptorError::EmptyEmbeddedName { key: key.to_string() });
			}
			embedded_languages.entry(key.to_string()).or_insert_with(|| target.to_string());
		}

		let mut descriptor = Descriptor::new(name, scope_name, grammar_source).with_extensions(record.file_extensions.unwrap_or_default());
		descriptor.language_configuration = record.language_configuration.filter(|r| !r.trim().is_empty());
		descriptor.embedded_languages = embedded_languages;
		Ok(descriptor)
	}
}

fn required(value: String, field: &'static str) -> Result<String, DescriptorError> {
	let trimmed = value.trim();
	if trimmed.is_empty() {
		return Err(DescriptorError::MissingField(field));
	}
	if trimmed.len() == value.len() { Ok(value) } else { Ok(trimmed.to_string()) }
}

/// Normalizes an extension to the `.ext` form used as an index key.
///
/// Returns `None` for empty input or a lone dot.
pub fn normalize_extension(ext: &str) -> Option<String> {
	let ext = ext.trim();
	let bare = ext.strip_prefix('.').unwrap_or(ext);
	if bare.is_empty() {
		return None;
	}
	Some(format!(".{bare}"))
}
