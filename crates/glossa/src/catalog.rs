//! Catalog loading.
//!
//! A catalog is a JSON document listing grammar descriptors, either as a bare
//! array or as an object with a `languages` array. Loading is forgiving at the
//! record level: a malformed record or a reused name produces a
//! [`CatalogWarning`] and the rest of the catalog still loads. Only a document
//! that cannot be read as a sequence of records fails the load.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::descriptor::{Descriptor, DescriptorRecord};
use crate::options::DuplicatePolicy;

/// Errors that abort a catalog load.
#[derive(Debug, Error)]
pub enum CatalogError {
	#[error("failed to read catalog {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse catalog: {0}")]
	Parse(#[from] serde_json::Error),

	#[error("unsupported catalog shape: {0}")]
	Shape(&'static str),

	#[error("duplicate grammar name `{name}` at record {index}")]
	DuplicateName { name: String, index: usize },
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Record-level problems that were skipped during a load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogWarning {
	#[error("record {index} skipped: {reason}")]
	InvalidRecord { index: usize, reason: String },

	#[error("record {index} reuses grammar name `{name}`; keeping the first definition")]
	DuplicateName { index: usize, name: String },
}

/// Outcome of a successful [`GrammarRegistry::initialize`](crate::GrammarRegistry::initialize).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogReport {
	/// Number of descriptors in the index.
	pub loaded: usize,
	/// Problems skipped while parsing; empty when the catalog was already loaded.
	pub warnings: Vec<CatalogWarning>,
	/// The catalog had been loaded by an earlier call and was not parsed again.
	pub already_loaded: bool,
}

/// Parsed catalog: validated descriptors in catalog order plus skipped problems.
#[derive(Debug, Default)]
pub struct Catalog {
	descriptors: Vec<Descriptor>,
	warnings: Vec<CatalogWarning>,
}

impl Catalog {
	pub fn descriptors(&self) -> &[Descriptor] {
		&self.descriptors
	}

	pub fn warnings(&self) -> &[CatalogWarning] {
		&self.warnings
	}

	pub fn len(&self) -> usize {
		self.descriptors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.descriptors.is_empty()
	}

	pub fn into_parts(self) -> (Vec<Descriptor>, Vec<CatalogWarning>) {
		(self.descriptors, self.warnings)
	}
}

/// Parses a catalog blob.
pub fn parse_catalog(input: &[u8], duplicates: DuplicatePolicy) -> Result<Catalog> {
	let records = match serde_json::from_slice::<Value>(input)? {
		Value::Array(items) => items,
		Value::Object(mut map) => match map.remove("languages") {
			Some(Value::Array(items)) => items,
			Some(_) => return Err(CatalogError::Shape("`languages` must be an array")),
			None => return Err(CatalogError::Shape("expected an array of descriptors or a `languages` array")),
		},
		_ => return Err(CatalogError::Shape("expected an array of descriptors or a `languages` array")),
	};

	let mut catalog = Catalog::default();
	let mut names: HashSet<String> = HashSet::new();

	for (index, item) in records.into_iter().enumerate() {
		let descriptor = match decode_record(item) {
			Ok(descriptor) => descriptor,
			Err(reason) => {
				warn!(record = index, %reason, "skipping invalid grammar record");
				catalog.warnings.push(CatalogWarning::InvalidRecord { index, reason });
				continue;
			}
		};

		if names.contains(descriptor.name()) {
			let name = descriptor.name().to_string();
			match duplicates {
				DuplicatePolicy::Reject => return Err(CatalogError::DuplicateName { name, index }),
				DuplicatePolicy::KeepFirst => {
					warn!(record = index, grammar = %name, "duplicate grammar name, keeping first definition");
					catalog.warnings.push(CatalogWarning::DuplicateName { index, name });
					continue;
				}
			}
		}

		names.insert(descriptor.name().to_string());
		catalog.descriptors.push(descriptor);
	}

	Ok(catalog)
}

/// Reads and parses a catalog file.
pub fn load_catalog_from_path(path: &Path, duplicates: DuplicatePolicy) -> Result<Catalog> {
	let bytes = std::fs::read(path).map_err(|source| CatalogError::Io {
		path: path.to_path_buf(),
		source,
	})?;
	parse_catalog(&bytes, duplicates)
}

fn decode_record(item: Value) -> std::result::Result<Descriptor, String> {
	let record: DescriptorRecord = serde_json::from_value(item).map_err(|e| e.to_string())?;
	Descriptor::try_from(record).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	use super::*;

	const TWO_LANGUAGES: &str = r#"[
		{"name": "JavaScript", "scopeName": "source.js", "fileExtensions": [".js"], "grammar": "js.json"},
		{"name": "HTML", "scopeName": "text.html", "fileExtensions": [".html"], "grammar": "html.json",
		 "embeddedLanguages": {"source.js": "JavaScript"}}
	]"#;

	fn names(catalog: &Catalog) -> Vec<&str> {
		catalog.descriptors().iter().map(Descriptor::name).collect()
	}

	#[test]
	fn test_array_catalog() {
		let catalog = parse_catalog(TWO_LANGUAGES.as_bytes(), DuplicatePolicy::KeepFirst).unwrap();
		assert_eq!(names(&catalog), vec!["JavaScript", "HTML"]);
		assert!(catalog.warnings().is_empty());
	}

	#[test]
	fn test_languages_object_catalog() {
		let input = format!(r#"{{"languages": {TWO_LANGUAGES}}}"#);
		let catalog = parse_catalog(input.as_bytes(), DuplicatePolicy::KeepFirst).unwrap();
		assert_eq!(catalog.len(), 2);
	}

	#[test]
	fn test_bad_record_skipped() {
		let input = r#"[
			{"name": "JavaScript", "scopeName": "source.js", "grammar": "js.json"},
			{"name": 42, "scopeName": "source.broken", "grammar": "broken.json"},
			{"scopeName": "source.anon", "grammar": "anon.json"},
			"not a record",
			{"name": "CSS", "scopeName": "source.css", "grammar": "css.json"}
		]"#;
		let catalog = parse_catalog(input.as_bytes(), DuplicatePolicy::KeepFirst).unwrap();

		assert_eq!(names(&catalog), vec!["JavaScript", "CSS"]);
		let skipped: Vec<usize> = catalog
			.warnings()
			.iter()
			.map(|w| match w {
				CatalogWarning::InvalidRecord { index, .. } => *index,
				CatalogWarning::DuplicateName { index, .. } => panic!("unexpected duplicate at {index}"),
			})
			.collect();
		assert_eq!(skipped, vec![1, 2, 3]);
	}

	#[test]
	fn test_duplicate_keeps_first() {
		let input = r#"[
			{"name": "HTML", "scopeName": "text.html.basic", "grammar": "html.json"},
			{"name": "HTML", "scopeName": "text.html.derivative", "grammar": "html2.json"}
		]"#;
		let catalog = parse_catalog(input.as_bytes(), DuplicatePolicy::KeepFirst).unwrap();

		assert_eq!(catalog.len(), 1);
		assert_eq!(catalog.descriptors()[0].scope_name(), "text.html.basic");
		assert_eq!(catalog.warnings(), [CatalogWarning::DuplicateName {
			index: 1,
			name: "HTML".to_string()
		}]);
	}

	#[test]
	fn test_duplicate_rejected_under_strict_policy() {
		let input = r#"[
			{"name": "HTML", "scopeName": "text.html.basic", "grammar": "html.json"},
			{"name": "HTML", "scopeName": "text.html.derivative", "grammar": "html2.json"}
		]"#;
		let err = parse_catalog(input.as_bytes(), DuplicatePolicy::Reject).unwrap_err();
		assert!(matches!(err, CatalogError::DuplicateName { ref name, index: 1 } if name == "HTML"));
	}

	#[rstest]
	#[case::garbage("{not json")]
	#[case::empty("   ")]
	#[case::scalar("42")]
	#[case::object_without_languages(r#"{"grammars": []}"#)]
	#[case::languages_not_array(r#"{"languages": {"name": "HTML"}}"#)]
	fn test_unparseable_catalog(#[case] input: &str) {
		assert!(parse_catalog(input.as_bytes(), DuplicatePolicy::KeepFirst).is_err());
	}

	#[test]
	fn test_empty_array_is_valid() {
		let catalog = parse_catalog(b"[]", DuplicatePolicy::KeepFirst).unwrap();
		assert!(catalog.is_empty());
	}

	#[test]
	fn test_load_from_missing_path() {
		let err = load_catalog_from_path(Path::new("/nonexistent/grammars.json"), DuplicatePolicy::KeepFirst).unwrap_err();
		assert!(matches!(err, CatalogError::Io { .. }));
	}
}
