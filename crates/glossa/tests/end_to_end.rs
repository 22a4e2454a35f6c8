#![allow(unused_crate_dependencies)]

use std::fs;
use std::sync::Arc;

use glossa::engine::{FIRST_GRAMMAR_ID, GrammarId};
use glossa::{FsFileProvider, GrammarRegistry, MemoryEngine, MemoryFileProvider, RegisterError, SkipReason, TokenizerBinding};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const CATALOG: &str = r#"[
	{
		"name": "JavaScript",
		"scopeName": "source.js",
		"fileExtensions": [".js"],
		"grammar": "js.json",
		"languageConfiguration": "js-config.json"
	},
	{
		"name": "HTML",
		"scopeName": "text.html",
		"fileExtensions": [".html"],
		"grammar": "html.json",
		"embeddedLanguages": { "source.js": "JavaScript" }
	},
	{
		"name": "Python",
		"scopeName": "source.python",
		"fileExtensions": [".py"],
		"grammar": "python.json"
	}
]"#;

fn files() -> MemoryFileProvider {
	MemoryFileProvider::new()
		.with_file("js.json", r#"{"scopeName": "source.js", "patterns": []}"#)
		.with_file("js-config.json", r#"{"comments": {"lineComment": "//"}}"#)
		.with_file("html.json", r#"{"scopeName": "text.html", "patterns": []}"#)
		.with_file("python.json", r#"{"scopeName": "source.py", "patterns": []}"#)
}

fn registry() -> (Arc<MemoryEngine>, GrammarRegistry) {
	let engine = Arc::new(MemoryEngine::new());
	let binding = TokenizerBinding::new(engine.clone(), files());
	let registry = GrammarRegistry::new(Arc::new(binding));
	let report = registry.initialize(CATALOG).unwrap();
	assert_eq!(report.loaded, 3);
	assert!(report.warnings.is_empty());
	(engine, registry)
}

#[test]
fn test_html_registers_javascript_first() {
	let (engine, registry) = registry();

	assert_eq!(registry.scope_for_extension(".html"), Some("text.html"));
	assert_eq!(engine.load_order(), vec!["JavaScript".to_string(), "HTML".to_string()]);

	let js_id = GrammarId(FIRST_GRAMMAR_ID);
	assert_eq!(engine.grammar_id("source.js"), Some(js_id));
	assert_eq!(engine.grammar("HTML").unwrap().embedded["source.js"], js_id);
	assert_eq!(engine.language_configuration("source.js").unwrap()["comments"]["lineComment"], "//");

	let again = registry.ensure_registered_for_extension(".html").unwrap().unwrap();
	assert!(again.is_noop());
	assert!(again.skipped.is_empty());
	assert_eq!(engine.load_order(), vec!["JavaScript".to_string(), "HTML".to_string()]);

	assert!(registry.ensure_registered_for_extension(".js").unwrap().unwrap().is_noop());
	assert_eq!(engine.len(), 2);
}

#[test]
fn test_scope_mismatch_falls_back_to_plain_text() {
	let (engine, registry) = registry();

	assert_eq!(registry.scope_for_extension(".py"), None);
	assert!(!registry.is_registered("Python"));

	let err = registry.ensure_registered_by_name("Python").unwrap_err();
	assert!(matches!(err, RegisterError::Engine { ref name, .. } if name == "Python"));
	assert!(engine.grammar_for_scope("source.python").is_none());
}

#[test]
fn test_missing_dependency_file_keeps_host() {
	let engine = Arc::new(MemoryEngine::new());
	let files = files();
	files.remove("js.json");
	let registry = GrammarRegistry::new(Arc::new(TokenizerBinding::new(engine.clone(), files)));
	registry.initialize(CATALOG).unwrap();

	let registration = registry.ensure_registered_for_scope("text.html").unwrap().unwrap();
	assert_eq!(registration.loaded, vec!["HTML".to_string()]);
	assert!(matches!(registration.skipped[0].reason, SkipReason::Failed(_)));
	// The embedding still points at the JavaScript scope for later resolution.
	assert_eq!(engine.grammar("HTML").unwrap().embedded.len(), 1);
}

#[test]
fn test_catalog_and_grammars_on_disk() {
	let dir = TempDir::new().unwrap();
	let syntaxes = dir.path().join("syntaxes");
	fs::create_dir_all(&syntaxes).unwrap();
	fs::write(syntaxes.join("js.json"), r#"{"scopeName": "source.js"}"#).unwrap();
	fs::write(syntaxes.join("html.json"), r#"{"scopeName": "text.html"}"#).unwrap();
	let catalog = dir.path().join("grammars.json");
	fs::write(
		&catalog,
		r#"{"languages": [
			{"name": "JavaScript", "scopeName": "source.js", "grammarSource": "syntaxes/js.json", "fileExtensions": [".js"]},
			{"name": "HTML", "scopeName": "text.html", "grammarSource": "syntaxes/html.json", "fileExtensions": [".HTML"],
			 "embeddedLanguages": {"source.js": "JavaScript"}}
		]}"#,
	)
	.unwrap();

	let engine = Arc::new(MemoryEngine::new());
	let provider = FsFileProvider::new(vec![dir.path().to_path_buf()]);
	let registry = GrammarRegistry::new(Arc::new(TokenizerBinding::new(engine.clone(), provider)));
	registry.initialize_from_path(&catalog).unwrap();

	assert_eq!(registry.scope_for_extension("html"), Some("text.html"));
	assert_eq!(registry.registered_names(), vec!["HTML".to_string(), "JavaScript".to_string()]);
	assert!(registry.initialize_from_path(&catalog).unwrap().already_loaded);
}
