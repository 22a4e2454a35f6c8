//! Subcommand implementations. Each returns `Ok(false)` for a clean run that
//! should still exit non-zero.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use glossa::{
	Descriptor, DuplicatePolicy, FsFileProvider, GrammarRegistry, MemoryEngine, MissingEmbedded, RegistryOptions, TokenizerBinding,
};
use tracing::{debug, info};

use crate::cli::Target;

/// Options from `path` (or defaults), the `--strict` flag, then the environment.
pub fn load_options(path: Option<&Path>, strict: bool) -> anyhow::Result<RegistryOptions> {
	load_options_with(path, strict, |key| std::env::var(key).ok())
}

fn load_options_with(path: Option<&Path>, strict: bool, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<RegistryOptions> {
	let mut options = match path {
		Some(path) => {
			let bytes = fs::read(path).with_context(|| format!("failed to read options file {}", path.display()))?;
			serde_json::from_slice(&bytes).with_context(|| format!("invalid options file {}", path.display()))?
		}
		None => RegistryOptions::default(),
	};

	if strict {
		options.duplicate_names = DuplicatePolicy::Reject;
		options.missing_embedded = MissingEmbedded::Fail;
	}

	Ok(options.with_overrides(env))
}

/// Registry whose engine is never reached; enough for lookups.
fn lookup_registry(catalog: &Path, options: RegistryOptions) -> anyhow::Result<GrammarRegistry> {
	let binding = TokenizerBinding::new(MemoryEngine::new(), FsFileProvider::default());
	let registry = GrammarRegistry::with_options(Arc::new(binding), options);
	registry
		.initialize_from_path(catalog)
		.with_context(|| format!("failed to load catalog {}", catalog.display()))?;
	Ok(registry)
}

fn write_descriptor(out: &mut impl Write, descriptor: &Descriptor) -> anyhow::Result<()> {
	writeln!(
		out,
		"{}\t{}\t{}",
		descriptor.name(),
		descriptor.scope_name(),
		descriptor.file_extensions().join(",")
	)?;
	Ok(())
}

pub fn list(catalog: &Path, options: RegistryOptions, out: &mut impl Write) -> anyhow::Result<bool> {
	let registry = lookup_registry(catalog, options)?;
	for descriptor in registry.descriptors() {
		write_descriptor(out, descriptor)?;
	}
	Ok(true)
}

pub fn resolve(catalog: &Path, target: &Target, options: RegistryOptions, out: &mut impl Write) -> anyhow::Result<bool> {
	let registry = lookup_registry(catalog, options)?;

	let found = if let Some(ext) = &target.ext {
		registry.descriptor_for_extension(ext)
	} else if let Some(name) = &target.name {
		registry.descriptor_by_name(name)
	} else if let Some(scope) = &target.scope {
		registry.descriptor_for_scope(scope)
	} else {
		None
	};

	match found {
		Some(descriptor) => {
			write_descriptor(out, descriptor)?;
			Ok(true)
		}
		None => {
			debug!(?target, "no grammar matched");
			Ok(false)
		}
	}
}

pub fn check(catalog: &Path, roots: Vec<PathBuf>, options: RegistryOptions, out: &mut impl Write) -> anyhow::Result<bool> {
	let roots = if roots.is_empty() {
		let dir = catalog.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
		vec![dir.to_path_buf()]
	} else {
		roots
	};

	let engine = Arc::new(MemoryEngine::new());
	let binding = TokenizerBinding::new(engine.clone(), FsFileProvider::from_env(roots));
	let registry = GrammarRegistry::with_options(Arc::new(binding), options);

	let report = registry
		.initialize_from_path(catalog)
		.with_context(|| format!("failed to load catalog {}", catalog.display()))?;
	for warning in &report.warnings {
		writeln!(out, "warning: {warning}")?;
	}

	let mut failed = 0usize;
	for descriptor in registry.descriptors() {
		match registry.ensure_registered(descriptor) {
			Ok(registration) => {
				for skip in &registration.skipped {
					writeln!(out, "skipped: {} -> {} ({}): {}", skip.host, skip.target, skip.key, skip.reason)?;
				}
			}
			Err(e) => {
				failed += 1;
				writeln!(out, "failed: {e}")?;
			}
		}
	}

	info!(registered = engine.len(), failed, "catalog check finished");
	writeln!(out, "{} of {} grammars registered", engine.len(), report.loaded)?;
	Ok(failed == 0)
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use tempfile::TempDir;

	use super::*;

	const CATALOG: &str = r#"{
		"languages": [
			{
				"name": "HTML",
				"scopeName": "text.html.basic",
				"grammarSource": "syntaxes/html.json",
				"fileExtensions": [".html"],
				"embeddedLanguages": { "source.js": "JavaScript", "source.ts": "TypeScript" }
			},
			{
				"name": "JavaScript",
				"scopeName": "source.js",
				"grammarSource": "syntaxes/js.json",
				"fileExtensions": [".js", ".mjs"]
			}
		]
	}"#;

	fn workspace() -> (TempDir, PathBuf) {
		let dir = TempDir::new().unwrap();
		fs::create_dir_all(dir.path().join("syntaxes")).unwrap();
		fs::write(dir.path().join("syntaxes/html.json"), r#"{"scopeName": "text.html.basic"}"#).unwrap();
		fs::write(dir.path().join("syntaxes/js.json"), r#"{"scopeName": "source.js"}"#).unwrap();
		let catalog = dir.path().join("grammars.json");
		fs::write(&catalog, CATALOG).unwrap();
		(dir, catalog)
	}

	fn run(f: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<bool>) -> (bool, String) {
		let mut out = Vec::new();
		let ok = f(&mut out).unwrap();
		(ok, String::from_utf8(out).unwrap())
	}

	#[test]
	fn test_list() {
		let (_dir, catalog) = workspace();
		let (ok, out) = run(|out| list(&catalog, RegistryOptions::default(), out));
		assert!(ok);
		assert_eq!(out, "HTML\ttext.html.basic\t.html\nJavaScript\tsource.js\t.js,.mjs\n");
	}

	#[test]
	fn test_resolve() {
		let (_dir, catalog) = workspace();
		let target = Target {
			ext: Some("mjs".to_string()),
			name: None,
			scope: None,
		};
		let (ok, out) = run(|out| resolve(&catalog, &target, RegistryOptions::default(), out));
		assert!(ok);
		assert_eq!(out, "JavaScript\tsource.js\t.js,.mjs\n");

		let target = Target {
			ext: None,
			name: None,
			scope: Some("source.css".to_string()),
		};
		let (ok, out) = run(|out| resolve(&catalog, &target, RegistryOptions::default(), out));
		assert!(!ok);
		assert_eq!(out, "");
	}

	#[test]
	fn test_check_reports_skips() {
		let (_dir, catalog) = workspace();
		let (ok, out) = run(|out| check(&catalog, Vec::new(), RegistryOptions::default(), out));
		assert!(ok);
		assert_eq!(
			out,
			"skipped: HTML -> TypeScript (source.ts): not in catalog\n2 of 2 grammars registered\n"
		);
	}

	#[test]
	fn test_check_fails_when_strict() {
		let (_dir, catalog) = workspace();
		let (ok, out) = run(|out| check(&catalog, Vec::new(), RegistryOptions::strict(), out));
		assert!(!ok);
		assert!(out.starts_with("failed: grammar `HTML` embeds `TypeScript`"));
		assert!(out.ends_with("1 of 2 grammars registered\n"));
	}

	#[test]
	fn test_check_missing_grammar_file() {
		let (dir, catalog) = workspace();
		fs::remove_file(dir.path().join("syntaxes/js.json")).unwrap();
		let (ok, out) = run(|out| check(&catalog, Vec::new(), RegistryOptions::default(), out));
		assert!(!ok);
		assert!(out.contains("failed: failed to register grammar `JavaScript`"));
	}

	#[test]
	fn test_missing_catalog_is_an_error() {
		let mut out = Vec::new();
		let err = list(Path::new("/nonexistent/grammars.json"), RegistryOptions::default(), &mut out).unwrap_err();
		assert!(err.to_string().contains("failed to load catalog"));
	}

	fn no_env(_: &str) -> Option<String> {
		None
	}

	#[test]
	fn test_load_options_file_and_strict() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("options.json");
		fs::write(&path, r#"{"max_embedding_depth": 3}"#).unwrap();

		let options = load_options_with(Some(&path), true, no_env).unwrap();
		assert_eq!(options.max_embedding_depth, 3);
		assert_eq!(options.duplicate_names, DuplicatePolicy::Reject);
		assert_eq!(options.missing_embedded, MissingEmbedded::Fail);
		assert!(options.fold_extension_case);

		let options = load_options_with(Some(&path), false, no_env).unwrap();
		assert_eq!(options.max_embedding_depth, 3);
		assert_eq!(options.duplicate_names, DuplicatePolicy::KeepFirst);
	}

	#[test]
	fn test_load_options_env_overrides_file() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("options.json");
		fs::write(&path, r#"{"max_embedding_depth": 3}"#).unwrap();

		let env = |key: &str| (key == glossa::options::ENV_MAX_EMBED_DEPTH).then(|| "7".to_string());
		let options = load_options_with(Some(&path), false, env).unwrap();
		assert_eq!(options.max_embedding_depth, 7);
		assert_eq!(load_options_with(None, false, no_env).unwrap(), RegistryOptions::default());
	}

	#[test]
	fn test_load_options_rejects_bad_file() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("options.json");
		fs::write(&path, "{not json").unwrap();

		let err = load_options_with(Some(&path), false, no_env).unwrap_err();
		assert!(err.to_string().starts_with("invalid options file"));
	}
}
