//! File providers for grammar and language configuration references.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{ByteStream, FileProvider};

/// Extra grammar search roots, separated like `PATH`.
pub const ENV_GRAMMAR_PATH: &str = "GLOSSA_GRAMMAR_PATH";

/// Resolves references against the filesystem.
///
/// Absolute references are opened as-is. Relative references are tried against
/// each search root in order; the first existing file wins. With no roots,
/// relative references resolve against the working directory.
#[derive(Debug, Clone, Default)]
pub struct FsFileProvider {
	roots: Vec<PathBuf>,
}

impl FsFileProvider {
	pub fn new(roots: Vec<PathBuf>) -> Self {
		Self { roots }
	}

	/// Roots from [`ENV_GRAMMAR_PATH`] followed by `fallback`.
	pub fn from_env(fallback: impl IntoIterator<Item = PathBuf>) -> Self {
		let mut roots: Vec<PathBuf> = std::env::var_os(ENV_GRAMMAR_PATH)
			.map(|raw| std::env::split_paths(&raw).filter(|p| !p.as_os_str().is_empty()).collect())
			.unwrap_or_default();
		roots.extend(fallback);
		Self { roots }
	}

	pub fn add_root(&mut self, root: PathBuf) {
		self.roots.push(root);
	}

	pub fn roots(&self) -> &[PathBuf] {
		&self.roots
	}

	/// Returns the file a reference points at, if it exists.
	pub fn resolve(&self, reference: &str) -> Option<PathBuf> {
		let path = Path::new(reference.strip_prefix("file://").unwrap_or(reference));

		if path.is_absolute() || self.roots.is_empty() {
			return path.is_file().then(|| path.to_path_buf());
		}

		self.roots.iter().map(|root| root.join(path)).find(|candidate| candidate.is_file())
	}
}

impl FileProvider for FsFileProvider {
	fn open_stream(&self, reference: &str) -> io::Result<ByteStream> {
		let path = self.resolve(reference).ok_or_else(|| {
			io::Error::new(
				io::ErrorKind::NotFound,
				format!("`{reference}` not found in {} search root(s)", self.roots.len()),
			)
		})?;
		Ok(Box::new(File::open(path)?))
	}
}

/// Serves in-memory buffers by reference.
#[derive(Debug, Default)]
pub struct MemoryFileProvider {
	files: RwLock<HashMap<String, Arc<[u8]>>>,
}

impl MemoryFileProvider {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_file(self, reference: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
		self.insert(reference, contents);
		self
	}

	pub fn insert(&self, reference: impl Into<String>, contents: impl Into<Vec<u8>>) {
		self.files.write().insert(reference.into(), Arc::from(contents.into()));
	}

	pub fn remove(&self, reference: &str) -> bool {
		self.files.write().remove(reference).is_some()
	}
}

impl FileProvider for MemoryFileProvider {
	fn open_stream(&self, reference: &str) -> io::Result<ByteStream> {
		let contents = self
			.files
			.read()
			.get(reference)
			.cloned()
			.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("`{reference}` is not registered")))?;
		Ok(Box::new(Cursor::new(contents)))
	}
}
