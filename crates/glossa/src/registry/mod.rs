//! Grammar registry.
//!
//! Owns the grammar index and the set of grammars already handed to the engine.
//! Registering a grammar first registers every grammar it embeds, so the engine
//! never sees an embedded scope it cannot resolve.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{self, CatalogError, CatalogReport, parse_catalog};
use crate::descriptor::Descriptor;
use crate::engine::{EngineBinding, EngineError};
use crate::index::GrammarIndex;
use crate::options::{MissingEmbedded, RegistryOptions};

mod report;

pub use report::{Registration, SkipReason, SkippedEmbedding};

/// Errors returned when the requested grammar itself could not be registered.
///
/// Problems with embedded grammars do not surface here; they are recorded in
/// [`Registration::skipped`].
#[derive(Debug, Error)]
pub enum RegisterError {
	#[error("failed to register grammar `{name}`: {source}")]
	Engine {
		name: String,
		#[source]
		source: EngineError,
	},

	#[error("grammar `{host}` embeds `{target}` under `{key}`, which is not in the catalog")]
	MissingEmbedded { host: String, key: String, target: String },
}

/// Result type for registration.
pub type Result<T> = std::result::Result<T, RegisterError>;

/// Catalog-backed grammar registry.
///
/// Constructed once by the application and shared by reference (typically in an
/// `Arc`) with every consumer.
///
/// # Concurrency
///
/// - `index`: published once by [`initialize`](Self::initialize) and read without locks.
/// - `init_gate`: serializes first initialization so exactly one caller parses.
/// - `registered`: names that completed registration; only ever grows.
/// - `slots`: one mutex per grammar name. A registration locks every name
///   reachable from its root, in sorted order, before touching the engine.
///   Registrations that share a dependency serialize on it; disjoint ones
///   run in parallel.
pub struct GrammarRegistry {
	options: RegistryOptions,
	binding: Arc<dyn EngineBinding>,
	init_gate: Mutex<()>,
	index: OnceLock<GrammarIndex>,
	registered: RwLock<HashSet<String>>,
	slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl GrammarRegistry {
	/// Creates an empty registry with default options.
	pub fn new(binding: Arc<dyn EngineBinding>) -> Self {
		Self::with_options(binding, RegistryOptions::default())
	}

	pub fn with_options(binding: Arc<dyn EngineBinding>, options: RegistryOptions) -> Self {
		Self {
			options,
			binding,
			init_gate: Mutex::new(()),
			index: OnceLock::new(),
			registered: RwLock::new(HashSet::new()),
			slots: Mutex::new(HashMap::new()),
		}
	}

	pub fn options(&self) -> &RegistryOptions {
		&self.options
	}

	/// Loads the catalog and builds the index.
	///
	/// Only the first successful call parses; later calls return a report with
	/// `already_loaded` set. Concurrent first callers wait for the winner. A
	/// top-level parse failure leaves the registry unloaded so a later call can
	/// try again.
	pub fn initialize(&self, source: impl AsRef<[u8]>) -> std::result::Result<CatalogReport, CatalogError> {
		if let Some(index) = self.index.get() {
			return Ok(already_loaded(index));
		}

		let _gate = self.init_gate.lock();
		if let Some(index) = self.index.get() {
			return Ok(already_loaded(index));
		}

		let catalog = parse_catalog(source.as_ref(), self.options.duplicate_names).inspect_err(|e| {
			warn!(error = %e, "grammar catalog failed to load");
		})?;
		self.publish(catalog)
	}

	/// Reads a catalog file, then behaves like [`initialize`](Self::initialize).
	pub fn initialize_from_path(&self, path: &Path) -> std::result::Result<CatalogReport, CatalogError> {
		if let Some(index) = self.index.get() {
			return Ok(already_loaded(index));
		}

		let _gate = self.init_gate.lock();
		if let Some(index) = self.index.get() {
			return Ok(already_loaded(index));
		}

		let catalog = catalog::load_catalog_from_path(path, self.options.duplicate_names).inspect_err(|e| {
			warn!(path = %path.display(), error = %e, "grammar catalog failed to load");
		})?;
		self.publish(catalog)
	}

	fn publish(&self, catalog: catalog::Catalog) -> std::result::Result<CatalogReport, CatalogError> {
		let (descriptors, warnings) = catalog.into_parts();
		let index = GrammarIndex::build(descriptors, self.options.fold_extension_case);
		let loaded = index.len();
		// The init gate is held, so the cell is still empty.
		let _ = self.index.set(index);

		info!(grammars = loaded, warnings = warnings.len(), "grammar catalog loaded");
		Ok(CatalogReport {
			loaded,
			warnings,
			already_loaded: false,
		})
	}

	pub fn is_initialized(&self) -> bool {
		self.index.get().is_some()
	}

	/// The index, once a catalog has been loaded.
	pub fn index(&self) -> Option<&GrammarIndex> {
		self.index.get()
	}

	/// All descriptors in catalog order; empty before initialization.
	pub fn descriptors(&self) -> impl Iterator<Item = &Descriptor> {
		self.index.get().into_iter().flat_map(|index| index.descriptors())
	}

	pub fn descriptor_by_name(&self, name: &str) -> Option<&Descriptor> {
		self.index.get()?.by_name(name)
	}

	pub fn descriptor_for_extension(&self, ext: &str) -> Option<&Descriptor> {
		self.index.get()?.by_extension(ext)
	}

	pub fn descriptor_for_scope(&self, scope: &str) -> Option<&Descriptor> {
		self.index.get()?.by_scope(scope)
	}

	pub fn descriptor_for_path(&self, path: &Path) -> Option<&Descriptor> {
		self.index.get()?.by_path(path)
	}

	/// Whether `name` has completed registration.
	pub fn is_registered(&self, name: &str) -> bool {
		self.registered.read().contains(name)
	}

	/// Registered grammar names, sorted.
	pub fn registered_names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.registered.read().iter().cloned().collect();
		names.sort();
		names
	}

	/// Resolves the scope for an extension, registering its grammar first.
	///
	/// Returns `None` when no grammar claims the extension or the grammar failed
	/// to load; callers fall back to plain text.
	pub fn scope_for_extension(&self, ext: &str) -> Option<&str> {
		let descriptor = self.descriptor_for_extension(ext)?;
		match self.ensure_registered(descriptor) {
			Ok(_) => Some(descriptor.scope_name()),
			Err(e) => {
				warn!(extension = ext, error = %e, "grammar unavailable, falling back to plain text");
				None
			}
		}
	}

	/// Registers the grammar claiming `ext`. `Ok(None)` when nothing claims it.
	pub fn ensure_registered_for_extension(&self, ext: &str) -> Result<Option<Registration>> {
		let Some(descriptor) = self.descriptor_for_extension(ext) else {
			debug!(extension = ext, "no grammar for extension");
			return Ok(None);
		};
		self.ensure_registered(descriptor).map(Some)
	}

	/// Registers the grammar called `name`. `Ok(None)` when it is not in the catalog.
	pub fn ensure_registered_by_name(&self, name: &str) -> Result<Option<Registration>> {
		let Some(descriptor) = self.descriptor_by_name(name) else {
			debug!(grammar = name, "no grammar with this name");
			return Ok(None);
		};
		self.ensure_registered(descriptor).map(Some)
	}

	/// Registers the grammar owning `scope`. `Ok(None)` when no grammar owns it.
	pub fn ensure_registered_for_scope(&self, scope: &str) -> Result<Option<Registration>> {
		let Some(descriptor) = self.descriptor_for_scope(scope) else {
			debug!(scope, "no grammar for scope");
			return Ok(None);
		};
		self.ensure_registered(descriptor).map(Some)
	}

	/// Registers `descriptor` and, before it, every grammar it embeds.
	///
	/// Returns immediately when the grammar is already registered. Embedded
	/// grammars that are missing, cyclic, too deep, or fail to load are skipped
	/// and listed in the returned [`Registration`]. An error means the requested
	/// grammar itself was not registered; a later call will try again.
	pub fn ensure_registered(&self, descriptor: &Descriptor) -> Result<Registration> {
		let mut registration = Registration::new(descriptor.name());
		if self.is_registered(descriptor.name()) {
			return Ok(registration);
		}

		let slots = self.slots_for(&self.dependency_closure(descriptor));
		let _held: Vec<_> = slots.iter().map(|slot| slot.lock()).collect();

		let mut walk = Walk::default();
		self.register_locked(descriptor, 0, &mut walk, &mut registration)?;
		Ok(registration)
	}

	/// Names reachable from `root` through embeddings, including `root`.
	fn dependency_closure(&self, root: &Descriptor) -> BTreeSet<String> {
		let mut closure = BTreeSet::from([root.name().to_string()]);
		let Some(index) = self.index.get() else {
			return closure;
		};

		let mut stack = vec![root];
		while let Some(descriptor) = stack.pop() {
			for target in descriptor.embedded_languages().values() {
				if let Some(embedded) = index.by_name(target)
					&& closure.insert(embedded.name().to_string())
				{
					stack.push(embedded);
				}
			}
		}
		closure
	}

	/// Slot mutexes for `names`, in the set's sorted order.
	fn slots_for(&self, names: &BTreeSet<String>) -> Vec<Arc<Mutex<()>>> {
		let mut slots = self.slots.lock();
		names.iter().map(|name| slots.entry(name.clone()).or_default().clone()).collect()
	}

	/// Registration body. Callers hold the slots of every name reachable from
	/// `descriptor`.
	fn register_locked(
		&self,
		descriptor: &Descriptor,
		depth: usize,
		walk: &mut Walk,
		registration: &mut Registration,
	) -> Result<()> {
		let name = descriptor.name();
		if self.is_registered(name) {
			return Ok(());
		}

		walk.visiting.insert(name.to_string());
		let result = self
			.register_embedded(descriptor, depth, walk, registration)
			.and_then(|embedded_scopes| self.load(descriptor, &embedded_scopes, registration));
		walk.visiting.remove(name);

		if let Err(e) = &result {
			walk.failed.insert(name.to_string(), e.to_string());
		}
		result
	}

	/// Registers the grammars `descriptor` embeds and returns its embedding key
	/// to scope map. Embeddings that cannot be resolved are left out of the map.
	fn register_embedded(
		&self,
		descriptor: &Descriptor,
		depth: usize,
		walk: &mut Walk,
		registration: &mut Registration,
	) -> Result<IndexMap<String, String>> {
		let host = descriptor.name();
		let mut scopes = IndexMap::with_capacity(descriptor.embedded_languages().len());

		for (key, target) in descriptor.embedded_languages() {
			let Some(embedded) = self.descriptor_by_name(target) else {
				if self.options.missing_embedded == MissingEmbedded::Fail {
					return Err(RegisterError::MissingEmbedded {
						host: host.to_string(),
						key: key.clone(),
						target: target.clone(),
					});
				}
				warn!(grammar = host, key = %key, embedded = %target, "embedded language not in catalog, skipping");
				registration.skip(host, key, target, SkipReason::Missing);
				continue;
			};

			scopes.insert(key.clone(), embedded.scope_name().to_string());

			if self.is_registered(target) {
				continue;
			}
			if let Some(reason) = walk.failed.get(target.as_str()) {
				debug!(grammar = host, embedded = %target, "embedded grammar already failed in this registration");
				registration.skip(host, key, target, SkipReason::Failed(reason.clone()));
				continue;
			}
			if walk.visiting.contains(target.as_str()) {
				debug!(grammar = host, embedded = %target, "cyclic embedding, deferring to scope reference");
				registration.skip(host, key, target, SkipReason::Cycle);
				continue;
			}
			if depth >= self.options.max_embedding_depth {
				warn!(
					grammar = host,
					embedded = %target,
					max_depth = self.options.max_embedding_depth,
					"embedding depth limit reached, skipping"
				);
				registration.skip(host, key, target, SkipReason::DepthExceeded);
				continue;
			}

			if let Err(e) = self.register_locked(embedded, depth + 1, walk, registration) {
				warn!(grammar = host, embedded = %target, error = %e, "embedded grammar failed, continuing without it");
				registration.skip(host, key, target, SkipReason::Failed(e.to_string()));
			}
		}

		Ok(scopes)
	}

	fn load(&self, descriptor: &Descriptor, embedded_scopes: &IndexMap<String, String>, registration: &mut Registration) -> Result<()> {
		let name = descriptor.name();

		if self.binding.contains(name) {
			debug!(grammar = name, "engine already holds grammar");
			self.registered.write().insert(name.to_string());
			return Ok(());
		}

		match self.binding.load(descriptor, embedded_scopes) {
			Ok(()) => {
				self.registered.write().insert(name.to_string());
				registration.loaded.push(name.to_string());
				debug!(grammar = name, scope = descriptor.scope_name(), "grammar registered");
				Ok(())
			}
			Err(source) => {
				warn!(grammar = name, error = %source, "grammar registration failed");
				Err(RegisterError::Engine {
					name: name.to_string(),
					source,
				})
			}
		}
	}
}

/// State of one `ensure_registered` call.
///
/// Failures are remembered only for the call, so a later call retries them.
#[derive(Default)]
struct Walk {
	/// Grammars on the current embedding chain.
	visiting: HashSet<String>,
	/// Grammars that failed during this call, with the error text.
	failed: HashMap<String, String>,
}

fn already_loaded(index: &GrammarIndex) -> CatalogReport {
	CatalogReport {
		loaded: index.len(),
		warnings: Vec::new(),
		already_loaded: true,
	}
}
