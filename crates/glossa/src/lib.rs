// Registry operations report through tracing, never stderr
#![deny(clippy::print_stderr)]

//! Syntax grammar registry
//!
//! Loads a catalog of grammar descriptors once, answers lookups by file
//! extension, grammar name, and scope name, and registers grammars with a
//! tokenizer engine on demand. Registering a grammar first registers every
//! grammar it embeds, guarding against cycles and runaway nesting.
//!
//! # Architecture
//!
//! * [`descriptor`]: Grammar descriptors and their catalog records
//! * [`catalog`]: Catalog parsing with per-record recovery
//! * [`index`]: Lookup maps by extension, name, and scope
//! * [`options`]: Registry policies, overridable from the environment
//! * [`engine`]: Engine binding, file providers, and an in-memory engine
//! * [`GrammarRegistry`]: Initialization, lookups, and dependency-ordered registration
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use glossa::{GrammarRegistry, MemoryEngine, MemoryFileProvider, TokenizerBinding};
//!
//! let files = MemoryFileProvider::new().with_file("js.json", r#"{"scopeName": "source.js"}"#);
//! let binding = TokenizerBinding::new(MemoryEngine::new(), files);
//! let registry = GrammarRegistry::new(Arc::new(binding));
//!
//! registry
//! 	.initialize(r#"[{"name": "JavaScript", "scopeName": "source.js", "grammar": "js.json", "fileExtensions": [".js"]}]"#)
//! 	.unwrap();
//! assert_eq!(registry.scope_for_extension(".js"), Some("source.js"));
//! ```

pub mod catalog;
pub mod descriptor;
pub mod engine;
pub mod index;
pub mod options;
mod registry;

pub use catalog::{CatalogError, CatalogReport, CatalogWarning};
pub use descriptor::{Descriptor, DescriptorError, DescriptorRecord};
pub use engine::{EngineBinding, EngineError, FileProvider, FsFileProvider, MemoryEngine, MemoryFileProvider, TokenizerBinding, TokenizerEngine};
pub use index::{DescriptorId, GrammarIndex};
pub use options::{DuplicatePolicy, MissingEmbedded, RegistryOptions};
pub use registry::{GrammarRegistry, RegisterError, Registration, SkipReason, SkippedEmbedding};
