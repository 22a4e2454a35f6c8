//! Read-only lookup maps over a loaded catalog.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::descriptor::{Descriptor, normalize_extension};

/// Position of a descriptor in its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorId(pub u32);

impl DescriptorId {
	#[inline]
	pub fn idx(self) -> usize {
		self.0 as usize
	}
}

/// Extension, name, and scope lookups over catalog descriptors.
///
/// Built once and never mutated. When two descriptors claim the same extension
/// or scope, the one earlier in the catalog wins.
#[derive(Debug, Default)]
pub struct GrammarIndex {
	descriptors: Vec<Descriptor>,
	by_extension: HashMap<String, DescriptorId>,
	by_name: HashMap<String, DescriptorId>,
	by_scope: HashMap<String, DescriptorId>,
	fold_case: bool,
}

impl GrammarIndex {
	/// Builds the index. With `fold_case`, extensions match case-insensitively.
	pub fn build(descriptors: Vec<Descriptor>, fold_case: bool) -> Self {
		let mut index = Self {
			descriptors: Vec::with_capacity(descriptors.len()),
			fold_case,
			..Self::default()
		};

		for descriptor in descriptors {
			let id = DescriptorId(index.descriptors.len() as u32);

			for ext in descriptor.file_extensions() {
				let key = index.extension_key(ext);
				if let Some(existing) = index.by_extension.get(&key).copied() {
					debug!(
						extension = %key,
						kept = index.descriptors[existing.idx()].name(),
						ignored = descriptor.name(),
						"extension already claimed"
					);
					continue;
				}
				index.by_extension.insert(key, id);
			}

			index.by_name.entry(descriptor.name().to_string()).or_insert(id);

			if let Some(existing) = index.by_scope.get(descriptor.scope_name()).copied() {
				debug!(
					scope = descriptor.scope_name(),
					kept = index.descriptors[existing.idx()].name(),
					ignored = descriptor.name(),
					"scope already claimed"
				);
			} else {
				index.by_scope.insert(descriptor.scope_name().to_string(), id);
			}

			index.descriptors.push(descriptor);
		}

		index
	}

	pub fn get(&self, id: DescriptorId) -> Option<&Descriptor> {
		self.descriptors.get(id.idx())
	}

	/// Finds a descriptor by file extension, with or without the leading dot.
	pub fn by_extension(&self, ext: &str) -> Option<&Descriptor> {
		let key = normalize_extension(ext)?;
		let key = if self.fold_case { key.to_lowercase() } else { key };
		self.by_extension.get(&key).and_then(|id| self.get(*id))
	}

	pub fn by_name(&self, name: &str) -> Option<&Descriptor> {
		self.by_name.get(name).and_then(|id| self.get(*id))
	}

	pub fn by_scope(&self, scope: &str) -> Option<&Descriptor> {
		self.by_scope.get(scope).and_then(|id| self.get(*id))
	}

	/// Finds a descriptor from a path's extension.
	pub fn by_path(&self, path: &Path) -> Option<&Descriptor> {
		path.extension().and_then(|ext| ext.to_str()).and_then(|ext| self.by_extension(ext))
	}

	/// All descriptors in catalog order.
	pub fn descriptors(&self) -> impl Iterator<Item = &Descriptor> {
		self.descriptors.iter()
	}

	pub fn len(&self) -> usize {
		self.descriptors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.descriptors.is_empty()
	}

	fn extension_key(&self, ext: &str) -> String {
		if self.fold_case { ext.to_lowercase() } else { ext.to_string() }
	}
}
