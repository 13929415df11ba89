use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;

use log::debug;

use super::design_error::ConflictingSignatureError;
use super::parameter::ParameterMap;
use super::signature::PortSignature;
use super::{DesignError, ExtModuleId};

/// Determines which instances share an external module record
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct IdentityKey {
	/// Declared (desired) external module name
	pub name: String,

	/// Parameter values
	pub parameters: ParameterMap,
}

impl IdentityKey {
	pub fn new(name: &str, parameters: ParameterMap) -> Self {
		Self {
			name: name.into(),
			parameters,
		}
	}
}

impl fmt::Display for IdentityKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "(\"{}\", {{", self.name)?;
		for (index, (name, value)) in self.parameters.iter().enumerate() {
			if index > 0 {
				write!(f, ", ")?;
			}
			write!(f, "{}: {}", name, value)?;
		}
		write!(f, "}})")
	}
}

/// Canonical description of one external module.
/// Immutable once created; owned by the registry for the whole run.
#[derive(Clone, Debug)]
pub struct ExtModuleRecord {
	id: ExtModuleId,
	key: IdentityKey,
	emitted_name: String,
	ports: PortSignature,
}

impl ExtModuleRecord {
	pub fn id(&self) -> ExtModuleId {
		self.id
	}

	pub fn key(&self) -> &IdentityKey {
		&self.key
	}

	/// Name of the external implementation
	pub fn declared_name(&self) -> &str {
		&self.key.name
	}

	/// Design-unique name of this record
	pub fn emitted_name(&self) -> &str {
		&self.emitted_name
	}

	pub fn parameters(&self) -> &ParameterMap {
		&self.key.parameters
	}

	/// Encoded parameter values, sorted by parameter name
	pub fn encoded_parameters(&self) -> Vec<(String, String)> {
		self.key
			.parameters
			.iter()
			.map(|(name, value)| (name.clone(), value.encode()))
			.collect()
	}

	pub fn ports(&self) -> &PortSignature {
		&self.ports
	}
}

/// Deduplicates external modules by identity key
#[derive(Default)]
pub(super) struct ModuleRegistry {
	records: Vec<ExtModuleRecord>,
	index: HashMap<IdentityKey, ExtModuleId>,
	used_names: HashSet<String>,
	name_counters: HashMap<String, usize>,
}

impl ModuleRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the record matching the key, creating it if necessary.
	///
	/// An existing record is only reused if its signature is identical to
	/// the presented one.
	pub fn register(&mut self, key: IdentityKey, signature: PortSignature) -> Result<ExtModuleId, DesignError> {
		match self.index.entry(key) {
			Entry::Occupied(entry) => {
				let id = *entry.get();
				let record = &self.records[id.id - 1];

				if record.ports != signature {
					return Err(ConflictingSignatureError {
						key: entry.key().clone(),
						registered: record.ports.clone(),
						requested: signature,
					}
					.into());
				}

				debug!("Reusing external module '{}' for {}", record.emitted_name, entry.key());
				Ok(id)
			},
			Entry::Vacant(entry) => {
				let id = ExtModuleId {
					id: self.records.len() + 1,
				};
				let emitted_name = unique_name(&mut self.used_names, &mut self.name_counters, &entry.key().name);
				debug!(
					"New external module '{}' for {} with ports {}",
					emitted_name,
					entry.key(),
					signature
				);

				self.records.push(ExtModuleRecord {
					id,
					key: entry.key().clone(),
					emitted_name,
					ports: signature,
				});
				entry.insert(id);
				Ok(id)
			},
		}
	}

	pub fn lookup(&self, key: &IdentityKey) -> Option<ExtModuleId> {
		self.index.get(key).copied()
	}

	pub fn get(&self, id: ExtModuleId) -> Option<&ExtModuleRecord> {
		self.records.get(id.id.checked_sub(1)?)
	}

	pub fn records(&self) -> &[ExtModuleRecord] {
		&self.records
	}
}

/// Picks `name`, or `name_N` with the lowest free N
fn unique_name(used: &mut HashSet<String>, counters: &mut HashMap<String, usize>, name: &str) -> String {
	let counter = counters.entry(name.into()).or_insert(0);
	let mut candidate = name.to_string();
	while used.contains(&candidate) {
		*counter += 1;
		candidate = format!("{}_{}", name, counter);
	}
	used.insert(candidate.clone());
	candidate
}
