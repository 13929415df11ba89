use std::rc::Weak;

use super::parameter::{ParameterMap, ParameterValue};
use super::port::PortBundle;
use super::registry::{ExtModuleRecord, IdentityKey};
use super::signature::PortSignature;
use super::utils::is_name_valid;
use super::{DesignError, ExtModuleId, WeakDesignHandle};

/// Declaration of an external module type.
///
/// The desired name defaults to the type name and is what takes part in the
/// identity key, so two declaration types overriding their desired name to
/// the same value share records.
#[derive(Clone, Debug)]
pub struct ExtModuleDecl {
	type_name: String,
	desired_name: String,
	parameters: Vec<(String, ParameterValue)>,
	bundles: Vec<PortBundle>,
}

impl ExtModuleDecl {
	pub fn new(type_name: &str) -> Self {
		Self {
			type_name: type_name.into(),
			desired_name: type_name.into(),
			parameters: vec![],
			bundles: vec![],
		}
	}

	/// Overrides the name under which the module is emitted
	pub fn desired_name(mut self, name: &str) -> Self {
		self.desired_name = name.into();
		self
	}

	/// Adds a parameter
	pub fn param(mut self, name: &str, value: impl Into<ParameterValue>) -> Self {
		self.parameters.push((name.into(), value.into()));
		self
	}

	/// Adds a port bundle
	pub fn port_bundle(mut self, bundle: PortBundle) -> Self {
		self.bundles.push(bundle);
		self
	}

	pub fn type_name(&self) -> &str {
		&self.type_name
	}

	/// Name used for deduplication and emission
	pub fn name(&self) -> &str {
		&self.desired_name
	}

	pub fn bundles(&self) -> &[PortBundle] {
		&self.bundles
	}

	/// Computes the (desired name, parameters) key
	pub fn identity_key(&self) -> Result<IdentityKey, DesignError> {
		if !is_name_valid(&self.desired_name) {
			return Err(DesignError::InvalidName(self.desired_name.clone()));
		}

		let mut parameters = ParameterMap::new();
		for (name, value) in &self.parameters {
			if !is_name_valid(name) {
				return Err(DesignError::InvalidName(name.clone()));
			}

			if parameters.insert(name.clone(), value.clone()).is_some() {
				return Err(DesignError::DuplicateParameterName(name.clone()));
			}
		}

		Ok(IdentityKey::new(&self.desired_name, parameters))
	}

	/// Picks the bundle forming the module's interface.
	///
	/// A bundle bound as `io` wins. Otherwise the only bundle carrying a
	/// suggested name is used. Several candidates are an error.
	pub fn resolve_port_bundle(&self) -> Result<&PortBundle, DesignError> {
		let io: Vec<&PortBundle> = self.bundles.iter().filter(|b| b.is_io()).collect();
		let candidates = if io.is_empty() {
			self.bundles.iter().filter(|b| b.name().is_some()).collect()
		}
		else {
			io
		};

		match candidates.as_slice() {
			[] => Err(DesignError::UnnamedPortBundle {
				module: Some(self.desired_name.clone()),
			}),
			[bundle] => Ok(*bundle),
			_ => Err(DesignError::AmbiguousPortBundle {
				module: self.desired_name.clone(),
				candidates: candidates.iter().filter_map(|b| b.name()).map(String::from).collect(),
			}),
		}
	}

	/// Extracts the port signature of the resolved bundle
	pub fn signature(&self) -> Result<(String, PortSignature), DesignError> {
		PortSignature::extract(self.resolve_port_bundle()?)
	}
}

/// References an external module record in a design.
///
/// Does not keep the design alive.
#[derive(Clone, Debug)]
pub struct ExtModuleHandle {
	design: WeakDesignHandle,
	id: ExtModuleId,
}

impl ExtModuleHandle {
	pub(super) fn new(design: WeakDesignHandle, id: ExtModuleId) -> Self {
		Self { design, id }
	}

	pub fn id(&self) -> ExtModuleId {
		self.id
	}

	/// Returns a copy of the referenced record
	pub fn record(&self) -> Result<ExtModuleRecord, DesignError> {
		let design = self.design.upgrade().ok_or(DesignError::NotInDesign)?;
		let core = design.borrow();
		let record = core.registry.get(self.id).cloned();
		record.ok_or(DesignError::InvalidModuleId(self.id))
	}

	pub(super) fn belongs_to(&self, design: &WeakDesignHandle) -> bool {
		Weak::ptr_eq(&self.design, design)
	}
}

impl PartialEq for ExtModuleHandle {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id && Weak::ptr_eq(&self.design, &other.design)
	}
}

impl Eq for ExtModuleHandle {}
