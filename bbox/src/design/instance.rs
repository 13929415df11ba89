use log::debug;

use super::design_error::{InstanceAlreadyBoundError, PortNotFoundError, PortWidthMismatchError};
use super::registry::ExtModuleRecord;
use super::signature::PortSignature;
use super::{DesignError, ExtModuleId, InstanceId};

/// Connects a port of an instance to a port of its external module record
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PortBinding {
	/// Name of the instance leaf port (same as the record port name)
	pub port: String,

	/// Index of the port in the record's signature
	pub index: usize,
}

/// One use-site of an external module
#[derive(Clone, Debug)]
pub struct Instance {
	/// Self-reference
	pub(super) id: InstanceId,

	/// Instance name
	name: String,

	/// Name of the port bundle the instance was created with
	bundle_name: String,

	/// The instance's own leaf ports
	ports: PortSignature,

	/// Record this instance is bound to
	module: Option<ExtModuleId>,

	bindings: Vec<PortBinding>,
}

impl Instance {
	pub(super) fn new(id: InstanceId, name: &str, bundle_name: &str, ports: PortSignature) -> Self {
		Self {
			id,
			name: name.into(),
			bundle_name: bundle_name.into(),
			ports,
			module: None,
			bindings: vec![],
		}
	}

	pub fn id(&self) -> InstanceId {
		self.id
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn bundle_name(&self) -> &str {
		&self.bundle_name
	}

	pub fn ports(&self) -> &PortSignature {
		&self.ports
	}

	/// Record the instance is bound to, if any
	pub fn module(&self) -> Option<ExtModuleId> {
		self.module
	}

	pub fn bindings(&self) -> &[PortBinding] {
		&self.bindings
	}

	/// Looks up the record port index bound to the given instance port
	pub fn binding(&self, port: &str) -> Option<usize> {
		self.bindings.iter().find(|b| b.port == port).map(|b| b.index)
	}

	/// Matches every leaf port by name against the record.
	///
	/// Nothing is modified unless all ports match. Binding again to the same
	/// record is a no-op.
	pub(super) fn bind(&mut self, record: &ExtModuleRecord) -> Result<(), DesignError> {
		match self.module {
			Some(bound) if bound == record.id() => {
				debug!(
					"Instance '{}' already bound to '{}'",
					self.name,
					record.emitted_name()
				);
				return Ok(());
			},
			Some(bound) => {
				return Err(InstanceAlreadyBoundError {
					instance: self.id,
					bound,
					requested: record.id(),
				}
				.into())
			},
			None => {},
		}

		let mut bindings = Vec::with_capacity(self.ports.len());
		for port in self.ports.iter() {
			let index = record.ports().position(&port.name).ok_or_else(|| {
				DesignError::from(PortNotFoundError {
					instance: self.name.clone(),
					module: record.emitted_name().into(),
					port: port.name.clone(),
				})
			})?;

			let expected = record.ports().ports()[index].width;
			if expected != port.width {
				return Err(PortWidthMismatchError {
					instance: self.name.clone(),
					module: record.emitted_name().into(),
					port: port.name.clone(),
					expected,
					found: port.width,
				}
				.into());
			}

			bindings.push(PortBinding {
				port: port.name.clone(),
				index,
			});
		}

		debug!(
			"Bound instance '{}' to '{}' ({} ports)",
			self.name,
			record.emitted_name(),
			bindings.len()
		);
		self.bindings = bindings;
		self.module = Some(record.id());
		Ok(())
	}
}
