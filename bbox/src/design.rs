pub mod design_error;
pub mod ext_module;
pub mod instance;
pub mod parameter;
pub mod port;
pub mod registry;
pub mod signature;
mod utils;

pub use design_error::DesignError;
pub use ext_module::{ExtModuleDecl, ExtModuleHandle};
pub use instance::{Instance, PortBinding};
pub use parameter::{ParameterMap, ParameterValue};
pub use port::{BundleField, PortBundle, PortType, SignalDirection, IO_BINDING};
pub use registry::{ExtModuleRecord, IdentityKey};
pub use signature::{PortDifference, PortEntry, PortSignature};

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use log::debug;

use self::registry::ModuleRegistry;
use self::utils::is_name_valid;

/// References an external module record in a design
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct ExtModuleId {
	id: usize,
}

impl ExtModuleId {
	/// Checks if the reference is valid
	pub fn is_null(&self) -> bool {
		self.id == 0
	}
}

/// References an instance in a design
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct InstanceId {
	id: usize,
}

impl InstanceId {
	/// Checks if the reference is valid
	pub fn is_null(&self) -> bool {
		self.id == 0
	}
}

/// State of a single elaboration run.
/// Referred to via multiple handles with reference counting.
pub struct DesignCore {
	weak: WeakDesignHandle,
	registry: ModuleRegistry,
	instances: Vec<Instance>,
	instance_names: HashMap<String, InstanceId>,
}

impl DesignCore {
	/// Creates a new empty design
	fn new() -> Self {
		Self {
			weak: WeakDesignHandle::new(),
			registry: ModuleRegistry::new(),
			instances: Vec::new(),
			instance_names: HashMap::new(),
		}
	}

	/// Registers a declaration, reusing a matching record if there is one
	fn register(&mut self, decl: &ExtModuleDecl) -> Result<ExtModuleId, DesignError> {
		let key = decl.identity_key()?;
		let (bundle_name, signature) = decl.signature()?;
		debug!(
			"Registering '{}' (type '{}', bundle '{}')",
			decl.name(),
			decl.type_name(),
			bundle_name
		);
		self.registry.register(key, signature)
	}

	/// Validates a new instance name and extracts the instance's ports.
	/// Does not modify the design.
	fn check_instance(&self, name: &str, bundle: &PortBundle) -> Result<(String, PortSignature), DesignError> {
		if !is_name_valid(name) {
			return Err(DesignError::InvalidName(name.into()));
		}

		if self.instance_names.contains_key(name) {
			return Err(DesignError::InstanceNameConflict(name.into()));
		}

		PortSignature::extract(bundle)
	}

	fn push_instance(&mut self, name: &str, bundle_name: &str, ports: PortSignature) -> InstanceId {
		let id = InstanceId {
			id: self.instances.len() + 1,
		};

		self.instances.push(Instance::new(id, name, bundle_name, ports));
		self.instance_names.insert(name.into(), id);
		id
	}

	/// Adds an unbound instance to the design
	fn add_instance(&mut self, name: &str, bundle: &PortBundle) -> Result<InstanceId, DesignError> {
		let (bundle_name, ports) = self.check_instance(name, bundle)?;
		Ok(self.push_instance(name, &bundle_name, ports))
	}

	/// Binds an instance to a record
	fn bind(&mut self, instance: InstanceId, module: ExtModuleId) -> Result<(), DesignError> {
		let record = self
			.registry
			.get(module)
			.ok_or(DesignError::InvalidModuleId(module))?;

		let inst = instance
			.id
			.checked_sub(1)
			.and_then(|index| self.instances.get_mut(index))
			.ok_or(DesignError::InvalidInstanceId(instance))?;

		inst.bind(record)
	}

	/// Returns a reference to the instance with the given ID
	fn get_instance(&self, instance: InstanceId) -> Option<&Instance> {
		self.instances.get(instance.id.checked_sub(1)?)
	}

	/// Returns a handle to the record with the given ID
	fn get_ext_module_handle(&self, module: ExtModuleId) -> Option<ExtModuleHandle> {
		self.registry.get(module)?;
		Some(ExtModuleHandle::new(self.weak.clone(), module))
	}
}

/// Weak reference to a design
pub type WeakDesignHandle = Weak<RefCell<DesignCore>>;

/// Strong reference to a design
pub type DesignHandle = Rc<RefCell<DesignCore>>;

/// Elaboration context holding all external module records and instances
/// of a single run
pub struct Design {
	handle: DesignHandle,
}

impl Design {
	/// Creates a new, empty design
	pub fn new() -> Self {
		let d = Self {
			handle: Rc::new(RefCell::new(DesignCore::new())),
		};

		d.handle.borrow_mut().weak = Rc::downgrade(&d.handle);
		d
	}

	fn borrow_mut(&mut self) -> std::cell::RefMut<DesignCore> {
		self.handle.borrow_mut()
	}

	fn borrow(&self) -> std::cell::Ref<DesignCore> {
		self.handle.borrow()
	}

	fn weak(&self) -> WeakDesignHandle {
		Rc::downgrade(&self.handle)
	}

	/// Registers an external module declaration and returns a handle to
	/// its (possibly shared) record
	pub fn register(&mut self, decl: &ExtModuleDecl) -> Result<ExtModuleHandle, DesignError> {
		let id = self.borrow_mut().register(decl)?;
		Ok(ExtModuleHandle::new(self.weak(), id))
	}

	/// Creates an unbound instance presenting the given port bundle
	pub fn new_instance(&mut self, name: &str, bundle: PortBundle) -> Result<InstanceId, DesignError> {
		self.borrow_mut().add_instance(name, &bundle)
	}

	/// Attaches an instance to an external module record
	pub fn bind(&mut self, instance: InstanceId, module: &ExtModuleHandle) -> Result<(), DesignError> {
		if !module.belongs_to(&self.weak()) {
			return Err(DesignError::NotInDesign);
		}

		self.borrow_mut().bind(instance, module.id())
	}

	/// Registers the declaration and creates an instance of it bound to
	/// the resulting record. Nothing is registered if the instance itself
	/// cannot be created.
	pub fn instantiate(&mut self, name: &str, decl: &ExtModuleDecl) -> Result<InstanceId, DesignError> {
		let (bundle_name, ports) = self.borrow().check_instance(name, decl.resolve_port_bundle()?)?;
		let module = self.register(decl)?;
		let instance = self.borrow_mut().push_instance(name, &bundle_name, ports);
		self.bind(instance, &module)?;
		Ok(instance)
	}

	/// Returns all external module records in creation order
	pub fn ext_modules(&self) -> Vec<ExtModuleRecord> {
		self.borrow().registry.records().to_vec()
	}

	pub fn get_ext_module(&self, module: ExtModuleId) -> Option<ExtModuleRecord> {
		self.borrow().registry.get(module).cloned()
	}

	pub fn get_ext_module_handle(&self, module: ExtModuleId) -> Option<ExtModuleHandle> {
		self.borrow().get_ext_module_handle(module)
	}

	/// Finds the record registered under the given identity key
	pub fn lookup(&self, key: &IdentityKey) -> Option<ExtModuleHandle> {
		let id = self.borrow().registry.lookup(key)?;
		Some(ExtModuleHandle::new(self.weak(), id))
	}

	/// Returns all instances in creation order
	pub fn instances(&self) -> Vec<Instance> {
		self.borrow().instances.clone()
	}

	pub fn get_instance(&self, instance: InstanceId) -> Option<Instance> {
		self.borrow().get_instance(instance).cloned()
	}

	pub fn get_instance_by_name(&self, name: &str) -> Option<InstanceId> {
		self.borrow().instance_names.get(name).copied()
	}

	/// Returns the record an instance is bound to
	pub fn instance_module(&self, instance: InstanceId) -> Option<ExtModuleHandle> {
		let core = self.borrow();
		let module = core.get_instance(instance)?.module()?;
		core.get_ext_module_handle(module)
	}

	/// Resolves an instance port to the matching record port
	pub fn instance_port(&self, instance: InstanceId, port: &str) -> Option<PortEntry> {
		let core = self.borrow();
		let inst = core.get_instance(instance)?;
		let index = inst.binding(port)?;
		let record = core.registry.get(inst.module()?)?;
		record.ports().ports().get(index).cloned()
	}
}

impl Default for Design {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use SignalDirection::*;

	fn inverter_ports() -> PortType {
		PortType::bundle([("in", PortType::input(1)), ("out", PortType::output(1))])
	}

	fn inverter() -> ExtModuleDecl {
		ExtModuleDecl::new("BlackBoxInverter").port_bundle(PortBundle::io(inverter_ports()))
	}

	fn passthrough() -> ExtModuleDecl {
		ExtModuleDecl::new("BlackBoxPassthrough").port_bundle(PortBundle::io(inverter_ports()))
	}

	fn constant(value: i64) -> ExtModuleDecl {
		ExtModuleDecl::new("BlackBoxConstant")
			.param("VALUE", value)
			.port_bundle(PortBundle::io(PortType::bundle([("out", PortType::output(16))])))
	}

	/// Repeated instantiation of the same declaration yields one record
	#[test]
	fn test_dedup() -> Result<(), DesignError> {
		let mut d = Design::new();
		let a = d.instantiate("inv_a", &inverter())?;
		let b = d.instantiate("inv_b", &inverter())?;

		assert_eq!(d.ext_modules().len(), 1);
		assert_eq!(d.instance_module(a), d.instance_module(b));
		assert_eq!(d.register(&inverter())?, d.instance_module(a).unwrap());
		Ok(())
	}

	/// Identical signatures under different names never share a record
	#[test]
	fn test_no_merge_by_signature() -> Result<(), DesignError> {
		let mut d = Design::new();
		let inv = d.register(&inverter())?;
		let pass = d.register(&passthrough())?;
		let renamed = d.register(&inverter().desired_name("BlackBoxInverterRenamed"))?;

		assert_ne!(inv, pass);
		assert_ne!(inv, renamed);
		assert_eq!(inv.record()?.ports(), pass.record()?.ports());
		assert_eq!(d.ext_modules().len(), 3);
		Ok(())
	}

	#[test]
	fn test_parameter_split() -> Result<(), DesignError> {
		let mut d = Design::new();
		let c1 = d.instantiate("c1", &constant(1))?;
		let c4 = d.instantiate("c4", &constant(4))?;
		let c4_again = d.instantiate("c4_again", &constant(4))?;

		assert_ne!(d.instance_module(c1), d.instance_module(c4));
		assert_eq!(d.instance_module(c4), d.instance_module(c4_again));

		let records = d.ext_modules();
		assert_eq!(records.len(), 2);
		assert_eq!(records[0].encoded_parameters(), [("VALUE".to_string(), "1".to_string())]);
		assert_eq!(records[1].encoded_parameters(), [("VALUE".to_string(), "4".to_string())]);
		Ok(())
	}

	#[test]
	fn test_typed_parameters() -> Result<(), DesignError> {
		let ports = || PortBundle::io(PortType::bundle([("out", PortType::output(64))]));
		let mut d = Design::new();

		let one = d.register(&ExtModuleDecl::new("BlackBoxStringParam").param("STRING", "one").port_bundle(ports()))?;
		let two = d.register(&ExtModuleDecl::new("BlackBoxStringParam").param("STRING", "two").port_bundle(ports()))?;
		let pos = d.register(&ExtModuleDecl::new("BlackBoxRealParam").param("REAL", 1.0).port_bundle(ports()))?;
		let neg = d.register(&ExtModuleDecl::new("BlackBoxRealParam").param("REAL", -1.0).port_bundle(ports()))?;
		let raw = d.register(
			&ExtModuleDecl::new("BlackBoxTypeParam")
				.param("T", ParameterValue::raw("bit [31:0]"))
				.port_bundle(ports()),
		)?;

		assert_ne!(one, two);
		assert_ne!(pos, neg);
		assert_eq!(one.record()?.encoded_parameters()[0].1, "\"one\"");
		assert_eq!(two.record()?.encoded_parameters()[0].1, "\"two\"");
		assert_eq!(pos.record()?.encoded_parameters()[0].1, "64'h3ff0000000000000");
		assert_eq!(neg.record()?.encoded_parameters()[0].1, "64'hbff0000000000000");
		assert_eq!(raw.record()?.encoded_parameters()[0].1, "bit [31:0]");
		Ok(())
	}

	/// Flipped bundle with lexically inverted directions maps onto the same record
	#[test]
	fn test_flipped_bundle() -> Result<(), DesignError> {
		let flipped = ExtModuleDecl::new("BlackBoxInverter").port_bundle(PortBundle::io(
			PortType::bundle([("in", PortType::output(1)), ("out", PortType::input(1))]).flipped(),
		));

		let mut d = Design::new();
		let handle = d.register(&flipped)?;
		let record = handle.record()?;
		assert_eq!(record.ports().get("in").map(|p| p.direction), Some(Input));
		assert_eq!(record.ports().get("out").map(|p| p.direction), Some(Output));
		assert_eq!(d.register(&inverter())?, handle);
		Ok(())
	}

	/// Suggested name plus desired name override resolves to the normal key
	#[test]
	fn test_suggested_name_binding() -> Result<(), DesignError> {
		let suggested = ExtModuleDecl::new("BlackBoxInverterSuggestName")
			.desired_name("BlackBoxInverter")
			.port_bundle(PortBundle::new(inverter_ports()).suggest_name("io"));

		let mut d = Design::new();
		let normal = d.instantiate("normal", &inverter())?;
		let fallback = d.instantiate("fallback", &suggested)?;

		let handle = d.instance_module(fallback).unwrap();
		assert_eq!(
			handle.record()?.key(),
			&IdentityKey::new("BlackBoxInverter", ParameterMap::new())
		);
		assert_eq!(d.instance_module(normal), Some(handle));
		assert_eq!(d.get_instance(fallback).unwrap().bundle_name(), "io");
		Ok(())
	}

	#[test]
	fn test_unnamed_bundle() {
		let decl = ExtModuleDecl::new("BlackBoxInverter").port_bundle(PortBundle::new(inverter_ports()));
		let mut d = Design::new();
		assert!(matches!(
			d.instantiate("inv", &decl),
			Err(DesignError::UnnamedPortBundle { .. })
		));
		assert!(d.ext_modules().is_empty());
	}

	#[test]
	fn test_conflicting_signature() -> Result<(), DesignError> {
		let narrow = ExtModuleDecl::new("X").port_bundle(PortBundle::io(PortType::bundle([("a", PortType::input(1))])));
		let wide = ExtModuleDecl::new("X").port_bundle(PortBundle::io(PortType::bundle([("a", PortType::input(2))])));

		let mut d = Design::new();
		d.instantiate("x0", &narrow)?;
		let err = d.instantiate("x1", &wide);
		assert!(matches!(err, Err(DesignError::ConflictingExternalModuleSignature(_))));
		assert!(d.get_instance_by_name("x1").is_none());
		Ok(())
	}

	/// Binding matches ports by name, regardless of declaration order
	#[test]
	fn test_bind_by_name() -> Result<(), DesignError> {
		let mut d = Design::new();
		let module = d.register(&inverter())?;

		let reordered = PortType::bundle([("out", PortType::output(1)), ("in", PortType::input(1))]);
		let inst = d.new_instance("inv", PortBundle::io(reordered))?;
		d.bind(inst, &module)?;

		assert_eq!(d.instance_port(inst, "in"), Some(PortEntry::new("in", Input, 1)));
		assert_eq!(d.instance_port(inst, "out"), Some(PortEntry::new("out", Output, 1)));
		assert_eq!(d.instance_port(inst, "missing"), None);
		assert_eq!(d.get_instance(inst).unwrap().binding("in"), Some(0));
		Ok(())
	}

	#[test]
	fn test_bind_port_not_found() -> Result<(), DesignError> {
		let mut d = Design::new();
		let module = d.register(&inverter())?;
		let ports = PortType::bundle([("in", PortType::input(1)), ("enable", PortType::input(1))]);
		let inst = d.new_instance("inv", PortBundle::io(ports))?;

		match d.bind(inst, &module) {
			Err(DesignError::PortNotFound(e)) => {
				assert_eq!(e.port, "enable");
				assert_eq!(e.instance, "inv");
			},
			other => panic!("expected missing port, got {:?}", other),
		}

		// Failed binding leaves the instance unbound
		assert!(d.instance_module(inst).is_none());
		Ok(())
	}

	#[test]
	fn test_bind_width_mismatch() -> Result<(), DesignError> {
		let mut d = Design::new();
		let module = d.register(&inverter())?;
		let ports = PortType::bundle([("in", PortType::input(8)), ("out", PortType::output(1))]);
		let inst = d.new_instance("inv", PortBundle::io(ports))?;

		match d.bind(inst, &module) {
			Err(DesignError::PortWidthMismatch(e)) => {
				assert_eq!(e.port, "in");
				assert_eq!(e.expected, 1);
				assert_eq!(e.found, 8);
			},
			other => panic!("expected width mismatch, got {:?}", other),
		}
		Ok(())
	}

	#[test]
	fn test_rebind_is_noop() -> Result<(), DesignError> {
		let mut d = Design::new();
		let inst = d.instantiate("inv", &inverter())?;
		let module = d.instance_module(inst).unwrap();

		d.bind(inst, &module)?;
		d.bind(inst, &module)?;
		assert_eq!(d.ext_modules().len(), 1);
		assert_eq!(d.get_instance(inst).unwrap().bindings().len(), 2);

		let other = d.register(&passthrough())?;
		assert!(matches!(d.bind(inst, &other), Err(DesignError::InstanceAlreadyBound(_))));
		assert_eq!(d.instance_module(inst), Some(module));
		Ok(())
	}

	#[test]
	fn test_handle_from_other_design() -> Result<(), DesignError> {
		let mut a = Design::new();
		let mut b = Design::new();
		let module = a.register(&inverter())?;
		let inst = b.new_instance("inv", PortBundle::io(inverter_ports()))?;
		assert!(matches!(b.bind(inst, &module), Err(DesignError::NotInDesign)));
		Ok(())
	}

	#[test]
	fn test_handle_outlives_design() -> Result<(), DesignError> {
		let module = {
			let mut d = Design::new();
			d.register(&inverter())?
		};
		assert!(matches!(module.record(), Err(DesignError::NotInDesign)));
		Ok(())
	}

	#[test]
	fn test_instance_names() -> Result<(), DesignError> {
		let mut d = Design::new();
		d.instantiate("inv", &inverter())?;
		assert!(matches!(
			d.instantiate("inv", &inverter()),
			Err(DesignError::InstanceNameConflict(_))
		));
		assert!(matches!(
			d.new_instance("my inv", PortBundle::io(inverter_ports())),
			Err(DesignError::InvalidName(_))
		));
		assert_eq!(d.instances().len(), 1);
		Ok(())
	}

	#[test]
	fn test_name_conflict_registers_nothing() -> Result<(), DesignError> {
		let mut d = Design::new();
		d.instantiate("c", &constant(1))?;
		assert!(matches!(
			d.instantiate("c", &constant(4)),
			Err(DesignError::InstanceNameConflict(_))
		));
		assert!(matches!(
			d.instantiate("my c", &constant(5)),
			Err(DesignError::InvalidName(_))
		));

		assert_eq!(d.ext_modules().len(), 1);
		assert_eq!(d.lookup(&constant(4).identity_key()?), None);
		assert_eq!(d.instances().len(), 1);
		Ok(())
	}

	#[test]
	fn test_invalid_ids() {
		let mut d = Design::new();
		assert!(d.get_instance(InstanceId { id: 0 }).is_none());
		assert!(d.get_ext_module(ExtModuleId { id: 3 }).is_none());
		assert!(d.get_ext_module_handle(ExtModuleId { id: 1 }).is_none());

		let stale = ExtModuleHandle::new(d.weak(), ExtModuleId { id: 7 });
		let inst = d.new_instance("inv", PortBundle::io(inverter_ports())).unwrap();
		assert!(matches!(d.bind(inst, &stale), Err(DesignError::InvalidModuleId(_))));

		let module = d.register(&inverter()).unwrap();
		assert!(matches!(
			d.bind(InstanceId { id: 9 }, &module),
			Err(DesignError::InvalidInstanceId(_))
		));
	}

	#[test]
	fn test_zero_width_ports_are_kept() -> Result<(), DesignError> {
		let decl = ExtModuleDecl::new("BlackBoxEmpty").port_bundle(PortBundle::io(PortType::bundle([
			("unused", PortType::bundle([])),
			("out", PortType::output(1)),
		])));

		let mut d = Design::new();
		let inst = d.instantiate("empty", &decl)?;
		let record = d.instance_module(inst).unwrap().record()?;
		assert_eq!(record.ports().ports()[0], PortEntry::new("unused", Input, 0));
		assert_eq!(record.ports().len(), 2);
		Ok(())
	}

	#[test]
	fn test_lookup_by_key() -> Result<(), DesignError> {
		let mut d = Design::new();
		let module = d.register(&constant(4))?;
		let key = constant(4).identity_key()?;
		assert_eq!(d.lookup(&key), Some(module));
		assert_eq!(d.lookup(&constant(5).identity_key()?), None);
		Ok(())
	}
}
