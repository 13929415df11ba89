use std::collections::HashSet;
use std::fmt;

use log::warn;

use super::port::{PortBundle, PortType, SignalDirection};
use super::utils::is_name_valid;
use super::DesignError;

/// A single leaf port of an external module
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct PortEntry {
	pub name: String,
	pub direction: SignalDirection,
	pub width: u64,
}

impl PortEntry {
	pub fn new(name: &str, direction: SignalDirection, width: u64) -> Self {
		Self {
			name: name.into(),
			direction,
			width,
		}
	}
}

impl fmt::Display for PortEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}({})", self.name, self.direction, self.width)
	}
}

/// Ordered, direction-normalized list of leaf ports.
///
/// Comparison is structural: signatures extracted from two unrelated port
/// types are equal as long as names, directions and widths match in order.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct PortSignature {
	ports: Vec<PortEntry>,
}

impl PortSignature {
	/// Creates a signature from already flattened ports
	pub fn new(ports: Vec<PortEntry>) -> Self {
		Self { ports }
	}

	/// Extracts the signature of a port bundle, resolving the bundle's name.
	/// Fails if the bundle was neither bound nor given a suggested name.
	pub fn extract(bundle: &PortBundle) -> Result<(String, PortSignature), DesignError> {
		let name = bundle
			.name()
			.ok_or(DesignError::UnnamedPortBundle { module: None })?;
		Ok((name.into(), Self::from_type(bundle.ty(), name)?))
	}

	/// Flattens a port tree under the given top-level name
	pub fn from_type(ty: &PortType, name: &str) -> Result<Self, DesignError> {
		let mut seen = HashSet::new();
		let mut ports = vec![];

		for port in ty.normalized().flatten(name) {
			if !is_name_valid(&port.name) {
				return Err(DesignError::InvalidName(port.name));
			}

			if !seen.insert(port.name.clone()) {
				return Err(DesignError::DuplicatePortName {
					bundle: name.into(),
					port: port.name,
				});
			}

			if port.width == 0 {
				warn!("Port '{}' of bundle '{}' has zero width", port.name, name);
			}

			ports.push(PortEntry {
				name: port.name,
				direction: port.direction,
				width: port.width,
			});
		}

		Ok(Self { ports })
	}

	pub fn ports(&self) -> &[PortEntry] {
		&self.ports
	}

	pub fn iter(&self) -> impl Iterator<Item = &PortEntry> {
		self.ports.iter()
	}

	pub fn len(&self) -> usize {
		self.ports.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ports.is_empty()
	}

	/// Looks up a port by name
	pub fn get(&self, name: &str) -> Option<&PortEntry> {
		self.ports.iter().find(|p| p.name == name)
	}

	pub fn position(&self, name: &str) -> Option<usize> {
		self.ports.iter().position(|p| p.name == name)
	}

	/// Lists differences between `self` (the registered signature) and
	/// `requested`. Empty iff both signatures are equal.
	pub fn diff(&self, requested: &PortSignature) -> Vec<PortDifference> {
		let mut differences = vec![];

		for (index, registered) in self.ports.iter().enumerate() {
			match requested.position(&registered.name) {
				None => differences.push(PortDifference::Removed(registered.clone())),
				Some(other_index) => {
					let other = &requested.ports[other_index];
					if other != registered {
						differences.push(PortDifference::Changed {
							registered: registered.clone(),
							requested: other.clone(),
						});
					}
					else if other_index != index {
						differences.push(PortDifference::Moved {
							name: registered.name.clone(),
							registered: index,
							requested: other_index,
						});
					}
				},
			}
		}

		for port in &requested.ports {
			if self.get(&port.name).is_none() {
				differences.push(PortDifference::Added(port.clone()));
			}
		}

		differences
	}
}

impl fmt::Display for PortSignature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{{")?;
		for (index, port) in self.ports.iter().enumerate() {
			if index > 0 {
				write!(f, ", ")?;
			}
			write!(f, "{}", port)?;
		}
		write!(f, "}}")
	}
}

/// One line of a signature diff
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PortDifference {
	/// Port exists only in the registered signature
	Removed(PortEntry),

	/// Port exists only in the requested signature
	Added(PortEntry),

	/// Port exists in both, with different direction or width
	Changed { registered: PortEntry, requested: PortEntry },

	/// Same port at a different position
	Moved {
		name: String,
		registered: usize,
		requested: usize,
	},
}

impl fmt::Display for PortDifference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		use PortDifference::*;
		match self {
			Removed(port) => write!(f, "- {}", port),
			Added(port) => write!(f, "+ {}", port),
			Changed { registered, requested } => write!(f, "- {}\n+ {}", registered, requested),
			Moved {
				name,
				registered,
				requested,
			} => write!(f, "~ {}: position {} -> {}", name, registered, requested),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use rstest::rstest;
	use SignalDirection::*;

	fn inverter_ports() -> PortType {
		PortType::bundle([("in", PortType::input(1)), ("out", PortType::output(1))])
	}

	#[test]
	fn test_extract_io() -> Result<(), DesignError> {
		let (name, sig) = PortSignature::extract(&PortBundle::io(inverter_ports()))?;
		assert_eq!(name, "io");
		assert_eq!(
			sig.ports(),
			[PortEntry::new("in", Input, 1), PortEntry::new("out", Output, 1)]
		);
		Ok(())
	}

	#[test]
	fn test_extract_flipped() -> Result<(), DesignError> {
		let ty = PortType::bundle([("in", PortType::output(1)), ("out", PortType::input(1))]).flipped();
		let (_, sig) = PortSignature::extract(&PortBundle::io(ty))?;
		assert_eq!(sig.get("in").map(|p| p.direction), Some(Input));
		assert_eq!(sig.get("out").map(|p| p.direction), Some(Output));

		let (_, plain) = PortSignature::extract(&PortBundle::io(inverter_ports()))?;
		assert_eq!(sig, plain);
		Ok(())
	}

	#[test]
	fn test_extract_suggested_name() -> Result<(), DesignError> {
		let (name, _) = PortSignature::extract(&PortBundle::new(inverter_ports()).suggest_name("ports"))?;
		assert_eq!(name, "ports");
		Ok(())
	}

	#[test]
	fn test_extract_unnamed() {
		let result = PortSignature::extract(&PortBundle::new(inverter_ports()));
		assert!(matches!(result, Err(DesignError::UnnamedPortBundle { .. })));
	}

	#[test]
	fn test_extract_duplicate_names() {
		let ty = PortType::bundle([
			("a", PortType::bundle([("b", PortType::input(1))])),
			("a_b", PortType::input(1)),
		]);
		let result = PortSignature::from_type(&ty, "io");
		assert!(matches!(result, Err(DesignError::DuplicatePortName { .. })));
	}

	#[rstest]
	#[case(PortType::bundle([("", PortType::input(1))]), "")]
	#[case(PortType::bundle([("my port", PortType::input(1))]), "my port")]
	#[case(PortType::bundle([("bus", PortType::bundle([("9", PortType::output(1))]))]), "bus_9")]
	#[case(PortType::bundle([("0", PortType::input(1).vector(2))]), "0_0")]
	fn test_extract_invalid_port_name(#[case] ty: PortType, #[case] port: &str) {
		match PortSignature::from_type(&ty, "io") {
			Err(DesignError::InvalidName(name)) => assert_eq!(name, port),
			other => panic!("expected invalid port name, got {:?}", other),
		}
	}

	#[test]
	fn test_structural_equality() -> Result<(), DesignError> {
		// Same leaves, built through differently shaped trees
		let nested = PortType::bundle([("a", PortType::bundle([("x", PortType::input(2))]))]);
		let flat = PortType::bundle([("a_x", PortType::input(2))]);
		assert_eq!(
			PortSignature::from_type(&nested, "io")?,
			PortSignature::from_type(&flat, "io")?
		);
		Ok(())
	}

	#[test]
	fn test_order_matters() {
		let a = PortSignature::new(vec![PortEntry::new("a", Input, 1), PortEntry::new("b", Input, 1)]);
		let b = PortSignature::new(vec![PortEntry::new("b", Input, 1), PortEntry::new("a", Input, 1)]);
		assert_ne!(a, b);
		assert_eq!(a.diff(&b).len(), 2);
		assert!(matches!(a.diff(&b)[0], PortDifference::Moved { .. }));
	}

	#[test]
	fn test_diff() {
		let registered = PortSignature::new(vec![PortEntry::new("a", Input, 1), PortEntry::new("b", Output, 1)]);
		let requested = PortSignature::new(vec![PortEntry::new("a", Input, 2), PortEntry::new("c", Output, 1)]);

		let diff = registered.diff(&requested);
		assert_eq!(
			diff,
			[
				PortDifference::Changed {
					registered: PortEntry::new("a", Input, 1),
					requested: PortEntry::new("a", Input, 2),
				},
				PortDifference::Removed(PortEntry::new("b", Output, 1)),
				PortDifference::Added(PortEntry::new("c", Output, 1)),
			]
		);
		assert!(registered.diff(&registered).is_empty());
	}

	#[test]
	fn test_display() {
		let sig = PortSignature::new(vec![PortEntry::new("in", Input, 1), PortEntry::new("out", Output, 8)]);
		assert_eq!(sig.to_string(), "{in: Input(1), out: Output(8)}");
		assert_eq!(PortSignature::default().to_string(), "{}");
	}
}
