use std::fmt;

/// Conventional name under which a module's port bundle is bound
pub const IO_BINDING: &str = "io";

/// Specifies direction of a port, from the perspective of the module
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SignalDirection {
	/// Driven by the outside world
	Input,

	/// Driven by the module
	Output,
}

impl SignalDirection {
	/// Returns the opposite direction
	pub fn flip(self) -> Self {
		match self {
			Self::Input => Self::Output,
			Self::Output => Self::Input,
		}
	}
}

impl fmt::Display for SignalDirection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Input => write!(f, "Input"),
			Self::Output => write!(f, "Output"),
		}
	}
}

/// Named member of a bundle
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BundleField {
	pub name: String,
	pub ty: PortType,
}

/// Declared type of a port aggregate
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PortType {
	/// Leaf port with given direction and bit width
	Element { direction: SignalDirection, width: u64 },

	/// Named fields, in declaration order
	Bundle(Vec<BundleField>),

	/// `len` copies of the element type
	Vector { element: Box<PortType>, len: usize },

	/// Inverts directions of all leaves of the inner type
	Flipped(Box<PortType>),
}

/// Leaf produced by flattening a normalized port tree
#[derive(Clone, PartialEq, Eq, Debug)]
pub(super) struct FlatPort {
	pub name: String,
	pub direction: SignalDirection,
	pub width: u64,
}

impl PortType {
	pub fn input(width: u64) -> Self {
		Self::Element {
			direction: SignalDirection::Input,
			width,
		}
	}

	pub fn output(width: u64) -> Self {
		Self::Element {
			direction: SignalDirection::Output,
			width,
		}
	}

	pub fn bundle<'a>(fields: impl IntoIterator<Item = (&'a str, PortType)>) -> Self {
		Self::Bundle(
			fields
				.into_iter()
				.map(|(name, ty)| BundleField { name: name.into(), ty })
				.collect(),
		)
	}

	pub fn vector(self, len: usize) -> Self {
		Self::Vector {
			element: Box::new(self),
			len,
		}
	}

	pub fn flipped(self) -> Self {
		Self::Flipped(Box::new(self))
	}

	/// Returns an equivalent tree without `Flipped` nodes, with every leaf
	/// direction as observed from outside the module.
	pub fn normalized(&self) -> PortType {
		self.normalized_impl(false)
	}

	fn normalized_impl(&self, flip: bool) -> PortType {
		use PortType::*;
		match self {
			Element { direction, width } => Element {
				direction: if flip { direction.flip() } else { *direction },
				width: *width,
			},
			Bundle(fields) => Bundle(
				fields
					.iter()
					.map(|field| BundleField {
						name: field.name.clone(),
						ty: field.ty.normalized_impl(flip),
					})
					.collect(),
			),
			Vector { element, len } => Vector {
				element: Box::new(element.normalized_impl(flip)),
				len: *len,
			},
			Flipped(inner) => inner.normalized_impl(!flip),
		}
	}

	/// Flattens a normalized tree into leaf ports in declaration order.
	/// Top-level bundle fields are not prefixed; `name` is only used when the
	/// tree itself is a single leaf.
	pub(super) fn flatten(&self, name: &str) -> Vec<FlatPort> {
		let mut ports = vec![];
		match self {
			PortType::Bundle(fields) => {
				for field in fields {
					field.ty.flatten_into(&field.name, false, &mut ports);
				}
			},
			other => other.flatten_into(name, false, &mut ports),
		}
		ports
	}

	fn flatten_into(&self, prefix: &str, flip: bool, ports: &mut Vec<FlatPort>) {
		use PortType::*;
		match self {
			Element { direction, width } => ports.push(FlatPort {
				name: prefix.into(),
				direction: if flip { direction.flip() } else { *direction },
				width: *width,
			}),

			// Empty aggregates keep a zero-width placeholder so the name survives
			Bundle(fields) if fields.is_empty() => Self::zero_width(prefix, flip, ports),
			Vector { len: 0, .. } => Self::zero_width(prefix, flip, ports),

			Bundle(fields) => {
				for field in fields {
					field.ty.flatten_into(&format!("{}_{}", prefix, field.name), flip, ports);
				}
			},
			Vector { element, len } => {
				for index in 0..*len {
					element.flatten_into(&format!("{}_{}", prefix, index), flip, ports);
				}
			},
			Flipped(inner) => inner.flatten_into(prefix, !flip, ports),
		}
	}

	fn zero_width(prefix: &str, flip: bool, ports: &mut Vec<FlatPort>) {
		let direction = SignalDirection::Input;
		ports.push(FlatPort {
			name: prefix.into(),
			direction: if flip { direction.flip() } else { direction },
			width: 0,
		});
	}
}

/// A port aggregate declared on an external module.
///
/// The bundle is normally bound under the conventional `io` name. Bundles
/// created without that binding may still carry a suggested name, which is
/// used as a fallback during port bundle resolution.
#[derive(Clone, Debug)]
pub struct PortBundle {
	ty: PortType,
	binding: Option<String>,
	suggested_name: Option<String>,
}

impl PortBundle {
	/// Creates an unnamed bundle
	pub fn new(ty: PortType) -> Self {
		Self {
			ty,
			binding: None,
			suggested_name: None,
		}
	}

	/// Creates a bundle bound under the conventional `io` name
	pub fn io(ty: PortType) -> Self {
		Self::new(ty).bind(IO_BINDING)
	}

	pub fn bind(mut self, name: &str) -> Self {
		self.binding = Some(name.into());
		self
	}

	pub fn suggest_name(mut self, name: &str) -> Self {
		self.suggested_name = Some(name.into());
		self
	}

	pub fn ty(&self) -> &PortType {
		&self.ty
	}

	/// True if bound under the conventional `io` name
	pub fn is_io(&self) -> bool {
		self.binding.as_deref() == Some(IO_BINDING)
	}

	pub fn suggested_name(&self) -> Option<&str> {
		self.suggested_name.as_deref()
	}

	/// Name used to refer to the bundle: the binding if present, the
	/// suggested name otherwise
	pub fn name(&self) -> Option<&str> {
		self.binding.as_deref().or(self.suggested_name.as_deref())
	}
}
