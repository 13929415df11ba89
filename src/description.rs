use bbox::design::{ExtModuleDecl, InstanceId, ParameterValue, PortBundle, PortType};
use bbox::{Design, DesignError};
use log::debug;
use num_bigint::BigInt;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::DriverError;

/// Design read from a JSON description
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct DesignDescription {
	pub instances: Vec<InstanceDescription>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct InstanceDescription {
	pub name: String,
	pub module: ModuleDescription,

	/// Ports presented by the instance itself. When absent, the instance
	/// uses the module's own port bundle.
	#[serde(default)]
	pub ports: Option<BundleDescription>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct ModuleDescription {
	#[serde(rename = "type")]
	pub type_name: String,

	#[serde(default)]
	pub desired_name: Option<String>,

	#[serde(default)]
	pub params: Map<String, Value>,

	pub bundles: Vec<BundleDescription>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct BundleDescription {
	#[serde(default)]
	pub binding: Option<String>,

	#[serde(default)]
	pub suggested_name: Option<String>,

	#[serde(rename = "type")]
	pub ty: PortTypeDescription,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct FieldDescription {
	pub name: String,

	#[serde(rename = "type")]
	pub ty: PortTypeDescription,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "snake_case")]
pub enum PortTypeDescription {
	Input(u64),
	Output(u64),
	Bundle(Vec<FieldDescription>),
	Vector {
		element: Box<PortTypeDescription>,
		len: usize,
	},
	Flipped(Box<PortTypeDescription>),
}

impl DesignDescription {
	pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(text)
	}

	/// Elaborates all instances in order. Stops at the first error.
	pub fn elaborate(&self) -> Result<Design, DriverError> {
		let mut design = Design::new();
		for instance in &self.instances {
			instance.elaborate(&mut design).map_err(|source| DriverError::ElabError {
				instance: instance.name.clone(),
				source,
			})?;
		}
		Ok(design)
	}
}

impl InstanceDescription {
	fn elaborate(&self, design: &mut Design) -> Result<InstanceId, DesignError> {
		let decl = self.module.to_decl()?;
		match &self.ports {
			None => design.instantiate(&self.name, &decl),
			Some(ports) => {
				debug!("Instance '{}' presents its own port bundle", self.name);
				let module = design.register(&decl)?;
				let instance = design.new_instance(&self.name, ports.to_bundle())?;
				design.bind(instance, &module)?;
				Ok(instance)
			},
		}
	}
}

impl ModuleDescription {
	pub fn to_decl(&self) -> Result<ExtModuleDecl, DesignError> {
		let mut decl = ExtModuleDecl::new(&self.type_name);
		if let Some(name) = &self.desired_name {
			decl = decl.desired_name(name);
		}

		for (name, value) in &self.params {
			decl = decl.param(name, parameter_value(name, value)?);
		}

		for bundle in &self.bundles {
			decl = decl.port_bundle(bundle.to_bundle());
		}

		Ok(decl)
	}
}

impl BundleDescription {
	pub fn to_bundle(&self) -> PortBundle {
		let mut bundle = PortBundle::new(self.ty.to_port_type());
		if let Some(name) = &self.binding {
			bundle = bundle.bind(name);
		}
		if let Some(name) = &self.suggested_name {
			bundle = bundle.suggest_name(name);
		}
		bundle
	}
}

impl PortTypeDescription {
	pub fn to_port_type(&self) -> PortType {
		use PortTypeDescription::*;
		match self {
			Input(width) => PortType::input(*width),
			Output(width) => PortType::output(*width),
			Bundle(fields) => PortType::bundle(fields.iter().map(|f| (f.name.as_str(), f.ty.to_port_type()))),
			Vector { element, len } => element.to_port_type().vector(*len),
			Flipped(inner) => inner.to_port_type().flipped(),
		}
	}
}

/// Converts a JSON value into a parameter value.
///
/// Plain numbers and strings map directly. Number literals without a
/// fraction or exponent are integers of any magnitude. Raw text, integers
/// given as text and explicit reals use single-key objects:
/// `{"raw": "bit [31:0]"}`, `{"integer": "123456789012345678901234567890"}`,
/// `{"real": 1}`.
pub fn parameter_value(name: &str, value: &Value) -> Result<ParameterValue, DesignError> {
	let unsupported = |found: &str| DesignError::UnsupportedParameterType {
		name: name.into(),
		found: found.into(),
	};

	match value {
		// Numbers keep their literal text, so integers of any size survive
		Value::Number(number) => {
			let text = number.to_string();
			if text.contains(['.', 'e', 'E']) {
				number.as_f64().map(ParameterValue::Real).ok_or_else(|| unsupported("number"))
			}
			else {
				text
					.parse::<BigInt>()
					.map(ParameterValue::Integer)
					.map_err(|_| unsupported("malformed integer"))
			}
		},
		Value::String(text) => Ok(ParameterValue::from(text.as_str())),
		Value::Object(object) if object.len() == 1 => match object.iter().next() {
			Some((kind, Value::String(text))) if kind == "raw" => Ok(ParameterValue::raw(text)),
			Some((kind, Value::String(text))) if kind == "integer" => text
				.parse::<BigInt>()
				.map(ParameterValue::Integer)
				.map_err(|_| unsupported("malformed integer")),
			Some((kind, Value::Number(number))) if kind == "real" => number
				.as_f64()
				.map(ParameterValue::Real)
				.ok_or_else(|| unsupported("malformed real")),
			_ => Err(unsupported("object")),
		},
		Value::Object(_) => Err(unsupported("object")),
		Value::Array(_) => Err(unsupported("array")),
		Value::Bool(_) => Err(unsupported("boolean")),
		Value::Null => Err(unsupported("null")),
	}
}
