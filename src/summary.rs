use bbox::Design;
use serde::Serialize;

/// Machine-readable view of an elaborated design
#[derive(Serialize, Debug)]
pub struct DesignSummary {
	pub modules: Vec<ModuleSummary>,
	pub instances: Vec<InstanceSummary>,
}

#[derive(Serialize, Debug)]
pub struct ModuleSummary {
	pub name: String,
	pub defname: String,
	pub parameters: Vec<ParameterSummary>,
	pub ports: Vec<PortSummary>,
}

#[derive(Serialize, Debug)]
pub struct ParameterSummary {
	pub name: String,
	pub value: String,
}

#[derive(Serialize, Debug)]
pub struct PortSummary {
	pub name: String,
	pub direction: String,
	pub width: u64,
}

#[derive(Serialize, Debug)]
pub struct InstanceSummary {
	pub name: String,

	/// Emitted name of the bound module
	pub module: Option<String>,
}

impl DesignSummary {
	pub fn new(design: &Design) -> Self {
		let modules = design
			.ext_modules()
			.iter()
			.map(|record| ModuleSummary {
				name: record.emitted_name().into(),
				defname: record.declared_name().into(),
				parameters: record
					.encoded_parameters()
					.into_iter()
					.map(|(name, value)| ParameterSummary { name, value })
					.collect(),
				ports: record
					.ports()
					.iter()
					.map(|port| PortSummary {
						name: port.name.clone(),
						direction: port.direction.to_string(),
						width: port.width,
					})
					.collect(),
			})
			.collect();

		let instances = design
			.instances()
			.iter()
			.map(|inst| InstanceSummary {
				name: inst.name().into(),
				module: inst
					.module()
					.and_then(|id| design.get_ext_module(id))
					.map(|record| record.emitted_name().to_string()),
			})
			.collect();

		Self { modules, instances }
	}
}
