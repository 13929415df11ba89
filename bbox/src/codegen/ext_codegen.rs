use std::fmt;

use super::{Codegen, CodegenError};
use crate::design::{Design, ExtModuleId, ExtModuleRecord, InstanceId, SignalDirection};

/// Emits external module records and their instantiation sites
pub struct ExtModuleCodegen<'a> {
	design: &'a Design,
	indent_level: u32,
	output_stream: &'a mut dyn fmt::Write,
}

macro_rules! emitln {
	($self:ident, $($arg:tt)*) => {
		writeln!($self.output_stream, "{}{}", "\t".repeat($self.indent_level as usize), format!($($arg)*))
	}
}

impl<'a> ExtModuleCodegen<'a> {
	pub fn new(design: &'a Design, w: &'a mut dyn fmt::Write) -> Self {
		Self {
			design,
			indent_level: 0,
			output_stream: w,
		}
	}

	fn begin_indent(&mut self) {
		self.indent_level += 1;
	}

	fn end_indent(&mut self) {
		assert!(self.indent_level > 0);
		self.indent_level -= 1;
	}

	fn emit_record(&mut self, record: &ExtModuleRecord) -> Result<(), CodegenError> {
		emitln!(self, "extmodule {} :", record.emitted_name())?;
		self.begin_indent();

		for port in record.ports().iter() {
			let direction_str = match port.direction {
				SignalDirection::Input => "input",
				SignalDirection::Output => "output",
			};
			emitln!(self, "{} {} : UInt<{}>", direction_str, port.name, port.width)?;
		}

		emitln!(self, "defname = {}", record.declared_name())?;

		for (name, value) in record.encoded_parameters() {
			emitln!(self, "parameter {} = {}", name, value)?;
		}

		self.end_indent();
		Ok(())
	}
}

impl<'a> Codegen for ExtModuleCodegen<'a> {
	fn emit_ext_module(&mut self, module: ExtModuleId) -> Result<(), CodegenError> {
		let record = self
			.design
			.get_ext_module(module)
			.ok_or(CodegenError::InvalidModuleId(module))?;
		self.emit_record(&record)
	}

	fn emit_instance(&mut self, instance: InstanceId) -> Result<(), CodegenError> {
		let inst = self
			.design
			.get_instance(instance)
			.ok_or(CodegenError::InvalidInstanceId(instance))?;

		let record = inst
			.module()
			.and_then(|module| self.design.get_ext_module(module))
			.ok_or_else(|| CodegenError::UnboundInstance(inst.name().into()))?;

		emitln!(self, "inst {} of {}", inst.name(), record.emitted_name())?;
		Ok(())
	}

	fn emit_design(&mut self) -> Result<(), CodegenError> {
		for record in self.design.ext_modules() {
			self.emit_record(&record)?;
			emitln!(self, "")?;
		}

		for inst in self.design.instances() {
			self.emit_instance(inst.id())?;
		}

		Ok(())
	}
}
