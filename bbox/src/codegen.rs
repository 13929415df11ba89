pub mod ext_codegen;

pub use ext_codegen::ExtModuleCodegen;

use crate::design::{ExtModuleId, InstanceId};
use std::fmt;
use thiserror::Error;

#[derive(Clone, Error, Debug)]
pub enum CodegenError {
	#[error(transparent)]
	FormatError(#[from] fmt::Error),

	#[error("Invalid external module ID")]
	InvalidModuleId(ExtModuleId),

	#[error("Invalid instance ID")]
	InvalidInstanceId(InstanceId),

	#[error("Instance '{0}' is not bound to any external module")]
	UnboundInstance(String),
}

pub trait Codegen {
	/// Emits the record of a single external module
	fn emit_ext_module(&mut self, module: ExtModuleId) -> Result<(), CodegenError>;

	/// Emits a single instantiation site
	fn emit_instance(&mut self, instance: InstanceId) -> Result<(), CodegenError>;

	/// Emits all records followed by all instantiation sites
	fn emit_design(&mut self) -> Result<(), CodegenError>;
}
