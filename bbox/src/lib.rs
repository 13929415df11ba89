pub mod codegen;
pub mod design;

pub use design::{
	Design, DesignError, ExtModuleDecl, ExtModuleHandle, ExtModuleId, InstanceId, ParameterValue, PortBundle, PortType,
	SignalDirection,
};
