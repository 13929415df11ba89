use std::fmt;

use thiserror::Error;

use super::registry::IdentityKey;
use super::signature::PortSignature;
use super::{ExtModuleId, InstanceId};

#[derive(Clone, Debug)]
pub struct ConflictingSignatureError {
	pub key: IdentityKey,
	pub registered: PortSignature,
	pub requested: PortSignature,
}

impl fmt::Display for ConflictingSignatureError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(
			f,
			"External module '{}' registered again with a different port signature",
			self.key.name
		)?;
		writeln!(f, "identity key: {}", self.key)?;
		writeln!(f, "registered:   {}", self.registered)?;
		write!(f, "requested:    {}", self.requested)?;
		for difference in self.registered.diff(&self.requested) {
			write!(f, "\n{}", difference)?;
		}
		Ok(())
	}
}

#[derive(Clone, Debug)]
pub struct PortNotFoundError {
	pub instance: String,
	pub module: String,
	pub port: String,
}

#[derive(Clone, Debug)]
pub struct PortWidthMismatchError {
	pub instance: String,
	pub module: String,
	pub port: String,
	pub expected: u64,
	pub found: u64,
}

#[derive(Clone, Debug)]
pub struct InstanceAlreadyBoundError {
	pub instance: InstanceId,
	pub bound: ExtModuleId,
	pub requested: ExtModuleId,
}

impl From<ConflictingSignatureError> for DesignError {
	fn from(err: ConflictingSignatureError) -> Self {
		Self::ConflictingExternalModuleSignature(Box::new(err))
	}
}

impl From<PortNotFoundError> for DesignError {
	fn from(err: PortNotFoundError) -> Self {
		Self::PortNotFound(Box::new(err))
	}
}

impl From<PortWidthMismatchError> for DesignError {
	fn from(err: PortWidthMismatchError) -> Self {
		Self::PortWidthMismatch(Box::new(err))
	}
}

impl From<InstanceAlreadyBoundError> for DesignError {
	fn from(err: InstanceAlreadyBoundError) -> Self {
		Self::InstanceAlreadyBound(Box::new(err))
	}
}

/// Represents an error that can occur while declaring, registering or
/// binding external modules. All of them abort the elaboration run.
#[derive(Clone, Debug, Error)]
pub enum DesignError {
	#[error("Handle does not belong to this design")]
	NotInDesign,

	#[error("Invalid name '{0}'")]
	InvalidName(String),

	#[error("Invalid external module ID")]
	InvalidModuleId(ExtModuleId),

	#[error("Invalid instance ID")]
	InvalidInstanceId(InstanceId),

	#[error("Unsupported value for parameter '{name}' ({found})")]
	UnsupportedParameterType { name: String, found: String },

	#[error("Parameter '{0}' declared more than once")]
	DuplicateParameterName(String),

	#[error(
		"Port bundle of external module '{}' has no name (no 'io' binding and no suggested name)",
		.module.as_deref().unwrap_or("<unknown>")
	)]
	UnnamedPortBundle { module: Option<String> },

	#[error("External module '{module}' has more than one candidate port bundle: {candidates:?}")]
	AmbiguousPortBundle { module: String, candidates: Vec<String> },

	#[error("Port name '{port}' appears more than once in bundle '{bundle}'")]
	DuplicatePortName { bundle: String, port: String },

	#[error("{0}")]
	ConflictingExternalModuleSignature(Box<ConflictingSignatureError>),

	#[error("Instance '{}' has no port '{}' on external module '{}'", .0.instance, .0.port, .0.module)]
	PortNotFound(Box<PortNotFoundError>),

	#[error(
		"Width mismatch on port '{}' of instance '{}' (external module '{}' expects {} bits, found {})",
		.0.port, .0.instance, .0.module, .0.expected, .0.found
	)]
	PortWidthMismatch(Box<PortWidthMismatchError>),

	#[error("Instance name '{0}' is already used in the design")]
	InstanceNameConflict(String),

	#[error("Instance is already bound to a different external module")]
	InstanceAlreadyBound(Box<InstanceAlreadyBoundError>),
}
