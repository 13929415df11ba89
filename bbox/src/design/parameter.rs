use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use num_bigint::BigInt;

/// Parameters of an external module keyed by name.
///
/// Ordered by name, so two maps built in different insertion order compare
/// (and hash) equal.
pub type ParameterMap = BTreeMap<String, ParameterValue>;

/// Compile-time value passed to an external module
#[derive(Clone, Debug)]
pub enum ParameterValue {
	/// Arbitrary precision integer
	Integer(BigInt),

	/// Text, emitted as a quoted and escaped string literal
	String(String),

	/// Verbatim text (e.g. a type expression), emitted without quotes or escapes
	Raw(String),

	/// IEEE-754 double, emitted as its 64-bit pattern
	Real(f64),
}

impl ParameterValue {
	/// Creates a verbatim parameter
	pub fn raw(text: &str) -> Self {
		Self::Raw(text.into())
	}

	/// Textual representation used in external module records
	pub fn encode(&self) -> String {
		match self {
			Self::Integer(value) => value.to_string(),
			Self::String(text) => encode_string(text),
			Self::Raw(text) => text.clone(),
			Self::Real(value) => format!("64'h{:016x}", value.to_bits()),
		}
	}

	/// Name of the value kind, used in diagnostics
	pub fn kind_name(&self) -> &'static str {
		match self {
			Self::Integer(_) => "integer",
			Self::String(_) => "string",
			Self::Raw(_) => "raw",
			Self::Real(_) => "real",
		}
	}
}

// Reals compare by bit pattern so that values which encode differently never
// share an identity key (and NaN stays equal to itself).
impl PartialEq for ParameterValue {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Integer(lhs), Self::Integer(rhs)) => lhs == rhs,
			(Self::String(lhs), Self::String(rhs)) => lhs == rhs,
			(Self::Raw(lhs), Self::Raw(rhs)) => lhs == rhs,
			(Self::Real(lhs), Self::Real(rhs)) => lhs.to_bits() == rhs.to_bits(),
			_ => false,
		}
	}
}

impl Eq for ParameterValue {}

impl Hash for ParameterValue {
	fn hash<H: Hasher>(&self, state: &mut H) {
		std::mem::discriminant(self).hash(state);
		match self {
			Self::Integer(value) => value.hash(state),
			Self::String(text) | Self::Raw(text) => text.hash(state),
			Self::Real(value) => value.to_bits().hash(state),
		}
	}
}

impl fmt::Display for ParameterValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.encode())
	}
}

impl From<BigInt> for ParameterValue {
	fn from(value: BigInt) -> Self {
		Self::Integer(value)
	}
}

macro_rules! impl_integer_parameter {
	($($t: ty),*) => {
		$(
			impl From<$t> for ParameterValue {
				fn from(value: $t) -> Self {
					Self::Integer(value.into())
				}
			}
		)*
	}
}

impl_integer_parameter!(i32, i64, u32, u64);

impl From<f64> for ParameterValue {
	fn from(value: f64) -> Self {
		Self::Real(value)
	}
}

impl From<&str> for ParameterValue {
	fn from(text: &str) -> Self {
		Self::String(text.into())
	}
}

impl From<String> for ParameterValue {
	fn from(text: String) -> Self {
		Self::String(text)
	}
}

/// Quotes and escapes a string parameter
pub fn encode_string(text: &str) -> String {
	let mut result = String::with_capacity(text.len() + 2);
	result.push('"');
	for c in text.chars() {
		match c {
			'"' => result.push_str("\\\""),
			'\\' => result.push_str("\\\\"),
			'\n' => result.push_str("\\n"),
			'\t' => result.push_str("\\t"),
			c if c.is_ascii_control() => result.push_str(&format!("\\{:03o}", c as u32)),
			c => result.push(c),
		}
	}
	result.push('"');
	result
}

/// Recovers the original text from an encoded string parameter.
/// Returns `None` if the literal is malformed.
pub fn decode_string(literal: &str) -> Option<String> {
	let inner = literal.strip_prefix('"')?.strip_suffix('"')?;
	let mut result = String::with_capacity(inner.len());
	let mut chars = inner.chars();

	while let Some(c) = chars.next() {
		match c {
			'\\' => match chars.next()? {
				'"' => result.push('"'),
				'\\' => result.push('\\'),
				'n' => result.push('\n'),
				't' => result.push('\t'),
				d @ '0'..='7' => {
					let mut code = d.to_digit(8)?;
					for _ in 0..2 {
						code = code * 8 + chars.next()?.to_digit(8)?;
					}
					result.push(char::from_u32(code)?);
				},
				_ => return None,
			},

			// Unescaped delimiter inside the literal
			'"' => return None,
			c => result.push(c),
		}
	}

	Some(result)
}
