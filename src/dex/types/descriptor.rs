use std::fmt::{Display, Formatter};

use color_eyre::{eyre::bail, Result};

use crate::dex::parser::ParseError;

/// Class descriptors with one of these as a proper prefix belong to the
/// platform rather than to the application under analysis.
const EXTERNAL_PREFIXES: &[&str] = &[
	"Ljava/",
	"Ljavax/",
	"Lsun/",
	"Landroid/",
	"Landroidx/",
	"Lkotlin/",
	"Ldalvik/",
];

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Fundamental {
	Boolean,
	Byte,
	Char,
	Double,
	Float,
	Int,
	Long,
	Short,
	Void,
}

impl Fundamental {
	pub fn from_letter(letter: char) -> Option<Fundamental> {
		Some(match letter {
			'Z' => Fundamental::Boolean,
			'B' => Fundamental::Byte,
			'C' => Fundamental::Char,
			'D' => Fundamental::Double,
			'F' => Fundamental::Float,
			'I' => Fundamental::Int,
			'J' => Fundamental::Long,
			'S' => Fundamental::Short,
			'V' => Fundamental::Void,
			_ => return None,
		})
	}
}

impl Display for Fundamental {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Fundamental::Boolean => "boolean",
			Fundamental::Byte => "byte",
			Fundamental::Char => "char",
			Fundamental::Double => "double",
			Fundamental::Float => "float",
			Fundamental::Int => "int",
			Fundamental::Long => "long",
			Fundamental::Short => "short",
			Fundamental::Void => "void",
		})
	}
}

/// A Dalvik type descriptor, e.g. `I`, `Ljava/lang/String;` or `[[I`.
///
/// https://source.android.com/devices/tech/dalvik/dex-format#typedescriptor
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum Descriptor {
	Fundamental { kind: Fundamental, raw: String },
	Class { raw: String },
	Array { inner: Box<Descriptor>, raw: String },
	Unknown { raw: String },
}

impl Descriptor {
	/// Classifies a raw descriptor string. Total on non-empty input:
	/// anything that is not a fundamental letter, an `L...` class or a
	/// `[`-prefixed array is kept verbatim as `Unknown`.
	pub fn parse(raw: &str) -> Result<Descriptor> {
		if raw.is_empty() {
			bail!(ParseError::MalformedDescriptor(raw.to_string()));
		}

		// Arrays are unwrapped iteratively so a pathological run of `[`
		// cannot blow the stack; nesting is rebuilt innermost-first.
		let arity = raw.bytes().take_while(|&b| b == b'[').count();
		let element = &raw[arity..];

		let mut typ = if element.len() == 1 {
			match Fundamental::from_letter(element.chars().next().unwrap()) {
				Some(kind) => Descriptor::Fundamental {
					kind,
					raw: element.to_string(),
				},
				None => Descriptor::Unknown {
					raw: element.to_string(),
				},
			}
		} else if element.starts_with('L') {
			Descriptor::Class {
				raw: element.to_string(),
			}
		} else {
			Descriptor::Unknown {
				raw: element.to_string(),
			}
		};

		for depth in 1..=arity {
			typ = Descriptor::Array {
				inner: Box::new(typ),
				raw:   raw[arity - depth..].to_string(),
			};
		}

		Ok(typ)
	}

	/// The descriptor exactly as it appeared in the string pool.
	pub fn raw(&self) -> &str {
		match self {
			Descriptor::Fundamental { raw, .. }
			| Descriptor::Class { raw }
			| Descriptor::Array { raw, .. }
			| Descriptor::Unknown { raw } => raw,
		}
	}

	/// Number of array dimensions; 0 for anything that is not an array.
	pub fn arity(&self) -> usize {
		match self {
			Descriptor::Array { inner, .. } => 1 + inner.arity(),
			_ => 0,
		}
	}

	/// Innermost element type of an array, or the descriptor itself.
	pub fn element(&self) -> &Descriptor {
		match self {
			Descriptor::Array { inner, .. } => inner.element(),
			other => other,
		}
	}

	/// A class is external iff a known platform prefix is a proper
	/// prefix of its descriptor.
	pub fn is_external(&self) -> bool {
		match self {
			Descriptor::Class { raw } => EXTERNAL_PREFIXES
				.iter()
				.any(|prefix| raw.len() > prefix.len() && raw.starts_with(prefix)),
			_ => false,
		}
	}
}

impl Display for Descriptor {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.raw())
	}
}
