use std::fmt::{Display, Formatter};

use color_eyre::Result;

use crate::{
	dex::types::descriptor::{Descriptor, Fundamental},
	mjolnir::LifterError,
};

/// Value-type tag carried by every IR value. `None` marks operations
/// without a result, `Unknown` a block argument whose incoming edges
/// have not been seen yet.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DvmType {
	Boolean,
	Byte,
	Char,
	Short,
	Int,
	Long,
	Float,
	Double,
	Object,
	None,
	Unknown,
}

impl DvmType {
	/// Join of two incoming types at a block argument. `Unknown` is the
	/// bottom element; joining two distinct concrete types is a lifter
	/// error since DEX registers are typed per instruction.
	pub fn join(self, other: DvmType) -> Result<DvmType> {
		match (self, other) {
			(DvmType::Unknown, t) | (t, DvmType::Unknown) => Ok(t),
			(a, b) if a == b => Ok(a),
			(a, b) => Err(LifterError::TypeJoinConflict { left: a, right: b }.into()),
		}
	}
}

impl From<&Descriptor> for DvmType {
	fn from(descriptor: &Descriptor) -> DvmType {
		match descriptor {
			Descriptor::Fundamental { kind, .. } => match kind {
				Fundamental::Boolean => DvmType::Boolean,
				Fundamental::Byte => DvmType::Byte,
				Fundamental::Char => DvmType::Char,
				Fundamental::Short => DvmType::Short,
				Fundamental::Int => DvmType::Int,
				Fundamental::Long => DvmType::Long,
				Fundamental::Float => DvmType::Float,
				Fundamental::Double => DvmType::Double,
				Fundamental::Void => DvmType::None,
			},
			Descriptor::Class { .. } | Descriptor::Array { .. } => DvmType::Object,
			Descriptor::Unknown { .. } => DvmType::Unknown,
		}
	}
}

impl Display for DvmType {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			DvmType::Boolean => "bool",
			DvmType::Byte => "byte",
			DvmType::Char => "char",
			DvmType::Short => "short",
			DvmType::Int => "int",
			DvmType::Long => "long",
			DvmType::Float => "float",
			DvmType::Double => "double",
			DvmType::Object => "object",
			DvmType::None => "none",
			DvmType::Unknown => "?",
		};
		f.write_str(name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn join_with_unknown_is_identity() {
		assert_eq!(DvmType::Unknown.join(DvmType::Int).unwrap(), DvmType::Int);
		assert_eq!(DvmType::Long.join(DvmType::Unknown).unwrap(), DvmType::Long);
		assert_eq!(
			DvmType::Unknown.join(DvmType::Unknown).unwrap(),
			DvmType::Unknown
		);
	}

	#[test]
	fn join_of_equal_types_is_that_type() {
		assert_eq!(DvmType::Int.join(DvmType::Int).unwrap(), DvmType::Int);
	}

	#[test]
	fn join_of_distinct_types_conflicts() {
		assert!(DvmType::Int.join(DvmType::Float).is_err());
	}

	#[test]
	fn descriptors_map_to_type_tags() {
		let int = Descriptor::parse("I").unwrap();
		assert_eq!(DvmType::from(&int), DvmType::Int);
		let class = Descriptor::parse("Ljava/lang/String;").unwrap();
		assert_eq!(DvmType::from(&class), DvmType::Object);
		let array = Descriptor::parse("[I").unwrap();
		assert_eq!(DvmType::from(&array), DvmType::Object);
	}
}
