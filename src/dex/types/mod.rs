pub mod descriptor;
pub mod header;
pub mod pool;

pub use descriptor::{Descriptor, Fundamental};
pub use header::{Header, Section};
pub use pool::{
	ClassData,
	ClassDef,
	Classes,
	CodeItem,
	EncodedMethod,
	FieldEntry,
	Fields,
	MethodEntry,
	Methods,
	ProtoEntry,
	Protos,
	Strings,
	TypeEntry,
	Types,
};
