pub mod asm;
pub mod disassembler;
pub mod parser;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

use std::io::{Cursor, Read, Seek};

use color_eyre::{eyre::WrapErr, Result};

use crate::dex::{
	parser::{FileParser, Parser},
	types::{
		descriptor::Descriptor,
		header::Header,
		pool::{Classes, Fields, Methods, Protos, Strings, Types},
	},
};

/// A fully resolved DEX symbol model: the header plus every pool,
/// immutable once built. Pool errors abort the whole load; no partial
/// model escapes.
#[derive(Debug)]
pub struct Dex {
	pub header:  Header,
	pub strings: Strings,
	pub types:   Types,
	pub protos:  Protos,
	pub fields:  Fields,
	pub methods: Methods,
	pub classes: Classes,
}

/// Resolved view of one field pool entry.
#[derive(Debug, Clone)]
pub struct FieldView<'a> {
	pub class: &'a Descriptor,
	pub typ:   &'a Descriptor,
	pub name:  &'a str,
}

/// Resolved view of one method pool entry.
#[derive(Debug, Clone)]
pub struct MethodView<'a> {
	pub class:       &'a Descriptor,
	pub name:        &'a str,
	pub shorty:      &'a str,
	pub return_type: &'a Descriptor,
	pub parameters:  Vec<&'a Descriptor>,
}

impl Dex {
	#[cfg_attr(feature = "trace", instrument(skip(reader)))]
	pub fn parse<R: Read + Seek>(reader: R) -> Result<Dex> {
		let mut parser = FileParser::new(reader);

		let header: Header = parser.offset(0)?.parse().wrap_err("parsing header")?;

		let strings = Strings::parse(&mut parser, header.string_ids)?;
		let types = Types::parse(&mut parser, header.type_ids, &strings)?;
		let protos = Protos::parse(&mut parser, header.proto_ids, &strings, &types)?;
		let fields = Fields::parse(&mut parser, header.field_ids, &strings, &types)?;
		let methods = Methods::parse(&mut parser, header.method_ids, &strings, &types, &protos)?;
		let classes = Classes::parse(
			&mut parser,
			header.class_defs,
			&strings,
			&types,
			&fields,
			&methods,
		)?;

		Ok(Dex {
			header,
			strings,
			types,
			protos,
			fields,
			methods,
			classes,
		})
	}

	pub fn from_bytes(bytes: &[u8]) -> Result<Dex> {
		Dex::parse(Cursor::new(bytes))
	}

	/// Finds the encoded method (with its code item) for a method id.
	pub fn method_body(&self, method_id: u32) -> Option<&types::pool::EncodedMethod> {
		self.classes.iter().find_map(|class| {
			class.class_data.as_ref().and_then(|data| {
				data.direct_methods
					.iter()
					.chain(&data.virtual_methods)
					.find(|m| m.method_idx == method_id)
			})
		})
	}

	/// Resolves a field id through the string and type pools.
	pub fn field(&self, id: u32) -> Result<FieldView<'_>> {
		let entry = self.fields.get_field_by_id(id)?;
		Ok(FieldView {
			class: self.types.get_type_by_order(entry.class_idx)?,
			typ:   self.types.get_type_by_order(entry.type_idx)?,
			name:  self.strings.get_string_by_id(entry.name_idx)?,
		})
	}

	/// Resolves a method id through the string, type and proto pools.
	pub fn method(&self, id: u32) -> Result<MethodView<'_>> {
		let entry = self.methods.get_method_by_id(id)?;
		let proto = self.protos.get_proto_by_id(entry.proto_idx)?;
		let parameters = proto
			.parameter_idxs
			.iter()
			.map(|&idx| self.types.get_type_by_order(idx))
			.collect::<Result<Vec<_>>>()?;

		Ok(MethodView {
			class: self.types.get_type_by_order(entry.class_idx)?,
			name: self.strings.get_string_by_id(entry.name_idx)?,
			shorty: &proto.shorty,
			return_type: self.types.get_type_by_order(proto.return_type_idx)?,
			parameters,
		})
	}
}
