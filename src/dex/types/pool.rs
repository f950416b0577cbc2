use std::collections::HashMap;

use color_eyre::{
	eyre::{eyre, WrapErr},
	Result,
};
use tracing::debug;

use crate::dex::{
	parser::{ParseError, Parser},
	types::{descriptor::Descriptor, header::Section},
};

pub const NO_INDEX: u32 = 0xffff_ffff;

fn check_index(what: &'static str, index: usize, len: usize) -> Result<()> {
	if index >= len {
		return Err(ParseError::index_out_of_range(what, index, len).into());
	}
	Ok(())
}

/// String pool: dense ids `[0, N)` onto decoded MUTF-8 strings.
#[derive(Debug)]
pub struct Strings {
	offset:  u32,
	strings: Vec<String>,
}

impl Strings {
	#[cfg_attr(feature = "trace", instrument(skip(parser)))]
	pub(crate) fn parse<P: Parser>(parser: &mut P, section: Section) -> Result<Self> {
		let Section { size, offset } = section;
		debug!(count = size, offset, "parsing string ids");
		let strings = parser
			.with_offset(offset, |p| {
				let data_offsets: Vec<u32> = p.parse_list(size)?;
				data_offsets
					.into_iter()
					.map(|data_off| {
						p.with_offset(data_off, |p| {
							let utf16_len = p.uleb128()?;
							p.parse_string(*utf16_len)
						})?
						.ok_or_else(|| eyre!("string data offset is 0"))
					})
					.collect::<Result<Vec<_>>>()
			})
			.wrap_err("parsing string pool")?
			.unwrap_or_default();

		Ok(Strings { offset, strings })
	}

	pub fn get_string_by_id(&self, id: u32) -> Result<&str> {
		check_index("string", id as usize, self.strings.len())?;
		Ok(&self.strings[id as usize])
	}

	pub fn number_of_strings(&self) -> u32 {
		self.strings.len() as u32
	}

	pub fn offset(&self) -> u32 {
		self.offset
	}
}

/// One type pool entry: the string id the section references plus the
/// descriptor parsed from it.
#[derive(Debug, Clone)]
pub struct TypeEntry {
	pub string_id:  u32,
	pub descriptor: Descriptor,
}

/// Type pool. Entries keep their section order; `get_type_by_id` keys
/// on the referenced string id, `get_type_by_order` on section order.
#[derive(Debug)]
pub struct Types {
	offset:  u32,
	entries: Vec<TypeEntry>,
	by_id:   HashMap<u32, usize>,
}

impl Types {
	#[cfg_attr(feature = "trace", instrument(skip(parser, strings)))]
	pub(crate) fn parse<P: Parser>(
		parser: &mut P,
		section: Section,
		strings: &Strings,
	) -> Result<Self> {
		let Section { size, offset } = section;
		debug!(count = size, offset, "parsing type ids");
		let entries = parser
			.with_offset(offset, |p| {
				(0..size)
					.map(|_| {
						let string_id = p.u32()?;
						let raw = strings.get_string_by_id(string_id)?;
						let descriptor = Descriptor::parse(raw)?;
						Ok(TypeEntry {
							string_id,
							descriptor,
						})
					})
					.collect::<Result<Vec<_>>>()
			})
			.wrap_err("parsing type pool")?
			.unwrap_or_default();

		let by_id = entries
			.iter()
			.enumerate()
			.map(|(order, entry)| (entry.string_id, order))
			.collect();

		Ok(Types {
			offset,
			entries,
			by_id,
		})
	}

	pub fn get_type_by_id(&self, string_id: u32) -> Result<&Descriptor> {
		self.by_id
			.get(&string_id)
			.map(|&order| &self.entries[order].descriptor)
			.ok_or_else(|| {
				ParseError::index_out_of_range("type", string_id as usize, self.entries.len())
					.into()
			})
	}

	pub fn get_type_by_order(&self, order: u32) -> Result<&Descriptor> {
		check_index("type", order as usize, self.entries.len())?;
		Ok(&self.entries[order as usize].descriptor)
	}

	pub fn number_of_types(&self) -> u32 {
		self.entries.len() as u32
	}

	pub fn offset(&self) -> u32 {
		self.offset
	}
}

/// https://source.android.com/devices/tech/dalvik/dex-format#proto-id-item
#[derive(Debug, Clone)]
pub struct ProtoEntry {
	pub shorty:          String,
	pub return_type_idx: u32,
	pub parameter_idxs:  Vec<u32>,
}

#[derive(Debug)]
pub struct Protos {
	offset:  u32,
	entries: Vec<ProtoEntry>,
}

impl Protos {
	#[cfg_attr(feature = "trace", instrument(skip(parser, strings, types)))]
	pub(crate) fn parse<P: Parser>(
		parser: &mut P,
		section: Section,
		strings: &Strings,
		types: &Types,
	) -> Result<Self> {
		let Section { size, offset } = section;
		debug!(count = size, offset, "parsing proto ids");
		let entries = parser
			.with_offset(offset, |p| {
				(0..size)
					.map(|_| {
						let shorty_idx = p.u32()?;
						let return_type_idx = p.u32()?;
						let parameters_off = p.u32()?;

						let shorty = strings.get_string_by_id(shorty_idx)?.to_string();
						check_index(
							"type",
							return_type_idx as usize,
							types.number_of_types() as usize,
						)?;

						let parameter_idxs = p
							.with_offset(parameters_off, |p| {
								let size = p.u32()?;
								let idxs = p.parse_list::<u16>(size)?;
								idxs.into_iter()
									.map(|idx| {
										check_index(
											"type",
											idx as usize,
											types.number_of_types() as usize,
										)?;
										Ok(idx as u32)
									})
									.collect::<Result<Vec<_>>>()
							})?
							.unwrap_or_default();

						Ok(ProtoEntry {
							shorty,
							return_type_idx,
							parameter_idxs,
						})
					})
					.collect::<Result<Vec<_>>>()
			})
			.wrap_err("parsing proto pool")?
			.unwrap_or_default();

		Ok(Protos { offset, entries })
	}

	pub fn get_proto_by_id(&self, id: u32) -> Result<&ProtoEntry> {
		check_index("proto", id as usize, self.entries.len())?;
		Ok(&self.entries[id as usize])
	}

	pub fn number_of_protos(&self) -> u32 {
		self.entries.len() as u32
	}

	pub fn offset(&self) -> u32 {
		self.offset
	}
}

/// https://source.android.com/devices/tech/dalvik/dex-format#field-id-item
#[derive(Debug, Clone)]
pub struct FieldEntry {
	pub class_idx: u32,
	pub type_idx:  u32,
	pub name_idx:  u32,
}

#[derive(Debug)]
pub struct Fields {
	offset:  u32,
	entries: Vec<FieldEntry>,
}

impl Fields {
	#[cfg_attr(feature = "trace", instrument(skip(parser, strings, types)))]
	pub(crate) fn parse<P: Parser>(
		parser: &mut P,
		section: Section,
		strings: &Strings,
		types: &Types,
	) -> Result<Self> {
		let Section { size, offset } = section;
		debug!(count = size, offset, "parsing field ids");
		let entries = parser
			.with_offset(offset, |p| {
				(0..size)
					.map(|_| {
						let class_idx = p.u16()? as u32;
						let type_idx = p.u16()? as u32;
						let name_idx = p.u32()?;

						check_index("type", class_idx as usize, types.number_of_types() as usize)?;
						check_index("type", type_idx as usize, types.number_of_types() as usize)?;
						check_index(
							"string",
							name_idx as usize,
							strings.number_of_strings() as usize,
						)?;

						Ok(FieldEntry {
							class_idx,
							type_idx,
							name_idx,
						})
					})
					.collect::<Result<Vec<_>>>()
			})
			.wrap_err("parsing field pool")?
			.unwrap_or_default();

		Ok(Fields { offset, entries })
	}

	pub fn get_field_by_id(&self, id: u32) -> Result<&FieldEntry> {
		check_index("field", id as usize, self.entries.len())?;
		Ok(&self.entries[id as usize])
	}

	pub fn number_of_fields(&self) -> u32 {
		self.entries.len() as u32
	}

	pub fn offset(&self) -> u32 {
		self.offset
	}
}

/// https://source.android.com/devices/tech/dalvik/dex-format#method-id-item
#[derive(Debug, Clone)]
pub struct MethodEntry {
	pub class_idx: u32,
	pub proto_idx: u32,
	pub name_idx:  u32,
}

#[derive(Debug)]
pub struct Methods {
	offset:  u32,
	entries: Vec<MethodEntry>,
}

impl Methods {
	#[cfg_attr(feature = "trace", instrument(skip(parser, strings, types, protos)))]
	pub(crate) fn parse<P: Parser>(
		parser: &mut P,
		section: Section,
		strings: &Strings,
		types: &Types,
		protos: &Protos,
	) -> Result<Self> {
		let Section { size, offset } = section;
		debug!(count = size, offset, "parsing method ids");
		let entries = parser
			.with_offset(offset, |p| {
				(0..size)
					.map(|_| {
						let class_idx = p.u16()? as u32;
						let proto_idx = p.u16()? as u32;
						let name_idx = p.u32()?;

						check_index("type", class_idx as usize, types.number_of_types() as usize)?;
						check_index(
							"proto",
							proto_idx as usize,
							protos.number_of_protos() as usize,
						)?;
						check_index(
							"string",
							name_idx as usize,
							strings.number_of_strings() as usize,
						)?;

						Ok(MethodEntry {
							class_idx,
							proto_idx,
							name_idx,
						})
					})
					.collect::<Result<Vec<_>>>()
			})
			.wrap_err("parsing method pool")?
			.unwrap_or_default();

		Ok(Methods { offset, entries })
	}

	pub fn get_method_by_id(&self, id: u32) -> Result<&MethodEntry> {
		check_index("method", id as usize, self.entries.len())?;
		Ok(&self.entries[id as usize])
	}

	pub fn number_of_methods(&self) -> u32 {
		self.entries.len() as u32
	}

	pub fn offset(&self) -> u32 {
		self.offset
	}
}

/// https://source.android.com/devices/tech/dalvik/dex-format#code-item
#[derive(Debug, Clone)]
pub struct CodeItem {
	pub registers_size: u16,
	pub ins_size:       u16,
	pub outs_size:      u16,
	pub debug_info_off: u32,
	/// Raw 16-bit code units; decoding them is the disassembler's job.
	pub insns:          Vec<u16>,
	pub tries:          Vec<TryItem>,
	pub handlers:       Vec<EncodedCatchHandler>,
}

/// https://source.android.com/devices/tech/dalvik/dex-format#type-item
#[derive(Debug, Copy, Clone)]
pub struct TryItem {
	pub start_addr:  u32,
	pub insn_count:  u16,
	pub handler_off: u16,
}

/// https://source.android.com/devices/tech/dalvik/dex-format#encoded-catch-handler
#[derive(Debug, Clone)]
pub struct EncodedCatchHandler {
	pub handlers:       Vec<(u32, u32)>,
	pub catch_all_addr: Option<u32>,
}

impl CodeItem {
	fn parse<P: Parser>(parser: &mut P) -> Result<Self> {
		parser.align(4)?;

		let registers_size = parser.u16()?;
		let ins_size = parser.u16()?;
		let outs_size = parser.u16()?;
		let tries_size = parser.u16()?;
		let debug_info_off = parser.u32()?;
		let insns_size = parser.u32()?;

		let mut insns = Vec::with_capacity(insns_size as usize);
		for _ in 0..insns_size {
			insns.push(parser.u16()?);
		}

		let (tries, handlers) = if tries_size != 0 {
			if insns_size % 2 != 0 {
				parser.u16()?; // padding
			}

			let tries = (0..tries_size)
				.map(|_| {
					Ok(TryItem {
						start_addr:  parser.u32()?,
						insn_count:  parser.u16()?,
						handler_off: parser.u16()?,
					})
				})
				.collect::<Result<Vec<_>>>()?;

			let list_size = parser.uleb128()?;
			let handlers = (0..*list_size)
				.map(|_| {
					let size = parser.sleb128()?;
					let pairs = (0..size.abs())
						.map(|_| Ok((*parser.uleb128()?, *parser.uleb128()?)))
						.collect::<Result<Vec<_>>>()?;
					let catch_all_addr = if *size <= 0 {
						Some(*parser.uleb128()?)
					} else {
						None
					};
					Ok(EncodedCatchHandler {
						handlers: pairs,
						catch_all_addr,
					})
				})
				.collect::<Result<Vec<_>>>()?;

			(tries, handlers)
		} else {
			(vec![], vec![])
		};

		Ok(CodeItem {
			registers_size,
			ins_size,
			outs_size,
			debug_info_off,
			insns,
			tries,
			handlers,
		})
	}
}

#[derive(Debug, Clone)]
pub struct EncodedField {
	pub field_idx:    u32,
	pub access_flags: u32,
}

#[derive(Debug, Clone)]
pub struct EncodedMethod {
	pub method_idx:   u32,
	pub access_flags: u32,
	pub code:         Option<CodeItem>,
}

/// https://source.android.com/devices/tech/dalvik/dex-format#class-data-item
#[derive(Debug, Clone)]
pub struct ClassData {
	pub static_fields:   Vec<EncodedField>,
	pub instance_fields: Vec<EncodedField>,
	pub direct_methods:  Vec<EncodedMethod>,
	pub virtual_methods: Vec<EncodedMethod>,
}

impl ClassData {
	fn parse<P: Parser>(parser: &mut P, fields: &Fields, methods: &Methods) -> Result<Self> {
		let static_fields_size = *parser.uleb128()?;
		let instance_fields_size = *parser.uleb128()?;
		let direct_methods_size = *parser.uleb128()?;
		let virtual_methods_size = *parser.uleb128()?;

		// idx_diff encoding: the first entry carries an absolute id,
		// every following entry the difference to its predecessor.
		let parse_fields = |p: &mut P, count: u32| -> Result<Vec<EncodedField>> {
			let mut out = Vec::with_capacity(count as usize);
			let mut field_idx = 0u32;
			for i in 0..count {
				let diff = *p.uleb128()?;
				// the diff is attacker-controlled; a wrapped sum would
				// alias a valid id instead of failing the bounds check
				field_idx = if i == 0 {
					diff
				} else {
					field_idx.checked_add(diff).ok_or_else(|| {
						ParseError::index_out_of_range(
							"field",
							usize::MAX,
							fields.number_of_fields() as usize,
						)
					})?
				};
				check_index(
					"field",
					field_idx as usize,
					fields.number_of_fields() as usize,
				)?;
				out.push(EncodedField {
					field_idx,
					access_flags: *p.uleb128()?,
				});
			}
			Ok(out)
		};

		let parse_methods = |p: &mut P, count: u32| -> Result<Vec<EncodedMethod>> {
			let mut out = Vec::with_capacity(count as usize);
			let mut method_idx = 0u32;
			for i in 0..count {
				let diff = *p.uleb128()?;
				method_idx = if i == 0 {
					diff
				} else {
					method_idx.checked_add(diff).ok_or_else(|| {
						ParseError::index_out_of_range(
							"method",
							usize::MAX,
							methods.number_of_methods() as usize,
						)
					})?
				};
				check_index(
					"method",
					method_idx as usize,
					methods.number_of_methods() as usize,
				)?;
				let access_flags = *p.uleb128()?;
				let code_off = *p.uleb128()?;
				let code = p.with_offset(code_off, CodeItem::parse)?;
				out.push(EncodedMethod {
					method_idx,
					access_flags,
					code,
				});
			}
			Ok(out)
		};

		Ok(ClassData {
			static_fields:   parse_fields(parser, static_fields_size)?,
			instance_fields: parse_fields(parser, instance_fields_size)?,
			direct_methods:  parse_methods(parser, direct_methods_size)?,
			virtual_methods: parse_methods(parser, virtual_methods_size)?,
		})
	}
}

/// https://source.android.com/devices/tech/dalvik/dex-format#class-def-item
#[derive(Debug, Clone)]
pub struct ClassDef {
	pub class_idx:       u32,
	pub access_flags:    u32,
	pub superclass_idx:  Option<u32>,
	pub interfaces:      Vec<u32>,
	pub source_file_idx: Option<u32>,
	pub class_data:      Option<ClassData>,
}

#[derive(Debug)]
pub struct Classes {
	offset:  u32,
	classes: Vec<ClassDef>,
}

impl Classes {
	#[cfg_attr(
		feature = "trace",
		instrument(skip(parser, strings, types, fields, methods))
	)]
	pub(crate) fn parse<P: Parser>(
		parser: &mut P,
		section: Section,
		strings: &Strings,
		types: &Types,
		fields: &Fields,
		methods: &Methods,
	) -> Result<Self> {
		let Section { size, offset } = section;
		debug!(count = size, offset, "parsing class defs");
		let classes = parser
			.with_offset(offset, |p| {
				(0..size)
					.map(|_| {
						let class_idx = p.u32()?;
						let access_flags = p.u32()?;
						let superclass_idx = p.u32()?;
						let interfaces_off = p.u32()?;
						let source_file_idx = p.u32()?;
						let _annotations_off = p.u32()?;
						let class_data_off = p.u32()?;
						let _static_values_off = p.u32()?;

						check_index("type", class_idx as usize, types.number_of_types() as usize)?;
						let superclass_idx = if superclass_idx == NO_INDEX {
							None
						} else {
							check_index(
								"type",
								superclass_idx as usize,
								types.number_of_types() as usize,
							)?;
							Some(superclass_idx)
						};
						let source_file_idx = if source_file_idx == NO_INDEX {
							None
						} else {
							check_index(
								"string",
								source_file_idx as usize,
								strings.number_of_strings() as usize,
							)?;
							Some(source_file_idx)
						};

						let interfaces = p
							.with_offset(interfaces_off, |p| {
								let size = p.u32()?;
								let idxs = p.parse_list::<u16>(size)?;
								idxs.into_iter()
									.map(|idx| {
										check_index(
											"type",
											idx as usize,
											types.number_of_types() as usize,
										)?;
										Ok(idx as u32)
									})
									.collect::<Result<Vec<_>>>()
							})?
							.unwrap_or_default();

						let class_data = p
							.with_offset(class_data_off, |p| ClassData::parse(p, fields, methods))?;

						Ok(ClassDef {
							class_idx,
							access_flags,
							superclass_idx,
							interfaces,
							source_file_idx,
							class_data,
						})
					})
					.collect::<Result<Vec<_>>>()
			})
			.wrap_err("parsing class defs")?
			.unwrap_or_default();

		Ok(Classes { offset, classes })
	}

	pub fn get_class_by_order(&self, order: u32) -> Result<&ClassDef> {
		check_index("class", order as usize, self.classes.len())?;
		Ok(&self.classes[order as usize])
	}

	pub fn iter(&self) -> impl Iterator<Item = &ClassDef> {
		self.classes.iter()
	}

	pub fn number_of_classes(&self) -> u32 {
		self.classes.len() as u32
	}

	pub fn offset(&self) -> u32 {
		self.offset
	}
}

#[cfg(test)]
mod tests {
	use crate::dex::{testutil::DexBuilder, types::descriptor::Descriptor, Dex};

	#[test]
	fn single_fundamental_type() {
		let image = DexBuilder::new().string("I").typ(0).build();
		let dex = Dex::from_bytes(&image).unwrap();

		assert_eq!(dex.strings.number_of_strings(), 1);
		assert_eq!(dex.types.number_of_types(), 1);

		let typ = dex.types.get_type_by_id(0).unwrap();
		assert_eq!(typ.raw(), "I");
		match typ {
			Descriptor::Fundamental { .. } => {}
			other => panic!("expected fundamental, got {:?}", other),
		}
		assert_eq!(dex.types.get_type_by_order(0).unwrap().raw(), "I");
	}

	#[test]
	fn nested_array_type() {
		let image = DexBuilder::new().string("[[Ljava/lang/Object;").typ(0).build();
		let dex = Dex::from_bytes(&image).unwrap();

		let typ = dex.types.get_type_by_id(0).unwrap();
		assert_eq!(typ.arity(), 2);
		assert_eq!(typ.element().raw(), "Ljava/lang/Object;");
	}

	#[test]
	fn type_referencing_missing_string_is_rejected() {
		let image = DexBuilder::new().string("I").typ(7).build();
		assert!(Dex::from_bytes(&image).is_err());
	}

	#[test]
	fn field_cross_references_resolve() {
		let image = DexBuilder::new()
			.string("I") // 0
			.string("Lcom/example/Point;") // 1
			.string("x") // 2
			.typ(0) // type order 0: I
			.typ(1) // type order 1: the class
			.field(1, 0, 2)
			.build();
		let dex = Dex::from_bytes(&image).unwrap();

		let field = dex.fields.get_field_by_id(0).unwrap();
		assert_eq!(
			dex.types.get_type_by_order(field.class_idx).unwrap().raw(),
			"Lcom/example/Point;"
		);
		assert_eq!(dex.types.get_type_by_order(field.type_idx).unwrap().raw(), "I");
		assert_eq!(dex.strings.get_string_by_id(field.name_idx).unwrap(), "x");
	}

	#[test]
	fn field_with_bad_type_index_is_rejected() {
		let image = DexBuilder::new()
			.string("I")
			.string("x")
			.typ(0)
			.field(0, 9, 1)
			.build();
		assert!(Dex::from_bytes(&image).is_err());
	}

	#[test]
	fn method_and_proto_resolve() {
		let image = DexBuilder::new()
			.string("II") // 0: shorty
			.string("I") // 1
			.string("Lcom/example/A;") // 2
			.string("addOne") // 3
			.typ(1) // order 0: I
			.typ(2) // order 1: class
			.proto(0, 0, &[0])
			.method(1, 0, 3)
			.build();
		let dex = Dex::from_bytes(&image).unwrap();

		let method = dex.methods.get_method_by_id(0).unwrap();
		assert_eq!(dex.strings.get_string_by_id(method.name_idx).unwrap(), "addOne");
		let proto = dex.protos.get_proto_by_id(method.proto_idx).unwrap();
		assert_eq!(proto.shorty, "II");
		assert_eq!(
			dex.types
				.get_type_by_order(proto.return_type_idx)
				.unwrap()
				.raw(),
			"I"
		);
		assert_eq!(proto.parameter_idxs, vec![0]);
	}

	#[test]
	fn class_with_code_exposes_raw_code_units() {
		let image = DexBuilder::new()
			.string("V") // 0
			.string("()V") // 1 (shorty-ish, content irrelevant)
			.string("Lcom/example/A;") // 2
			.string("doNothing") // 3
			.typ(0) // order 0: V
			.typ(2) // order 1: class
			.proto(1, 0, &[])
			.method(1, 0, 3)
			.class(1, &[(0, 1, 0, vec![0x000e])]) // return-void
			.build();
		let dex = Dex::from_bytes(&image).unwrap();

		let class = dex.classes.get_class_by_order(0).unwrap();
		let data = class.class_data.as_ref().unwrap();
		assert_eq!(data.direct_methods.len(), 1);
		let code = data.direct_methods[0].code.as_ref().unwrap();
		assert_eq!(code.insns, vec![0x000e]);
		assert_eq!(code.registers_size, 1);
	}
}
