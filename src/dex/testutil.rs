//! In-memory DEX image builder for tests. Only covers what the tests
//! feed the parser: ASCII strings, the six id sections, and direct
//! methods with raw code units.

const HEADER_SIZE: u32 = 0x70;
const ENDIAN_CONSTANT: u32 = 0x12345678;
const NO_INDEX: u32 = 0xffff_ffff;

type MethodSpec = (u32, u16, u16, Vec<u16>);

#[derive(Default)]
pub struct DexBuilder {
	strings: Vec<String>,
	types:   Vec<u32>,
	protos:  Vec<(u32, u32, Vec<u32>)>,
	fields:  Vec<(u32, u32, u32)>,
	methods: Vec<(u32, u32, u32)>,
	classes: Vec<(u32, Vec<MethodSpec>)>,
}

impl DexBuilder {
	pub fn new() -> DexBuilder {
		DexBuilder::default()
	}

	pub fn string(mut self, value: &str) -> Self {
		assert!(value.is_ascii(), "builder only encodes ASCII strings");
		self.strings.push(value.to_string());
		self
	}

	/// Adds a type id entry referencing `string_id`.
	pub fn typ(mut self, string_id: u32) -> Self {
		self.types.push(string_id);
		self
	}

	/// Adds a proto: shorty string id, return type order, parameter
	/// type orders.
	pub fn proto(mut self, shorty_id: u32, return_type_order: u32, params: &[u32]) -> Self {
		self.protos
			.push((shorty_id, return_type_order, params.to_vec()));
		self
	}

	/// Adds a field id: class type order, field type order, name
	/// string id.
	pub fn field(mut self, class_order: u32, type_order: u32, name_id: u32) -> Self {
		self.fields.push((class_order, type_order, name_id));
		self
	}

	/// Adds a method id: class type order, proto id, name string id.
	pub fn method(mut self, class_order: u32, proto_id: u32, name_id: u32) -> Self {
		self.methods.push((class_order, proto_id, name_id));
		self
	}

	/// Adds a class def whose direct methods are given as
	/// `(method_id, registers_size, ins_size, code_units)`.
	pub fn class(mut self, class_order: u32, methods: &[MethodSpec]) -> Self {
		self.classes.push((class_order, methods.to_vec()));
		self
	}

	pub fn build(self) -> Vec<u8> {
		let string_ids_off = HEADER_SIZE;
		let type_ids_off = string_ids_off + 4 * self.strings.len() as u32;
		let proto_ids_off = type_ids_off + 4 * self.types.len() as u32;
		let field_ids_off = proto_ids_off + 12 * self.protos.len() as u32;
		let method_ids_off = field_ids_off + 8 * self.fields.len() as u32;
		let class_defs_off = method_ids_off + 8 * self.methods.len() as u32;
		let data_off = class_defs_off + 32 * self.classes.len() as u32;

		let mut data: Vec<u8> = Vec::new();
		let abs = |data: &Vec<u8>| data_off + data.len() as u32;
		let align4 = |data: &mut Vec<u8>| {
			while (data_off + data.len() as u32) % 4 != 0 {
				data.push(0);
			}
		};

		let string_data_offs: Vec<u32> = self
			.strings
			.iter()
			.map(|s| {
				let off = abs(&data);
				leb128::write::unsigned(&mut data, s.len() as u64).unwrap();
				data.extend_from_slice(s.as_bytes());
				data.push(0);
				off
			})
			.collect();

		let proto_param_offs: Vec<u32> = self
			.protos
			.iter()
			.map(|(_, _, params)| {
				if params.is_empty() {
					return 0;
				}
				align4(&mut data);
				let off = abs(&data);
				data.extend_from_slice(&(params.len() as u32).to_le_bytes());
				for &p in params {
					data.extend_from_slice(&(p as u16).to_le_bytes());
				}
				off
			})
			.collect();

		let class_data_offs: Vec<u32> = self
			.classes
			.iter()
			.map(|(_, methods)| {
				if methods.is_empty() {
					return 0;
				}

				let code_offs: Vec<u32> = methods
					.iter()
					.map(|(_, regs, ins, code)| {
						align4(&mut data);
						let off = abs(&data);
						data.extend_from_slice(&regs.to_le_bytes());
						data.extend_from_slice(&ins.to_le_bytes());
						data.extend_from_slice(&0u16.to_le_bytes()); // outs
						data.extend_from_slice(&0u16.to_le_bytes()); // tries
						data.extend_from_slice(&0u32.to_le_bytes()); // debug_info_off
						data.extend_from_slice(&(code.len() as u32).to_le_bytes());
						for unit in code {
							data.extend_from_slice(&unit.to_le_bytes());
						}
						off
					})
					.collect();

				let off = abs(&data);
				leb128::write::unsigned(&mut data, 0).unwrap(); // static fields
				leb128::write::unsigned(&mut data, 0).unwrap(); // instance fields
				leb128::write::unsigned(&mut data, methods.len() as u64).unwrap();
				leb128::write::unsigned(&mut data, 0).unwrap(); // virtual methods

				let mut prev_idx = 0;
				for (i, ((method_idx, _, _, _), code_off)) in
					methods.iter().zip(&code_offs).enumerate()
				{
					let diff = if i == 0 {
						*method_idx
					} else {
						method_idx - prev_idx
					};
					prev_idx = *method_idx;
					leb128::write::unsigned(&mut data, diff as u64).unwrap();
					leb128::write::unsigned(&mut data, 0x8).unwrap(); // access_flags: static
					leb128::write::unsigned(&mut data, *code_off as u64).unwrap();
				}
				off
			})
			.collect();

		let file_size = data_off + data.len() as u32;
		let mut image = Vec::with_capacity(file_size as usize);

		image.extend_from_slice(b"dex\n035\0");
		image.extend_from_slice(&0u32.to_le_bytes()); // checksum
		image.extend_from_slice(&[0u8; 20]); // signature
		image.extend_from_slice(&file_size.to_le_bytes());
		image.extend_from_slice(&HEADER_SIZE.to_le_bytes());
		image.extend_from_slice(&ENDIAN_CONSTANT.to_le_bytes());
		image.extend_from_slice(&0u32.to_le_bytes()); // link_size
		image.extend_from_slice(&0u32.to_le_bytes()); // link_off
		image.extend_from_slice(&0u32.to_le_bytes()); // map_off

		let section = |image: &mut Vec<u8>, count: usize, off: u32| {
			image.extend_from_slice(&(count as u32).to_le_bytes());
			let off = if count == 0 { 0 } else { off };
			image.extend_from_slice(&off.to_le_bytes());
		};
		section(&mut image, self.strings.len(), string_ids_off);
		section(&mut image, self.types.len(), type_ids_off);
		section(&mut image, self.protos.len(), proto_ids_off);
		section(&mut image, self.fields.len(), field_ids_off);
		section(&mut image, self.methods.len(), method_ids_off);
		section(&mut image, self.classes.len(), class_defs_off);
		image.extend_from_slice(&(data.len() as u32).to_le_bytes());
		image.extend_from_slice(&data_off.to_le_bytes());

		assert_eq!(image.len() as u32, HEADER_SIZE);

		for off in string_data_offs {
			image.extend_from_slice(&off.to_le_bytes());
		}
		for string_id in &self.types {
			image.extend_from_slice(&string_id.to_le_bytes());
		}
		for ((shorty_id, ret, _), params_off) in self.protos.iter().zip(&proto_param_offs) {
			image.extend_from_slice(&shorty_id.to_le_bytes());
			image.extend_from_slice(&ret.to_le_bytes());
			image.extend_from_slice(&params_off.to_le_bytes());
		}
		for (class, typ, name) in &self.fields {
			image.extend_from_slice(&(*class as u16).to_le_bytes());
			image.extend_from_slice(&(*typ as u16).to_le_bytes());
			image.extend_from_slice(&name.to_le_bytes());
		}
		for (class, proto, name) in &self.methods {
			image.extend_from_slice(&(*class as u16).to_le_bytes());
			image.extend_from_slice(&(*proto as u16).to_le_bytes());
			image.extend_from_slice(&name.to_le_bytes());
		}
		for ((class_order, _), class_data_off) in self.classes.iter().zip(&class_data_offs) {
			image.extend_from_slice(&class_order.to_le_bytes());
			image.extend_from_slice(&0u32.to_le_bytes()); // access_flags
			image.extend_from_slice(&NO_INDEX.to_le_bytes()); // superclass
			image.extend_from_slice(&0u32.to_le_bytes()); // interfaces_off
			image.extend_from_slice(&NO_INDEX.to_le_bytes()); // source_file
			image.extend_from_slice(&0u32.to_le_bytes()); // annotations_off
			image.extend_from_slice(&class_data_off.to_le_bytes());
			image.extend_from_slice(&0u32.to_le_bytes()); // static_values_off
		}

		assert_eq!(image.len() as u32, data_off);
		image.extend_from_slice(&data);

		image
	}
}
