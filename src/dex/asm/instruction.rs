use byteorder::{LittleEndian, WriteBytesExt};
use color_eyre::{
	eyre::{bail, ensure},
	Result,
};

use crate::dex::{
	asm::{
		format::Format,
		opcode::{Opcode, VALUE_TO_OPCODE},
		DisassemblyError,
	},
	parser::{Parse, Parser},
};

/// A decoded Dalvik instruction. Variants follow the instruction
/// formats; branch offsets are kept signed, registers and pool indices
/// unsigned.
///
/// https://source.android.com/devices/tech/dalvik/instruction-formats#formats
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub enum Instruction {
	/// `ØØ|op`
	Instruction10x(Opcode),

	/// `B|A|op` — `op vA, vB`
	Instruction12x(Opcode, (u8, u8)),
	/// `B|A|op` — `op vA, #+B`
	Instruction11n(Opcode, (u8, i8)),

	/// `AA|op` — `op vAA`
	Instruction11x(Opcode, (u8,)),
	/// `AA|op` — `op +AA`
	Instruction10t(Opcode, (i8,)),

	/// `ØØ|op AAAA` — `op +AAAA`
	Instruction20t(Opcode, (i16,)),

	/// `AA|op BBBB` — `op vAA, vBBBB`
	Instruction22x(Opcode, (u8, u16)),
	/// `AA|op BBBB` — `op vAA, +BBBB`
	Instruction21t(Opcode, (u8, i16)),
	/// `AA|op BBBB` — `op vAA, #+BBBB`
	Instruction21s(Opcode, (u8, i16)),
	/// `AA|op BBBB` — `op vAA, #+BBBB0000(00000000)`
	Instruction21h(Opcode, (u8, i16)),
	/// `AA|op BBBB` — `op vAA, kind@BBBB`
	Instruction21c(Opcode, (u8, u16)),

	/// `AA|op CC|BB` — `op vAA, vBB, vCC`
	Instruction23x(Opcode, (u8, u8, u8)),
	/// `AA|op CC|BB` — `op vAA, vBB, #+CC`
	Instruction22b(Opcode, (u8, u8, i8)),

	/// `B|A|op CCCC` — `op vA, vB, +CCCC`
	Instruction22t(Opcode, (u8, u8, i16)),
	/// `B|A|op CCCC` — `op vA, vB, #+CCCC`
	Instruction22s(Opcode, (u8, u8, i16)),
	/// `B|A|op CCCC` — `op vA, vB, kind@CCCC`
	Instruction22c(Opcode, (u8, u8, u16)),

	/// `ØØ|op AAAAlo AAAAhi` — `op +AAAAAAAA`
	Instruction30t(Opcode, (i32,)),

	/// `ØØ|op AAAA BBBB` — `op vAAAA, vBBBB`
	Instruction32x(Opcode, (u16, u16)),

	/// `AA|op BBBBlo BBBBhi` — `op vAA, #+BBBBBBBB`
	Instruction31i(Opcode, (u8, i32)),
	/// `AA|op BBBBlo BBBBhi` — `op vAA, +BBBBBBBB`
	Instruction31t(Opcode, (u8, i32)),
	/// `AA|op BBBBlo BBBBhi` — `op vAA, string@BBBBBBBB`
	Instruction31c(Opcode, (u8, u32)),

	/// `A|G|op BBBB F|E|D|C`
	///
	/// `[A=5] op {vC, vD, vE, vF, vG}, kind@BBBB` down to `[A=0] op {}, kind@BBBB`
	Instruction35c(Opcode, (u8, u8, u16, u8, u8, u8, u8)),

	/// `AA|op BBBB CCCC`
	///
	/// `op {vCCCC .. vNNNN}, kind@BBBB` where `NNNN = CCCC+AA-1`
	Instruction3rc(Opcode, (u8, u16, u16)),

	/// `A|G|op BBBB F|E|D|C HHHH` — `invoke-polymorphic`
	Instruction45cc(Opcode, (u8, u8, u16, u8, u8, u8, u8, u16)),

	/// `AA|op BBBB CCCC HHHH` — `invoke-polymorphic/range`
	Instruction4rcc(Opcode, (u8, u16, u16, u16)),

	/// `AA|op BBBBlo BBBB BBBB BBBBhi` — `const-wide`
	Instruction51l(Opcode, (u8, u64)),

	/// https://source.android.com/devices/tech/dalvik/dalvik-bytecode#packed-switch
	PackedSwitchPayload { first_key: i32, targets: Vec<i32> },
	/// https://source.android.com/devices/tech/dalvik/dalvik-bytecode#sparse-switch
	SparseSwitchPayload { keys: Vec<i32>, targets: Vec<i32> },
	/// https://source.android.com/devices/tech/dalvik/dalvik-bytecode#fill-array
	FillArrayDataPayload { element_width: u16, size: u32, data: Vec<u8> },
}

macro_rules! ensure_unused_byte {
	($parser:ident, $format:literal) => {{
		let __unused = $parser.u8()?;
		ensure!(
			__unused == 0,
			"expected unused {} byte to be 0, but got {}",
			$format,
			__unused
		);
	}};
}

impl Parse for Instruction {
	#[cfg_attr(feature = "trace", instrument(skip(parser), fields(op, offset = parser.get_offset())))]
	fn parse<P: Parser>(parser: &mut P) -> Result<Self> {
		let address = parser.get_offset();
		let op = {
			let mut opcode_value = parser.u8()? as u16;
			// a zero opcode byte may introduce one of the payload
			// pseudo-instructions (0x0100, 0x0200, 0x0300)
			if opcode_value == 0 {
				opcode_value = (parser.u8()? as u16) << 8;
				if opcode_value == 0 {
					parser.seek(std::io::SeekFrom::Current(-1))?;
				}
			}
			*VALUE_TO_OPCODE
				.get(&opcode_value)
				.ok_or(DisassemblyError::UnknownOpcode {
					value: opcode_value,
					address,
				})?
		};

		#[cfg(feature = "trace")]
		{
			tracing::Span::current().record("op", &tracing::field::display(op));
		}

		Ok(match op.format() {
			Format::Format10x => {
				ensure_unused_byte!(parser, "10x");
				Instruction::Instruction10x(op)
			}

			Format::Format12x => {
				let (a, b) = parser.split_u8()?;
				Instruction::Instruction12x(op, (a, b))
			}
			Format::Format11n => {
				let (a, b) = parser.split_u8()?;
				// sign-extend the literal nibble
				let b = ((b << 4) as i8) >> 4;
				Instruction::Instruction11n(op, (a, b))
			}

			Format::Format11x => {
				let aa = parser.u8()?;
				Instruction::Instruction11x(op, (aa,))
			}
			Format::Format10t => {
				let aa = parser.u8()? as i8;
				Instruction::Instruction10t(op, (aa,))
			}

			Format::Format20t => {
				ensure_unused_byte!(parser, "20t");
				let aaaa = parser.i16()?;
				Instruction::Instruction20t(op, (aaaa,))
			}

			Format::Format22x => {
				let aa = parser.u8()?;
				let bbbb = parser.u16()?;
				Instruction::Instruction22x(op, (aa, bbbb))
			}
			Format::Format21t => {
				let aa = parser.u8()?;
				let bbbb = parser.i16()?;
				Instruction::Instruction21t(op, (aa, bbbb))
			}
			Format::Format21s => {
				let aa = parser.u8()?;
				let bbbb = parser.i16()?;
				Instruction::Instruction21s(op, (aa, bbbb))
			}
			Format::Format21h => {
				let aa = parser.u8()?;
				let bbbb = parser.i16()?;
				Instruction::Instruction21h(op, (aa, bbbb))
			}
			Format::Format21c => {
				let aa = parser.u8()?;
				let bbbb = parser.u16()?;
				Instruction::Instruction21c(op, (aa, bbbb))
			}

			Format::Format23x => {
				let aa = parser.u8()?;
				let bb = parser.u8()?;
				let cc = parser.u8()?;
				Instruction::Instruction23x(op, (aa, bb, cc))
			}
			Format::Format22b => {
				let aa = parser.u8()?;
				let bb = parser.u8()?;
				let cc = parser.u8()? as i8;
				Instruction::Instruction22b(op, (aa, bb, cc))
			}

			Format::Format22t => {
				let (a, b) = parser.split_u8()?;
				let cccc = parser.i16()?;
				Instruction::Instruction22t(op, (a, b, cccc))
			}
			Format::Format22s => {
				let (a, b) = parser.split_u8()?;
				let cccc = parser.i16()?;
				Instruction::Instruction22s(op, (a, b, cccc))
			}
			Format::Format22c => {
				let (a, b) = parser.split_u8()?;
				let cccc = parser.u16()?;
				Instruction::Instruction22c(op, (a, b, cccc))
			}

			Format::Format30t => {
				ensure_unused_byte!(parser, "30t");
				let aaaa_aaaa = parser.i32()?;
				Instruction::Instruction30t(op, (aaaa_aaaa,))
			}

			Format::Format32x => {
				ensure_unused_byte!(parser, "32x");
				let aaaa = parser.u16()?;
				let bbbb = parser.u16()?;
				Instruction::Instruction32x(op, (aaaa, bbbb))
			}

			Format::Format31i => {
				let aa = parser.u8()?;
				let bbbb_bbbb = parser.i32()?;
				Instruction::Instruction31i(op, (aa, bbbb_bbbb))
			}
			Format::Format31t => {
				let aa = parser.u8()?;
				let bbbb_bbbb = parser.i32()?;
				Instruction::Instruction31t(op, (aa, bbbb_bbbb))
			}
			Format::Format31c => {
				let aa = parser.u8()?;
				let bbbb_bbbb = parser.u32()?;
				Instruction::Instruction31c(op, (aa, bbbb_bbbb))
			}

			Format::Format35c => {
				let (g, a) = parser.split_u8()?;
				let bbbb = parser.u16()?;
				let (c, d) = parser.split_u8()?;
				let (e, f) = parser.split_u8()?;
				Instruction::Instruction35c(op, (a, g, bbbb, c, d, e, f))
			}

			Format::Format3rc => {
				let aa = parser.u8()?;
				let bbbb = parser.u16()?;
				let cccc = parser.u16()?;
				Instruction::Instruction3rc(op, (aa, bbbb, cccc))
			}

			Format::Format45cc => {
				let (g, a) = parser.split_u8()?;
				let bbbb = parser.u16()?;
				let (c, d) = parser.split_u8()?;
				let (e, f) = parser.split_u8()?;
				let hhhh = parser.u16()?;
				Instruction::Instruction45cc(op, (a, g, bbbb, c, d, e, f, hhhh))
			}

			Format::Format4rcc => {
				let aa = parser.u8()?;
				let bbbb = parser.u16()?;
				let cccc = parser.u16()?;
				let hhhh = parser.u16()?;
				Instruction::Instruction4rcc(op, (aa, bbbb, cccc, hhhh))
			}

			Format::Format51l => {
				let aa = parser.u8()?;
				let bbbb = parser.u64()?;
				Instruction::Instruction51l(op, (aa, bbbb))
			}

			Format::PackedSwitchPayload => {
				let size = parser.u16()?;
				let first_key = parser.i32()?;
				let targets = parser.parse_list(size as u32)?;
				Instruction::PackedSwitchPayload { first_key, targets }
			}
			Format::SparseSwitchPayload => {
				let size = parser.u16()?;
				let keys = parser.parse_list(size as u32)?;
				let targets = parser.parse_list(size as u32)?;
				Instruction::SparseSwitchPayload { keys, targets }
			}
			Format::ArrayPayload => {
				let element_width = parser.u16()?;
				let size = parser.u32()?;
				let byte_len = element_width as u32 * size;
				let mut data = vec![0u8; byte_len as usize];
				parser.read_exact(&mut data)?;
				// total code units are (size * width + 1) / 2 + 4, so an
				// odd byte count is padded to a unit boundary
				if byte_len % 2 != 0 {
					parser.u8()?;
				}
				Instruction::FillArrayDataPayload {
					element_width,
					size,
					data,
				}
			}
		})
	}
}

impl Instruction {
	pub fn opcode(&self) -> Opcode {
		match self {
			Instruction::Instruction10x(op)
			| Instruction::Instruction12x(op, ..)
			| Instruction::Instruction11n(op, ..)
			| Instruction::Instruction11x(op, ..)
			| Instruction::Instruction10t(op, ..)
			| Instruction::Instruction20t(op, ..)
			| Instruction::Instruction22x(op, ..)
			| Instruction::Instruction21t(op, ..)
			| Instruction::Instruction21s(op, ..)
			| Instruction::Instruction21h(op, ..)
			| Instruction::Instruction21c(op, ..)
			| Instruction::Instruction23x(op, ..)
			| Instruction::Instruction22b(op, ..)
			| Instruction::Instruction22t(op, ..)
			| Instruction::Instruction22s(op, ..)
			| Instruction::Instruction22c(op, ..)
			| Instruction::Instruction30t(op, ..)
			| Instruction::Instruction32x(op, ..)
			| Instruction::Instruction31i(op, ..)
			| Instruction::Instruction31t(op, ..)
			| Instruction::Instruction31c(op, ..)
			| Instruction::Instruction35c(op, ..)
			| Instruction::Instruction3rc(op, ..)
			| Instruction::Instruction45cc(op, ..)
			| Instruction::Instruction4rcc(op, ..)
			| Instruction::Instruction51l(op, ..) => *op,
			Instruction::PackedSwitchPayload { .. } => Opcode::PackedSwitchPayload,
			Instruction::SparseSwitchPayload { .. } => Opcode::SparseSwitchPayload,
			Instruction::FillArrayDataPayload { .. } => Opcode::ArrayPayload,
		}
	}

	/// Length in 16-bit code units; variable for the payloads.
	pub fn code_units(&self) -> u32 {
		match self {
			Instruction::PackedSwitchPayload { targets, .. } => targets.len() as u32 * 2 + 4,
			Instruction::SparseSwitchPayload { targets, .. } => targets.len() as u32 * 4 + 2,
			Instruction::FillArrayDataPayload {
				element_width,
				size,
				..
			} => (*element_width as u32 * size + 1) / 2 + 4,
			other => other
				.opcode()
				.format()
				.code_units()
				.expect("non-payload formats have a fixed size"),
		}
	}

	pub fn is_terminator(&self) -> bool {
		self.opcode().is_terminator()
	}

	/// Branch offset of an unconditional `goto*`, in code units.
	pub fn unconditional_branch_offset(&self) -> Option<i32> {
		match self {
			Instruction::Instruction10t(Opcode::Goto, (offset,)) => Some(*offset as i32),
			Instruction::Instruction20t(Opcode::Goto16, (offset,)) => Some(*offset as i32),
			Instruction::Instruction30t(Opcode::Goto32, (offset,)) => Some(*offset),
			_ => None,
		}
	}

	/// Branch offset of an `if*` conditional, in code units.
	pub fn conditional_branch_offset(&self) -> Option<i32> {
		match self {
			Instruction::Instruction22t(_, (_, _, offset))
			| Instruction::Instruction21t(_, (_, offset)) => Some(*offset as i32),
			_ => None,
		}
	}

	/// Offset to a switch/fill-array payload, in code units.
	pub fn payload_offset(&self) -> Option<i32> {
		match self {
			Instruction::Instruction31t(op, (_, offset))
				if matches!(op, Opcode::PackedSwitch | Opcode::SparseSwitch) =>
			{
				Some(*offset)
			}
			_ => None,
		}
	}

	/// Relative branch targets of a switch payload, in code units from
	/// the switch instruction itself.
	pub fn switch_targets(&self) -> Option<&[i32]> {
		match self {
			Instruction::PackedSwitchPayload { targets, .. }
			| Instruction::SparseSwitchPayload { targets, .. } => Some(targets),
			_ => None,
		}
	}

	/// Re-encodes the instruction to the exact code units it was
	/// decoded from.
	pub fn assemble(&self) -> Result<Vec<u8>> {
		let mut out: Vec<u8> = Vec::with_capacity(self.code_units() as usize * 2);
		let op = self.opcode().value();

		match self {
			Instruction::Instruction10x(_) => {
				out.write_u8(op as u8)?;
				out.write_u8(0)?;
			}
			Instruction::Instruction12x(_, (a, b)) => {
				out.write_u8(op as u8)?;
				out.write_u8((a & 0xf) | (b << 4))?;
			}
			Instruction::Instruction11n(_, (a, b)) => {
				out.write_u8(op as u8)?;
				out.write_u8((a & 0xf) | ((*b as u8) << 4))?;
			}
			Instruction::Instruction11x(_, (aa,)) => {
				out.write_u8(op as u8)?;
				out.write_u8(*aa)?;
			}
			Instruction::Instruction10t(_, (aa,)) => {
				out.write_u8(op as u8)?;
				out.write_u8(*aa as u8)?;
			}
			Instruction::Instruction20t(_, (aaaa,)) => {
				out.write_u8(op as u8)?;
				out.write_u8(0)?;
				out.write_i16::<LittleEndian>(*aaaa)?;
			}
			Instruction::Instruction22x(_, (aa, bbbb)) => {
				out.write_u8(op as u8)?;
				out.write_u8(*aa)?;
				out.write_u16::<LittleEndian>(*bbbb)?;
			}
			Instruction::Instruction21t(_, (aa, bbbb))
			| Instruction::Instruction21s(_, (aa, bbbb))
			| Instruction::Instruction21h(_, (aa, bbbb)) => {
				out.write_u8(op as u8)?;
				out.write_u8(*aa)?;
				out.write_i16::<LittleEndian>(*bbbb)?;
			}
			Instruction::Instruction21c(_, (aa, bbbb)) => {
				out.write_u8(op as u8)?;
				out.write_u8(*aa)?;
				out.write_u16::<LittleEndian>(*bbbb)?;
			}
			Instruction::Instruction23x(_, (aa, bb, cc)) => {
				out.write_u8(op as u8)?;
				out.write_u8(*aa)?;
				out.write_u8(*bb)?;
				out.write_u8(*cc)?;
			}
			Instruction::Instruction22b(_, (aa, bb, cc)) => {
				out.write_u8(op as u8)?;
				out.write_u8(*aa)?;
				out.write_u8(*bb)?;
				out.write_u8(*cc as u8)?;
			}
			Instruction::Instruction22t(_, (a, b, cccc))
			| Instruction::Instruction22s(_, (a, b, cccc)) => {
				out.write_u8(op as u8)?;
				out.write_u8((a & 0xf) | (b << 4))?;
				out.write_i16::<LittleEndian>(*cccc)?;
			}
			Instruction::Instruction22c(_, (a, b, cccc)) => {
				out.write_u8(op as u8)?;
				out.write_u8((a & 0xf) | (b << 4))?;
				out.write_u16::<LittleEndian>(*cccc)?;
			}
			Instruction::Instruction30t(_, (aaaa,)) => {
				out.write_u8(op as u8)?;
				out.write_u8(0)?;
				out.write_i32::<LittleEndian>(*aaaa)?;
			}
			Instruction::Instruction32x(_, (aaaa, bbbb)) => {
				out.write_u8(op as u8)?;
				out.write_u8(0)?;
				out.write_u16::<LittleEndian>(*aaaa)?;
				out.write_u16::<LittleEndian>(*bbbb)?;
			}
			Instruction::Instruction31i(_, (aa, bbbb))
			| Instruction::Instruction31t(_, (aa, bbbb)) => {
				out.write_u8(op as u8)?;
				out.write_u8(*aa)?;
				out.write_i32::<LittleEndian>(*bbbb)?;
			}
			Instruction::Instruction31c(_, (aa, bbbb)) => {
				out.write_u8(op as u8)?;
				out.write_u8(*aa)?;
				out.write_u32::<LittleEndian>(*bbbb)?;
			}
			Instruction::Instruction35c(_, (a, g, bbbb, c, d, e, f)) => {
				out.write_u8(op as u8)?;
				out.write_u8((g & 0xf) | (a << 4))?;
				out.write_u16::<LittleEndian>(*bbbb)?;
				out.write_u8((c & 0xf) | (d << 4))?;
				out.write_u8((e & 0xf) | (f << 4))?;
			}
			Instruction::Instruction3rc(_, (aa, bbbb, cccc)) => {
				out.write_u8(op as u8)?;
				out.write_u8(*aa)?;
				out.write_u16::<LittleEndian>(*bbbb)?;
				out.write_u16::<LittleEndian>(*cccc)?;
			}
			Instruction::Instruction45cc(_, (a, g, bbbb, c, d, e, f, hhhh)) => {
				out.write_u8(op as u8)?;
				out.write_u8((g & 0xf) | (a << 4))?;
				out.write_u16::<LittleEndian>(*bbbb)?;
				out.write_u8((c & 0xf) | (d << 4))?;
				out.write_u8((e & 0xf) | (f << 4))?;
				out.write_u16::<LittleEndian>(*hhhh)?;
			}
			Instruction::Instruction4rcc(_, (aa, bbbb, cccc, hhhh)) => {
				out.write_u8(op as u8)?;
				out.write_u8(*aa)?;
				out.write_u16::<LittleEndian>(*bbbb)?;
				out.write_u16::<LittleEndian>(*cccc)?;
				out.write_u16::<LittleEndian>(*hhhh)?;
			}
			Instruction::Instruction51l(_, (aa, bbbb)) => {
				out.write_u8(op as u8)?;
				out.write_u8(*aa)?;
				out.write_u64::<LittleEndian>(*bbbb)?;
			}
			Instruction::PackedSwitchPayload { first_key, targets } => {
				out.write_u16::<LittleEndian>(op)?;
				out.write_u16::<LittleEndian>(targets.len() as u16)?;
				out.write_i32::<LittleEndian>(*first_key)?;
				for target in targets {
					out.write_i32::<LittleEndian>(*target)?;
				}
			}
			Instruction::SparseSwitchPayload { keys, targets } => {
				ensure!(keys.len() == targets.len(), "sparse switch key/target mismatch");
				out.write_u16::<LittleEndian>(op)?;
				out.write_u16::<LittleEndian>(keys.len() as u16)?;
				for key in keys {
					out.write_i32::<LittleEndian>(*key)?;
				}
				for target in targets {
					out.write_i32::<LittleEndian>(*target)?;
				}
			}
			Instruction::FillArrayDataPayload {
				element_width,
				size,
				data,
			} => {
				out.write_u16::<LittleEndian>(op)?;
				out.write_u16::<LittleEndian>(*element_width)?;
				out.write_u32::<LittleEndian>(*size)?;
				out.extend_from_slice(data);
				if data.len() % 2 != 0 {
					out.write_u8(0)?;
				}
			}
		}

		if out.len() != self.code_units() as usize * 2 {
			bail!(DisassemblyError::CodeStreamDesync {
				expected: self.code_units(),
				consumed: out.len() as u32 / 2,
			});
		}

		Ok(out)
	}
}

#[cfg(test)]
mod tests {
	use std::io::Cursor;

	use super::*;
	use crate::dex::parser::Parser;

	fn decode(bytes: &[u8]) -> Instruction {
		Cursor::new(bytes.to_vec()).parse().unwrap()
	}

	#[test]
	fn decodes_if_eq_22t() {
		// if-eq v0, v1, +4
		let instr = decode(&[0x32, 0x10, 0x04, 0x00]);
		match &instr {
			Instruction::Instruction22t(Opcode::IfEq, (a, b, offset)) => {
				assert_eq!((*a, *b, *offset), (0, 1, 4));
			}
			other => panic!("expected if-eq, got {:?}", other),
		}
		assert_eq!(instr.conditional_branch_offset(), Some(4));
		assert_eq!(instr.code_units(), 2);
	}

	#[test]
	fn decodes_negative_goto_offset() {
		// goto -3
		let instr = decode(&[0x28, 0xfd]);
		assert_eq!(instr.unconditional_branch_offset(), Some(-3));
	}

	#[test]
	fn decodes_add_int_23x() {
		// add-int v2, v0, v1
		let instr = decode(&[0x90, 0x02, 0x00, 0x01]);
		match instr {
			Instruction::Instruction23x(Opcode::AddInt, (dest, src1, src2)) => {
				assert_eq!((dest, src1, src2), (2, 0, 1));
			}
			other => panic!("expected add-int, got {:?}", other),
		}
	}

	#[test]
	fn decodes_iget_22c() {
		// iget v1, v0, field@3
		let instr = decode(&[0x52, 0x01, 0x03, 0x00]);
		match instr {
			Instruction::Instruction22c(Opcode::Iget, (a, b, index)) => {
				assert_eq!((a, b, index), (1, 0, 3));
			}
			other => panic!("expected iget, got {:?}", other),
		}
	}

	#[test]
	fn decodes_const4_sign_extended() {
		// const/4 v0, #-1
		let instr = decode(&[0x12, 0xf0]);
		match instr {
			Instruction::Instruction11n(Opcode::Const4, (0, -1)) => {}
			other => panic!("expected const/4 v0, -1, got {:?}", other),
		}
	}

	#[test]
	fn decodes_invoke_virtual_35c_register_list() {
		// invoke-virtual {v4, v5}, meth@6  => A=2, G=0, C=4, D=5
		let instr = decode(&[0x6e, 0x20, 0x06, 0x00, 0x54, 0x00]);
		match instr {
			Instruction::Instruction35c(Opcode::InvokeVirtual, (a, _g, index, c, d, _e, _f)) => {
				assert_eq!((a, index, c, d), (2, 6, 4, 5));
			}
			other => panic!("expected invoke-virtual, got {:?}", other),
		}
	}

	#[test]
	fn decodes_packed_switch_payload() {
		let mut bytes = vec![0x00, 0x01, 0x02, 0x00]; // ident, size 2
		bytes.extend_from_slice(&10i32.to_le_bytes()); // first_key
		bytes.extend_from_slice(&4i32.to_le_bytes());
		bytes.extend_from_slice(&8i32.to_le_bytes());
		let instr = decode(&bytes);
		match &instr {
			Instruction::PackedSwitchPayload { first_key, targets } => {
				assert_eq!(*first_key, 10);
				assert_eq!(targets, &vec![4, 8]);
			}
			other => panic!("expected packed switch payload, got {:?}", other),
		}
		assert_eq!(instr.code_units(), 8);
	}

	#[test]
	fn plain_nop_still_decodes() {
		let instr = decode(&[0x00, 0x00]);
		assert!(matches!(instr, Instruction::Instruction10x(Opcode::Nop)));
	}

	#[test]
	fn unknown_opcode_is_reported() {
		let err = Cursor::new(vec![0x3eu8, 0x00])
			.parse::<Instruction>()
			.unwrap_err();
		assert!(err.downcast_ref::<DisassemblyError>().is_some());
	}

	#[test]
	fn assembling_reproduces_original_code_units() {
		let samples: Vec<Vec<u8>> = vec![
			vec![0x00, 0x00],                               // nop
			vec![0x0e, 0x00],                               // return-void
			vec![0x0f, 0x02],                               // return v2
			vec![0x12, 0x7f],                               // const/4 v15, -1
			vec![0x28, 0xfe],                               // goto -2
			vec![0x29, 0x00, 0x10, 0x00],                   // goto/16 +16
			vec![0x2a, 0x00, 0x00, 0x01, 0x00, 0x00],       // goto/32 +256
			vec![0x32, 0x10, 0x04, 0x00],                   // if-eq v0, v1, +4
			vec![0x38, 0x00, 0xfc, 0xff],                   // if-eqz v0, -4
			vec![0x90, 0x02, 0x00, 0x01],                   // add-int
			vec![0xb0, 0x10],                               // add-int/2addr
			vec![0x52, 0x01, 0x03, 0x00],                   // iget
			vec![0x6e, 0x20, 0x06, 0x00, 0x54, 0x00],       // invoke-virtual
			vec![0x18, 0x00, 1, 2, 3, 4, 5, 6, 7, 8],       // const-wide
			vec![0x74, 0x03, 0x06, 0x00, 0x04, 0x00],       // invoke-virtual/range
		];
		for bytes in samples {
			let instr = decode(&bytes);
			assert_eq!(instr.assemble().unwrap(), bytes, "for {:?}", instr);
		}
	}
}
