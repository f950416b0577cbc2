use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io::Cursor;

use color_eyre::{
	eyre::{bail, WrapErr},
	Result,
};
use tracing::{debug, warn};

use crate::dex::{
	asm::{instruction::Instruction, DisassemblyError},
	parser::Parser,
	types::pool::CodeItem,
	Dex,
};

/// The two disassembly strategies: linear sweep decodes every address
/// in order, recursive traversal only follows reachable control flow.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Algorithm {
	LinearSweep,
	RecursiveTraversal,
}

impl Default for Algorithm {
	fn default() -> Self {
		Algorithm::LinearSweep
	}
}

/// A basic block of one method. Addresses are byte offsets from the
/// start of the method's code; branch offsets from the bytecode are in
/// code units and get doubled on the way in.
#[derive(Debug, Clone)]
pub struct BasicBlock {
	pub start:        u32,
	/// End of the block, exclusive.
	pub end:          u32,
	/// Addresses of the instructions inside the block, ascending.
	pub instructions: Vec<u32>,
	/// Start addresses of successor blocks. For a conditional branch
	/// the branch target comes first, the fallthrough second.
	pub successors:   Vec<u32>,
}

/// Disassembly of a single method body.
#[derive(Debug)]
pub struct MethodDisassembly {
	pub method_id:    u32,
	pub instructions: BTreeMap<u32, Instruction>,
	pub blocks:       Vec<BasicBlock>,
}

impl MethodDisassembly {
	pub fn block_at(&self, address: u32) -> Option<&BasicBlock> {
		self.blocks.iter().find(|b| b.start == address)
	}
}

/// Disassembly of every method in a DEX. A method that fails to decode
/// lands in `errors` and leaves the other methods intact.
#[derive(Debug, Default)]
pub struct DexDisassembly {
	pub methods: BTreeMap<u32, MethodDisassembly>,
	pub errors:  BTreeMap<u32, color_eyre::Report>,
}

pub struct DexDisassembler<'a> {
	dex:       &'a Dex,
	algorithm: Algorithm,
}

impl<'a> DexDisassembler<'a> {
	pub fn new(dex: &'a Dex) -> Self {
		DexDisassembler {
			dex,
			algorithm: Algorithm::default(),
		}
	}

	pub fn with_algorithm(dex: &'a Dex, algorithm: Algorithm) -> Self {
		DexDisassembler { dex, algorithm }
	}

	pub fn set_disassembly_algorithm(&mut self, algorithm: Algorithm) {
		self.algorithm = algorithm;
	}

	/// Disassembles every method body in the DEX, keyed by method id.
	#[cfg_attr(feature = "trace", instrument(skip(self)))]
	pub fn disassemble_dex(&self) -> DexDisassembly {
		let mut out = DexDisassembly::default();

		for class in self.dex.classes.iter() {
			let data = match &class.class_data {
				Some(data) => data,
				None => continue,
			};
			for method in data.direct_methods.iter().chain(&data.virtual_methods) {
				let code = match &method.code {
					Some(code) => code,
					None => continue,
				};
				match self.disassemble_code(method.method_idx, code) {
					Ok(dis) => {
						out.methods.insert(method.method_idx, dis);
					}
					Err(err) => {
						warn!(method = method.method_idx, "failed to disassemble: {:#}", err);
						out.errors.insert(method.method_idx, err);
					}
				}
			}
		}

		debug!(
			methods = out.methods.len(),
			errors = out.errors.len(),
			"disassembled dex"
		);
		out
	}

	/// Disassembles one method's code item.
	pub fn disassemble_code(&self, method_id: u32, code: &CodeItem) -> Result<MethodDisassembly> {
		let bytes = code_unit_bytes(&code.insns);
		let instructions = match self.algorithm {
			Algorithm::LinearSweep => linear_sweep(&bytes)
				.wrap_err_with(|| format!("linear sweep of method {}", method_id))?,
			Algorithm::RecursiveTraversal => recursive_traversal(&bytes)
				.wrap_err_with(|| format!("recursive traversal of method {}", method_id))?,
		};
		let blocks = build_blocks(&bytes, &instructions)?;

		Ok(MethodDisassembly {
			method_id,
			instructions,
			blocks,
		})
	}

	/// Treats a raw byte buffer as Dalvik bytecode and decodes it in
	/// address order.
	pub fn disassemble_buffer(&self, buffer: &[u8]) -> Result<Vec<(u32, Instruction)>> {
		if buffer.len() % 2 != 0 {
			bail!(DisassemblyError::CodeStreamDesync {
				expected: (buffer.len() as u32 + 1) / 2,
				consumed: buffer.len() as u32 / 2,
			});
		}
		Ok(linear_sweep(buffer)?.into_iter().collect())
	}
}

fn code_unit_bytes(insns: &[u16]) -> Vec<u8> {
	let mut bytes = Vec::with_capacity(insns.len() * 2);
	for unit in insns {
		bytes.extend_from_slice(&unit.to_le_bytes());
	}
	bytes
}

fn decode_at(bytes: &[u8], address: u32) -> Result<Instruction> {
	if address as usize >= bytes.len() {
		bail!(DisassemblyError::CodeStreamDesync {
			expected: bytes.len() as u32 / 2,
			consumed: address / 2,
		});
	}
	let mut cursor = Cursor::new(bytes);
	cursor.set_offset(address)?;
	let instruction: Instruction = cursor.parse()?;

	// the format dictates the exact width; consuming anything else
	// would desynchronize the stream
	let consumed = cursor.get_offset() - address;
	if consumed != instruction.code_units() * 2 {
		bail!(DisassemblyError::CodeStreamDesync {
			expected: instruction.code_units(),
			consumed: consumed / 2,
		});
	}

	Ok(instruction)
}

/// Decodes instructions back to back over the whole buffer.
fn linear_sweep(bytes: &[u8]) -> Result<BTreeMap<u32, Instruction>> {
	let mut instructions = BTreeMap::new();
	let mut address = 0u32;

	while (address as usize) < bytes.len() {
		let instruction = decode_at(bytes, address)?;
		let next = address + instruction.code_units() * 2;
		instructions.insert(address, instruction);
		address = next;
	}

	if address as usize != bytes.len() {
		bail!(DisassemblyError::CodeStreamDesync {
			expected: bytes.len() as u32 / 2,
			consumed: address / 2,
		});
	}

	Ok(instructions)
}

/// Follows control flow from the entry address; unreachable code is
/// never decoded.
fn recursive_traversal(bytes: &[u8]) -> Result<BTreeMap<u32, Instruction>> {
	let mut instructions = BTreeMap::new();
	let mut work: VecDeque<u32> = VecDeque::new();

	if !bytes.is_empty() {
		work.push_back(0);
	}

	while let Some(address) = work.pop_front() {
		if instructions.contains_key(&address) {
			continue;
		}
		let instruction = decode_at(bytes, address)?;
		for successor in successor_addresses(bytes, address, &instruction, &instructions)? {
			if !instructions.contains_key(&successor) {
				work.push_back(successor);
			}
		}
		instructions.insert(address, instruction);
	}

	Ok(instructions)
}

/// Successor addresses of the instruction at `address`, branch targets
/// first, fallthrough last.
fn successor_addresses(
	bytes: &[u8],
	address: u32,
	instruction: &Instruction,
	decoded: &BTreeMap<u32, Instruction>,
) -> Result<Vec<u32>> {
	let target = |offset: i32| (address as i64 + offset as i64 * 2) as u32;
	let fallthrough = address + instruction.code_units() * 2;

	if let Some(offset) = instruction.unconditional_branch_offset() {
		return Ok(vec![target(offset)]);
	}
	if let Some(offset) = instruction.conditional_branch_offset() {
		return Ok(vec![target(offset), fallthrough]);
	}
	if let Some(offset) = instruction.payload_offset() {
		// switch targets live in the payload table; the payload itself
		// is data, not a successor
		let payload_addr = target(offset);
		let decoded_payload;
		let payload = match decoded.get(&payload_addr) {
			Some(payload) => payload,
			None => {
				decoded_payload = decode_at(bytes, payload_addr)?;
				&decoded_payload
			}
		};
		let mut successors: Vec<u32> = payload
			.switch_targets()
			.map(|targets| targets.iter().map(|&t| target(t)).collect())
			.unwrap_or_default();
		successors.push(fallthrough);
		return Ok(successors);
	}
	if instruction.is_terminator() {
		return Ok(vec![]);
	}
	Ok(vec![fallthrough])
}

fn is_payload(instruction: &Instruction) -> bool {
	matches!(
		instruction,
		Instruction::PackedSwitchPayload { .. }
			| Instruction::SparseSwitchPayload { .. }
			| Instruction::FillArrayDataPayload { .. }
	)
}

/// Partitions decoded instructions into basic blocks: a block starts at
/// the entry, at every branch target, and after every terminator or
/// branch. Payload pseudo-instructions are data and stay out of blocks.
fn build_blocks(
	bytes: &[u8],
	instructions: &BTreeMap<u32, Instruction>,
) -> Result<Vec<BasicBlock>> {
	let code: Vec<(u32, &Instruction)> = instructions
		.iter()
		.filter(|(_, i)| !is_payload(i))
		.map(|(&a, i)| (a, i))
		.collect();

	let mut leaders: BTreeSet<u32> = BTreeSet::new();
	if let Some(&(first, _)) = code.first() {
		leaders.insert(first);
	}
	for &(address, instruction) in &code {
		let end = address + instruction.code_units() * 2;
		let branches = instruction.unconditional_branch_offset().is_some()
			|| instruction.conditional_branch_offset().is_some()
			|| instruction.payload_offset().is_some();
		if branches {
			for successor in successor_addresses(bytes, address, instruction, instructions)? {
				leaders.insert(successor);
			}
			leaders.insert(end);
		} else if instruction.is_terminator() {
			leaders.insert(end);
		}
	}

	let mut blocks: Vec<BasicBlock> = Vec::new();
	let mut expected_next = None;
	for &(address, instruction) in &code {
		let end = address + instruction.code_units() * 2;
		let starts_new = leaders.contains(&address) || expected_next != Some(address);
		if starts_new || blocks.is_empty() {
			blocks.push(BasicBlock {
				start:        address,
				end,
				instructions: vec![],
				successors:   vec![],
			});
		}
		let block = blocks.last_mut().unwrap();
		block.instructions.push(address);
		block.end = end;
		expected_next = Some(end);
	}

	for block in &mut blocks {
		let &last = block.instructions.last().expect("blocks are never empty");
		let instruction = &instructions[&last];
		let successors = successor_addresses(bytes, last, instruction, instructions)?;
		// only keep successors that actually begin a decoded block;
		// recursive traversal never produces others, linear sweep can
		// fall off the end of the method
		block.successors = successors
			.into_iter()
			.filter(|s| instructions.contains_key(s))
			.collect();
	}

	Ok(blocks)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dex::{asm::opcode::Opcode, testutil::DexBuilder};

	fn dex_with_code(code: Vec<u16>) -> Dex {
		let image = DexBuilder::new()
			.string("V")
			.string("()V")
			.string("Lcom/example/A;")
			.string("run")
			.typ(0)
			.typ(2)
			.proto(1, 0, &[])
			.method(1, 0, 3)
			.class(1, &[(0, 4, 0, code)])
			.build();
		Dex::from_bytes(&image).unwrap()
	}

	fn disassemble(code: Vec<u16>, algorithm: Algorithm) -> MethodDisassembly {
		let dex = dex_with_code(code);
		let disassembler = DexDisassembler::with_algorithm(&dex, algorithm);
		let disassembly = disassembler.disassemble_dex();
		assert!(disassembly.errors.is_empty());
		disassembly.methods.into_iter().next().unwrap().1
	}

	#[test]
	fn linear_sweep_decodes_dead_code_after_return() {
		// return-void; const/4 v0, #0; return-void
		let code = vec![0x000e, 0x0012, 0x000e];
		let dis = disassemble(code, Algorithm::LinearSweep);

		assert_eq!(dis.instructions.len(), 3);
		let starts: Vec<u32> = dis.blocks.iter().map(|b| b.start).collect();
		assert_eq!(starts, vec![0, 2]);
	}

	#[test]
	fn recursive_traversal_stops_at_return() {
		let code = vec![0x000e, 0x0012, 0x000e];
		let dis = disassemble(code, Algorithm::RecursiveTraversal);

		assert_eq!(dis.instructions.len(), 1);
		assert_eq!(dis.blocks.len(), 1);
		assert_eq!(dis.blocks[0].start, 0);
		assert!(dis.blocks[0].successors.is_empty());
	}

	#[test]
	fn conditional_branch_splits_blocks() {
		// 0x0: if-eq v0, v1, +3  (-> 0x6)
		// 0x4: const/4 v0, #0
		// 0x6: return-void
		let code = vec![0x1032, 0x0003, 0x0012, 0x000e];
		let dis = disassemble(code, Algorithm::LinearSweep);

		let starts: Vec<u32> = dis.blocks.iter().map(|b| b.start).collect();
		assert_eq!(starts, vec![0, 4, 6]);

		let entry = dis.block_at(0).unwrap();
		// branch target first, fallthrough second
		assert_eq!(entry.successors, vec![6, 4]);
		assert_eq!(dis.block_at(4).unwrap().successors, vec![6]);
		assert!(dis.block_at(6).unwrap().successors.is_empty());
	}

	#[test]
	fn goto_successor_is_target_only() {
		// 0x0: goto +2 (-> 0x4)
		// 0x2: const/4 v0, #0 (dead)
		// 0x4: return-void
		let code = vec![0x0228, 0x0012, 0x000e];
		let dis = disassemble(code, Algorithm::LinearSweep);

		let entry = dis.block_at(0).unwrap();
		assert_eq!(entry.successors, vec![4]);

		let recursive = disassemble(vec![0x0228, 0x0012, 0x000e], Algorithm::RecursiveTraversal);
		// the dead const/4 at 0x2 is never decoded
		assert!(recursive.instructions.get(&2).is_none());
		assert_eq!(recursive.blocks.len(), 2);
	}

	#[test]
	fn packed_switch_targets_become_successors() {
		// 0x00: packed-switch v0, +4 (payload at byte 0x8)
		// 0x06: return-void (the fallthrough)
		// 0x08: payload with two targets, both +3 code units (-> 0x6)
		let code = vec![
			0x002b, 0x0004, 0x0000, // packed-switch v0, +4
			0x000e, // return-void @ 0x6
			0x0100, 0x0002, // payload ident, size 2
			0x0000, 0x0000, // first_key = 0
			0x0003, 0x0000, // target +3 units -> byte 0x6
			0x0003, 0x0000, // target +3 units -> byte 0x6
		];
		let dis = disassemble(code, Algorithm::LinearSweep);

		let entry = dis.block_at(0).unwrap();
		assert_eq!(entry.successors, vec![6, 6, 6]);
		// the payload is data, not a block
		assert!(dis.blocks.iter().all(|b| b.start != 8));
	}

	#[test]
	fn desync_on_truncated_instruction() {
		// goto/32 needs 3 code units but only 1 is present
		let code = vec![0x002a];
		let dex = dex_with_code(code);
		let disassembler = DexDisassembler::new(&dex);
		let disassembly = disassembler.disassemble_dex();
		assert_eq!(disassembly.methods.len(), 0);
		assert_eq!(disassembly.errors.len(), 1);
	}

	#[test]
	fn buffer_disassembly_yields_ordered_instructions() {
		let dex = dex_with_code(vec![0x000e]);
		let disassembler = DexDisassembler::new(&dex);
		// const/4 v0, #1; return-void
		let buffer = [0x12u8, 0x10, 0x0e, 0x00];
		let instructions = disassembler.disassemble_buffer(&buffer).unwrap();
		assert_eq!(instructions.len(), 2);
		assert_eq!(instructions[0].0, 0);
		assert_eq!(instructions[0].1.opcode(), Opcode::Const4);
		assert_eq!(instructions[1].0, 2);
		assert_eq!(instructions[1].1.opcode(), Opcode::ReturnVoid);
	}

	#[test]
	fn reassembled_method_matches_original_bytes() {
		let code = vec![0x1032, 0x0003, 0x0012, 0x000e];
		let bytes = code_unit_bytes(&code);
		let dis = disassemble(code, Algorithm::LinearSweep);

		let mut reassembled = Vec::new();
		for instruction in dis.instructions.values() {
			reassembled.extend(instruction.assemble().unwrap());
		}
		assert_eq!(reassembled, bytes);
	}
}
