use std::collections::{BTreeMap, HashMap, HashSet};

use color_eyre::{
	eyre::{bail, eyre, WrapErr},
	Result,
};
use tracing::debug;

use crate::{
	dex::{
		asm::{instruction::Instruction, opcode::Opcode},
		disassembler::{Algorithm, BasicBlock, DexDisassembler, MethodDisassembly},
		types::pool::{CodeItem, EncodedMethod},
		Dex,
	},
	mjolnir::{
		graph::{BlockId, IrOp, MethodIr, ValueId, ValueKind},
		types::DvmType,
		LifterError,
	},
};

const ACC_STATIC: u32 = 0x0008;

/// Lifts method bodies into the SSA IR. The symbol pool is read-only,
/// so one lifter can serve any number of methods; per-method state
/// lives in a fresh `MethodLifter`.
pub struct Lifter<'a> {
	dex:       &'a Dex,
	algorithm: Algorithm,
}

impl<'a> Lifter<'a> {
	pub fn new(dex: &'a Dex) -> Self {
		Lifter {
			dex,
			algorithm: Algorithm::default(),
		}
	}

	pub fn with_algorithm(dex: &'a Dex, algorithm: Algorithm) -> Self {
		Lifter { dex, algorithm }
	}

	/// Lifts one method to its IR graph.
	#[cfg_attr(feature = "trace", instrument(skip(self)))]
	pub fn lift_method(&self, method_id: u32) -> Result<MethodIr> {
		let method = self
			.dex
			.method_body(method_id)
			.ok_or(LifterError::NoCode { method: method_id })?;
		let code = method
			.code
			.as_ref()
			.ok_or(LifterError::NoCode { method: method_id })?;

		let disassembly = DexDisassembler::with_algorithm(self.dex, self.algorithm)
			.disassemble_code(method_id, code)?;

		MethodLifter::new(self.dex, method, code, &disassembly)
			.lift()
			.wrap_err_with(|| format!("lifting method {}", method_id))
	}

	/// Lifts every method with a body. A failing method lands in the
	/// error map and leaves the rest intact.
	pub fn lift_dex(&self) -> (BTreeMap<u32, MethodIr>, BTreeMap<u32, color_eyre::Report>) {
		let mut methods = BTreeMap::new();
		let mut errors = BTreeMap::new();

		for class in self.dex.classes.iter() {
			let data = match &class.class_data {
				Some(data) => data,
				None => continue,
			};
			for method in data.direct_methods.iter().chain(&data.virtual_methods) {
				if method.code.is_none() {
					continue;
				}
				match self.lift_method(method.method_idx) {
					Ok(ir) => {
						methods.insert(method.method_idx, ir);
					}
					Err(err) => {
						debug!(method = method.method_idx, "lift failed: {:#}", err);
						errors.insert(method.method_idx, err);
					}
				}
			}
		}

		(methods, errors)
	}
}

/// Working state for one method: local-variable numbering per block,
/// sealed/filled bookkeeping and the pending block arguments of blocks
/// whose predecessors are not all lifted yet.
struct MethodLifter<'a> {
	dex:         &'a Dex,
	method:      &'a EncodedMethod,
	code:        &'a CodeItem,
	disassembly: &'a MethodDisassembly,

	ir:            MethodIr,
	entry:         Option<BlockId>,
	addr_to_block: BTreeMap<u32, BlockId>,
	current_def:   HashMap<(BlockId, u16), ValueId>,
	sealed:        HashSet<BlockId>,
	filled:        HashSet<BlockId>,
	pending:       HashMap<BlockId, Vec<(u16, ValueId)>>,
}

impl<'a> MethodLifter<'a> {
	fn new(
		dex: &'a Dex,
		method: &'a EncodedMethod,
		code: &'a CodeItem,
		disassembly: &'a MethodDisassembly,
	) -> Self {
		MethodLifter {
			dex,
			method,
			code,
			disassembly,
			ir: MethodIr::default(),
			entry: None,
			addr_to_block: BTreeMap::new(),
			current_def: HashMap::new(),
			sealed: HashSet::new(),
			filled: HashSet::new(),
			pending: HashMap::new(),
		}
	}

	fn lift(mut self) -> Result<MethodIr> {
		let disassembly = self.disassembly;
		if disassembly.blocks.is_empty() {
			return Ok(self.ir);
		}

		let order = reverse_post_order(&disassembly.blocks);
		let reachable: HashSet<u32> = order.iter().copied().collect();
		let by_start: BTreeMap<u32, &BasicBlock> =
			disassembly.blocks.iter().map(|b| (b.start, b)).collect();

		// materialize IR blocks for the reachable part of the CFG, in
		// ascending address order
		for block in &disassembly.blocks {
			if reachable.contains(&block.start) {
				let id = self.ir.new_block(block.start);
				self.addr_to_block.insert(block.start, id);
			}
		}
		for block in &disassembly.blocks {
			if !reachable.contains(&block.start) {
				continue;
			}
			let from = self.addr_to_block[&block.start];
			for succ in &block.successors {
				let to = self.addr_to_block[succ];
				self.ir.add_edge(from, to);
			}
		}

		let entry = self.addr_to_block[&disassembly.blocks[0].start];
		self.entry = Some(entry);
		self.seed_parameters(entry)?;

		for &addr in &order {
			let block = self.addr_to_block[&addr];
			if self.all_preds_filled(block) {
				self.seal_block(block)?;
			}

			for &ins_addr in &by_start[&addr].instructions {
				let instruction = &disassembly.instructions[&ins_addr];
				self.gen_instruction(block, ins_addr, instruction)?;
			}
			self.filled.insert(block);

			for succ in self.ir.block(block).succs.clone() {
				if self.all_preds_filled(succ) {
					self.seal_block(succ)?;
				}
			}
		}

		// everything is filled now, so nothing may stay incomplete
		for &addr in &order {
			let block = self.addr_to_block[&addr];
			self.seal_block(block)?;
		}

		self.insert_fallthroughs(&by_start)?;

		Ok(self.ir)
	}

	fn all_preds_filled(&self, block: BlockId) -> bool {
		self.ir
			.block(block)
			.preds
			.iter()
			.all(|pred| self.filled.contains(pred))
	}

	/// The method's `ins` registers occupy the top of the frame; each
	/// becomes a typed block argument of the entry block. If the entry
	/// block is also a branch target, the arguments double as pending
	/// block arguments so back edges supply values for them.
	fn seed_parameters(&mut self, entry: BlockId) -> Result<()> {
		let dex = self.dex;
		let view = dex.method(self.disassembly.method_id)?;

		let mut reg = self.code.registers_size.saturating_sub(self.code.ins_size);

		if self.method.access_flags & ACC_STATIC == 0 {
			self.seed_parameter(entry, reg, DvmType::Object);
			reg += 1;
		}
		for descriptor in &view.parameters {
			let ty = DvmType::from(*descriptor);
			self.seed_parameter(entry, reg, ty);
			reg += match ty {
				DvmType::Long | DvmType::Double => 2,
				_ => 1,
			};
		}

		Ok(())
	}

	fn seed_parameter(&mut self, entry: BlockId, reg: u16, ty: DvmType) {
		let value = self.ir.new_block_arg(entry, ty);
		self.current_def.insert((entry, reg), value);
		// back edges into the entry block still have to supply these
		self.pending.entry(entry).or_default().push((reg, value));
	}

	fn block_at(&self, address: u32) -> Result<BlockId> {
		self.addr_to_block
			.get(&address)
			.copied()
			.ok_or_else(|| eyre!("no basic block starts at {:#x}", address))
	}

	// -- local value numbering (Braun et al., "Simple and Efficient
	// Construction of Static Single Assignment Form") --

	fn write_local(&mut self, block: BlockId, reg: u16, value: ValueId) {
		self.current_def.insert((block, reg), value);
	}

	fn read_local(&mut self, block: BlockId, reg: u16) -> Result<ValueId> {
		if let Some(&value) = self.current_def.get(&(block, reg)) {
			return Ok(value);
		}
		self.read_local_recursive(block, reg)
	}

	fn read_local_recursive(&mut self, block: BlockId, reg: u16) -> Result<ValueId> {
		let value = if !self.sealed.contains(&block) {
			// some predecessor is still unlifted; leave an argument of
			// unknown type and fix it up when the block seals
			let arg = self.ir.new_block_arg(block, DvmType::Unknown);
			self.pending.entry(block).or_default().push((reg, arg));
			arg
		} else if self.ir.block(block).preds.len() == 1 {
			let pred = self.ir.block(block).preds[0];
			self.read_local(pred, reg)?
		} else if self.ir.block(block).preds.is_empty() {
			bail!(LifterError::UndefinedRegister { reg });
		} else {
			let arg = self.ir.new_block_arg(block, DvmType::Unknown);
			self.write_local(block, reg, arg);
			self.add_arg_operands(block, arg, reg)?
		};

		self.write_local(block, reg, value);
		Ok(value)
	}

	/// Completes a block argument by reading the register in every
	/// predecessor and recording the value at the branch site.
	fn add_arg_operands(&mut self, block: BlockId, arg: ValueId, reg: u16) -> Result<ValueId> {
		let preds = self.ir.block(block).preds.clone();
		for pred in preds {
			let value = self.read_local(pred, reg)?;
			self.ir.push_branch_arg(pred, block, value);
			let joined = self
				.ir
				.value_type(arg)
				.join(self.ir.value_type(value))?;
			self.ir.set_value_type(arg, joined);
		}
		self.try_remove_trivial(arg)
	}

	/// Marks a block's predecessor set final and resolves the block
	/// arguments accumulated while it was incomplete.
	fn seal_block(&mut self, block: BlockId) -> Result<()> {
		if !self.sealed.insert(block) {
			return Ok(());
		}
		if let Some(pending) = self.pending.remove(&block) {
			for (reg, arg) in pending {
				self.add_arg_operands(block, arg, reg)?;
			}
		}
		Ok(())
	}

	/// A block argument whose incoming values are all one value (or the
	/// argument itself) is redundant: uses are rewritten to that value,
	/// the argument disappears, and every argument that used it is
	/// re-examined. Entry-block arguments are method parameters and are
	/// never removed.
	fn try_remove_trivial(&mut self, arg: ValueId) -> Result<ValueId> {
		let (block, index) = match self.ir.value(arg).kind {
			ValueKind::BlockArg { block, index } => (block, index),
			_ => return Ok(arg),
		};
		if Some(block) == self.entry {
			return Ok(arg);
		}
		if self.ir.block(block).args.get(index) != Some(&arg) {
			// already removed by an earlier round
			return Ok(arg);
		}

		let preds = self.ir.block(block).preds.len();
		let incoming = self.ir.incoming_values(block, index);
		if preds == 0 || incoming.len() < preds {
			return Ok(arg);
		}

		let mut same = None;
		for value in incoming {
			if value == arg {
				continue;
			}
			match same {
				None => same = Some(value),
				Some(existing) if existing == value => {}
				Some(_) => return Ok(arg),
			}
		}
		let replacement = match same {
			Some(value) => value,
			None => return Ok(arg),
		};

		self.ir.remove_block_arg(block, index);
		let retrigger = self.ir.replace_all_uses(arg, replacement);
		for def in self.current_def.values_mut() {
			if *def == arg {
				*def = replacement;
			}
		}
		for candidate in retrigger {
			self.try_remove_trivial(candidate)?;
		}

		Ok(replacement)
	}

	// -- instruction translation --

	fn gen_instruction(
		&mut self,
		block: BlockId,
		address: u32,
		instruction: &Instruction,
	) -> Result<()> {
		match instruction {
			Instruction::Instruction10x(Opcode::Nop) => {}
			Instruction::Instruction10x(Opcode::ReturnVoid) => {
				self.ir
					.emit(block, IrOp::Return, DvmType::None, vec![], address);
			}

			Instruction::Instruction11x(op, (reg,))
				if matches!(op, Opcode::Return | Opcode::ReturnWide | Opcode::ReturnObject) =>
			{
				let value = self.read_local(block, *reg as u16)?;
				self.ir
					.emit(block, IrOp::Return, DvmType::None, vec![value], address);
			}

			Instruction::Instruction12x(op, (dest, src))
				if matches!(op, Opcode::Move | Opcode::MoveWide | Opcode::MoveObject) =>
			{
				let value = self.read_local(block, *src as u16)?;
				let ty = self.ir.value_type(value);
				let result = self
					.ir
					.emit(block, IrOp::Move, ty, vec![value], address)
					.expect("move produces a value");
				self.write_local(block, *dest as u16, result);
			}

			Instruction::Instruction12x(op, (dest, src)) => {
				let (ir_op, ty) = binary_op_2addr(*op).ok_or_else(|| {
					LifterError::UnsupportedOpcode {
						opcode: op.name(),
						address,
					}
				})?;
				let src1 = self.read_local(block, *dest as u16)?;
				let src2 = self.read_local(block, *src as u16)?;
				let result = self
					.ir
					.emit(block, ir_op, ty, vec![src1, src2], address)
					.expect("arithmetic produces a value");
				self.write_local(block, *dest as u16, result);
			}

			Instruction::Instruction23x(op, (dest, src1, src2)) => {
				let (ir_op, ty) = binary_op_23x(*op).ok_or_else(|| {
					LifterError::UnsupportedOpcode {
						opcode: op.name(),
						address,
					}
				})?;
				let src1 = self.read_local(block, *src1 as u16)?;
				let src2 = self.read_local(block, *src2 as u16)?;
				let result = self
					.ir
					.emit(block, ir_op, ty, vec![src1, src2], address)
					.expect("arithmetic produces a value");
				self.write_local(block, *dest as u16, result);
			}

			Instruction::Instruction22c(op, (reg, _object, field_idx)) => {
				let field = self.dex.field(*field_idx as u32)?;
				let name = field.name.to_string();
				let class = field.class.raw().to_string();
				let ty = DvmType::from(field.typ);

				if is_iget(*op) {
					let result = self
						.ir
						.emit(
							block,
							IrOp::LoadField {
								field: *field_idx as u32,
								name,
								class,
							},
							ty,
							vec![],
							address,
						)
						.expect("field load produces a value");
					self.write_local(block, *reg as u16, result);
				} else if is_iput(*op) {
					let value = self.read_local(block, *reg as u16)?;
					self.ir.emit(
						block,
						IrOp::StoreField {
							field: *field_idx as u32,
							name,
							class,
						},
						DvmType::None,
						vec![value],
						address,
					);
				} else {
					bail!(LifterError::UnsupportedOpcode {
						opcode: op.name(),
						address,
					});
				}
			}

			Instruction::Instruction22t(op, (a, b, offset)) => {
				let ir_op = comparison_22t(*op).ok_or_else(|| LifterError::UnsupportedOpcode {
					opcode: op.name(),
					address,
				})?;
				let lhs = self.read_local(block, *a as u16)?;
				let rhs = self.read_local(block, *b as u16)?;
				let cmp = self
					.ir
					.emit(block, ir_op, DvmType::Boolean, vec![lhs, rhs], address)
					.expect("comparison produces a value");

				let true_addr = branch_target(address, *offset as i32);
				let false_addr = address + instruction.code_units() * 2;
				let true_target = self.block_at(true_addr)?;
				let false_target = self.block_at(false_addr)?;
				self.ir.emit(
					block,
					IrOp::CondBranch {
						true_target,
						false_target,
					},
					DvmType::None,
					vec![cmp],
					address,
				);
			}

			Instruction::Instruction10t(Opcode::Goto, (offset,)) => {
				self.gen_goto(block, address, *offset as i32)?;
			}
			Instruction::Instruction20t(Opcode::Goto16, (offset,)) => {
				self.gen_goto(block, address, *offset as i32)?;
			}
			Instruction::Instruction30t(Opcode::Goto32, (offset,)) => {
				self.gen_goto(block, address, *offset)?;
			}

			other => bail!(LifterError::UnsupportedOpcode {
				opcode: other.opcode().name(),
				address,
			}),
		}

		Ok(())
	}

	fn gen_goto(&mut self, block: BlockId, address: u32, offset: i32) -> Result<()> {
		let target = self.block_at(branch_target(address, offset))?;
		self.ir
			.emit(block, IrOp::Branch { target }, DvmType::None, vec![], address);
		Ok(())
	}

	/// Post-pass: a lifted block whose final operation is not a
	/// terminator falls through to the next block; make that branch
	/// explicit.
	fn insert_fallthroughs(&mut self, by_start: &BTreeMap<u32, &BasicBlock>) -> Result<()> {
		for (addr, block) in self.addr_to_block.clone() {
			let ends_in_terminator = self
				.ir
				.block(block)
				.ops
				.last()
				.map(|&op| self.ir.operation(op).op.is_terminator())
				.unwrap_or(false);
			if ends_in_terminator {
				continue;
			}

			let basic_block = by_start[&addr];
			let successor = match basic_block.successors.first() {
				Some(&successor) => successor,
				None => continue,
			};
			let target = self.block_at(successor)?;
			let location = basic_block
				.instructions
				.last()
				.copied()
				.unwrap_or(basic_block.start);
			self.ir.emit(
				block,
				IrOp::Branch { target },
				DvmType::None,
				vec![],
				location,
			);
		}
		Ok(())
	}
}

fn branch_target(address: u32, offset: i32) -> u32 {
	(address as i64 + offset as i64 * 2) as u32
}

/// Reverse post-order over the reachable blocks; block start addresses.
fn reverse_post_order(blocks: &[BasicBlock]) -> Vec<u32> {
	let by_start: BTreeMap<u32, &BasicBlock> = blocks.iter().map(|b| (b.start, b)).collect();
	let entry = match blocks.first() {
		Some(block) => block.start,
		None => return vec![],
	};

	let mut visited: HashSet<u32> = HashSet::new();
	let mut postorder: Vec<u32> = Vec::new();
	let mut stack: Vec<(u32, usize)> = vec![(entry, 0)];
	visited.insert(entry);

	while let Some(&(addr, next_succ)) = stack.last() {
		let block = by_start[&addr];
		if next_succ < block.successors.len() {
			stack.last_mut().unwrap().1 += 1;
			let successor = block.successors[next_succ];
			if visited.insert(successor) {
				stack.push((successor, 0));
			}
		} else {
			postorder.push(addr);
			stack.pop();
		}
	}

	postorder.reverse();
	postorder
}

fn is_iget(op: Opcode) -> bool {
	matches!(
		op,
		Opcode::Iget
			| Opcode::IgetWide
			| Opcode::IgetObject
			| Opcode::IgetBoolean
			| Opcode::IgetByte
			| Opcode::IgetChar
			| Opcode::IgetShort
	)
}

fn is_iput(op: Opcode) -> bool {
	matches!(
		op,
		Opcode::Iput
			| Opcode::IputWide
			| Opcode::IputObject
			| Opcode::IputBoolean
			| Opcode::IputByte
			| Opcode::IputChar
			| Opcode::IputShort
	)
}

/// The arithmetic opcode families select the result type through their
/// suffix; one table lookup replaces per-opcode dispatch.
fn binary_op_23x(op: Opcode) -> Option<(IrOp, DvmType)> {
	use DvmType::{Double, Float, Int, Long};

	Some(match op {
		Opcode::AddInt => (IrOp::Add, Int),
		Opcode::SubInt => (IrOp::Sub, Int),
		Opcode::MulInt => (IrOp::Mul, Int),
		Opcode::DivInt => (IrOp::Div, Int),
		Opcode::RemInt => (IrOp::Rem, Int),
		Opcode::AndInt => (IrOp::And, Int),
		Opcode::OrInt => (IrOp::Or, Int),
		Opcode::XorInt => (IrOp::Xor, Int),
		Opcode::ShlInt => (IrOp::Shl, Int),
		Opcode::ShrInt => (IrOp::Shr, Int),
		Opcode::UshrInt => (IrOp::UShr, Int),
		Opcode::AddLong => (IrOp::Add, Long),
		Opcode::SubLong => (IrOp::Sub, Long),
		Opcode::MulLong => (IrOp::Mul, Long),
		Opcode::DivLong => (IrOp::Div, Long),
		Opcode::RemLong => (IrOp::Rem, Long),
		Opcode::AndLong => (IrOp::And, Long),
		Opcode::OrLong => (IrOp::Or, Long),
		Opcode::XorLong => (IrOp::Xor, Long),
		Opcode::ShlLong => (IrOp::Shl, Long),
		Opcode::ShrLong => (IrOp::Shr, Long),
		Opcode::UshrLong => (IrOp::UShr, Long),
		Opcode::AddFloat => (IrOp::Add, Float),
		Opcode::SubFloat => (IrOp::Sub, Float),
		Opcode::MulFloat => (IrOp::Mul, Float),
		Opcode::DivFloat => (IrOp::Div, Float),
		Opcode::RemFloat => (IrOp::Rem, Float),
		Opcode::AddDouble => (IrOp::Add, Double),
		Opcode::SubDouble => (IrOp::Sub, Double),
		Opcode::MulDouble => (IrOp::Mul, Double),
		Opcode::DivDouble => (IrOp::Div, Double),
		Opcode::RemDouble => (IrOp::Rem, Double),
		_ => return None,
	})
}

fn binary_op_2addr(op: Opcode) -> Option<(IrOp, DvmType)> {
	use DvmType::{Double, Float, Int, Long};

	Some(match op {
		Opcode::AddInt2addr => (IrOp::Add, Int),
		Opcode::SubInt2addr => (IrOp::Sub, Int),
		Opcode::MulInt2addr => (IrOp::Mul, Int),
		Opcode::DivInt2addr => (IrOp::Div, Int),
		Opcode::RemInt2addr => (IrOp::Rem, Int),
		Opcode::AndInt2addr => (IrOp::And, Int),
		Opcode::OrInt2addr => (IrOp::Or, Int),
		Opcode::XorInt2addr => (IrOp::Xor, Int),
		Opcode::ShlInt2addr => (IrOp::Shl, Int),
		Opcode::ShrInt2addr => (IrOp::Shr, Int),
		Opcode::UshrInt2addr => (IrOp::UShr, Int),
		Opcode::AddLong2addr => (IrOp::Add, Long),
		Opcode::SubLong2addr => (IrOp::Sub, Long),
		Opcode::MulLong2addr => (IrOp::Mul, Long),
		Opcode::DivLong2addr => (IrOp::Div, Long),
		Opcode::RemLong2addr => (IrOp::Rem, Long),
		Opcode::AndLong2addr => (IrOp::And, Long),
		Opcode::OrLong2addr => (IrOp::Or, Long),
		Opcode::XorLong2addr => (IrOp::Xor, Long),
		Opcode::ShlLong2addr => (IrOp::Shl, Long),
		Opcode::ShrLong2addr => (IrOp::Shr, Long),
		Opcode::UshrLong2addr => (IrOp::UShr, Long),
		Opcode::AddFloat2addr => (IrOp::Add, Float),
		Opcode::SubFloat2addr => (IrOp::Sub, Float),
		Opcode::MulFloat2addr => (IrOp::Mul, Float),
		Opcode::DivFloat2addr => (IrOp::Div, Float),
		Opcode::RemFloat2addr => (IrOp::Rem, Float),
		Opcode::AddDouble2addr => (IrOp::Add, Double),
		Opcode::SubDouble2addr => (IrOp::Sub, Double),
		Opcode::MulDouble2addr => (IrOp::Mul, Double),
		Opcode::DivDouble2addr => (IrOp::Div, Double),
		Opcode::RemDouble2addr => (IrOp::Rem, Double),
		_ => return None,
	})
}

/// Each comparison opcode emits exactly its own comparison; there is no
/// sharing between the cases.
fn comparison_22t(op: Opcode) -> Option<IrOp> {
	Some(match op {
		Opcode::IfEq => IrOp::CmpEq,
		Opcode::IfNe => IrOp::CmpNEq,
		Opcode::IfLt => IrOp::CmpLt,
		Opcode::IfGe => IrOp::CmpGe,
		Opcode::IfGt => IrOp::CmpGt,
		Opcode::IfLe => IrOp::CmpLe,
		_ => return None,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dex::testutil::DexBuilder;

	/// One class with one static method: `params` are type orders into
	/// {0: I, 1: F}, the method returns int.
	fn dex_for(params: &[u32], regs: u16, ins: u16, code: Vec<u16>) -> Dex {
		let image = DexBuilder::new()
			.string("I") // 0
			.string("F") // 1
			.string("Lcom/example/A;") // 2
			.string("V") // 3
			.string("III") // 4: shorty
			.string("run") // 5
			.typ(0) // order 0: I
			.typ(1) // order 1: F
			.typ(2) // order 2: the class
			.typ(3) // order 3: V
			.proto(4, 0, params)
			.method(2, 0, 5)
			.class(2, &[(0, regs, ins, code)])
			.build();
		Dex::from_bytes(&image).unwrap()
	}

	fn block_index(ir: &MethodIr, start: u32) -> usize {
		ir.blocks
			.iter()
			.position(|b| b.start == start)
			.unwrap_or_else(|| panic!("no block starts at {:#x}", start))
	}

	fn only_op<'i>(ir: &'i MethodIr, block: usize, kind: &str) -> &'i crate::mjolnir::Operation {
		ir.blocks[block]
			.ops
			.iter()
			.map(|&op| ir.operation(op))
			.find(|op| format!("{:?}", op.op).starts_with(kind))
			.unwrap_or_else(|| panic!("no {} op in block {}", kind, block))
	}

	#[test]
	fn straight_line_add_uses_parameter_arguments() {
		// add-int v0, v1, v2; return v0
		let code = vec![0x0090, 0x0201, 0x000f];
		let dex = dex_for(&[0, 0], 3, 2, code);
		let ir = Lifter::new(&dex).lift_method(0).unwrap();

		assert_eq!(ir.blocks.len(), 1);
		let entry = &ir.blocks[0];
		assert_eq!(entry.args.len(), 2);
		assert_eq!(entry.ops.len(), 2);

		let add = ir.operation(entry.ops[0]);
		assert!(matches!(add.op, IrOp::Add));
		assert_eq!(add.result_type, DvmType::Int);
		assert_eq!(add.operands, entry.args);

		let ret = ir.operation(entry.ops[1]);
		assert!(matches!(ret.op, IrOp::Return));
		assert_eq!(ret.operands, vec![add.result.unwrap()]);
	}

	#[test]
	fn if_eq_lifts_to_cmp_and_cond_branch() {
		// 8 nops, then at 0x10: if-eq v0, v1, +4; 0x14: return-void;
		// 0x16: return-void (dead); 0x18: return-void
		let mut code = vec![0x0000u16; 8];
		code.extend_from_slice(&[0x1032, 0x0004, 0x000e, 0x000e, 0x000e]);
		let dex = dex_for(&[0, 0], 2, 2, code);
		let ir = Lifter::new(&dex).lift_method(0).unwrap();

		let entry = block_index(&ir, 0);
		let ops: Vec<_> = ir.blocks[entry]
			.ops
			.iter()
			.map(|&op| ir.operation(op))
			.collect();
		// nops disappear; the comparison and the branch remain
		assert_eq!(ops.len(), 2);

		let cmp = ops[0];
		assert!(matches!(cmp.op, IrOp::CmpEq));
		assert_eq!(cmp.result_type, DvmType::Boolean);
		assert_eq!(cmp.operands, ir.blocks[entry].args);
		assert_eq!(cmp.location, 0x10);

		let branch = ops[1];
		match branch.op {
			IrOp::CondBranch {
				true_target,
				false_target,
			} => {
				assert_eq!(ir.block(true_target).start, 0x18);
				assert_eq!(ir.block(false_target).start, 0x14);
			}
			ref other => panic!("expected CondBranch, got {:?}", other),
		}
		assert_eq!(branch.operands, vec![cmp.result.unwrap()]);
		// the dead block at 0x16 is never lifted
		assert!(ir.blocks.iter().all(|b| b.start != 0x16));
	}

	#[test]
	fn merge_of_two_definitions_becomes_block_argument() {
		// 0x0: if-eq v1, v2, +5 (-> 0xa)
		// 0x4: sub-int v0, v1, v2
		// 0x8: goto +3 (-> 0xe)
		// 0xa: add-int v0, v1, v2
		// 0xe: return v0
		let code = vec![
			0x2132, 0x0005, 0x0091, 0x0201, 0x0328, 0x0090, 0x0201, 0x000f,
		];
		let dex = dex_for(&[0, 0], 3, 2, code);
		let ir = Lifter::new(&dex).lift_method(0).unwrap();

		let sub_block = block_index(&ir, 0x4);
		let add_block = block_index(&ir, 0xa);
		let merge = block_index(&ir, 0xe);

		assert_eq!(ir.blocks[merge].args.len(), 1);
		let arg = ir.blocks[merge].args[0];
		assert_eq!(ir.value_type(arg), DvmType::Int);

		let sub = only_op(&ir, sub_block, "Sub");
		let add = only_op(&ir, add_block, "Add");
		assert_eq!(
			ir.jmp_parameters[&(BlockId(sub_block), BlockId(merge))],
			vec![sub.result.unwrap()]
		);
		assert_eq!(
			ir.jmp_parameters[&(BlockId(add_block), BlockId(merge))],
			vec![add.result.unwrap()]
		);

		let ret = only_op(&ir, merge, "Return");
		assert_eq!(ret.operands, vec![arg]);
	}

	#[test]
	fn same_value_from_both_predecessors_is_eliminated() {
		// 0x0: if-eq v0, v1, +3 (-> 0x6)
		// 0x4: nop
		// 0x6: return v0
		let code = vec![0x1032, 0x0003, 0x0000, 0x000f];
		let dex = dex_for(&[0, 0], 2, 2, code);
		let ir = Lifter::new(&dex).lift_method(0).unwrap();

		let entry = block_index(&ir, 0);
		let nop_block = block_index(&ir, 0x4);
		let merge = block_index(&ir, 0x6);

		// the argument for v0 collapses back to the parameter
		assert!(ir.blocks[merge].args.is_empty());
		let ret = only_op(&ir, merge, "Return");
		assert_eq!(ret.operands, vec![ir.blocks[entry].args[0]]);

		for ((_, to), params) in &ir.jmp_parameters {
			if *to == BlockId(merge) {
				assert!(params.is_empty());
			}
		}

		// the empty nop block got an explicit fallthrough branch
		let branch = only_op(&ir, nop_block, "Branch");
		match branch.op {
			IrOp::Branch { target } => assert_eq!(ir.block(target).start, 0x6),
			ref other => panic!("expected Branch, got {:?}", other),
		}
	}

	#[test]
	fn loop_header_argument_is_fixed_up_through_the_back_edge() {
		// 0x0: add-int v0, v1, v2
		// 0x4: if-eq v0, v2, +5 (-> 0xe)
		// 0x8: add-int v0, v0, v1
		// 0xc: goto -4 (-> 0x4)
		// 0xe: return v0
		let code = vec![
			0x0090, 0x0201, 0x2032, 0x0005, 0x0090, 0x0100, 0xfc28, 0x000f,
		];
		let dex = dex_for(&[0, 0], 3, 2, code);
		let ir = Lifter::new(&dex).lift_method(0).unwrap();

		let entry = block_index(&ir, 0);
		let header = block_index(&ir, 0x4);
		let body = block_index(&ir, 0x8);
		let exit = block_index(&ir, 0xe);

		// the loop-carried v0 becomes one argument of the header
		assert_eq!(ir.blocks[header].args.len(), 1);
		let carried = ir.blocks[header].args[0];
		assert_eq!(ir.value_type(carried), DvmType::Int);

		let init = only_op(&ir, entry, "Add");
		let step = only_op(&ir, body, "Add");
		assert_eq!(
			ir.jmp_parameters[&(BlockId(entry), BlockId(header))],
			vec![init.result.unwrap()]
		);
		assert_eq!(
			ir.jmp_parameters[&(BlockId(body), BlockId(header))],
			vec![step.result.unwrap()]
		);
		// the loop body reads the carried value
		assert_eq!(step.operands[0], carried);

		// entry falls through into the header explicitly
		let fallthrough = only_op(&ir, entry, "Branch");
		match fallthrough.op {
			IrOp::Branch { target } => assert_eq!(ir.block(target).start, 0x4),
			ref other => panic!("expected Branch, got {:?}", other),
		}

		let ret = only_op(&ir, exit, "Return");
		assert_eq!(ret.operands, vec![carried]);
	}

	#[test]
	fn conflicting_types_at_a_merge_are_rejected() {
		// same diamond as the merge test, but one arm is add-float
		let code = vec![
			0x2132, 0x0005, 0x0091, 0x0201, 0x0328, 0x00a6, 0x0201, 0x000f,
		];
		let dex = dex_for(&[0, 0], 3, 2, code);
		let err = Lifter::new(&dex).lift_method(0).unwrap_err();
		assert!(matches!(
			err.downcast_ref::<LifterError>(),
			Some(LifterError::TypeJoinConflict { .. })
		));
	}

	#[test]
	fn unsupported_opcode_aborts_only_that_method() {
		let image = DexBuilder::new()
			.string("I")
			.string("F")
			.string("Lcom/example/A;")
			.string("V")
			.string("III")
			.string("run")
			.string("bad")
			.typ(0)
			.typ(1)
			.typ(2)
			.typ(3)
			.proto(4, 0, &[])
			.method(2, 0, 5)
			.method(2, 0, 6)
			.class(
				2,
				&[
					(0, 1, 0, vec![0x000e]),         // return-void
					(1, 1, 0, vec![0x1012, 0x000e]), // const/4 v0, #1 (no rule)
				],
			)
			.build();
		let dex = Dex::from_bytes(&image).unwrap();

		let (methods, errors) = Lifter::new(&dex).lift_dex();
		assert!(methods.contains_key(&0));
		assert!(matches!(
			errors[&1].downcast_ref::<LifterError>(),
			Some(LifterError::UnsupportedOpcode { .. })
		));
	}

	#[test]
	fn field_access_lifts_to_load_and_store() {
		// 0x0: iget v0, v1, field@0
		// 0x4: iput v1, v0, field@0
		// 0x8: return-void
		let image = DexBuilder::new()
			.string("I") // 0
			.string("Lcom/example/A;") // 1
			.string("x") // 2
			.string("VI") // 3: shorty
			.string("load") // 4
			.typ(0) // order 0: I
			.typ(1) // order 1: the class
			.proto(3, 0, &[0])
			.field(1, 0, 2)
			.method(1, 0, 4)
			.class(1, &[(0, 2, 1, vec![0x1052, 0x0000, 0x0159, 0x0000, 0x000e])])
			.build();
		let dex = Dex::from_bytes(&image).unwrap();
		let ir = Lifter::new(&dex).lift_method(0).unwrap();

		let entry = block_index(&ir, 0);
		let load = only_op(&ir, entry, "LoadField");
		match &load.op {
			IrOp::LoadField { field, name, class } => {
				assert_eq!(*field, 0);
				assert_eq!(name, "x");
				assert_eq!(class, "Lcom/example/A;");
			}
			other => panic!("expected LoadField, got {:?}", other),
		}
		assert_eq!(load.result_type, DvmType::Int);

		let store = only_op(&ir, entry, "StoreField");
		// iput stores the int parameter in v1
		assert_eq!(store.operands, vec![ir.blocks[entry].args[0]]);
	}
}

