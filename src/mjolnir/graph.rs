use std::collections::HashMap;

use crate::mjolnir::types::DvmType;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ValueId(pub usize);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct OpId(pub usize);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BlockId(pub usize);

/// One use of a value: either an operand slot of an operation, or a
/// branch-site slot supplying a successor's block argument.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Use {
	Operand { op: OpId, index: usize },
	BranchArg { from: BlockId, to: BlockId, index: usize },
}

#[derive(Debug, Clone)]
pub enum ValueKind {
	Result(OpId),
	BlockArg { block: BlockId, index: usize },
}

#[derive(Debug, Clone)]
pub struct Value {
	pub kind:  ValueKind,
	pub ty:    DvmType,
	/// Intrusive use list; kept exact so trivial-argument elimination
	/// can rewrite uses in O(1) per use.
	pub users: Vec<Use>,
}

/// The closed operation set of the IR.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum IrOp {
	Add,
	Sub,
	Mul,
	Div,
	Rem,
	And,
	Or,
	Xor,
	Shl,
	Shr,
	UShr,
	Move,
	Return,
	LoadField { field: u32, name: String, class: String },
	StoreField { field: u32, name: String, class: String },
	CmpEq,
	CmpNEq,
	CmpLt,
	CmpLe,
	CmpGt,
	CmpGe,
	Branch { target: BlockId },
	CondBranch { true_target: BlockId, false_target: BlockId },
}

impl IrOp {
	pub fn is_terminator(&self) -> bool {
		matches!(
			self,
			IrOp::Return | IrOp::Branch { .. } | IrOp::CondBranch { .. }
		)
	}
}

/// An IR operation; immutable once emitted, except for operand slots
/// rewritten by trivial-argument elimination.
#[derive(Debug, Clone)]
pub struct Operation {
	pub op:          IrOp,
	pub result:      Option<ValueId>,
	pub result_type: DvmType,
	pub operands:    Vec<ValueId>,
	pub block:       BlockId,
	/// Byte address of the source instruction within the method.
	pub location:    u32,
}

#[derive(Debug, Clone)]
pub struct IrBlock {
	/// Byte address of the first instruction this block was lifted from.
	pub start: u32,
	pub args:  Vec<ValueId>,
	pub ops:   Vec<OpId>,
	pub preds: Vec<BlockId>,
	pub succs: Vec<BlockId>,
}

/// Arena-allocated SSA graph of one method. Values, operations and
/// blocks refer to each other by index, so cycles through loop headers
/// need no ownership tricks.
#[derive(Debug, Default)]
pub struct MethodIr {
	pub values: Vec<Value>,
	pub ops:    Vec<Operation>,
	pub blocks: Vec<IrBlock>,
	/// For each CFG edge, the values the predecessor passes for the
	/// successor's block arguments, in argument order.
	pub jmp_parameters: HashMap<(BlockId, BlockId), Vec<ValueId>>,
}

impl MethodIr {
	pub fn new_block(&mut self, start: u32) -> BlockId {
		let id = BlockId(self.blocks.len());
		self.blocks.push(IrBlock {
			start,
			args: vec![],
			ops: vec![],
			preds: vec![],
			succs: vec![],
		});
		id
	}

	pub fn add_edge(&mut self, pred: BlockId, succ: BlockId) {
		if !self.blocks[pred.0].succs.contains(&succ) {
			self.blocks[pred.0].succs.push(succ);
		}
		if !self.blocks[succ.0].preds.contains(&pred) {
			self.blocks[succ.0].preds.push(pred);
		}
		self.jmp_parameters.entry((pred, succ)).or_default();
	}

	pub fn value(&self, id: ValueId) -> &Value {
		&self.values[id.0]
	}

	pub fn value_type(&self, id: ValueId) -> DvmType {
		self.values[id.0].ty
	}

	pub fn set_value_type(&mut self, id: ValueId, ty: DvmType) {
		self.values[id.0].ty = ty;
	}

	pub fn block(&self, id: BlockId) -> &IrBlock {
		&self.blocks[id.0]
	}

	pub fn operation(&self, id: OpId) -> &Operation {
		&self.ops[id.0]
	}

	/// Appends a fresh block argument and returns its value.
	pub fn new_block_arg(&mut self, block: BlockId, ty: DvmType) -> ValueId {
		let index = self.blocks[block.0].args.len();
		let value = ValueId(self.values.len());
		self.values.push(Value {
			kind: ValueKind::BlockArg { block, index },
			ty,
			users: vec![],
		});
		self.blocks[block.0].args.push(value);
		value
	}

	/// Records that `pred` passes `value` for the next unfilled block
	/// argument slot of `succ` on the `pred -> succ` edge.
	pub fn push_branch_arg(&mut self, pred: BlockId, succ: BlockId, value: ValueId) {
		let params = self.jmp_parameters.entry((pred, succ)).or_default();
		let index = params.len();
		params.push(value);
		self.values[value.0].users.push(Use::BranchArg {
			from: pred,
			to: succ,
			index,
		});
	}

	/// Emits an operation at the end of `block`. A result value is
	/// created unless the result type is `None`.
	pub fn emit(
		&mut self,
		block: BlockId,
		op: IrOp,
		result_type: DvmType,
		operands: Vec<ValueId>,
		location: u32,
	) -> Option<ValueId> {
		let op_id = OpId(self.ops.len());

		for (index, &operand) in operands.iter().enumerate() {
			self.values[operand.0]
				.users
				.push(Use::Operand { op: op_id, index });
		}

		let result = if result_type == DvmType::None {
			None
		} else {
			let value = ValueId(self.values.len());
			self.values.push(Value {
				kind:  ValueKind::Result(op_id),
				ty:    result_type,
				users: vec![],
			});
			Some(value)
		};

		self.ops.push(Operation {
			op,
			result,
			result_type,
			operands,
			block,
			location,
		});
		self.blocks[block.0].ops.push(op_id);

		result
	}

	/// Rewrites every use of `old` to `new` and returns the block
	/// arguments that had `old` among their incoming values; those are
	/// the candidates for re-triggered elimination.
	pub fn replace_all_uses(&mut self, old: ValueId, new: ValueId) -> Vec<ValueId> {
		let users = std::mem::take(&mut self.values[old.0].users);
		let mut retrigger = Vec::new();

		for user in users {
			match user {
				Use::Operand { op, index } => {
					self.ops[op.0].operands[index] = new;
				}
				Use::BranchArg { from, to, index } => {
					self.jmp_parameters
						.get_mut(&(from, to))
						.expect("edge exists for recorded use")[index] = new;
					retrigger.push(self.blocks[to.0].args[index]);
				}
			}
			self.values[new.0].users.push(user);
		}

		retrigger
	}

	/// Deletes block argument `index` of `block` along with the
	/// corresponding slot on every incoming edge, re-indexing whatever
	/// comes after it.
	pub fn remove_block_arg(&mut self, block: BlockId, index: usize) {
		let removed = self.blocks[block.0].args.remove(index);

		// later args shift down by one
		for later in self.blocks[block.0].args[index..].to_vec() {
			if let ValueKind::BlockArg { index: i, .. } = &mut self.values[later.0].kind {
				*i -= 1;
			}
		}

		for pred in self.blocks[block.0].preds.clone() {
			let params = self
				.jmp_parameters
				.get_mut(&(pred, block))
				.expect("edge exists for predecessor");
			if params.len() <= index {
				// slot was never supplied (argument still pending)
				continue;
			}
			let supplied = params.remove(index);
			self.values[supplied.0].users.retain(|u| {
				!matches!(u, Use::BranchArg { from, to, index: i }
					if *from == pred && *to == block && *i == index)
			});
			// re-index the uses recorded for the slots that moved
			for (new_index, &value) in
				self.jmp_parameters[&(pred, block)].iter().enumerate().skip(index)
			{
				for user in &mut self.values[value.0].users {
					if let Use::BranchArg { from, to, index: i } = user {
						if *from == pred && *to == block && *i == new_index + 1 {
							*i = new_index;
							break;
						}
					}
				}
			}
		}

		self.values[removed.0].users.clear();
	}

	/// Values currently supplied for block argument `index` of `block`,
	/// one per predecessor edge that has resolved the slot.
	pub fn incoming_values(&self, block: BlockId, index: usize) -> Vec<ValueId> {
		self.blocks[block.0]
			.preds
			.iter()
			.filter_map(|&pred| {
				self.jmp_parameters
					.get(&(pred, block))
					.and_then(|params| params.get(index).copied())
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn emit_tracks_operand_uses() {
		let mut ir = MethodIr::default();
		let entry = ir.new_block(0);
		let a = ir.new_block_arg(entry, DvmType::Int);
		let b = ir.new_block_arg(entry, DvmType::Int);
		let sum = ir
			.emit(entry, IrOp::Add, DvmType::Int, vec![a, b], 0)
			.unwrap();

		assert_eq!(ir.value(a).users.len(), 1);
		assert_eq!(ir.value(b).users.len(), 1);
		assert_eq!(ir.value_type(sum), DvmType::Int);
		assert!(matches!(ir.value(sum).kind, ValueKind::Result(_)));
	}

	#[test]
	fn replace_all_uses_rewrites_operands() {
		let mut ir = MethodIr::default();
		let entry = ir.new_block(0);
		let a = ir.new_block_arg(entry, DvmType::Int);
		let b = ir.new_block_arg(entry, DvmType::Int);
		ir.emit(entry, IrOp::Return, DvmType::None, vec![a], 0);

		let retrigger = ir.replace_all_uses(a, b);
		assert!(retrigger.is_empty());
		assert_eq!(ir.ops[0].operands, vec![b]);
		assert!(ir.value(a).users.is_empty());
		assert_eq!(ir.value(b).users.len(), 1);
	}

	#[test]
	fn remove_block_arg_reindexes_later_args() {
		let mut ir = MethodIr::default();
		let pred = ir.new_block(0);
		let merge = ir.new_block(4);
		ir.add_edge(pred, merge);

		let v = ir.new_block_arg(pred, DvmType::Int);
		let p0 = ir.new_block_arg(merge, DvmType::Int);
		let p1 = ir.new_block_arg(merge, DvmType::Int);
		ir.push_branch_arg(pred, merge, v);
		ir.push_branch_arg(pred, merge, v);

		ir.remove_block_arg(merge, 0);

		assert_eq!(ir.blocks[merge.0].args, vec![p1]);
		assert!(matches!(
			ir.value(p1).kind,
			ValueKind::BlockArg { index: 0, .. }
		));
		assert_eq!(ir.jmp_parameters[&(pred, merge)], vec![v]);
		// the surviving slot's use record now points at index 0
		assert!(ir
			.value(v)
			.users
			.iter()
			.any(|u| matches!(u, Use::BranchArg { index: 0, .. })));
		assert_eq!(ir.value(v).users.len(), 1);
		let _ = p0;
	}
}
