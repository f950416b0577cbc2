//! Static analysis of Dalvik executables: a DEX parser producing a
//! fully resolved symbol pool, a bytecode disassembler building basic
//! blocks, and a lifter translating method bodies into a typed SSA IR
//! ("MjolnIR").

pub mod dex;
pub mod mjolnir;

pub use crate::{
	dex::{
		asm::{Format, Instruction, Opcode},
		disassembler::{Algorithm, BasicBlock, DexDisassembler, DexDisassembly, MethodDisassembly},
		parser::ParseError,
		types::{Descriptor, Fundamental},
		Dex,
	},
	mjolnir::{DvmType, IrOp, Lifter, LifterError, MethodIr},
};
