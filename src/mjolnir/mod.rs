pub mod graph;
pub mod lifter;
pub mod types;

use thiserror::Error;

pub use graph::{BlockId, IrBlock, IrOp, MethodIr, OpId, Operation, Use, Value, ValueId, ValueKind};
pub use lifter::Lifter;
pub use types::DvmType;

/// Error kinds surfaced while lifting a method. They abort that
/// method's lift only; the caller sees a per-method status.
#[derive(Debug, Error)]
pub enum LifterError {
	#[error("no lifter rule for {opcode} at {address:#x}")]
	UnsupportedOpcode { opcode: &'static str, address: u32 },
	#[error("block argument receives incompatible types {left} and {right}")]
	TypeJoinConflict { left: DvmType, right: DvmType },
	#[error("read of register v{reg} before any definition")]
	UndefinedRegister { reg: u16 },
	#[error("method {method} has no code item")]
	NoCode { method: u32 },
}
