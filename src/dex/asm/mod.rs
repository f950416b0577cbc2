pub mod format;
pub mod instruction;
pub mod opcode;

use thiserror::Error;

pub use format::Format;
pub use instruction::Instruction;
pub use opcode::{Opcode, OpcodeFlags, ReferenceType};

/// Error kinds surfaced while decoding a method's code units. These
/// abort the current method's decode; other methods are unaffected.
#[derive(Debug, Error)]
pub enum DisassemblyError {
	#[error("unknown opcode {value:#06x} at code unit {address:#x}")]
	UnknownOpcode { value: u16, address: u32 },
	#[error("code stream desync: code declares {expected} code units, decoder consumed {consumed}")]
	CodeStreamDesync { expected: u32, consumed: u32 },
}
