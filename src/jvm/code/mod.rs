//! Instruction assembly
//!
//! Instructions are appended to a [`Code`] buffer by position. Branches name their targets by
//! position (or by [`Label`]), never by byte offset: offsets only exist once the code is
//! assembled, at which point `goto`/`jsr` instructions that can't reach their targets with a 16
//! bit displacement are widened.

mod assembler;
mod instruction;
mod label;
pub mod opcodes;

pub use assembler::*;
pub use instruction::*;
pub use label::*;
