//! Bytecode representation and emission (§3, §4.3, §4.4).

pub mod asm;
pub mod code;
pub mod compiler;
pub mod opcode;
