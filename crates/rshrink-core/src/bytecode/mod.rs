//! Bytecode helpers for static initializers (`<clinit>`).
//!
//! Only the handful of JVM instructions needed to build `int[]` constants are
//! modelled as real variants; everything else decodes to [`Insn::Other`] and is
//! skipped by the interpreter.

/// Opcode constants and operand-length table.
pub mod opcodes;
/// Tagged instruction type.
pub mod insn;
/// Integer push encoding shared by the encoder and the decoder.
pub mod policy;
/// Single-pass stack interpreter populating a [`crate::SymbolTable`].
pub mod interp;
/// Textual listing of instruction streams.
pub mod disasm;

pub use disasm::{disassemble, disassemble_full};
pub use insn::{max_stack, FieldRef, Insn, INT_ARRAY_DESCRIPTOR};
pub use interp::Interpreter;
pub use policy::encode_int;
