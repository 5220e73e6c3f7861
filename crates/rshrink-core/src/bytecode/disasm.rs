//! Minimal textual disassembly helpers used by the CLI tooling.

use core::fmt::Write;

use crate::bytecode::insn::Insn;

/// One line per instruction, indexed by position in the stream.
pub fn disassemble(insns: &[Insn]) -> String {
    let mut out = String::new();
    for (ix, insn) in insns.iter().enumerate() {
        let _ = writeln!(out, "{ix:04}: {insn}");
    }
    out
}

/// Listing with a header and a per-array summary, for `rshrink dump`.
pub fn disassemble_full(insns: &[Insn], title: &str) -> String {
    let stores = insns.iter().filter(|i| matches!(i, Insn::StoreField(_))).count();
    let opaque = insns.iter().filter(|i| matches!(i, Insn::Other { .. })).count();
    let mut out = String::new();
    let _ = writeln!(out, "== {title} == (insns={}, arrays={stores}, other={opaque})", insns.len());
    let _ = writeln!(out);
    out.push_str(&disassemble(insns));
    out
}
