//! Narrowest-form selection for integer pushes.

use crate::bytecode::insn::Insn;

/// Choose the instruction that pushes `v`.
///
/// Branch order is part of the artifact format and must not be "fixed": the
/// byte and short forms only test an upper bound. Any `v < -128` therefore
/// lands in `PushByte` and is truncated to 8 bits when serialized; only
/// `-128..=i32::MAX` survives a write/read cycle unchanged.
pub fn encode_int(v: i32) -> Insn {
    if (0..=5).contains(&v) {
        Insn::PushSmallInt(v)
    } else if v <= i32::from(i8::MAX) {
        Insn::PushByte(v)
    } else if v <= i32::from(i16::MAX) {
        Insn::PushShort(v)
    } else {
        Insn::PushConst(v)
    }
}
