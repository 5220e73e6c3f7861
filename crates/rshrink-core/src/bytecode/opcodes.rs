//! JVM opcode values used by the codec, plus the operand layout of every
//! opcode so that unrelated instructions can be stepped over.

/// `iconst_0`; `iconst_1`..`iconst_5` follow.
pub const ICONST_0: u8 = 0x03;
/// `iconst_5`.
pub const ICONST_5: u8 = 0x08;
/// `bipush` + s1.
pub const BIPUSH: u8 = 0x10;
/// `sipush` + s2.
pub const SIPUSH: u8 = 0x11;
/// `ldc` + u1 pool index.
pub const LDC: u8 = 0x12;
/// `ldc_w` + u2 pool index.
pub const LDC_W: u8 = 0x13;
/// `iastore`.
pub const IASTORE: u8 = 0x4f;
/// `dup`.
pub const DUP: u8 = 0x59;
/// `iinc`.
pub const IINC: u8 = 0x84;
/// `goto`.
pub const GOTO: u8 = 0xa7;
/// `tableswitch`.
pub const TABLESWITCH: u8 = 0xaa;
/// `lookupswitch`.
pub const LOOKUPSWITCH: u8 = 0xab;
/// `return` (void).
pub const RETURN: u8 = 0xb1;
/// `putstatic` + u2 field ref.
pub const PUTSTATIC: u8 = 0xb3;
/// `invokestatic`.
pub const INVOKESTATIC: u8 = 0xb8;
/// `newarray` + u1 element type.
pub const NEWARRAY: u8 = 0xbc;
/// `wide`.
pub const WIDE: u8 = 0xc4;

/// `newarray` element type for `int`.
pub const T_INT: u8 = 10;

/// Operand layout following an opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    /// Fixed number of operand bytes.
    Fixed(usize),
    /// `tableswitch`: 0–3 alignment bytes, default, low, high, jump table.
    TableSwitch,
    /// `lookupswitch`: 0–3 alignment bytes, default, npairs, match/offset pairs.
    LookupSwitch,
    /// `wide`: modified opcode followed by a widened operand.
    Wide,
}

/// Operand layout of `op`, or `None` for opcodes the JVM does not define.
pub const fn operands(op: u8) -> Option<Operands> {
    use Operands::{Fixed, LookupSwitch, TableSwitch, Wide};
    let layout = match op {
        0x00..=0x0f | 0x1a..=0x35 | 0x3b..=0x83 | 0x85..=0x98 | 0xac..=0xb1 | 0xbe | 0xbf
        | 0xc2 | 0xc3 | 0xca | 0xfe | 0xff => Fixed(0),
        0x10 | 0x12 | 0x15..=0x19 | 0x36..=0x3a | 0xa9 | 0xbc => Fixed(1),
        0x11 | 0x13 | 0x14 | 0x84 | 0x99..=0xa8 | 0xb2..=0xb8 | 0xbb | 0xbd | 0xc0 | 0xc1
        | 0xc6 | 0xc7 => Fixed(2),
        0xc5 => Fixed(3),
        0xb9 | 0xba | 0xc8 | 0xc9 => Fixed(4),
        TABLESWITCH => TableSwitch,
        LOOKUPSWITCH => LookupSwitch,
        WIDE => Wide,
        _ => return None,
    };
    Some(layout)
}

/// Widened operand size for the opcode following `wide`.
pub const fn wide_operands(op: u8) -> Option<usize> {
    match op {
        IINC => Some(4),
        0x15..=0x19 | 0x36..=0x3a | 0xa9 => Some(2),
        _ => None,
    }
}

/// Alignment padding after a switch opcode located at `pc`.
pub const fn switch_padding(pc: usize) -> usize {
    (4 - (pc + 1) % 4) % 4
}
