//! Tagged instruction type for `<clinit>` streams.

use core::fmt;

use crate::{Error, Result};

/// Symbolic reference to a static field (`owner.name:descriptor`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// Internal name of the owning class.
    pub owner: String,
    /// Field name.
    pub name: String,
    /// Field descriptor (`[I` for the arrays this crate handles).
    pub descriptor: String,
}

impl FieldRef {
    /// Reference to an `int[]` field of `owner`.
    pub fn int_array(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self { owner: owner.into(), name: name.into(), descriptor: INT_ARRAY_DESCRIPTOR.into() }
    }
}

/// Field descriptor of `int[]`.
pub const INT_ARRAY_DESCRIPTOR: &str = "[I";

/// One instruction of an initialization stream.
///
/// Push operands are kept as `i32` even for the narrow forms: the encoding
/// policy may hand out a `PushByte`/`PushShort` whose value does not fit the
/// operand, and the serializer truncates it (see [`crate::encode_int`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insn {
    /// `iconst_<n>`, 0 ≤ n ≤ 5.
    PushSmallInt(i32),
    /// `bipush`.
    PushByte(i32),
    /// `sipush`.
    PushShort(i32),
    /// `ldc` / `ldc_w` of an integer constant.
    PushConst(i32),
    /// `newarray int`: pops a length, pushes the new array.
    NewIntArray,
    /// `dup`.
    Dup,
    /// `iastore`: pops value, index and array.
    ArrayStore,
    /// `putstatic` of an `int[]` field.
    StoreField(FieldRef),
    /// `return`.
    Return,
    /// Any other opcode; operands were skipped while decoding.
    Other {
        /// Raw opcode byte.
        opcode: u8,
    },
}

impl Insn {
    /// Net stack effect, or `None` when unknown (`Other`).
    pub const fn stack_delta(&self) -> Option<i32> {
        match self {
            Insn::PushSmallInt(_) | Insn::PushByte(_) | Insn::PushShort(_) | Insn::PushConst(_) | Insn::Dup => Some(1),
            Insn::NewIntArray | Insn::Return => Some(0),
            Insn::ArrayStore => Some(-3),
            Insn::StoreField(_) => Some(-1),
            Insn::Other { .. } => None,
        }
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Insn::PushSmallInt(v) => write!(f, "iconst_{v}"),
            Insn::PushByte(v) => write!(f, "bipush {v}"),
            Insn::PushShort(v) => write!(f, "sipush {v}"),
            Insn::PushConst(v) => write!(f, "ldc {v}"),
            Insn::NewIntArray => write!(f, "newarray int"),
            Insn::Dup => write!(f, "dup"),
            Insn::ArrayStore => write!(f, "iastore"),
            Insn::StoreField(r) => write!(f, "putstatic {}.{}:{}", r.owner, r.name, r.descriptor),
            Insn::Return => write!(f, "return"),
            Insn::Other { opcode } => write!(f, "<op 0x{opcode:02x}>"),
        }
    }
}

/// Maximum operand stack depth reached by a straight-line stream.
///
/// Fails on streams containing `Other` (unknown effect) or popping below zero.
pub fn max_stack(insns: &[Insn]) -> Result<u16> {
    let mut depth: i32 = 0;
    let mut max: i32 = 0;
    for (pc, insn) in insns.iter().enumerate() {
        let delta = insn
            .stack_delta()
            .ok_or_else(|| Error::malformed(format!("unknown stack effect of `{insn}` at {pc}")))?;
        // `iastore` needs its three operands before popping them
        if delta < 0 && depth + delta < 0 {
            return Err(Error::malformed(format!("stack underflow at {pc} (`{insn}`)")));
        }
        depth += delta;
        max = max.max(depth);
    }
    u16::try_from(max).map_err(|_| Error::malformed("operand stack deeper than 65535"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_stack_of_array_init() {
        let insns = vec![
            Insn::PushSmallInt(1),
            Insn::NewIntArray,
            Insn::Dup,
            Insn::PushSmallInt(0),
            Insn::PushByte(100),
            Insn::ArrayStore,
            Insn::StoreField(FieldRef::int_array("R$styleable", "a")),
            Insn::Return,
        ];
        assert_eq!(max_stack(&insns).unwrap(), 4);
        assert_eq!(max_stack(&[Insn::Return]).unwrap(), 0);
    }

    #[test]
    fn max_stack_rejects_underflow_and_opaque_ops() {
        assert!(max_stack(&[Insn::ArrayStore]).is_err());
        assert!(max_stack(&[Insn::Other { opcode: 0x00 }]).is_err());
    }

    #[test]
    fn display_uses_jvm_mnemonics() {
        assert_eq!(Insn::PushSmallInt(3).to_string(), "iconst_3");
        assert_eq!(
            Insn::StoreField(FieldRef::int_array("R$styleable", "a")).to_string(),
            "putstatic R$styleable.a:[I"
        );
    }
}
