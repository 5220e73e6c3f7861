//! Code attribute bytes ⇄ [`Insn`] streams.
//!
//! Decoding walks the whole method body: the handful of instructions used to
//! build `int[]` constants get real variants, every other opcode becomes
//! [`Insn::Other`] with its operands skipped (switch padding and `wide`
//! included).

use rshrink_core::{
    bytecode::{
        opcodes::{self, Operands},
        Insn, INT_ARRAY_DESCRIPTOR,
    },
    ByteReader, ByteWriter, Error, Result,
};

use crate::pool::{ConstantPool, PoolBuilder};

/* ─────────────────────────── Décodage ─────────────────────────── */

/// Decode a method body into instructions.
pub fn decode(code: &[u8], pool: &ConstantPool) -> Result<Vec<Insn>> {
    let mut r = ByteReader::new(code);
    let mut out = Vec::new();
    while r.remaining() > 0 {
        let pc = r.offset();
        let op = r.read_u8()?;
        let insn = match op {
            opcodes::ICONST_0..=opcodes::ICONST_5 => Insn::PushSmallInt(i32::from(op - opcodes::ICONST_0)),
            opcodes::BIPUSH => Insn::PushByte(i32::from(r.read_i8()?)),
            opcodes::SIPUSH => Insn::PushShort(i32::from(r.read_i16()?)),
            opcodes::LDC => load_const(op, u16::from(r.read_u8()?), pool)?,
            opcodes::LDC_W => load_const(op, r.read_u16()?, pool)?,
            opcodes::NEWARRAY => match r.read_u8()? {
                opcodes::T_INT => Insn::NewIntArray,
                _ => Insn::Other { opcode: op },
            },
            opcodes::DUP => Insn::Dup,
            opcodes::IASTORE => Insn::ArrayStore,
            opcodes::PUTSTATIC => {
                let field = pool.field_ref(r.read_u16()?)?;
                if field.descriptor == INT_ARRAY_DESCRIPTOR {
                    Insn::StoreField(field)
                } else {
                    Insn::Other { opcode: op }
                }
            }
            opcodes::RETURN => Insn::Return,
            _ => {
                skip_operands(&mut r, op, pc)?;
                Insn::Other { opcode: op }
            }
        };
        out.push(insn);
    }
    Ok(out)
}

fn load_const(op: u8, index: u16, pool: &ConstantPool) -> Result<Insn> {
    Ok(match pool.integer(index)? {
        Some(v) => Insn::PushConst(v),
        None => Insn::Other { opcode: op },
    })
}

fn skip_operands(r: &mut ByteReader<'_>, op: u8, pc: usize) -> Result<()> {
    let layout = opcodes::operands(op).ok_or_else(|| Error::malformed(format!("unknown opcode 0x{op:02x} at {pc}")))?;
    match layout {
        Operands::Fixed(n) => r.skip(n),
        Operands::TableSwitch => {
            r.skip(opcodes::switch_padding(pc))?;
            r.skip(4)?;
            let low = r.read_i32()?;
            let high = r.read_i32()?;
            let entries = i64::from(high) - i64::from(low) + 1;
            let n = usize::try_from(entries).map_err(|_| Error::malformed(format!("tableswitch at {pc} has low > high")))?;
            r.skip(n.saturating_mul(4))
        }
        Operands::LookupSwitch => {
            r.skip(opcodes::switch_padding(pc))?;
            r.skip(4)?;
            let pairs = r.read_i32()?;
            let n = usize::try_from(pairs).map_err(|_| Error::malformed(format!("lookupswitch at {pc} has {pairs} pairs")))?;
            r.skip(n.saturating_mul(8))
        }
        Operands::Wide => {
            let inner = r.read_u8()?;
            let n = opcodes::wide_operands(inner)
                .ok_or_else(|| Error::malformed(format!("wide applied to 0x{inner:02x} at {pc}")))?;
            r.skip(n)
        }
    }
}

/* ─────────────────────────── Encodage ─────────────────────────── */

/// Serialize instructions, interning constants and field references in `pool`.
///
/// Narrow pushes are truncated to their operand width.
pub fn encode(insns: &[Insn], pool: &mut PoolBuilder) -> Result<Vec<u8>> {
    let mut w = ByteWriter::new();
    for insn in insns {
        match insn {
            Insn::PushSmallInt(v @ 0..=5) => w.write_u8(opcodes::ICONST_0 + *v as u8),
            Insn::PushSmallInt(v) => return Err(Error::malformed(format!("iconst_{v} does not exist"))),
            Insn::PushByte(v) => {
                w.write_u8(opcodes::BIPUSH);
                w.write_u8(*v as i8 as u8);
            }
            Insn::PushShort(v) => {
                w.write_u8(opcodes::SIPUSH);
                w.write_u16(*v as i16 as u16);
            }
            Insn::PushConst(v) => {
                let ix = pool.integer(*v)?;
                match u8::try_from(ix) {
                    Ok(narrow) => {
                        w.write_u8(opcodes::LDC);
                        w.write_u8(narrow);
                    }
                    Err(_) => {
                        w.write_u8(opcodes::LDC_W);
                        w.write_u16(ix);
                    }
                }
            }
            Insn::NewIntArray => {
                w.write_u8(opcodes::NEWARRAY);
                w.write_u8(opcodes::T_INT);
            }
            Insn::Dup => w.write_u8(opcodes::DUP),
            Insn::ArrayStore => w.write_u8(opcodes::IASTORE),
            Insn::StoreField(field) => {
                let ix = pool.field_ref(field)?;
                w.write_u8(opcodes::PUTSTATIC);
                w.write_u16(ix);
            }
            Insn::Return => w.write_u8(opcodes::RETURN),
            Insn::Other { opcode } => {
                return Err(Error::malformed(format!("cannot encode opaque opcode 0x{opcode:02x}")));
            }
        }
    }
    Ok(w.into_vec())
}
