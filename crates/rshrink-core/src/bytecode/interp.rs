//! One-pass stack interpreter for `<clinit>` streams.
//!
//! Replays the array-construction idiom emitted by Java compilers:
//!
//! ```text
//! iconst_3            ; length
//! newarray int
//! dup / iconst_0 / bipush 100 / iastore
//! dup / iconst_1 / sipush 200 / iastore
//! dup / iconst_2 / ldc 70000 / iastore
//! putstatic R$styleable.a:[I
//! ```
//!
//! Branches are never followed and unrelated instructions are ignored.

use crate::{bytecode::insn::Insn, Error, Result, SymbolTable};

/// Evaluation stack slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Int(i32),
    /// Reference to the array held in the current-array slot.
    ArrayRef,
}

/// Array between `newarray` and `putstatic`.
#[derive(Debug)]
struct PendingArray {
    values: Vec<i32>,
    written: Vec<bool>,
}

impl PendingArray {
    fn new(len: usize) -> Self { Self { values: vec![0; len], written: vec![false; len] } }

    fn store(&mut self, index: i32, value: i32) -> Result<()> {
        let len = self.values.len();
        let slot = usize::try_from(index)
            .ok()
            .filter(|i| *i < len)
            .ok_or_else(|| Error::malformed(format!("iastore index {index} out of bounds for length {len}")))?;
        self.values[slot] = value;
        self.written[slot] = true;
        Ok(())
    }

    fn commit(self, name: &str) -> Result<Vec<i32>> {
        if let Some(missing) = self.written.iter().position(|w| !w) {
            return Err(Error::malformed(format!("`{name}` committed with index {missing} never written")));
        }
        Ok(self.values)
    }
}

/// Interpreter state borrowing the destination table.
#[derive(Debug)]
pub struct Interpreter<'t> {
    stack: Vec<Slot>,
    current: Option<PendingArray>,
    table: &'t mut SymbolTable,
    committed: usize,
}

impl<'t> Interpreter<'t> {
    /// Fresh interpreter writing into `table`.
    pub fn new(table: &'t mut SymbolTable) -> Self {
        Self { stack: Vec::new(), current: None, table, committed: 0 }
    }

    /// Run `insns` until `return` or the end of the stream; returns the
    /// number of arrays committed.
    pub fn run(&mut self, insns: &[Insn]) -> Result<usize> {
        for insn in insns {
            if !self.step(insn)? {
                break;
            }
        }
        Ok(self.committed)
    }

    /// Execute one instruction. Returns `false` once the stream returned.
    pub fn step(&mut self, insn: &Insn) -> Result<bool> {
        match insn {
            Insn::PushSmallInt(v) | Insn::PushByte(v) | Insn::PushShort(v) | Insn::PushConst(v) => {
                self.stack.push(Slot::Int(*v));
            }
            Insn::NewIntArray => {
                let len = self.pop_int("newarray")?;
                let len = usize::try_from(len)
                    .map_err(|_| Error::malformed(format!("negative array length {len}")))?;
                if self.current.is_some() {
                    return Err(Error::malformed("newarray while another array is pending"));
                }
                self.current = Some(PendingArray::new(len));
                self.stack.push(Slot::ArrayRef);
            }
            Insn::Dup => {
                let top = *self.stack.last().ok_or_else(|| Error::malformed("dup on empty stack"))?;
                self.stack.push(top);
            }
            Insn::ArrayStore => {
                if self.current.is_none() {
                    return Err(Error::malformed("iastore without a current array"));
                }
                let value = self.pop_int("iastore value")?;
                let index = self.pop_int("iastore index")?;
                match self.stack.pop() {
                    Some(Slot::ArrayRef) => {}
                    Some(Slot::Int(v)) => {
                        return Err(Error::malformed(format!("iastore target is the int {v}, not an array")));
                    }
                    None => return Err(Error::malformed("iastore with no array reference")),
                }
                if let Some(array) = self.current.as_mut() {
                    array.store(index, value)?;
                }
            }
            Insn::StoreField(field) => {
                let array = self
                    .current
                    .take()
                    .ok_or_else(|| Error::malformed(format!("putstatic {} without a current array", field.name)))?;
                let values = array.commit(&field.name)?;
                self.table.insert_array(&field.name, values)?;
                self.stack.clear();
                self.committed += 1;
            }
            Insn::Return => return Ok(false),
            Insn::Other { .. } => {}
        }
        Ok(true)
    }

    fn pop_int(&mut self, what: &str) -> Result<i32> {
        match self.stack.pop() {
            Some(Slot::Int(v)) => Ok(v),
            Some(Slot::ArrayRef) => Err(Error::malformed(format!("{what}: expected an int, found an array"))),
            None => Err(Error::malformed(format!("{what}: stack underflow"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bytecode::FieldRef, encode_int, ConstValue};
    use pretty_assertions::assert_eq;

    fn array_init(name: &str, values: &[i32]) -> Vec<Insn> {
        let mut out = vec![encode_int(values.len() as i32), Insn::NewIntArray];
        for (i, v) in values.iter().enumerate() {
            out.extend([Insn::Dup, encode_int(i as i32), encode_int(*v), Insn::ArrayStore]);
        }
        out.push(Insn::StoreField(FieldRef::int_array("R$styleable", name)));
        out
    }

    #[test]
    fn replays_array_construction() {
        let mut insns = array_init("a", &[1, 200, 0x7f01_0003]);
        insns.extend(array_init("empty", &[]));
        insns.push(Insn::Return);

        let mut table = SymbolTable::new();
        let n = Interpreter::new(&mut table).run(&insns).unwrap();
        assert_eq!(n, 2);
        assert_eq!(table.array("a"), Some(&[1, 200, 0x7f01_0003][..]));
        assert_eq!(table.array("empty"), Some(&[][..]));
    }

    #[test]
    fn ignores_unrelated_instructions() {
        let mut insns = vec![Insn::Other { opcode: 0x00 }];
        insns.extend(array_init("a", &[7]));
        insns.push(Insn::Other { opcode: 0xb8 });
        insns.push(Insn::Return);
        let mut table = SymbolTable::new();
        Interpreter::new(&mut table).run(&insns).unwrap();
        assert_eq!(table.array("a"), Some(&[7][..]));
    }

    #[test]
    fn stops_at_return() {
        let mut insns = vec![Insn::Return];
        insns.extend(array_init("a", &[7]));
        let mut table = SymbolTable::new();
        assert_eq!(Interpreter::new(&mut table).run(&insns).unwrap(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn underflow_is_malformed() {
        let mut table = SymbolTable::new();
        let err = Interpreter::new(&mut table).run(&[Insn::NewIntArray]).unwrap_err();
        assert!(matches!(err, Error::MalformedStream(_)), "{err}");
        let err = Interpreter::new(&mut table).run(&[Insn::Dup]).unwrap_err();
        assert!(matches!(err, Error::MalformedStream(_)), "{err}");
    }

    #[test]
    fn store_without_array_is_malformed() {
        let mut table = SymbolTable::new();
        let insns = [Insn::PushSmallInt(0), Insn::PushSmallInt(1), Insn::ArrayStore];
        assert!(matches!(Interpreter::new(&mut table).run(&insns), Err(Error::MalformedStream(_))));

        let insns = [Insn::StoreField(FieldRef::int_array("R$styleable", "a"))];
        assert!(matches!(Interpreter::new(&mut table).run(&insns), Err(Error::MalformedStream(_))));
    }

    #[test]
    fn out_of_bounds_and_unwritten_indices_are_malformed() {
        let mut table = SymbolTable::new();
        let oob = [
            Insn::PushSmallInt(1),
            Insn::NewIntArray,
            Insn::Dup,
            Insn::PushSmallInt(1),
            Insn::PushSmallInt(9),
            Insn::ArrayStore,
        ];
        assert!(matches!(Interpreter::new(&mut table).run(&oob), Err(Error::MalformedStream(_))));

        let gap = [
            Insn::PushSmallInt(2),
            Insn::NewIntArray,
            Insn::Dup,
            Insn::PushSmallInt(0),
            Insn::PushSmallInt(9),
            Insn::ArrayStore,
            Insn::StoreField(FieldRef::int_array("R$styleable", "a")),
        ];
        assert!(matches!(Interpreter::new(&mut table).run(&gap), Err(Error::MalformedStream(_))));
        assert!(table.is_empty());
    }

    #[test]
    fn conflicting_redefinition_surfaces() {
        let mut table = SymbolTable::new();
        table.insert_array("a", vec![1, 2]).unwrap();
        let mut insns = array_init("a", &[1, 3]);
        insns.push(Insn::Return);
        match Interpreter::new(&mut table).run(&insns) {
            Err(Error::Conflict { name, expected, actual }) => {
                assert_eq!(name, "a");
                assert_eq!(expected, ConstValue::Array(vec![1, 2]));
                assert_eq!(actual, ConstValue::Array(vec![1, 3]));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }
}
