//! Constant pool: reading, lookups, and a deduplicating builder.

use indexmap::IndexMap;
use rshrink_core::{bytecode::FieldRef, ByteReader, ByteWriter, Error, Result};

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

/// One constant pool entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// Slot 0 and the shadow slot after a `Long`/`Double`.
    Unusable,
    /// `CONSTANT_Utf8`.
    Utf8(String),
    /// `CONSTANT_Integer`.
    Integer(i32),
    /// `CONSTANT_Float` (raw bits).
    Float(u32),
    /// `CONSTANT_Long`.
    Long(u64),
    /// `CONSTANT_Double` (raw bits).
    Double(u64),
    /// `CONSTANT_Class`.
    Class {
        /// Utf8 index of the internal name.
        name: u16,
    },
    /// `CONSTANT_String`.
    String {
        /// Utf8 index.
        value: u16,
    },
    /// `CONSTANT_Fieldref`.
    FieldRef {
        /// Class index.
        class: u16,
        /// NameAndType index.
        name_and_type: u16,
    },
    /// `CONSTANT_Methodref` / `CONSTANT_InterfaceMethodref`.
    MethodRef {
        /// Class index.
        class: u16,
        /// NameAndType index.
        name_and_type: u16,
        /// True for interface methods.
        interface: bool,
    },
    /// `CONSTANT_NameAndType`.
    NameAndType {
        /// Utf8 index of the name.
        name: u16,
        /// Utf8 index of the descriptor.
        descriptor: u16,
    },
    /// Any other entry (method handles, dynamic, module, package); kept opaque.
    Opaque {
        /// Entry tag.
        tag: u8,
    },
}

/// Decoded constant pool of a class being read.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    /// Read `count - 1` entries (the on-disk count includes slot 0).
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        let count = usize::from(r.read_u16()?);
        let mut entries = Vec::with_capacity(count.max(1));
        entries.push(Constant::Unusable);
        while entries.len() < count {
            let tag = r.read_u8()?;
            let entry = match tag {
                TAG_UTF8 => {
                    let len = usize::from(r.read_u16()?);
                    Constant::Utf8(String::from_utf8_lossy(r.read_bytes(len)?).into_owned())
                }
                TAG_INTEGER => Constant::Integer(r.read_i32()?),
                TAG_FLOAT => Constant::Float(r.read_u32()?),
                TAG_LONG => Constant::Long(r.read_u64()?),
                TAG_DOUBLE => Constant::Double(r.read_u64()?),
                TAG_CLASS => Constant::Class { name: r.read_u16()? },
                TAG_STRING => Constant::String { value: r.read_u16()? },
                TAG_FIELDREF => Constant::FieldRef { class: r.read_u16()?, name_and_type: r.read_u16()? },
                TAG_METHODREF | TAG_INTERFACE_METHODREF => Constant::MethodRef {
                    class: r.read_u16()?,
                    name_and_type: r.read_u16()?,
                    interface: tag == TAG_INTERFACE_METHODREF,
                },
                TAG_NAME_AND_TYPE => Constant::NameAndType { name: r.read_u16()?, descriptor: r.read_u16()? },
                TAG_METHOD_HANDLE => {
                    r.skip(3)?;
                    Constant::Opaque { tag }
                }
                TAG_METHOD_TYPE | TAG_MODULE | TAG_PACKAGE => {
                    r.skip(2)?;
                    Constant::Opaque { tag }
                }
                TAG_DYNAMIC | TAG_INVOKE_DYNAMIC => {
                    r.skip(4)?;
                    Constant::Opaque { tag }
                }
                other => {
                    return Err(Error::format(format!("unknown constant tag {other} at entry {}", entries.len())));
                }
            };
            let wide = matches!(entry, Constant::Long(_) | Constant::Double(_));
            entries.push(entry);
            if wide {
                entries.push(Constant::Unusable);
            }
        }
        if entries.len() != count.max(1) {
            return Err(Error::format("8-byte constant overflows the pool"));
        }
        Ok(Self { entries })
    }

    /// Number of slots, including slot 0.
    pub fn len(&self) -> usize { self.entries.len() }

    /// True if the pool has no usable entry.
    pub fn is_empty(&self) -> bool { self.entries.len() <= 1 }

    /// Entry at `index`.
    pub fn get(&self, index: u16) -> Result<&Constant> {
        match self.entries.get(usize::from(index)) {
            Some(Constant::Unusable) | None => Err(Error::format(format!("bad constant pool index {index}"))),
            Some(entry) => Ok(entry),
        }
    }

    /// Utf8 string at `index`.
    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Utf8(s) => Ok(s),
            other => Err(Error::format(format!("entry {index} is not Utf8: {other:?}"))),
        }
    }

    /// Internal name of the `CONSTANT_Class` at `index`.
    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Class { name } => self.utf8(*name),
            other => Err(Error::format(format!("entry {index} is not a Class: {other:?}"))),
        }
    }

    /// Integer value at `index`, `None` for any other loadable constant.
    pub fn integer(&self, index: u16) -> Result<Option<i32>> {
        match self.get(index)? {
            Constant::Integer(v) => Ok(Some(*v)),
            _ => Ok(None),
        }
    }

    /// Resolve a `CONSTANT_Fieldref`.
    pub fn field_ref(&self, index: u16) -> Result<FieldRef> {
        let Constant::FieldRef { class, name_and_type } = self.get(index)? else {
            return Err(Error::format(format!("entry {index} is not a Fieldref")));
        };
        let Constant::NameAndType { name, descriptor } = self.get(*name_and_type)? else {
            return Err(Error::format(format!("entry {name_and_type} is not a NameAndType")));
        };
        Ok(FieldRef {
            owner: self.class_name(*class)?.to_owned(),
            name: self.utf8(*name)?.to_owned(),
            descriptor: self.utf8(*descriptor)?.to_owned(),
        })
    }
}

/// Pool under construction: each distinct entry gets one index, in first-use order.
#[derive(Debug, Clone)]
pub struct PoolBuilder {
    entries: IndexMap<Constant, u16>,
    next: u16,
}

impl Default for PoolBuilder {
    fn default() -> Self { Self::new() }
}

impl PoolBuilder {
    /// Empty pool (next index is 1).
    pub fn new() -> Self { Self { entries: IndexMap::new(), next: 1 } }

    /// On-disk `constant_pool_count`.
    pub fn count(&self) -> u16 { self.next }

    fn intern(&mut self, entry: Constant) -> Result<u16> {
        if let Some(ix) = self.entries.get(&entry) {
            return Ok(*ix);
        }
        let ix = self.next;
        self.next = ix.checked_add(1).filter(|n| *n < u16::MAX).ok_or_else(|| Error::format("constant pool overflow"))?;
        self.entries.insert(entry, ix);
        Ok(ix)
    }

    /// Utf8 entry.
    pub fn utf8(&mut self, s: &str) -> Result<u16> {
        if s.len() > usize::from(u16::MAX) {
            return Err(Error::format(format!("utf8 constant of {} bytes is too long", s.len())));
        }
        self.intern(Constant::Utf8(s.to_owned()))
    }

    /// Class entry for an internal name.
    pub fn class(&mut self, internal_name: &str) -> Result<u16> {
        let name = self.utf8(internal_name)?;
        self.intern(Constant::Class { name })
    }

    /// Integer entry.
    pub fn integer(&mut self, v: i32) -> Result<u16> { self.intern(Constant::Integer(v)) }

    /// NameAndType entry.
    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name = self.utf8(name)?;
        let descriptor = self.utf8(descriptor)?;
        self.intern(Constant::NameAndType { name, descriptor })
    }

    /// Fieldref entry.
    pub fn field_ref(&mut self, field: &FieldRef) -> Result<u16> {
        let class = self.class(&field.owner)?;
        let name_and_type = self.name_and_type(&field.name, &field.descriptor)?;
        self.intern(Constant::FieldRef { class, name_and_type })
    }

    /// Write `constant_pool_count` followed by the entries.
    pub fn write(&self, w: &mut ByteWriter) -> Result<()> {
        w.write_u16(self.next);
        for entry in self.entries.keys() {
            match entry {
                Constant::Utf8(s) => {
                    w.write_u8(TAG_UTF8);
                    w.write_u16(s.len() as u16);
                    w.write_bytes(s.as_bytes());
                }
                Constant::Integer(v) => {
                    w.write_u8(TAG_INTEGER);
                    w.write_i32(*v);
                }
                Constant::Class { name } => {
                    w.write_u8(TAG_CLASS);
                    w.write_u16(*name);
                }
                Constant::NameAndType { name, descriptor } => {
                    w.write_u8(TAG_NAME_AND_TYPE);
                    w.write_u16(*name);
                    w.write_u16(*descriptor);
                }
                Constant::FieldRef { class, name_and_type } => {
                    w.write_u8(TAG_FIELDREF);
                    w.write_u16(*class);
                    w.write_u16(*name_and_type);
                }
                other => return Err(Error::format(format!("builder cannot write {other:?}"))),
            }
        }
        Ok(())
    }
}
