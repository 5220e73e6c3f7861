//! Merged table of resource constants.
//!
//! Scalars are keyed `<type>.<field>` (`R$string.app_name`), arrays by the
//! field name they were stored to. Both maps keep insertion order so the
//! encoder output is reproducible; a key may be inserted again only with an
//! identical value.

use std::ops::Deref;

use indexmap::{map::Entry, IndexMap};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{ConstValue, Error, Result};

/// Named scalars and named `int` arrays, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SymbolTable {
    symbols: IndexMap<String, i32>,
    arrays: IndexMap<String, Vec<i32>>,
}

impl SymbolTable {
    /// Empty table.
    pub fn new() -> Self { Self::default() }

    /// Insert a scalar; re-inserting a different value is a conflict.
    pub fn insert_symbol(&mut self, name: &str, value: i32) -> Result<()> {
        match self.symbols.entry(name.to_owned()) {
            Entry::Occupied(old) if *old.get() != value => Err(Error::Conflict {
                name: name.to_owned(),
                expected: ConstValue::Scalar(*old.get()),
                actual: ConstValue::Scalar(value),
            }),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    /// Insert an array; re-inserting different contents (or length) is a conflict.
    pub fn insert_array(&mut self, name: &str, values: Vec<i32>) -> Result<()> {
        match self.arrays.entry(name.to_owned()) {
            Entry::Occupied(old) if *old.get() != values => Err(Error::Conflict {
                name: name.to_owned(),
                expected: ConstValue::Array(old.get().clone()),
                actual: ConstValue::Array(values),
            }),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(values);
                Ok(())
            }
        }
    }

    /// Fold `other` into `self` with the same checks as individual inserts,
    /// following `other`'s order.
    pub fn merge(&mut self, other: SymbolTable) -> Result<()> {
        for (name, value) in other.symbols {
            self.insert_symbol(&name, value)?;
        }
        for (name, values) in other.arrays {
            self.insert_array(&name, values)?;
        }
        Ok(())
    }

    /// Scalar by qualified name.
    pub fn symbol(&self, name: &str) -> Option<i32> { self.symbols.get(name).copied() }

    /// Array by name.
    pub fn array(&self, name: &str) -> Option<&[i32]> { self.arrays.get(name).map(Vec::as_slice) }

    /// Scalars in insertion order.
    pub fn symbols(&self) -> impl Iterator<Item = (&str, i32)> + '_ {
        self.symbols.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Arrays in insertion order.
    pub fn arrays(&self) -> impl Iterator<Item = (&str, &[i32])> + '_ {
        self.arrays.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of scalars.
    pub fn symbol_count(&self) -> usize { self.symbols.len() }

    /// Number of arrays.
    pub fn array_count(&self) -> usize { self.arrays.len() }

    /// Total number of entries.
    pub fn len(&self) -> usize { self.symbols.len() + self.arrays.len() }

    /// True if neither scalars nor arrays were inserted.
    pub fn is_empty(&self) -> bool { self.symbols.is_empty() && self.arrays.is_empty() }

    /// Stop accepting inserts; the encoder only takes frozen tables.
    pub fn freeze(self) -> FrozenTable { FrozenTable(self) }
}

/// Read-only view of a fully merged table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct FrozenTable(SymbolTable);

impl Deref for FrozenTable {
    type Target = SymbolTable;

    fn deref(&self) -> &SymbolTable { &self.0 }
}
