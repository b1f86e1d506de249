//! Hybrid array+hash table for Lua.

use crate::gc::{GcIdx, NativeFunction, Userdata};
use crate::string::StringId;
use crate::value::TValue;
use indexmap::IndexMap;

/// A key in the hash part of a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TableKey {
    Integer(i64),
    String(StringId),
    /// Non-integral float key, stored as raw bits for hashing.
    Float(u64),
    Boolean(bool),
    Table(u32),
    Function(u32),
    Userdata(u32),
}

impl TableKey {
    /// Normalize a value into a hash key. Nil and NaN are not valid keys.
    pub fn from_tvalue(v: TValue) -> Option<TableKey> {
        match v {
            TValue::Nil => None,
            TValue::Bool(b) => Some(TableKey::Boolean(b)),
            TValue::Integer(i) => Some(TableKey::Integer(i)),
            TValue::Float(f) if f.is_nan() => None,
            TValue::Float(f) => {
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    Some(TableKey::Integer(f as i64))
                } else {
                    Some(TableKey::Float(f.to_bits()))
                }
            }
            TValue::String(sid) => Some(TableKey::String(sid)),
            TValue::Table(idx) => Some(TableKey::Table(idx.0)),
            TValue::Function(idx) => Some(TableKey::Function(idx.0)),
            TValue::Userdata(idx) => Some(TableKey::Userdata(idx.0)),
        }
    }

    pub fn to_tvalue(self) -> TValue {
        match self {
            TableKey::Integer(i) => TValue::from_integer(i),
            TableKey::String(sid) => TValue::from_string_id(sid),
            TableKey::Float(bits) => TValue::from_float(f64::from_bits(bits)),
            TableKey::Boolean(b) => TValue::from_bool(b),
            TableKey::Table(i) => TValue::from_table(GcIdx::<Table>::new(i)),
            TableKey::Function(i) => TValue::from_native(GcIdx::<NativeFunction>::new(i)),
            TableKey::Userdata(i) => TValue::from_userdata(GcIdx::<Userdata>::new(i)),
        }
    }
}

/// A Lua table: hybrid array + hash map.
pub struct Table {
    /// Array part (1-indexed: array[0] corresponds to key 1).
    array: Vec<TValue>,
    /// Hash part for non-sequential keys (insertion-order preserving).
    hash: IndexMap<TableKey, TValue>,
    pub metatable: Option<GcIdx<Table>>,
}

impl Table {
    /// Create a new empty table with size hints.
    pub fn new(array_hint: usize, hash_hint: usize) -> Self {
        Table {
            array: Vec::with_capacity(array_hint),
            hash: IndexMap::with_capacity(hash_hint),
            metatable: None,
        }
    }

    /// Raw get by TValue key.
    pub fn raw_get(&self, key: TValue) -> TValue {
        match TableKey::from_tvalue(key) {
            Some(TableKey::Integer(i)) => self.raw_geti(i),
            Some(tk) => self.hash.get(&tk).copied().unwrap_or(TValue::nil()),
            None => TValue::nil(),
        }
    }

    /// Raw set by TValue key. Assigning nil removes the entry.
    pub fn raw_set(&mut self, key: TValue, value: TValue) -> Result<(), &'static str> {
        match TableKey::from_tvalue(key) {
            Some(TableKey::Integer(i)) => {
                self.raw_seti(i, value);
                Ok(())
            }
            Some(tk) => {
                if value.is_nil() {
                    self.hash.shift_remove(&tk);
                } else {
                    self.hash.insert(tk, value);
                }
                Ok(())
            }
            None if key.is_nil() => Err("table index is nil"),
            None => Err("table index is NaN"),
        }
    }

    /// Fast integer get (1-indexed).
    pub fn raw_geti(&self, key: i64) -> TValue {
        if key >= 1 && (key as usize) <= self.array.len() {
            self.array[(key - 1) as usize]
        } else {
            self.hash
                .get(&TableKey::Integer(key))
                .copied()
                .unwrap_or(TValue::nil())
        }
    }

    /// Fast integer set (1-indexed).
    pub fn raw_seti(&mut self, key: i64, value: TValue) {
        if key >= 1 {
            let idx = (key - 1) as usize;
            if idx < self.array.len() {
                self.array[idx] = value;
                if value.is_nil() {
                    self.trim_array(idx);
                }
                return;
            }
            if idx == self.array.len() && !value.is_nil() {
                self.array.push(value);
                self.rehash_from_hash_to_array();
                return;
            }
        }
        if value.is_nil() {
            self.hash.shift_remove(&TableKey::Integer(key));
        } else {
            self.hash.insert(TableKey::Integer(key), value);
        }
    }

    /// Fast string key set. String keys are always valid.
    pub fn raw_set_str(&mut self, key: StringId, value: TValue) {
        if value.is_nil() {
            self.hash.shift_remove(&TableKey::String(key));
        } else {
            self.hash.insert(TableKey::String(key), value);
        }
    }

    /// Border of the array part: largest n with t[n] non-nil and t[n+1] nil.
    pub fn length(&self) -> i64 {
        self.array.len() as i64
    }

    /// Number of non-nil entries.
    pub fn entry_count(&self) -> usize {
        self.array.len() + self.hash.len()
    }

    /// All entries: the array part in index order, then the hash part in
    /// insertion order.
    pub fn pairs(&self) -> impl Iterator<Item = (TValue, TValue)> + '_ {
        let array = self
            .array
            .iter()
            .enumerate()
            .map(|(i, v)| (TValue::from_integer(i as i64 + 1), *v));
        let hash = self.hash.iter().map(|(k, v)| (k.to_tvalue(), *v));
        array.chain(hash)
    }

    /// Move consecutive integer entries from hash into array.
    fn rehash_from_hash_to_array(&mut self) {
        loop {
            let next_idx = self.array.len() as i64 + 1;
            if let Some(v) = self.hash.shift_remove(&TableKey::Integer(next_idx)) {
                self.array.push(v);
            } else {
                break;
            }
        }
    }

    /// Keep the array part nil-free; interior holes move to the hash part.
    fn trim_array(&mut self, hole: usize) {
        let tail: Vec<TValue> = self.array.drain(hole..).collect();
        for (offset, v) in tail.into_iter().enumerate().skip(1) {
            let key = (hole + offset + 1) as i64;
            self.hash.insert(TableKey::Integer(key), v);
        }
    }

    /// Array part values (for GC traversal).
    pub fn array_values(&self) -> &[TValue] {
        &self.array
    }

    /// Hash part entries (for GC traversal).
    pub fn hash_entries(&self) -> impl Iterator<Item = (&TableKey, &TValue)> {
        self.hash.iter()
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "table(array={}, hash={})",
            self.array.len(),
            self.hash.len()
        )
    }
}
