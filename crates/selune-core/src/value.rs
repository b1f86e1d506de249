//! Tagged Lua value representation.
//!
//! Every runtime value is one of a closed set of kinds: nil, boolean,
//! integer, float, string, table, function or userdata. GC kinds carry a
//! typed index into the `GcHeap` arena; strings carry an interned id, so two
//! strings are equal iff their ids are equal. Ordering strings needs their
//! bytes, which live in the `StringInterner`.

use crate::gc::{GcIdx, NativeFunction, Userdata};
use crate::string::{StringId, StringInterner};
use crate::table::Table;
use std::cmp::Ordering;
use std::fmt;

/// A Lua value. `Copy`: GC kinds are plain arena indices.
#[derive(Clone, Copy)]
pub enum TValue {
    Nil,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(StringId),
    Table(GcIdx<Table>),
    Function(GcIdx<NativeFunction>),
    Userdata(GcIdx<Userdata>),
}

/// Coarse value kind, ordered by rank for cross-kind comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    Nil,
    Boolean,
    Number,
    String,
    Table,
    Function,
    Userdata,
}

impl ValueKind {
    /// The name `type()` would report.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Nil => "nil",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Table => "table",
            ValueKind::Function => "function",
            ValueKind::Userdata => "userdata",
        }
    }
}

impl TValue {
    // ---- Constructors ----

    #[inline]
    pub fn nil() -> Self {
        TValue::Nil
    }

    #[inline]
    pub fn from_bool(b: bool) -> Self {
        TValue::Bool(b)
    }

    #[inline]
    pub fn from_integer(i: i64) -> Self {
        TValue::Integer(i)
    }

    /// Create a float value. NaN inputs are canonicalized.
    #[inline]
    pub fn from_float(f: f64) -> Self {
        if f.is_nan() {
            TValue::Float(f64::NAN)
        } else {
            TValue::Float(f)
        }
    }

    #[inline]
    pub fn from_string_id(id: StringId) -> Self {
        TValue::String(id)
    }

    #[inline]
    pub fn from_table(idx: GcIdx<Table>) -> Self {
        TValue::Table(idx)
    }

    #[inline]
    pub fn from_native(idx: GcIdx<NativeFunction>) -> Self {
        TValue::Function(idx)
    }

    #[inline]
    pub fn from_userdata(idx: GcIdx<Userdata>) -> Self {
        TValue::Userdata(idx)
    }

    // ---- Type checks ----

    pub fn kind(&self) -> ValueKind {
        match self {
            TValue::Nil => ValueKind::Nil,
            TValue::Bool(_) => ValueKind::Boolean,
            TValue::Integer(_) | TValue::Float(_) => ValueKind::Number,
            TValue::String(_) => ValueKind::String,
            TValue::Table(_) => ValueKind::Table,
            TValue::Function(_) => ValueKind::Function,
            TValue::Userdata(_) => ValueKind::Userdata,
        }
    }

    /// Lua type name of this value.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, TValue::Nil)
    }

    #[inline]
    pub fn is_bool(&self) -> bool {
        matches!(self, TValue::Bool(_))
    }

    #[inline]
    pub fn is_integer(&self) -> bool {
        matches!(self, TValue::Integer(_))
    }

    #[inline]
    pub fn is_float(&self) -> bool {
        matches!(self, TValue::Float(_))
    }

    /// Returns true if this value is a number (integer or float).
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, TValue::Integer(_) | TValue::Float(_))
    }

    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, TValue::String(_))
    }

    #[inline]
    pub fn is_table(&self) -> bool {
        matches!(self, TValue::Table(_))
    }

    #[inline]
    pub fn is_function(&self) -> bool {
        matches!(self, TValue::Function(_))
    }

    #[inline]
    pub fn is_userdata(&self) -> bool {
        matches!(self, TValue::Userdata(_))
    }

    /// Returns true for values living in the GC heap.
    #[inline]
    pub fn is_collectable(&self) -> bool {
        matches!(
            self,
            TValue::Table(_) | TValue::Function(_) | TValue::Userdata(_)
        )
    }

    // ---- Extractors ----

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            TValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    #[inline]
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            TValue::Integer(i) => Some(i),
            _ => None,
        }
    }

    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            TValue::Float(f) => Some(f),
            _ => None,
        }
    }

    /// Attempt to extract as number (f64). Integers convert to float.
    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match *self {
            TValue::Integer(i) => Some(i as f64),
            TValue::Float(f) => Some(f),
            _ => None,
        }
    }

    #[inline]
    pub fn as_string_id(&self) -> Option<StringId> {
        match *self {
            TValue::String(id) => Some(id),
            _ => None,
        }
    }

    #[inline]
    pub fn as_table_idx(&self) -> Option<GcIdx<Table>> {
        match *self {
            TValue::Table(idx) => Some(idx),
            _ => None,
        }
    }

    #[inline]
    pub fn as_native_idx(&self) -> Option<GcIdx<NativeFunction>> {
        match *self {
            TValue::Function(idx) => Some(idx),
            _ => None,
        }
    }

    #[inline]
    pub fn as_userdata_idx(&self) -> Option<GcIdx<Userdata>> {
        match *self {
            TValue::Userdata(idx) => Some(idx),
            _ => None,
        }
    }

    // ---- Lua semantics ----

    /// Lua falsy: only nil and false are falsy.
    #[inline]
    pub fn is_falsy(&self) -> bool {
        matches!(self, TValue::Nil | TValue::Bool(false))
    }

    #[inline]
    pub fn is_truthy(&self) -> bool {
        !self.is_falsy()
    }

    /// Total order over all values: kind rank first, then payload.
    ///
    /// Numbers compare by exact numeric value across integer and float,
    /// with NaN after every other number. Strings compare bytewise, GC
    /// objects by arena index.
    pub fn total_cmp(&self, other: &Self, strings: &StringInterner) -> Ordering {
        self.total_cmp_by(other, |a, b| strings.get_bytes(a).cmp(strings.get_bytes(b)))
    }

    /// [`TValue::total_cmp`] with the string comparison supplied by the
    /// caller, for holders that keep string bytes outside an interner.
    pub fn total_cmp_by(
        &self,
        other: &Self,
        cmp_strings: impl FnOnce(StringId, StringId) -> Ordering,
    ) -> Ordering {
        match (self, other) {
            (TValue::Bool(a), TValue::Bool(b)) => a.cmp(b),
            (TValue::Integer(a), TValue::Integer(b)) => a.cmp(b),
            (TValue::Integer(a), TValue::Float(b)) => cmp_int_float(*a, *b),
            (TValue::Float(a), TValue::Integer(b)) => cmp_int_float(*b, *a).reverse(),
            (TValue::Float(a), TValue::Float(b)) => cmp_float(*a, *b),
            (TValue::String(a), TValue::String(b)) if a == b => Ordering::Equal,
            (TValue::String(a), TValue::String(b)) => cmp_strings(*a, *b),
            (TValue::Table(a), TValue::Table(b)) => a.0.cmp(&b.0),
            (TValue::Function(a), TValue::Function(b)) => a.0.cmp(&b.0),
            (TValue::Userdata(a), TValue::Userdata(b)) => a.0.cmp(&b.0),
            _ => self.kind().cmp(&other.kind()),
        }
    }
}

fn cmp_float(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        // -0.0 and 0.0 are the same key
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Exact comparison of an integer with a float.
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    // 2^63 as f64
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() {
        return Ordering::Less;
    }
    if f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }
    let t = f.trunc();
    match i.cmp(&(t as i64)) {
        Ordering::Equal if f > t => Ordering::Less,
        Ordering::Equal if f < t => Ordering::Greater,
        ord => ord,
    }
}

impl fmt::Debug for TValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TValue::Nil => write!(f, "nil"),
            TValue::Bool(b) => write!(f, "{b}"),
            TValue::Integer(i) => write!(f, "{i}"),
            TValue::Float(fl) => write!(f, "{fl}"),
            TValue::String(id) => write!(f, "string(#{})", id.0),
            TValue::Table(idx) => write!(f, "table(#{})", idx.0),
            TValue::Function(idx) => write!(f, "native(#{})", idx.0),
            TValue::Userdata(idx) => write!(f, "userdata(#{})", idx.0),
        }
    }
}

impl PartialEq for TValue {
    /// Raw equality: numbers by value (NaN ~= NaN), everything else by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TValue::Float(a), _) if a.is_nan() => false,
            (_, TValue::Float(b)) if b.is_nan() => false,
            // interned ids are equal iff the bytes are
            _ => self.total_cmp_by(other, |a, b| a.0.cmp(&b.0)) == Ordering::Equal,
        }
    }
}
