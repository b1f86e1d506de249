//! `LuaRef`: an owning handle to one Lua value.

use crate::error::{BridgeError, Result};
use crate::policy;
use crate::stack::{FromLua, Push};
use crate::state::Lua;
use selune_core::value::{TValue, ValueKind};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// Anchor slots keeping handle targets alive across collections.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    slots: Vec<Option<TValue>>,
    free: Vec<u32>,
}

impl Registry {
    fn anchor(&mut self, value: TValue) -> u32 {
        if let Some(slot) = self.free.pop() {
            self.slots[slot as usize] = Some(value);
            slot
        } else {
            self.slots.push(Some(value));
            (self.slots.len() - 1) as u32
        }
    }

    fn release(&mut self, slot: u32) {
        if let Some(entry) = self.slots.get_mut(slot as usize) {
            if entry.take().is_some() {
                self.free.push(slot);
            }
        }
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = TValue> + '_ {
        self.slots.iter().flatten().copied()
    }

    pub(crate) fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

/// Refcounted reference to a Lua value.
///
/// Collectable targets (tables, functions, userdata) are anchored in the
/// state's registry for as long as the handle lives, so they survive
/// [`Lua::collect_garbage`]. Handles order like [`TValue::total_cmp`], which
/// lets them key a `BTreeMap`.
pub struct LuaRef {
    value: TValue,
    /// Bytes of a string target, so ordering needs no state access.
    bytes: Option<Rc<[u8]>>,
    slot: Option<u32>,
    registry: Rc<RefCell<Registry>>,
}

impl LuaRef {
    /// Push `value` and keep a handle to the result.
    pub fn new<T: Push + ?Sized>(lua: &mut Lua, value: &T) -> Result<LuaRef> {
        let v = lua.to_tvalue(value)?;
        Ok(LuaRef::from_value(lua, v))
    }

    pub fn nil(lua: &Lua) -> LuaRef {
        LuaRef::from_value(lua, TValue::nil())
    }

    /// Handle to the value at stack `index`.
    pub fn from_stack(lua: &Lua, index: i32) -> Result<LuaRef> {
        Ok(LuaRef::from_value(lua, lua.value_at(index)?))
    }

    pub(crate) fn from_value(lua: &Lua, value: TValue) -> LuaRef {
        let bytes = lua.string_bytes(value).map(Rc::from);
        Self::anchored(&lua.registry, value, bytes)
    }

    fn anchored(
        registry: &Rc<RefCell<Registry>>,
        value: TValue,
        bytes: Option<Rc<[u8]>>,
    ) -> LuaRef {
        let slot = value
            .is_collectable()
            .then(|| registry.borrow_mut().anchor(value));
        LuaRef {
            value,
            bytes,
            slot,
            registry: Rc::clone(registry),
        }
    }

    pub(crate) fn check_owner(&self, lua: &Lua) -> Result<()> {
        if Rc::ptr_eq(&self.registry, &lua.registry) {
            Ok(())
        } else {
            Err(BridgeError::Runtime(
                "LuaRef belongs to a different Lua state".into(),
            ))
        }
    }

    pub fn value(&self) -> TValue {
        self.value
    }

    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }

    pub fn type_name(&self) -> &'static str {
        self.value.type_name()
    }

    pub fn is_nil(&self) -> bool {
        self.value.is_nil()
    }

    pub fn is_table(&self) -> bool {
        self.value.is_table()
    }

    pub fn is_function(&self) -> bool {
        self.value.is_function()
    }

    pub fn is_userdata(&self) -> bool {
        self.value.is_userdata()
    }

    // ---- Conversion ----

    pub fn try_cast<T: FromLua>(&self, lua: &Lua) -> Result<T> {
        self.check_owner(lua)?;
        T::from_lua(lua, self.value)
    }

    /// Convert to `T`; failures go through the build's error policy.
    pub fn cast<T: FromLua>(&self, lua: &Lua) -> T {
        policy::unwrap_or_raise(self.try_cast(lua))
    }

    pub fn is_instance<T: FromLua>(&self, lua: &Lua) -> bool {
        self.check_owner(lua).is_ok() && T::is_instance(lua, self.value)
    }

    // ---- Table access ----

    fn table_idx(&self) -> Result<selune_core::gc::GcIdx<selune_core::table::Table>> {
        self.value
            .as_table_idx()
            .ok_or_else(|| BridgeError::type_mismatch("table", self.value))
    }

    /// Raw `t[key] = value`.
    pub fn set<K, V>(&self, lua: &mut Lua, key: &K, value: &V) -> Result<()>
    where
        K: Push + ?Sized,
        V: Push + ?Sized,
    {
        self.check_owner(lua)?;
        let idx = self.table_idx()?;
        let k = lua.to_tvalue(key)?;
        let v = lua.to_tvalue(value)?;
        lua.table_mut(idx)
            .raw_set(k, v)
            .map_err(|msg| BridgeError::Runtime(msg.to_string()))
    }

    /// Raw `t[key]`, converted to `T`.
    pub fn get<T: FromLua, K: Push + ?Sized>(&self, lua: &mut Lua, key: &K) -> Result<T> {
        self.check_owner(lua)?;
        let idx = self.table_idx()?;
        let k = lua.to_tvalue(key)?;
        let v = lua.table(idx)?.raw_get(k);
        T::from_lua(lua, v)
    }

    /// Length of a string or the border of a table.
    pub fn len(&self, lua: &Lua) -> Result<i64> {
        self.check_owner(lua)?;
        match self.value {
            TValue::String(sid) => Ok(lua.strings.get_bytes(sid).len() as i64),
            TValue::Table(idx) => Ok(lua.table(idx)?.length()),
            other => Err(BridgeError::type_mismatch("table or string", other)),
        }
    }
}

impl Clone for LuaRef {
    fn clone(&self) -> Self {
        Self::anchored(&self.registry, self.value, self.bytes.clone())
    }
}

impl Drop for LuaRef {
    fn drop(&mut self) {
        if let Some(slot) = self.slot {
            // registry borrows never outlive a single call
            if let Ok(mut registry) = self.registry.try_borrow_mut() {
                registry.release(slot);
            }
        }
    }
}

impl PartialEq for LuaRef {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LuaRef {}

impl PartialOrd for LuaRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LuaRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .total_cmp_by(&other.value, |_, _| self.bytes.cmp(&other.bytes))
    }
}

impl fmt::Debug for LuaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LuaRef({:?})", self.value)
    }
}

impl Push for LuaRef {
    fn push(&self, lua: &mut Lua) -> Result<()> {
        self.check_owner(lua)?;
        lua.push_value(self.value)
    }
}

impl FromLua for LuaRef {
    fn from_lua(lua: &Lua, value: TValue) -> Result<Self> {
        Ok(LuaRef::from_value(lua, value))
    }

    fn is_instance(_lua: &Lua, _value: TValue) -> bool {
        true
    }
}
