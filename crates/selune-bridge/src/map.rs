//! Associative containers ↔ Lua tables.
//!
//! Pushing walks the map in its own iteration order (key order for
//! `BTreeMap`) and builds a fresh table. Reading walks the table in the
//! runtime's order, which carries no meaning: the result's order comes from
//! the container alone. A read either converts every entry or fails.
//!
//! When two distinct Lua keys convert to the same Rust key (`1` and `"1"`
//! read as `i64`), the entry visited last wins. Visit order is not part of
//! the contract, so neither is which value survives.

use crate::error::{BridgeError, Result};
use crate::stack::{FromLua, Push};
use crate::state::Lua;
use selune_core::value::TValue;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use tracing::{debug, trace};

/// Headroom needed while filling a table: the table, one key, one value.
const PUSH_HEADROOM: usize = 3;

fn push_entries<'a, K, V, I>(lua: &mut Lua, len: usize, entries: I) -> Result<()>
where
    K: Push + 'a,
    V: Push + 'a,
    I: Iterator<Item = (&'a K, &'a V)>,
{
    let base = lua.top();
    let result = lua.nested(|lua| {
        lua.ensure_stack(PUSH_HEADROOM)?;
        let table = lua.alloc_table(0, len);
        lua.push_value(TValue::from_table(table))?;
        for (k, v) in entries {
            k.push(lua)?;
            v.push(lua)?;
            lua.raw_set_from_stack(table)?;
        }
        Ok(())
    });
    if let Err(err) = &result {
        debug!(%err, entries = len, "map push failed; unwinding stack");
        lua.truncate(base);
    }
    result
}

fn read_entries<K, V>(lua: &Lua, value: TValue, mut insert: impl FnMut(K, V)) -> Result<()>
where
    K: FromLua,
    V: FromLua,
{
    let idx = value
        .as_table_idx()
        .ok_or_else(|| BridgeError::type_mismatch("table", value))?;
    lua.nested_ref(|lua| {
        for (k, v) in lua.table(idx)?.pairs() {
            trace!(key = ?k, value = ?v, "map entry");
            let key = K::from_lua(lua, k)
                .map_err(|e| e.with_element(format!("key {}", lua.describe(k))))?;
            let val = V::from_lua(lua, v)
                .map_err(|e| e.with_element(format!("value at key {}", lua.describe(k))))?;
            insert(key, val);
        }
        Ok(())
    })
}

fn entries_are_instances<K: FromLua, V: FromLua>(lua: &Lua, value: TValue) -> bool {
    let Some(idx) = value.as_table_idx() else {
        return false;
    };
    lua.nested_check(|lua| match lua.table(idx) {
        Ok(table) => table
            .pairs()
            .all(|(k, v)| K::is_instance(lua, k) && V::is_instance(lua, v)),
        Err(_) => false,
    })
}

impl<K: Push, V: Push> Push for BTreeMap<K, V> {
    fn push(&self, lua: &mut Lua) -> Result<()> {
        push_entries(lua, self.len(), self.iter())
    }
}

impl<K: FromLua + Ord, V: FromLua> FromLua for BTreeMap<K, V> {
    fn from_lua(lua: &Lua, value: TValue) -> Result<Self> {
        let mut map = BTreeMap::new();
        read_entries(lua, value, |k, v| {
            map.insert(k, v);
        })?;
        Ok(map)
    }

    fn is_instance(lua: &Lua, value: TValue) -> bool {
        entries_are_instances::<K, V>(lua, value)
    }
}

impl<K: Push, V: Push, S> Push for HashMap<K, V, S> {
    fn push(&self, lua: &mut Lua) -> Result<()> {
        push_entries(lua, self.len(), self.iter())
    }
}

impl<K, V, S> FromLua for HashMap<K, V, S>
where
    K: FromLua + Eq + Hash,
    V: FromLua,
    S: BuildHasher + Default,
{
    fn from_lua(lua: &Lua, value: TValue) -> Result<Self> {
        let mut map = HashMap::default();
        read_entries(lua, value, |k, v| {
            map.insert(k, v);
        })?;
        Ok(map)
    }

    fn is_instance(lua: &Lua, value: TValue) -> bool {
        entries_are_instances::<K, V>(lua, value)
    }
}
