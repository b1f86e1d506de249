//! Lua state: value stack, globals, handle registry and class bindings.

use crate::class::{ClassInfo, Userdata};
use crate::coerce;
use crate::config::LuaConfig;
use crate::error::{BridgeError, Result, StackKind};
use crate::luaref::{LuaRef, Registry};
use crate::policy;
use crate::stack::{FromLua, Push};
use selune_core::gc::{GcHeap, GcIdx, HeapStats};
use selune_core::string::{StringId, StringInterner};
use selune_core::table::Table;
use selune_core::value::TValue;
use std::any::TypeId;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, warn};

/// An embedded Lua state.
///
/// Stack indices follow the C API: `1` is the bottom slot, `-1` the top.
/// The state is single-threaded; conversions assume exclusive access for
/// their whole duration.
pub struct Lua {
    pub(crate) gc: GcHeap,
    pub(crate) strings: StringInterner,
    /// Value stack. Never grows past `config.max_stack`.
    stack: Vec<TValue>,
    globals: GcIdx<Table>,
    /// Anchors of live `LuaRef`s; shared with every handle.
    pub(crate) registry: Rc<RefCell<Registry>>,
    classes: HashMap<TypeId, ClassInfo>,
    config: LuaConfig,
    /// Nesting depth of container conversions in progress.
    c_stack_depth: Cell<usize>,
}

impl Lua {
    pub fn new() -> Self {
        Self::with_config(LuaConfig::default())
    }

    pub fn with_config(config: LuaConfig) -> Self {
        let mut gc = GcHeap::new();
        let globals = gc.alloc_table(0, 16);
        Lua {
            gc,
            strings: StringInterner::new(),
            stack: Vec::new(),
            globals,
            registry: Rc::new(RefCell::new(Registry::default())),
            classes: HashMap::new(),
            config,
            c_stack_depth: Cell::new(0),
        }
    }

    pub fn config(&self) -> &LuaConfig {
        &self.config
    }

    // ---- Stack ----

    /// Number of values on the stack.
    pub fn top(&self) -> usize {
        self.stack.len()
    }

    /// Returns true if `n` more values fit on the stack.
    pub fn check_stack(&self, n: usize) -> bool {
        self.stack.len() + n <= self.config.max_stack
    }

    pub(crate) fn ensure_stack(&self, n: usize) -> Result<()> {
        if self.check_stack(n) {
            Ok(())
        } else {
            warn!(
                needed = n,
                top = self.stack.len(),
                limit = self.config.max_stack,
                "value stack exhausted"
            );
            Err(BridgeError::StackOverflow {
                kind: StackKind::Values,
                limit: self.config.max_stack,
            })
        }
    }

    /// Raw values are not anchored; only the crate pushes them.
    pub(crate) fn push_value(&mut self, value: TValue) -> Result<()> {
        self.ensure_stack(1)?;
        self.stack.push(value);
        Ok(())
    }

    pub fn push_nil(&mut self) -> Result<()> {
        self.push_value(TValue::nil())
    }

    /// Pop `n` values (or everything, if fewer are present).
    pub fn pop(&mut self, n: usize) {
        let keep = self.stack.len().saturating_sub(n);
        self.stack.truncate(keep);
    }

    pub(crate) fn pop_value(&mut self) -> Result<TValue> {
        self.stack
            .pop()
            .ok_or_else(|| BridgeError::Runtime("stack is empty".into()))
    }

    /// Drop every value above `top`.
    pub fn truncate(&mut self, top: usize) {
        self.stack.truncate(top);
    }

    /// Convert an acceptable index into a 0-based stack slot.
    pub fn abs_index(&self, index: i32) -> Option<usize> {
        let top = self.stack.len() as i64;
        let i = index as i64;
        let slot = match i {
            0 => return None,
            i if i > 0 => i - 1,
            i => top + i,
        };
        (0..top).contains(&slot).then_some(slot as usize)
    }

    pub fn value_at(&self, index: i32) -> Result<TValue> {
        self.abs_index(index)
            .map(|slot| self.stack[slot])
            .ok_or_else(|| BridgeError::Runtime(format!("invalid stack index {index}")))
    }

    /// Lua type name at `index`, or "no value" for an invalid index.
    pub fn type_name(&self, index: i32) -> &'static str {
        self.value_at(index)
            .map(|v| v.type_name())
            .unwrap_or("no value")
    }

    // ---- Conversion entry points ----

    /// Push a Rust value. On failure the stack is left as it was.
    pub fn push<T: Push + ?Sized>(&mut self, value: &T) -> Result<()> {
        let base = self.top();
        let result = value.push(self);
        if result.is_err() {
            self.truncate(base);
        }
        result
    }

    /// Like [`Lua::push`], but failures go through the build's error policy.
    pub fn push_or_raise<T: Push + ?Sized>(&mut self, value: &T) {
        policy::unwrap_or_raise(self.push(value))
    }

    /// Convert the value at `index` to `T`.
    pub fn get<T: FromLua>(&self, index: i32) -> Result<T> {
        T::from_lua(self, self.value_at(index)?)
    }

    /// Non-failing shape check of the value at `index`.
    pub fn is_instance<T: FromLua>(&self, index: i32) -> bool {
        match self.value_at(index) {
            Ok(v) => T::is_instance(self, v),
            Err(_) => false,
        }
    }

    /// Push `value` and pop it again, yielding the Lua value it became.
    pub(crate) fn to_tvalue<T: Push + ?Sized>(&mut self, value: &T) -> Result<TValue> {
        self.push(value)?;
        self.pop_value()
    }

    // ---- Nesting ----

    pub(crate) fn enter_nested(&self) -> Result<()> {
        let depth = self.c_stack_depth.get();
        if depth >= self.config.max_c_stack_depth {
            warn!(depth, "conversion nesting limit reached");
            return Err(BridgeError::StackOverflow {
                kind: StackKind::Nesting,
                limit: self.config.max_c_stack_depth,
            });
        }
        self.c_stack_depth.set(depth + 1);
        Ok(())
    }

    pub(crate) fn leave_nested(&self) {
        self.c_stack_depth
            .set(self.c_stack_depth.get().saturating_sub(1));
    }

    /// Run one nested conversion step with mutable access.
    pub(crate) fn nested<R>(&mut self, f: impl FnOnce(&mut Lua) -> Result<R>) -> Result<R> {
        self.enter_nested()?;
        let result = f(self);
        self.leave_nested();
        result
    }

    pub(crate) fn nested_ref<R>(&self, f: impl FnOnce(&Lua) -> Result<R>) -> Result<R> {
        self.enter_nested()?;
        let result = f(self);
        self.leave_nested();
        result
    }

    /// Nested shape check; exceeding the nesting limit answers false.
    pub(crate) fn nested_check(&self, f: impl FnOnce(&Lua) -> bool) -> bool {
        self.nested_ref(|lua| Ok(f(lua))).unwrap_or(false)
    }

    // ---- Tables ----

    pub(crate) fn alloc_table(&mut self, array_hint: usize, hash_hint: usize) -> GcIdx<Table> {
        debug!(array_hint, hash_hint, "alloc table");
        self.gc.alloc_table(array_hint, hash_hint)
    }

    /// Pop a value and a key off the stack and store them into `table`.
    pub(crate) fn raw_set_from_stack(&mut self, table: GcIdx<Table>) -> Result<()> {
        let value = self.pop_value()?;
        let key = self.pop_value()?;
        self.gc
            .get_table_mut(table)
            .raw_set(key, value)
            .map_err(|msg| BridgeError::Runtime(msg.to_string()))
    }

    /// Fails for a table that has been collected.
    pub(crate) fn table(&self, idx: GcIdx<Table>) -> Result<&Table> {
        self.gc
            .try_get_table(idx)
            .ok_or_else(|| BridgeError::Runtime("stale reference: table was collected".into()))
    }

    pub(crate) fn table_mut(&mut self, idx: GcIdx<Table>) -> &mut Table {
        self.gc.get_table_mut(idx)
    }

    /// Create an empty table with size hints.
    pub fn create_table(&mut self, array_hint: usize, hash_hint: usize) -> LuaRef {
        let idx = self.alloc_table(array_hint, hash_hint);
        LuaRef::from_value(self, TValue::from_table(idx))
    }

    pub fn new_table(&mut self) -> LuaRef {
        self.create_table(0, 0)
    }

    /// Create a 1-indexed sequence table from `items`.
    pub fn create_sequence<T, I>(&mut self, items: I) -> Result<LuaRef>
    where
        T: Push,
        I: IntoIterator<Item = T>,
    {
        let idx = self.alloc_table(0, 0);
        let table = LuaRef::from_value(self, TValue::from_table(idx));
        for (i, item) in items.into_iter().enumerate() {
            let value = self.to_tvalue(&item)?;
            self.table_mut(idx).raw_seti(i as i64 + 1, value);
        }
        Ok(table)
    }

    /// Create a native function value. Calling it is outside the bridge's scope;
    /// it exists so function values can be stored and shape-checked.
    pub fn create_function(
        &mut self,
        name: &'static str,
        func: fn(&[TValue]) -> std::result::Result<Vec<TValue>, String>,
    ) -> LuaRef {
        let idx = self.gc.alloc_native(func, name);
        LuaRef::from_value(self, TValue::from_native(idx))
    }

    // ---- Globals ----

    pub fn set_global<T: Push + ?Sized>(&mut self, name: &str, value: &T) -> Result<()> {
        let key = self.intern(name.as_bytes());
        let value = self.to_tvalue(value)?;
        let globals = self.globals;
        self.table_mut(globals).raw_set_str(key, value);
        Ok(())
    }

    /// Handle to a global; nil if unset.
    pub fn get_global(&self, name: &str) -> LuaRef {
        let value = match self.strings.find(name.as_bytes()) {
            Some(sid) => self
                .gc
                .get_table(self.globals)
                .raw_get(TValue::from_string_id(sid)),
            None => TValue::nil(),
        };
        LuaRef::from_value(self, value)
    }

    // ---- Strings ----

    pub fn intern(&mut self, bytes: &[u8]) -> StringId {
        self.strings.intern(bytes)
    }

    /// Bytes of a string value; None for other kinds.
    pub fn string_bytes(&self, value: TValue) -> Option<&[u8]> {
        value.as_string_id().map(|sid| self.strings.get_bytes(sid))
    }

    /// Short human-readable form of a value, for error messages.
    pub fn describe(&self, value: TValue) -> String {
        match value {
            TValue::Nil | TValue::Bool(_) => format!("{value:?}"),
            TValue::Integer(_) | TValue::Float(_) => {
                coerce::number_to_string(value).unwrap_or_default()
            }
            TValue::String(sid) => {
                format!("{:?}", String::from_utf8_lossy(self.strings.get_bytes(sid)))
            }
            other => other.type_name().to_string(),
        }
    }

    // ---- Classes ----

    /// Register `T` so it can cross the boundary as userdata. Registering
    /// twice keeps the first binding.
    pub fn register_class<T: Userdata>(&mut self, name: &'static str) -> &ClassInfo {
        let type_id = TypeId::of::<T>();
        if !self.classes.contains_key(&type_id) {
            let metatable = self.alloc_table(0, 1);
            let key = self.intern(b"__name");
            let value = TValue::from_string_id(self.intern(name.as_bytes()));
            self.table_mut(metatable).raw_set_str(key, value);
            debug!(class = name, "register class");
            self.classes.insert(type_id, ClassInfo { name, metatable });
        }
        &self.classes[&type_id]
    }

    pub fn class_info<T: Userdata>(&self) -> Option<&ClassInfo> {
        self.classes.get(&TypeId::of::<T>())
    }

    pub fn is_registered<T: Userdata>(&self) -> bool {
        self.class_info::<T>().is_some()
    }

    // ---- GC ----

    /// Full mark/sweep cycle. Roots: stack, globals, live `LuaRef`s and
    /// class metatables. Returns the number of objects freed.
    pub fn collect_garbage(&mut self) -> usize {
        self.gc.gc_prepare_marks();
        self.gc.gc_mark_value(TValue::from_table(self.globals));
        for v in self.stack.iter() {
            self.gc.gc_mark_value(*v);
        }
        for v in self.registry.borrow().values() {
            self.gc.gc_mark_value(v);
        }
        for info in self.classes.values() {
            self.gc.gc_mark_value(TValue::from_table(info.metatable));
        }
        let freed = self.gc.gc_sweep();
        debug!(freed, live = ?self.gc.stats(), "collect garbage");
        freed
    }

    pub fn heap_stats(&self) -> HeapStats {
        self.gc.stats()
    }

    /// Number of `LuaRef`s currently anchoring a collectable value.
    pub fn live_refs(&self) -> usize {
        self.registry.borrow().live()
    }
}

impl Default for Lua {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Lua {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lua")
            .field("top", &self.stack.len())
            .field("heap", &self.gc.stats())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
