//! GC heap with arena-based allocation, typed indices and mark/sweep.

use crate::table::Table;
use crate::value::TValue;
use std::any::Any;
use std::marker::PhantomData;

/// A typed index into an arena in the GcHeap.
pub struct GcIdx<T>(pub u32, pub PhantomData<T>);

impl<T> std::fmt::Debug for GcIdx<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GcIdx({})", self.0)
    }
}

impl<T> Clone for GcIdx<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for GcIdx<T> {}

impl<T> PartialEq for GcIdx<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl<T> Eq for GcIdx<T> {}

impl<T> std::hash::Hash for GcIdx<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T> GcIdx<T> {
    pub fn new(index: u32) -> Self {
        GcIdx(index, PhantomData)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

/// A native (Rust) function value.
pub struct NativeFunction {
    pub func: fn(&[TValue]) -> Result<Vec<TValue>, String>,
    pub name: &'static str,
}

impl std::fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "native({})", self.name)
    }
}

/// A full userdata: an owned Rust value plus an optional metatable.
pub struct Userdata {
    pub data: Box<dyn Any>,
    pub metatable: Option<GcIdx<Table>>,
}

impl std::fmt::Debug for Userdata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "userdata(metatable={:?})", self.metatable.map(|m| m.0))
    }
}

/// One arena: slots, a free list and the mark bits of the current cycle.
struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<u32>,
    marks: Vec<bool>,
}

impl<T> Arena<T> {
    fn new() -> Self {
        Arena {
            slots: Vec::new(),
            free: Vec::new(),
            marks: Vec::new(),
        }
    }

    fn alloc(&mut self, value: T) -> u32 {
        if let Some(idx) = self.free.pop() {
            self.slots[idx as usize] = Some(value);
            idx
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(Some(value));
            idx
        }
    }

    fn get(&self, idx: u32) -> Option<&T> {
        self.slots.get(idx as usize).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, idx: u32) -> Option<&mut T> {
        self.slots.get_mut(idx as usize).and_then(Option::as_mut)
    }

    fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn prepare_marks(&mut self) {
        self.marks.clear();
        self.marks.resize(self.slots.len(), false);
    }

    /// Returns true if the slot was not yet marked.
    fn mark(&mut self, idx: u32) -> bool {
        match self.marks.get_mut(idx as usize) {
            Some(m) if !*m => {
                *m = true;
                true
            }
            _ => false,
        }
    }

    fn sweep(&mut self) -> usize {
        let mut freed = 0;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_some() && !self.marks.get(i).copied().unwrap_or(false) {
                *slot = None;
                self.free.push(i as u32);
                freed += 1;
            }
        }
        freed
    }
}

/// Counts of live objects per arena.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub tables: usize,
    pub natives: usize,
    pub userdata: usize,
}

/// Arena-based GC heap.
pub struct GcHeap {
    tables: Arena<Table>,
    natives: Arena<NativeFunction>,
    userdata: Arena<Userdata>,
    gray: Vec<TValue>,
}

impl GcHeap {
    pub fn new() -> Self {
        GcHeap {
            tables: Arena::new(),
            natives: Arena::new(),
            userdata: Arena::new(),
            gray: Vec::new(),
        }
    }

    pub fn alloc_table(&mut self, array_hint: usize, hash_hint: usize) -> GcIdx<Table> {
        GcIdx::new(self.tables.alloc(Table::new(array_hint, hash_hint)))
    }

    pub fn get_table(&self, idx: GcIdx<Table>) -> &Table {
        self.tables.get(idx.0).expect("table was freed")
    }

    pub fn get_table_mut(&mut self, idx: GcIdx<Table>) -> &mut Table {
        self.tables.get_mut(idx.0).expect("table was freed")
    }

    /// Like [`GcHeap::get_table`], but None once the table was collected.
    pub fn try_get_table(&self, idx: GcIdx<Table>) -> Option<&Table> {
        self.tables.get(idx.0)
    }

    pub fn alloc_native(
        &mut self,
        func: fn(&[TValue]) -> Result<Vec<TValue>, String>,
        name: &'static str,
    ) -> GcIdx<NativeFunction> {
        GcIdx::new(self.natives.alloc(NativeFunction { func, name }))
    }

    pub fn alloc_userdata(
        &mut self,
        data: Box<dyn Any>,
        metatable: Option<GcIdx<Table>>,
    ) -> GcIdx<Userdata> {
        GcIdx::new(self.userdata.alloc(Userdata { data, metatable }))
    }

    /// None once the userdata was collected.
    pub fn try_get_userdata(&self, idx: GcIdx<Userdata>) -> Option<&Userdata> {
        self.userdata.get(idx.0)
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats {
            tables: self.tables.live(),
            natives: self.natives.live(),
            userdata: self.userdata.live(),
        }
    }

    // ---- Collection ----

    /// Reset mark bits at the start of a cycle.
    pub fn gc_prepare_marks(&mut self) {
        self.tables.prepare_marks();
        self.natives.prepare_marks();
        self.userdata.prepare_marks();
        self.gray.clear();
    }

    /// Mark a root and everything reachable from it.
    pub fn gc_mark_value(&mut self, root: TValue) {
        self.gray.push(root);
        while let Some(v) = self.gray.pop() {
            match v {
                TValue::Table(idx) => {
                    if !self.tables.mark(idx.0) {
                        continue;
                    }
                    let Some(table) = self.tables.get(idx.0) else {
                        continue;
                    };
                    if let Some(mt) = table.metatable {
                        self.gray.push(TValue::from_table(mt));
                    }
                    self.gray.extend(table.array_values().iter().copied());
                    for (k, v) in table.hash_entries() {
                        self.gray.push(k.to_tvalue());
                        self.gray.push(*v);
                    }
                }
                TValue::Userdata(idx) => {
                    if !self.userdata.mark(idx.0) {
                        continue;
                    }
                    if let Some(mt) = self.userdata.get(idx.0).and_then(|u| u.metatable) {
                        self.gray.push(TValue::from_table(mt));
                    }
                }
                TValue::Function(idx) => {
                    self.natives.mark(idx.0);
                }
                _ => {}
            }
        }
    }

    /// Free every unmarked object. Returns the number of objects freed.
    pub fn gc_sweep(&mut self) -> usize {
        self.tables.sweep() + self.natives.sweep() + self.userdata.sweep()
    }
}

impl Default for GcHeap {
    fn default() -> Self {
        Self::new()
    }
}
