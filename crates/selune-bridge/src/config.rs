//! Runtime limits.

/// Maximum value stack size (slots), as in PUC Lua.
pub const LUAI_MAXSTACK: usize = 1_000_000;

/// Maximum nesting of native conversion calls.
pub const LUAI_MAXCCALLS: usize = 200;

/// Limits applied to a [`crate::Lua`] state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LuaConfig {
    /// Max value stack slots.
    pub max_stack: usize,
    /// Max depth of nested container conversions before "C stack overflow".
    pub max_c_stack_depth: usize,
}

impl LuaConfig {
    pub fn with_max_stack(mut self, slots: usize) -> Self {
        self.max_stack = slots;
        self
    }

    pub fn with_max_c_stack_depth(mut self, depth: usize) -> Self {
        self.max_c_stack_depth = depth;
        self
    }
}

impl Default for LuaConfig {
    fn default() -> Self {
        LuaConfig {
            max_stack: LUAI_MAXSTACK,
            max_c_stack_depth: LUAI_MAXCCALLS,
        }
    }
}
