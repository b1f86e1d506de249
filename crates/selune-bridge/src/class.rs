//! Registered classes: Rust types that cross the boundary as userdata.
//!
//! A type opts in at compile time with [`impl_userdata!`] and becomes usable
//! at run time once [`Lua::register_class`] has been called for it. Pushing
//! an instance of an unregistered type fails with `UnsupportedType`.

use crate::error::{BridgeError, Result};
use crate::state::Lua;
use selune_core::gc::GcIdx;
use selune_core::table::Table;
use selune_core::value::TValue;
use std::any::{type_name, Any};

/// Marker for types that may be bound as a class.
///
/// Instances are copied into the Lua heap on push and copied back out on
/// get; equality and ordering stay the Rust type's own.
pub trait Userdata: Any + Clone {}

/// Run-time binding of a registered class.
#[derive(Clone, Debug)]
pub struct ClassInfo {
    pub name: &'static str,
    /// Metatable shared by every instance; carries `__name`.
    pub metatable: GcIdx<Table>,
}

/// Push a copy of `value` as a full userdata.
pub fn push_userdata<T: Userdata>(lua: &mut Lua, value: &T) -> Result<()> {
    let metatable = lua
        .class_info::<T>()
        .map(|info| info.metatable)
        .ok_or(BridgeError::UnsupportedType {
            type_name: type_name::<T>(),
        })?;
    lua.ensure_stack(1)?;
    let ud = lua.gc.alloc_userdata(Box::new(value.clone()), Some(metatable));
    lua.push_value(TValue::from_userdata(ud))
}

fn class_name<T: Userdata>(lua: &Lua) -> &'static str {
    lua.class_info::<T>()
        .map(|info| info.name)
        .unwrap_or_else(type_name::<T>)
}

fn borrow_userdata<T: Userdata>(lua: &Lua, value: TValue) -> Option<&T> {
    let idx = value.as_userdata_idx()?;
    lua.gc.try_get_userdata(idx)?.data.downcast_ref::<T>()
}

/// Copy a `T` out of a userdata value.
pub fn get_userdata<T: Userdata>(lua: &Lua, value: TValue) -> Result<T> {
    borrow_userdata::<T>(lua, value)
        .cloned()
        .ok_or_else(|| BridgeError::type_mismatch(class_name::<T>(lua), value))
}

pub fn is_userdata<T: Userdata>(lua: &Lua, value: TValue) -> bool {
    borrow_userdata::<T>(lua, value).is_some()
}

/// Implement [`Userdata`], [`Push`](crate::Push) and
/// [`FromLua`](crate::FromLua) for one or more class types.
#[macro_export]
macro_rules! impl_userdata {
    ($($t:ty),+ $(,)?) => {$(
        impl $crate::Userdata for $t {}

        impl $crate::Push for $t {
            fn push(&self, lua: &mut $crate::Lua) -> $crate::Result<()> {
                $crate::class::push_userdata(lua, self)
            }
        }

        impl $crate::FromLua for $t {
            fn from_lua(
                lua: &$crate::Lua,
                value: $crate::TValue,
            ) -> $crate::Result<Self> {
                $crate::class::get_userdata(lua, value)
            }

            fn is_instance(lua: &$crate::Lua, value: $crate::TValue) -> bool {
                $crate::class::is_userdata::<$t>(lua, value)
            }
        }
    )+};
}
