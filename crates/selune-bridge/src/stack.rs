//! `Push` / `FromLua`: per-type conversion traits and primitive impls.

use crate::coerce;
use crate::error::{BridgeError, Result};
use crate::state::Lua;
use selune_core::value::TValue;

/// Rust → Lua conversion.
pub trait Push {
    /// Push exactly one value onto the stack, or fail.
    ///
    /// Implementations may leave partial values on the stack when they
    /// fail; [`Lua::push`] restores the stack height.
    fn push(&self, lua: &mut Lua) -> Result<()>;
}

/// Lua → Rust conversion.
pub trait FromLua: Sized {
    fn from_lua(lua: &Lua, value: TValue) -> Result<Self>;

    /// Would [`FromLua::from_lua`] succeed for `value`? Never fails and never
    /// mutates the state.
    fn is_instance(lua: &Lua, value: TValue) -> bool;
}

/// References push their referent by value.
impl<T: Push + ?Sized> Push for &T {
    fn push(&self, lua: &mut Lua) -> Result<()> {
        (**self).push(lua)
    }
}

impl<T: Push + ?Sized> Push for Box<T> {
    fn push(&self, lua: &mut Lua) -> Result<()> {
        (**self).push(lua)
    }
}

impl Push for bool {
    fn push(&self, lua: &mut Lua) -> Result<()> {
        lua.push_value(TValue::from_bool(*self))
    }
}

/// Lua truthiness: every value converts, only nil and false are false.
impl FromLua for bool {
    fn from_lua(_lua: &Lua, value: TValue) -> Result<Self> {
        Ok(value.is_truthy())
    }

    fn is_instance(_lua: &Lua, value: TValue) -> bool {
        value.is_bool()
    }
}

macro_rules! impl_signed {
    ($($t:ty),*) => {$(
        impl Push for $t {
            fn push(&self, lua: &mut Lua) -> Result<()> {
                lua.push_value(TValue::from_integer(*self as i64))
            }
        }

        impl FromLua for $t {
            fn from_lua(lua: &Lua, value: TValue) -> Result<Self> {
                coerce::to_integer(value, &lua.strings)
                    .and_then(|i| <$t>::try_from(i).ok())
                    .ok_or_else(|| BridgeError::type_mismatch(stringify!($t), value))
            }

            fn is_instance(lua: &Lua, value: TValue) -> bool {
                value.is_number() && Self::from_lua(lua, value).is_ok()
            }
        }
    )*};
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {$(
        impl Push for $t {
            fn push(&self, lua: &mut Lua) -> Result<()> {
                // values beyond i64 degrade to float, as lua_pushnumber would
                let v = match i64::try_from(*self) {
                    Ok(i) => TValue::from_integer(i),
                    Err(_) => TValue::from_float(*self as f64),
                };
                lua.push_value(v)
            }
        }

        impl FromLua for $t {
            fn from_lua(lua: &Lua, value: TValue) -> Result<Self> {
                let int = coerce::to_integer(value, &lua.strings)
                    .and_then(|i| <$t>::try_from(i).ok());
                let wide = || {
                    coerce::to_number(value, &lua.strings)
                        // MAX as f64 may round up to 2^bits, which no longer fits
                        .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < <$t>::MAX as f64 + 1.0)
                        .map(|f| f as $t)
                };
                int.or_else(wide)
                    .ok_or_else(|| BridgeError::type_mismatch(stringify!($t), value))
            }

            fn is_instance(lua: &Lua, value: TValue) -> bool {
                value.is_number() && Self::from_lua(lua, value).is_ok()
            }
        }
    )*};
}

impl_signed!(i8, i16, i32, i64, isize);
impl_unsigned!(u8, u16, u32, u64, usize);

macro_rules! impl_float {
    ($($t:ty),*) => {$(
        impl Push for $t {
            fn push(&self, lua: &mut Lua) -> Result<()> {
                lua.push_value(TValue::from_float(*self as f64))
            }
        }

        impl FromLua for $t {
            fn from_lua(lua: &Lua, value: TValue) -> Result<Self> {
                coerce::to_number(value, &lua.strings)
                    .map(|f| f as $t)
                    .ok_or_else(|| BridgeError::type_mismatch("number", value))
            }

            fn is_instance(_lua: &Lua, value: TValue) -> bool {
                value.is_number()
            }
        }
    )*};
}

impl_float!(f32, f64);

impl Push for str {
    fn push(&self, lua: &mut Lua) -> Result<()> {
        lua.ensure_stack(1)?;
        let sid = lua.intern(self.as_bytes());
        lua.push_value(TValue::from_string_id(sid))
    }
}

impl Push for String {
    fn push(&self, lua: &mut Lua) -> Result<()> {
        self.as_str().push(lua)
    }
}

/// Strings convert directly; numbers convert to their `tostring` form.
impl FromLua for String {
    fn from_lua(lua: &Lua, value: TValue) -> Result<Self> {
        if let Some(bytes) = lua.string_bytes(value) {
            return String::from_utf8(bytes.to_vec())
                .map_err(|_| BridgeError::type_mismatch("UTF-8 string", value));
        }
        coerce::number_to_string(value).ok_or_else(|| BridgeError::type_mismatch("string", value))
    }

    fn is_instance(lua: &Lua, value: TValue) -> bool {
        lua.string_bytes(value)
            .is_some_and(|bytes| std::str::from_utf8(bytes).is_ok())
    }
}

/// A `char` is a one-character string.
impl Push for char {
    fn push(&self, lua: &mut Lua) -> Result<()> {
        let mut buf = [0u8; 4];
        self.encode_utf8(&mut buf).push(lua)
    }
}

/// The first character of a string (or of a number's string form).
impl FromLua for char {
    fn from_lua(lua: &Lua, value: TValue) -> Result<Self> {
        String::from_lua(lua, value)
            .ok()
            .and_then(|s| s.chars().next())
            .ok_or_else(|| BridgeError::type_mismatch("character", value))
    }

    fn is_instance(lua: &Lua, value: TValue) -> bool {
        value.is_string() && Self::from_lua(lua, value).is_ok()
    }
}
