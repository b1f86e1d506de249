//! Selune bridge: moves Rust values, maps in particular, in and out of a
//! Selune state.
//!
//! ```
//! use selune_bridge::Lua;
//! use std::collections::BTreeMap;
//!
//! let mut lua = Lua::new();
//! let scores = BTreeMap::from([("ann".to_string(), 3), ("bob".to_string(), 5)]);
//! lua.push(&scores).unwrap();
//! assert!(lua.is_instance::<BTreeMap<String, i32>>(-1));
//! assert_eq!(lua.get::<BTreeMap<String, i32>>(-1).unwrap(), scores);
//! ```

pub mod class;
pub mod coerce;
pub mod config;
pub mod error;
pub mod luaref;
pub mod map;
pub mod policy;
pub mod stack;
pub mod state;

pub use class::{ClassInfo, Userdata};
pub use config::LuaConfig;
pub use error::{BridgeError, Result, StackKind};
pub use luaref::LuaRef;
pub use selune_core::value::{TValue, ValueKind};
pub use stack::{FromLua, Push};
pub use state::Lua;
