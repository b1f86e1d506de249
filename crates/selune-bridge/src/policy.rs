//! Build-time error policy for the raising entry points.
//!
//! Conversions report failures as `Result`. Entry points that return a plain
//! value ([`crate::Lua::push_or_raise`], [`crate::LuaRef::cast`]) hand errors
//! to [`raise`]: by default it unwinds with the `BridgeError` as panic
//! payload; with the `abort-on-error` feature it aborts the process.

use crate::error::{BridgeError, Result};

/// True when built with `abort-on-error`.
pub const ABORTS: bool = cfg!(feature = "abort-on-error");

#[cfg(not(feature = "abort-on-error"))]
pub fn raise(err: BridgeError) -> ! {
    tracing::debug!(%err, "raising conversion error");
    std::panic::panic_any(err)
}

#[cfg(feature = "abort-on-error")]
pub fn raise(err: BridgeError) -> ! {
    tracing::error!(%err, "unrecoverable conversion error; aborting");
    eprintln!("selune-bridge: {err}");
    std::process::abort()
}

pub fn unwrap_or_raise<T>(result: Result<T>) -> T {
    match result {
        Ok(v) => v,
        Err(err) => raise(err),
    }
}
