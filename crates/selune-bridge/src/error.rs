//! Conversion error types.

use selune_core::value::TValue;
use std::fmt;
use thiserror::Error;

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Which stack ran out of headroom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackKind {
    /// The value stack (`LuaConfig::max_stack` slots).
    Values,
    /// Nested conversion depth (`LuaConfig::max_c_stack_depth`).
    Nesting,
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackKind::Values => write!(f, "stack overflow"),
            StackKind::Nesting => write!(f, "C stack overflow"),
        }
    }
}

/// An error raised while moving a value across the Rust/Lua boundary.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum BridgeError {
    /// The Rust type has no registered conversion (push direction).
    #[error("no coercion available for type `{type_name}`")]
    UnsupportedType { type_name: &'static str },

    /// A Lua value cannot be coerced to the requested Rust type.
    #[error("{expected} expected, got {found}{}", element_suffix(.element))]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
        /// Path to the failing element inside a container, outermost first.
        element: Option<String>,
    },

    /// Not enough stack headroom to finish the conversion.
    #[error("{kind} (limit {limit})")]
    StackOverflow { kind: StackKind, limit: usize },

    #[error("{0}")]
    Runtime(String),
}

fn element_suffix(element: &Option<String>) -> String {
    match element {
        Some(path) => format!(" (at {path})"),
        None => String::new(),
    }
}

impl BridgeError {
    pub fn type_mismatch(expected: &'static str, found: TValue) -> Self {
        BridgeError::TypeMismatch {
            expected,
            found: found.type_name(),
            element: None,
        }
    }

    /// Prefix the element path of a `TypeMismatch`; other kinds pass through.
    pub fn with_element(self, desc: impl Into<String>) -> Self {
        match self {
            BridgeError::TypeMismatch {
                expected,
                found,
                element,
            } => {
                let desc = desc.into();
                let element = Some(match element {
                    Some(inner) => format!("{desc} > {inner}"),
                    None => desc,
                });
                BridgeError::TypeMismatch {
                    expected,
                    found,
                    element,
                }
            }
            other => other,
        }
    }

    pub fn is_stack_overflow(&self) -> bool {
        matches!(self, BridgeError::StackOverflow { .. })
    }
}
