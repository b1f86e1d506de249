//! Selune core types: values, strings, tables and the GC heap.

pub mod gc;
pub mod string;
pub mod table;
pub mod value;
