//! The built-in function library, one module per family. `IF`/`IFS`/
//! `SWITCH` are notably absent: they evaluate their branches lazily and
//! are special-cased directly in the interpreter's `Call` dispatch.

pub mod conditional;
pub mod criteria;
pub mod date;
pub mod lookup;
pub mod logical;
pub mod math;
pub mod text;
