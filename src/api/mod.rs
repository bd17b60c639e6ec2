//! Purpose: Define the stable public Rust API boundary for hstack.
//! Exports: Registry, handle, stack and error types used by bindings and tools.
//! Role: Public, additive-only surface over the core modules.
//! Invariants: Owned `Registry` values are independent; none share handles.

pub use crate::core::error::{Error, ErrorKind, to_exit_code};
pub use crate::core::registry::{Handle, Registry, RegistryOptions};
pub use crate::core::stack::Stack;
