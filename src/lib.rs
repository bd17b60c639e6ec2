//! Purpose: Handle-indexed LIFO byte stacks for Rust callers and C callers.
//! Exports: `api` (stable Rust surface), `abi` (C-callable functions), `core`.
//! Role: Library crate backing `hstack-bench` and the `cdylib`/`staticlib` builds.
//! Invariants: Callers address stacks only through integer handles.
//! Invariants: Handles are issued in increasing order and never reissued.
pub mod abi;
pub mod api;
pub mod core;
