// Core modules implementing the handle registry, stack instances, and errors.
pub mod error;
pub mod registry;
pub mod stack;
