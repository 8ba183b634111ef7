//! Common Utilities
//!
//! Shared utilities used across the compiler modules. Contains
//! CLI parsing and terminal colors so each compiler doesn't
//! duplicate this infrastructure.
//!

pub mod args;
pub mod colors;
