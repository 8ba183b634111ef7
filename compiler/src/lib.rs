//! Ingot Compiler
//!
//! Compiles XML view templates and their stylesheets into
//! JavaScript view factories, and renders templates in-process
//! against JSON data.
//!

pub mod common;
mod patterns;
pub mod script;
pub mod styles;
pub mod views;
