//! Adapter between a fact graph engine and a probing front end.
//!
//! A front end sends fact paths and raw values; the adapter checks the paths,
//! forwards the calls to the engine, makes sense of whatever the engine hands
//! back, and turns it into text fit for display.
//!
//! - **[`core`]**: Pure logic (path validation, outcome interpretation, value
//!   normalization). No I/O.
//! - **[`engine`]**: The traits an engine implements.
//! - **[`io`]**: Config files and the process bridge engine.
//! - **[`session`]**: The loaded graph and the entry points a front end calls.
//! - **[`shell`]**: Line-oriented interactive front end used by `probe shell`.

pub mod core;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod session;
pub mod shell;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
