//! Pure adapter logic: path checks, outcome interpretation, value rendering.
//!
//! Nothing here talks to the engine or the filesystem. Every function works on
//! in-memory values and returns deterministic text, so behavior is testable
//! without a real fact graph.

pub mod messages;
pub mod normalize;
pub mod outcome;
pub mod path;
pub mod sanitize;
pub mod value;
