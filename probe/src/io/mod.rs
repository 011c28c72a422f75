//! Side-effecting pieces: configuration files and the engine bridge process.

pub mod bridge;
pub mod config;
pub mod process;
