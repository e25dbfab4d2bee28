//! CLI command implementations.

pub mod common;
pub mod config;
pub mod control;
pub mod devices;
pub mod graph;
pub mod plugins;
pub mod process;
pub mod realtime;
