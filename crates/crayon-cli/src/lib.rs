//! Crayon CLI library
//!
//! Argument parsing, logging setup and the `render`, `validate` and `chat`
//! commands behind the `crayon` binary.

pub mod cli;
pub mod commands;
pub mod logging;
