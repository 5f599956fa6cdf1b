//! # Crayon Configuration Library
//!
//! Typed configuration for the Crayon SDUI engine: chat and validation
//! endpoints, validation pacing, dispatch limits, script sandbox limits and
//! logging.
//!
//! ## Features
//!
//! - TOML and JSON files (chosen by extension)
//! - Defaults for every field, so an empty file is a valid config
//! - Validation of URLs and limits before use
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crayon_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load_from_file("crayon.toml").await?;
//!     println!("chat endpoint: {}", config.chat.base_url);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod components;
mod config;
mod loader;

pub use components::*;
pub use config::*;
pub use loader::*;
