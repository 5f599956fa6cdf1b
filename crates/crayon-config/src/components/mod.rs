//! Configuration components for the Crayon engine
//!
//! One small, focused section per subsystem that actually needs tuning.

pub mod chat;
pub mod dispatch;
pub mod logging;
pub mod scripting;
pub mod validation;

pub use chat::*;
pub use dispatch::*;
pub use logging::*;
pub use scripting::*;
pub use validation::*;
