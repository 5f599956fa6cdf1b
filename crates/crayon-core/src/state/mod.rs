//! State bindings, computed expressions and the reactive store

pub mod binding;
pub mod expression;
pub mod store;

pub use binding::{BindingType, StateBinding, StateConfiguration, StateWatcher};
pub use expression::{Expr, ExpressionError};
pub use store::{SetOutcome, StateStore, WatcherEvent, WATCH_PREFIX};
