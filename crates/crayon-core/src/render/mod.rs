//! Rendering: resolve `@state:` references and map nodes to elements

pub mod element;
pub mod renderer;
pub mod resolve;

pub use element::{ButtonSize, ButtonVariant, Element, IconPosition, PickerOption};
pub use renderer::{node_action, Renderer};
pub use resolve::{resolve_deep, resolve_value, state_key, STATE_PREFIX};
