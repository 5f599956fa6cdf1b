//! Lua script sandbox for Crayon
//!
//! Script actions (`"type": "JAVASCRIPT"` on the wire) carry opaque source.
//! This crate runs that source as Lua 5.4 in a fresh, restricted interpreter
//! per call and plugs into the dispatcher through
//! [`crayon_core::effects::ScriptRunner`].
//!
//! ## Usage
//!
//! ```rust
//! use crayon_config::ScriptingConfig;
//! use crayon_core::effects::ScriptRunner;
//! use crayon_core::value::DynamicValue;
//! use crayon_lua::LuaScriptSandbox;
//!
//! let sandbox = LuaScriptSandbox::new(&ScriptingConfig::default());
//! let state = crayon_core::value::decode(br#"{"count": 2}"#).unwrap();
//! let result = sandbox.run("return state.count * 10", &state).unwrap();
//! assert_eq!(result, DynamicValue::Int(20));
//! ```

mod sandbox;

pub use sandbox::LuaScriptSandbox;
