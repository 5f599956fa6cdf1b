//! Restricted Lua interpreter implementing [`ScriptRunner`]

use crayon_config::ScriptingConfig;
use crayon_core::effects::{ScriptError, ScriptRunner};
use crayon_core::value::DynamicValue;
use mlua::{
    Function, HookTriggers, Lua, LuaOptions, LuaSerdeExt, SerializeOptions, StdLib, Value, VmState,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// How often the instruction hook fires
const HOOK_INTERVAL: u32 = 1_000;

/// Base-library functions that reach the file system or load bytecode
const REMOVED_GLOBALS: [&str; 4] = ["dofile", "loadfile", "load", "collectgarbage"];

/// Wraps the state snapshot so assignments raise instead of silently
/// editing the copy.
const FREEZE_STATE: &str = r#"
return function(data)
    if type(data) ~= "table" then
        return data
    end
    return setmetatable({}, {
        __index = data,
        __newindex = function()
            error("state is read-only", 2)
        end,
        __len = function()
            return #data
        end,
        __pairs = function()
            return next, data, nil
        end,
        __metatable = false,
    })
end
"#;

/// Runs each script in a fresh Lua state with only the `table`, `string`,
/// `math` and `utf8` libraries, a heap limit and an instruction budget.
///
/// The store snapshot is available as the global `state`; the script's
/// return value becomes the effect result.
#[derive(Debug, Clone)]
pub struct LuaScriptSandbox {
    memory_limit: usize,
    instruction_limit: u64,
}

impl LuaScriptSandbox {
    pub fn new(config: &ScriptingConfig) -> Self {
        Self {
            memory_limit: config.memory_limit_bytes,
            instruction_limit: u64::from(config.instruction_limit),
        }
    }

    fn create_lua(&self, exhausted: Arc<AtomicBool>) -> Result<Lua, ScriptError> {
        let lua = Lua::new_with(
            StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8,
            LuaOptions::default(),
        )
        .map_err(|e| ScriptError::Sandbox(e.to_string()))?;

        lua.set_memory_limit(self.memory_limit)
            .map_err(|e| ScriptError::Sandbox(e.to_string()))?;

        let globals = lua.globals();
        for name in REMOVED_GLOBALS {
            globals
                .set(name, Value::Nil)
                .map_err(|e| ScriptError::Sandbox(e.to_string()))?;
        }

        let limit = self.instruction_limit;
        let executed = AtomicU64::new(0);
        lua.set_hook(
            HookTriggers::new().every_nth_instruction(HOOK_INTERVAL),
            move |_lua, _debug| {
                let total = executed.fetch_add(u64::from(HOOK_INTERVAL), Ordering::Relaxed)
                    + u64::from(HOOK_INTERVAL);
                if total > limit {
                    exhausted.store(true, Ordering::Relaxed);
                    return Err(mlua::Error::RuntimeError(
                        "instruction limit exceeded".to_string(),
                    ));
                }
                Ok(VmState::Continue)
            },
        )
        .map_err(|e| ScriptError::Sandbox(e.to_string()))?;

        Ok(lua)
    }

    fn execute(&self, lua: &Lua, script: &str, state: &DynamicValue) -> mlua::Result<DynamicValue> {
        let freeze: Function = lua.load(FREEZE_STATE).set_name("=freeze").eval()?;
        let snapshot = lua.to_value_with(state, snapshot_options())?;
        let frozen: Value = freeze.call(snapshot)?;
        lua.globals().set("state", frozen)?;

        let result: Value = lua.load(script).set_name("=action").eval()?;
        lua.from_value(result)
    }
}

/// Nulls in the snapshot become `nil` so scripts can test for them
fn snapshot_options() -> SerializeOptions {
    SerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false)
}

fn classify(error: mlua::Error, exhausted: bool) -> ScriptError {
    if exhausted {
        return ScriptError::LimitExceeded("instruction");
    }
    match error {
        mlua::Error::SyntaxError { message, .. } => ScriptError::Syntax(message),
        mlua::Error::MemoryError(_) => ScriptError::LimitExceeded("memory"),
        mlua::Error::CallbackError { cause, .. } => classify((*cause).clone(), false),
        other => ScriptError::Runtime(other.to_string()),
    }
}

impl ScriptRunner for LuaScriptSandbox {
    fn run(&self, script: &str, state: &DynamicValue) -> Result<DynamicValue, ScriptError> {
        let exhausted = Arc::new(AtomicBool::new(false));
        let lua = self.create_lua(exhausted.clone())?;

        debug!("Running {} byte script", script.len());
        self.execute(&lua, script, state).map_err(|e| {
            let error = classify(e, exhausted.load(Ordering::Relaxed));
            warn!("Script rejected: {}", error);
            error
        })
    }
}
