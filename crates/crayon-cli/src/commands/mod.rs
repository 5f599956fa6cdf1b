//! Subcommand implementations

pub mod chat;
pub mod render;
pub mod validate;

use crayon_config::CrayonConfig;
use crayon_core::effects::{NavigationEvent, ShareSink};
use crayon_core::session::InboxSender;
use crayon_core::validation::{FailureReason, StepStatus, ValidationObserver, ValidationStep};
use crayon_core::{ActionDispatcher, HttpApiCaller};
use crayon_lua::LuaScriptSandbox;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Prints shared text to stdout
#[derive(Debug, Default)]
pub struct StdoutShareSink;

impl ShareSink for StdoutShareSink {
    fn share(&self, text: &str) {
        println!("share: {text}");
    }
}

/// Dispatcher wired to the real collaborators: HTTP API calls reporting to
/// `inbox`, the Lua sandbox and stdout sharing. Navigation events arrive on
/// the returned receiver.
pub fn build_dispatcher(
    config: &CrayonConfig,
    inbox: InboxSender,
) -> (ActionDispatcher, mpsc::UnboundedReceiver<NavigationEvent>) {
    let (nav_tx, nav_rx) = mpsc::unbounded_channel();
    let api = HttpApiCaller::new(tokio::runtime::Handle::current(), inbox);
    let dispatcher = ActionDispatcher::new(&config.dispatch)
        .with_api_caller(Arc::new(api))
        .with_script_runner(Arc::new(LuaScriptSandbox::new(&config.scripting)))
        .with_share_sink(Arc::new(StdoutShareSink))
        .with_navigation(nav_tx);
    (dispatcher, nav_rx)
}

/// Prints validation progress as it happens
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl ValidationObserver for ConsoleObserver {
    fn on_step_changed(&mut self, _index: usize, step: &ValidationStep) {
        let marker = match step.status {
            StepStatus::Pending => "  ",
            StepStatus::Loading => "..",
            StepStatus::Success => "ok",
            StepStatus::Failed => "!!",
        };
        println!("[{marker}] {} - {}", step.title, step.description);
    }

    fn on_completed(&mut self) {
        println!("Validation passed");
    }

    fn on_failed(&mut self, reason: &FailureReason) {
        println!("Validation failed: {reason}");
    }
}
