use anyhow::{Context, Result};
use crayon_config::CrayonConfig;
use crayon_core::chat::{ChatClient, ChatFlow, ChatRequest, ChatTurn};
use crayon_core::validation::{NoopObserver, ValidationObserver, ValidationOutcome, ValidationPipeline};
use crayon_core::{HttpChatClient, HttpComponentValidator, Renderer, StateStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::render::format_element;
use super::validate::cancel_on_interrupt;
use super::ConsoleObserver;
use crate::cli::OutputFormat;

/// Options for one `chat` invocation
#[derive(Debug, Clone)]
pub struct ChatArgs {
    pub app_id: String,
    pub message: String,
    pub model: Option<String>,
    pub screenshot: Option<String>,
    pub validate: bool,
    pub format: OutputFormat,
}

impl ChatArgs {
    pub fn request(&self) -> ChatRequest {
        let mut request = ChatRequest::new(self.app_id.as_str(), self.message.as_str());
        if let Some(model) = &self.model {
            request = request.with_model(model.as_str());
        }
        if let Some(url) = &self.screenshot {
            request = request.with_screenshot(url.as_str());
        }
        request
    }
}

/// Text printed for a finished turn
pub fn summarize(turn: &ChatTurn, format: OutputFormat) -> Result<String> {
    let mut lines = vec![turn.response.message.clone()];
    if turn.response.has_code_change {
        lines.push(format!("(code changed, version {})", turn.response.version_number));
    }
    if let Some(error) = &turn.response.error {
        lines.push(format!("service error: {error}"));
    }
    if let Some(report) = &turn.validation {
        lines.push(match &report.outcome {
            ValidationOutcome::Completed => "validation: passed".to_string(),
            ValidationOutcome::Failed(reason) => format!("validation: {reason}"),
            ValidationOutcome::Cancelled => "validation: cancelled".to_string(),
        });
    }

    let store = turn.tree.state.as_ref().map(StateStore::new);
    let element = Renderer::render(&turn.tree, store.as_ref());
    lines.push(String::new());
    lines.push(format_element(&element, format)?);
    Ok(lines.join("\n"))
}

/// Run one turn against `client` and print the result
pub async fn run<C: ChatClient>(
    flow: &ChatFlow<C>,
    args: &ChatArgs,
    observer: &mut dyn ValidationObserver,
) -> Result<String> {
    let cancel = CancellationToken::new();
    cancel_on_interrupt(&cancel);
    let turn = flow
        .send(&args.request(), &cancel, observer)
        .await
        .with_context(|| format!("Chat with app {} failed", args.app_id))?;
    summarize(&turn, args.format)
}

pub async fn execute(config: CrayonConfig, args: ChatArgs) -> Result<()> {
    let mut flow = ChatFlow::new(HttpChatClient::new(&config.chat));
    let output = if args.validate {
        let validator = HttpComponentValidator::new(&config.validation);
        flow = flow.with_validation(ValidationPipeline::new(
            Arc::new(validator),
            &config.validation,
        ));
        run(&flow, &args, &mut ConsoleObserver).await?
    } else {
        run(&flow, &args, &mut NoopObserver).await?
    };
    println!("{output}");
    Ok(())
}
