use anyhow::{bail, Context, Result};
use crayon_config::CrayonConfig;
use crayon_core::validation::{ValidationOutcome, ValidationPipeline};
use crayon_core::HttpComponentValidator;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::ConsoleObserver;

/// Component code from the argument, or from a file when it starts with `@`
pub async fn read_code(raw: &str) -> Result<String> {
    match raw.strip_prefix('@') {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read component code from {}", path)),
        None => Ok(raw.to_string()),
    }
}

/// Cancel `token` on Ctrl-C
pub fn cancel_on_interrupt(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted");
            token.cancel();
        }
    });
}

pub async fn execute(config: CrayonConfig, code: String) -> Result<()> {
    let code = read_code(&code).await?;
    if code.trim().is_empty() {
        bail!("No component code to validate");
    }
    info!(
        "Validating {} bytes against {}",
        code.len(),
        config.validation.endpoint
    );

    let validator = HttpComponentValidator::new(&config.validation);
    let pipeline = ValidationPipeline::new(Arc::new(validator), &config.validation);

    let cancel = CancellationToken::new();
    cancel_on_interrupt(&cancel);

    let report = pipeline.run(&code, &cancel, &mut ConsoleObserver).await;
    match report.outcome {
        ValidationOutcome::Completed => Ok(()),
        ValidationOutcome::Failed(reason) => bail!("Validation failed: {}", reason),
        ValidationOutcome::Cancelled => bail!("Validation cancelled"),
    }
}
