use anyhow::{anyhow, bail, Context, Result};
use crayon_config::CrayonConfig;
use crayon_core::dispatch::{DispatchOutcome, Effect};
use crayon_core::render::Element;
use crayon_core::session::{self, PumpReport, RenderSession, UiEvent};
use crayon_core::{ComponentKind, ComponentNode};
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cli::OutputFormat;

const PUMP_INTERVAL: Duration = Duration::from_millis(25);

/// Split `ID=VALUE`
pub fn parse_assignment(raw: &str) -> Result<(&str, &str)> {
    raw.split_once('=')
        .filter(|(id, _)| !id.is_empty())
        .ok_or_else(|| anyhow!("Expected ID=VALUE, got '{}'", raw))
}

/// Event a `--set` on `node` stands for
pub fn edit_event(node: &ComponentNode, value: &str) -> Result<UiEvent> {
    let id = node.id.clone();
    match node.kind {
        ComponentKind::TextField => Ok(UiEvent::text_changed(id, value)),
        ComponentKind::Picker => Ok(UiEvent::picker_selected(id, value)),
        ComponentKind::ImageUploader => Ok(UiEvent::image_picked(id, value)),
        ref other => bail!("'{}' is a {} and cannot be edited", node.id, other),
    }
}

pub fn format_element(element: &Element, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(element.outline()),
        OutputFormat::Json => {
            serde_json::to_string_pretty(element).context("Failed to encode element tree")
        }
    }
}

fn report(outcome: &DispatchOutcome) -> usize {
    for dropped in &outcome.dropped {
        warn!("Action dropped: {}", dropped);
    }
    outcome
        .effects
        .iter()
        .filter(|effect| matches!(effect, Effect::ApiCall { .. }))
        .count()
}

/// Pump `session` until `pending` API calls have finished, successfully or
/// not, or `wait` runs out.
pub async fn await_api_results(
    session: &mut RenderSession,
    pending: usize,
    wait: Duration,
) -> PumpReport {
    debug!("Waiting up to {:?} for {} API calls", wait, pending);
    let deadline = Instant::now() + wait;
    let mut total = PumpReport::default();
    while total.consumed < pending && Instant::now() < deadline {
        tokio::time::sleep(PUMP_INTERVAL).await;
        let report = session.pump();
        total.consumed += report.consumed;
        total.applied += report.applied;
    }
    if total.consumed < pending {
        warn!(
            "{} of {} API calls did not finish",
            pending - total.consumed,
            pending
        );
    }
    debug!(
        "{} of {} API results written to state",
        total.applied, total.consumed
    );
    total
}

pub async fn execute(
    config: CrayonConfig,
    tree_path: &Path,
    set: Vec<String>,
    tap: Vec<String>,
    format: OutputFormat,
    wait: Duration,
) -> Result<()> {
    let bytes = tokio::fs::read(tree_path)
        .await
        .with_context(|| format!("Failed to read {}", tree_path.display()))?;
    let tree = ComponentNode::from_json(&bytes)
        .with_context(|| format!("{} is not a component tree", tree_path.display()))?;
    info!("Loaded tree '{}' with {} nodes", tree.id, tree.node_count());

    let (inbox_tx, inbox_rx) = session::inbox();
    let (dispatcher, mut navigation) = super::build_dispatcher(&config, inbox_tx.clone());
    let mut session = RenderSession::with_inbox(tree, dispatcher, (inbox_tx, inbox_rx));

    let mut pending = 0;
    for raw in &set {
        let (id, value) = parse_assignment(raw)?;
        let node = session
            .tree()
            .find(id)
            .ok_or_else(|| anyhow!("No element with id '{}'", id))?;
        let event = edit_event(node, value)?;
        pending += report(&session.handle(event));
    }
    for id in &tap {
        if session.tree().find(id).is_none() {
            bail!("No element with id '{}'", id);
        }
        pending += report(&session.handle(UiEvent::tap(id.as_str())));
    }

    if pending > 0 {
        await_api_results(&mut session, pending, wait).await;
    }

    while let Ok(event) = navigation.try_recv() {
        println!("navigate: {}", event.target);
    }

    println!("{}", format_element(&session.render(), format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crayon_config::DispatchConfig;
    use crayon_core::{ActionDispatcher, DynamicValue, SessionMessage};

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("t1=bob").unwrap(), ("t1", "bob"));
        assert_eq!(parse_assignment("t1=a=b").unwrap(), ("t1", "a=b"));
        assert_eq!(parse_assignment("t1=").unwrap(), ("t1", ""));
        assert!(parse_assignment("t1").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn test_edit_event_by_kind() {
        let field = ComponentNode::new("f", ComponentKind::TextField);
        assert_eq!(
            edit_event(&field, "x").unwrap(),
            UiEvent::text_changed("f", "x")
        );
        let picker = ComponentNode::new("p", ComponentKind::Picker);
        assert_eq!(
            edit_event(&picker, "red").unwrap(),
            UiEvent::picker_selected("p", "red")
        );
        let text = ComponentNode::new("t", ComponentKind::Text);
        assert!(edit_event(&text, "x").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_calls_end_the_wait_without_a_key() {
        let tree = ComponentNode::from_json(
            br#"{"id": "root", "type": "SduiText",
                 "state": {"bindings": {"r": {"key": "r", "type": "string"}}}}"#,
        )
        .unwrap();
        let mut session =
            RenderSession::new(tree, ActionDispatcher::new(&DispatchConfig::default()));
        let inbox = session.inbox();
        for (result_key, result) in [
            (None, Ok(DynamicValue::Null)),
            (Some("r".to_string()), Err("status 500".to_string())),
        ] {
            inbox
                .send(SessionMessage::ApiResult {
                    generation: session.generation(),
                    url: "https://api.example.com".into(),
                    result_key,
                    result,
                })
                .unwrap();
        }

        let started = Instant::now();
        let report = await_api_results(&mut session, 2, Duration::from_secs(30)).await;
        assert_eq!(
            report,
            PumpReport {
                consumed: 2,
                applied: 0
            }
        );
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_execute_renders_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        std::fs::write(
            &path,
            br#"{"id": "root", "type": "SduiTextField", "props": {"text": "@state:name"},
                 "state": {"bindings": {"name": {"key": "name", "type": "string"}}}}"#,
        )
        .unwrap();

        execute(
            CrayonConfig::default(),
            &path,
            vec!["root=ada".into()],
            Vec::new(),
            OutputFormat::Json,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        let missing = execute(
            CrayonConfig::default(),
            &path,
            vec!["nope=1".into()],
            Vec::new(),
            OutputFormat::Text,
            Duration::from_secs(1),
        )
        .await;
        assert!(missing.is_err());
    }
}
