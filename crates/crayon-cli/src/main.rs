use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing::debug;

use crayon_cli::{
    cli::{Cli, Commands},
    commands::{self, chat::ChatArgs},
    logging,
};
use crayon_config::ConfigLoader;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(cli.config.as_deref()).await?;
    logging::init(
        logging::resolve_level(cli.log_level, cli.verbose, &config.logging),
        config.logging.format,
    );
    debug!("Configuration loaded");

    match cli.command {
        Commands::Render {
            tree,
            set,
            tap,
            format,
            wait,
        } => {
            commands::render::execute(config, &tree, set, tap, format, Duration::from_secs(wait))
                .await?
        }
        Commands::Validate { code } => commands::validate::execute(config, code).await?,
        Commands::Chat {
            app_id,
            message,
            model,
            screenshot,
            no_validate,
            format,
        } => {
            let args = ChatArgs {
                app_id,
                message,
                model,
                screenshot,
                validate: !no_validate,
                format,
            };
            commands::chat::execute(config, args).await?
        }
    }

    Ok(())
}
