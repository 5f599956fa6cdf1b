use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages (default for verbose)
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Output format for rendered trees
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented outline, one element per line
    #[default]
    Text,
    /// Element tree as JSON
    Json,
}

#[derive(Parser)]
#[command(name = "crayon")]
#[command(about = "crayon - render, validate and generate server-driven UI trees")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses config file value or defaults to 'warn'
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ~/.config/crayon/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a component tree, optionally after simulated interactions
    Render {
        /// JSON file holding the root component node
        tree: PathBuf,

        /// Edit an input before rendering (repeatable)
        /// Format: ID=VALUE
        /// Example: --set t1=bob
        #[arg(short = 's', long = "set", value_name = "ID=VALUE")]
        set: Vec<String>,

        /// Tap an element after all edits are applied (repeatable)
        #[arg(short = 't', long = "tap", value_name = "ID")]
        tap: Vec<String>,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Seconds to wait for API calls raised by taps
        #[arg(long, default_value = "5")]
        wait: u64,
    },

    /// Send component code to the validation service
    Validate {
        /// Component code, or @PATH to read it from a file
        code: String,
    },

    /// Send a chat message and render the returned tree
    Chat {
        /// App to talk to
        app_id: String,

        /// Message text
        message: String,

        /// Model override (defaults to config)
        #[arg(short = 'm', long)]
        model: Option<String>,

        /// URL of an uploaded screenshot to attach
        #[arg(long)]
        screenshot: Option<String>,

        /// Skip validating returned component code
        #[arg(long)]
        no_validate: bool,

        /// Output format for the returned tree
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}
