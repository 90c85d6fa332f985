// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::too_many_arguments)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::app_config::Config;
use app_controller::Controller;

mod anchor;
mod app_config;
mod app_controller;
mod container;
mod errors;
mod file_utils;
mod language_utils;
mod markup;
mod pipeline;
mod providers;
mod segmenter;
mod translation;
mod validation;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a document using an AI provider (default command)
    #[command(alias = "translate")]
    Translate(TranslateArgs),

    /// Generate shell completions for yadtwai
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input document (.epub or .docx)
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Output directory for the translated document
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Source language code (e.g., 'en', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'zh', 'de')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Segment the document into groups without translating
    #[arg(short, long)]
    prepare_only: bool,

    /// Re-translate only these group indices (comma-separated, e.g. "3,7,12")
    #[arg(short, long, value_delimiter = ',')]
    groups: Option<Vec<usize>>,

    /// Export the current translation state without translating further
    #[arg(short, long)]
    export_only: bool,

    /// Discard the cached pipeline state before starting
    #[arg(long)]
    clear_cache: bool,
}

/// YADTwAI - Yet Another Document Translation with AI
///
/// Translates EPUB and DOCX documents with an AI provider while preserving
/// markup, inline formatting and layout exactly.
#[derive(Parser, Debug)]
#[command(name = "yadtwai")]
#[command(author = "YADTwAI Team")]
#[command(version = "1.0.0")]
#[command(about = "AI-powered document translation tool")]
#[command(long_about = "YADTwAI translates EPUB and DOCX documents through an AI provider while
preserving markup, inline formatting and layout exactly.

EXAMPLES:
    yadtwai book.epub                           # Translate using default config
    yadtwai -f book.epub                        # Force overwrite existing output
    yadtwai -m gpt-4o book.epub                 # Use a specific model
    yadtwai -s en -t zh book.epub               # Translate from English to Chinese
    yadtwai -p book.epub                        # Segment only, translate nothing
    yadtwai -g 3,7 book.epub                    # Re-translate groups 3 and 7
    yadtwai -e book.epub                        # Repack what is translated so far
    yadtwai completions bash > yadtwai.bash     # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default
    one will be created automatically.

RESUMING:
    Every translated group is checkpointed. Interrupt with Ctrl-C at any time
    and run the same command again to resume where you left off.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input document (.epub or .docx)
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Output directory for the translated document
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Source language code (e.g., 'en', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'zh', 'de')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Segment the document into groups without translating
    #[arg(short, long)]
    prepare_only: bool,

    /// Re-translate only these group indices (comma-separated, e.g. "3,7,12")
    #[arg(short, long, value_delimiter = ',')]
    groups: Option<Vec<usize>>,

    /// Export the current translation state without translating further
    #[arg(short, long)]
    export_only: bool,

    /// Discard the cached pipeline state before starting
    #[arg(long)]
    clear_cache: bool,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color code for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let color = Self::color_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {:5} {}\x1B[0m", color, now, record.level(), record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default;
    // the level is updated after the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "yadtwai", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => {
            // Default behavior - use top-level args for backwards compatibility
            let input_path = cli
                .input_path
                .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;

            run_translate(TranslateArgs {
                input_path,
                output_dir: cli.output_dir,
                force_overwrite: cli.force_overwrite,
                model: cli.model,
                source_language: cli.source_language,
                target_language: cli.target_language,
                config_path: cli.config_path,
                log_level: cli.log_level,
                prepare_only: cli.prepare_only,
                groups: cli.groups,
                export_only: cli.export_only,
                clear_cache: cli.clear_cache,
            })
            .await
        }
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    // Apply a command-line log level immediately if given
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    // Load or create configuration
    let config_path = &options.config_path;
    let mut config = if Path::new(config_path).exists() {
        Config::from_file(config_path)?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();
        config
            .save_to_file(config_path)
            .context(format!("Failed to write default config to file: {}", config_path))?;
        config
    };

    // Override config with CLI options if provided
    if let Some(model) = &options.model {
        config.translation.model = model.clone();
    }
    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;

    // If the log level was not set via command line, take it from the config
    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    if !options.input_path.is_file() {
        return Err(anyhow!("Input path does not exist: {:?}", options.input_path));
    }

    let output_dir = options
        .output_dir
        .clone()
        .or_else(|| options.input_path.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    let controller = Controller::with_config(config)?;

    if options.clear_cache {
        controller.clear_cache(&options.input_path)?;
    }

    if options.prepare_only {
        return controller.prepare_only(&options.input_path);
    }
    if options.export_only {
        return controller.export(&options.input_path, &output_dir, options.force_overwrite);
    }
    if let Some(groups) = &options.groups {
        return controller.run_groups(options.input_path.clone(), groups).await;
    }

    controller
        .run(options.input_path.clone(), output_dir, options.force_overwrite)
        .await
}
