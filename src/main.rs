// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use segtrans::app_config::{self, Config};
use segtrans::app_controller::{Controller, RunRequest};
use segtrans::translation::{RunOptions, SegmentRange, TaskKind};

/// CLI wrapper for TaskKind to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliTask {
    Translate,
    ExtractName,
    Normalize,
    FixName,
    FixTranslation,
}

impl From<CliTask> for TaskKind {
    fn from(task: CliTask) -> Self {
        match task {
            CliTask::Translate => TaskKind::Translate,
            CliTask::ExtractName => TaskKind::ExtractName,
            CliTask::Normalize => TaskKind::Normalize,
            CliTask::FixName => TaskKind::FixName,
            CliTask::FixTranslation => TaskKind::FixTranslation,
        }
    }
}

/// CLI wrapper for LogLevel to implement ValueEnum
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

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process a folder of segment files
    Run(RunArgs),

    /// Generate shell completions for segtrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// What to do with each file
    #[arg(long, value_enum, default_value = "translate")]
    task: CliTask,

    /// Folder holding segment_<n>.txt files
    #[arg(short, long)]
    input: PathBuf,

    /// Output folder (required except for fix tasks, which rewrite in place)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Folder with one glossary per segment, same file name (translate only)
    #[arg(long)]
    glossary_dir: Option<PathBuf>,

    /// Newline-delimited key file
    #[arg(long)]
    keys_file: Option<PathBuf>,

    /// Comma-delimited keys; overrides the keys environment variable
    #[arg(long)]
    keys: Option<String>,

    /// File holding the system prompt
    #[arg(long)]
    system_prompt_file: Option<PathBuf>,

    /// Number of parallel workers; defaults to the number of keys
    #[arg(long)]
    max_workers: Option<usize>,

    /// First segment number to process (inclusive)
    #[arg(long)]
    start: Option<u64>,

    /// Last segment number to process (inclusive)
    #[arg(long)]
    end: Option<u64>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// segtrans - concurrent segment translator
///
/// Sends every numbered segment in a folder through a remote generation API,
/// one worker per API key.
#[derive(Parser, Debug)]
#[command(name = "segtrans")]
#[command(version)]
#[command(about = "Concurrent segment translation over a pool of API keys")]
#[command(long_about = "segtrans sends numbered text segments through a remote generation API, spreading the work over every available API key.

EXAMPLES:
    segtrans run -i chapters/ -o out/                            # Translate with keys from auth_files/keys.txt
    segtrans run -i chapters/ -o out/ --glossary-dir names/      # Translate with per-segment name lists
    segtrans run --task extract-name -i chapters/ -o names/ --system-prompt-file prompts/names.txt
    segtrans run --task fix-name -i names/                       # Re-translate untranslated glossary entries in place
    segtrans run -i chapters/ -o out/ --start 10 --end 20        # Only segments 10 to 20
    segtrans completions bash > segtrans.bash                    # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.

KEYS:
    Keys are read from the key file (one per line) and from the comma list in
    --keys or, when absent, the GOOGLE_API_KEYS environment variable.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
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
        log::set_boxed_logger(Box::new(CustomLogger::new(level)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
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
            let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the effective level is set through max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "segtrans", &mut std::io::stdout());
            Ok(())
        }
        Commands::Run(args) => run(args).await,
    }
}

/// Load the config file, or write a default one when it is missing
fn load_or_create_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?;
        return Ok(config);
    }

    warn!("Config file not found at '{}', creating default config.", config_path);
    let config = Config::default();
    let config_json = serde_json::to_string_pretty(&config)
        .context("Failed to serialize default config to JSON")?;
    std::fs::write(config_path, config_json)
        .context(format!("Failed to write default config to file: {}", config_path))?;
    Ok(config)
}

async fn run(args: RunArgs) -> Result<()> {
    // A CLI log level applies before the config is even read
    if let Some(level) = &args.log_level {
        log::set_max_level(level_filter(&level.clone().into()));
    }

    let mut config = load_or_create_config(&args.config)?;
    if let Some(level) = &args.log_level {
        config.log_level = level.clone().into();
    }
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(level_filter(&config.log_level));

    let mut options = RunOptions::new(args.task.into(), args.input)
        .range(SegmentRange::new(args.start, args.end));
    if let Some(output) = args.output {
        options = options.output_dir(output);
    }
    if let Some(dir) = args.glossary_dir {
        options = options.glossary_dir(dir);
    }
    if let Some(workers) = args.max_workers {
        options = options.max_workers(workers);
    }

    let request = RunRequest {
        options,
        keys_file: args.keys_file,
        keys: args.keys,
        system_prompt_file: args.system_prompt_file,
    };

    let controller = Controller::with_config(config)?;
    controller.run(request).await?;
    Ok(())
}
