//! Command-line runner for ASL scripts.
//!
//! Scripts run against an in-memory provider whose counters, series and
//! storage are persisted to a JSON state file between runs.
//!
//! # Usage
//!
//! ```bash
//! # Run a script and print its output table as JSON
//! asl run check.asl
//!
//! # Read the script from stdin
//! echo 'total: 1 + 2' | asl run
//!
//! # Pass arguments, read back with arg("host")
//! asl run check.asl --arg host=web-01 --arg limit=5
//!
//! # Persist counters and series between runs
//! asl run check.asl --state ./state.json
//!
//! # Re-run every 30 seconds until Ctrl-C
//! asl run check.asl --every 30s --state ./state.json
//!
//! # Parse only
//! asl check check.asl
//!
//! # Dump the token stream
//! asl tokens check.asl
//!
//! # Remember a default state file
//! asl config set-state ~/.asl/state.json
//! ```

mod config;
mod error;
mod http;
mod state;

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use asl_core::lexer::Lexer;
use asl_core::{MemoryProvider, MemoryState, Output, Script, ScriptError, Value};
use clap::{Parser, Subcommand};
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use config::AslConfig;
use error::CliError;
use http::UreqTransport;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Command-line runner for ASL scripts.
#[derive(Parser)]
#[command(name = "asl")]
#[command(about = "Run, check and inspect ASL scripts")]
#[command(version)]
struct Cli {
    /// Log filter (e.g. debug, asl_core=trace); overrides RUST_LOG
    #[arg(long, global = true, env = "ASL_LOG")]
    log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a script and print its output table as JSON
    Run {
        /// Script file (reads stdin when omitted or `-`)
        script: Option<PathBuf>,
        /// Script argument as KEY=VALUE; VALUE is parsed as JSON when possible
        #[arg(short, long = "arg", value_name = "KEY=VALUE", value_parser = parse_argument)]
        args: Vec<ScriptArgument>,
        /// JSON file holding counters, series and storage between runs
        #[arg(short, long, env = "ASL_STATE")]
        state: Option<PathBuf>,
        /// Abort a run after this many seconds
        #[arg(short, long, env = "ASL_TIMEOUT")]
        timeout: Option<u64>,
        /// Re-run the script at this interval (e.g. 30s, 5m) until interrupted
        #[arg(long, value_parser = asl_core::builtins::parse_interval)]
        every: Option<Duration>,
        /// Stop after this many runs when repeating
        #[arg(long, requires = "every")]
        times: Option<u64>,
        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Parse a script and report syntax errors
    Check {
        /// Script file (reads stdin when omitted or `-`)
        script: Option<PathBuf>,
    },

    /// Print the token stream of a script
    Tokens {
        /// Script file (reads stdin when omitted or `-`)
        script: Option<PathBuf>,
    },

    /// Show or edit the persistent configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the configuration file path and contents
    Show,
    /// Set the default state file
    SetState {
        /// Path to the state file
        path: PathBuf,
    },
}

#[derive(Debug, Clone)]
struct ScriptArgument {
    key: String,
    value: Value,
}

fn parse_argument(text: &str) -> Result<ScriptArgument, String> {
    let (key, raw) = text
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", text))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing argument name in `{}`", text));
    }
    let value = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Value::from(json),
        Err(_) => Value::String(raw.to_string()),
    };
    Ok(ScriptArgument {
        key: key.to_string(),
        value,
    })
}

struct RunOptions {
    script: Option<PathBuf>,
    arguments: BTreeMap<String, Value>,
    state: Option<PathBuf>,
    timeout: Option<u64>,
    every: Option<Duration>,
    times: Option<u64>,
    pretty: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = AslConfig::load();
    init_logging(cli.log_level.as_deref(), cli.log_file.as_deref(), &config);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let CliError::Timeout(_) = e {
                // The script thread cannot be interrupted; exit without joining it.
                std::process::exit(5);
            }
            e.exit_code()
        }
    }
}

fn init_logging(level: Option<&str>, log_file: Option<&Path>, config: &AslConfig) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_deref().unwrap_or("warn"))),
    };

    let log_dir = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            match std::fs::create_dir_all(dir) {
                Ok(()) => Some((dir, path.file_name().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("asl.log")))),
                Err(e) => {
                    eprintln!("Warning: cannot create log directory {}: {}; logging to stderr", dir.display(), e);
                    None
                }
            }
        }
        None => None,
    };

    match log_dir {
        Some((dir, file_name)) => {
            let file_appender = tracing_appender::rolling::never(dir, file_name);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(file_appender)
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

async fn run(cli: Cli, config: AslConfig) -> Result<(), CliError> {
    match cli.command {
        Command::Run {
            script,
            args,
            state,
            timeout,
            every,
            times,
            pretty,
        } => {
            let options = RunOptions {
                script,
                arguments: args.into_iter().map(|a| (a.key, a.value)).collect(),
                state: state.or_else(|| config.state_file.clone()),
                timeout: timeout.or(config.timeout_secs),
                every,
                times,
                pretty,
            };
            run_script(options).await
        }

        Command::Check { script } => {
            let source = read_source(script.as_deref())?;
            let parsed = asl_core::parse(&source).map_err(ScriptError::from)?;
            println!("OK: {} commands", parsed.commands.len());
            Ok(())
        }

        Command::Tokens { script } => {
            let source = read_source(script.as_deref())?;
            for token in Lexer::new(&source) {
                println!("{:<8} {:<24} {:?}", token.position.to_string(), format!("{:?}", token.kind), token.text);
            }
            Ok(())
        }

        Command::Config { action } => match action {
            ConfigAction::Show => {
                match AslConfig::path() {
                    Some(path) => eprintln!("{}", path.display()),
                    None => eprintln!("No home directory; using defaults"),
                }
                let json = serde_json::to_string_pretty(&config).map_err(std::io::Error::other)?;
                println!("{}", json);
                Ok(())
            }
            ConfigAction::SetState { path } => {
                let mut config = config;
                config.state_file = Some(path);
                config.save()?;
                eprintln!("Saved configuration");
                Ok(())
            }
        },
    }
}

fn read_source(path: Option<&Path>) -> Result<String, CliError> {
    match path {
        Some(path) if path != Path::new("-") => Ok(std::fs::read_to_string(path)?),
        _ => {
            let mut source = String::new();
            std::io::stdin().read_to_string(&mut source)?;
            Ok(source)
        }
    }
}

async fn run_script(options: RunOptions) -> Result<(), CliError> {
    let source = read_source(options.script.as_deref())?;
    let script = Arc::new(asl_core::parse(&source).map_err(ScriptError::from)?);

    let initial = match &options.state {
        Some(path) => state::load(path)?,
        None => MemoryState::default(),
    };
    let provider = Arc::new(
        MemoryProvider::with_state(initial).with_transport(Arc::new(UreqTransport::new(HTTP_TIMEOUT))),
    );

    let mut completed = 0u64;
    loop {
        let result = execute(&script, &provider, &options.arguments, options.timeout).await;
        // Side effects made before a failure or timeout are kept.
        if let Some(path) = &options.state {
            state::save(path, &provider.snapshot()?)?;
        }
        print_output(&result?, options.pretty)?;
        completed += 1;

        let Some(every) = options.every else {
            return Ok(());
        };
        if options.times.is_some_and(|times| completed >= times) {
            return Ok(());
        }
        debug!(completed, next_in_ms = every.as_millis() as u64, "waiting for next run");
        tokio::select! {
            _ = tokio::time::sleep(every) => {}
            _ = tokio::signal::ctrl_c() => {
                info!(completed, "interrupted");
                return Ok(());
            }
        }
    }
}

async fn execute(
    script: &Arc<Script>,
    provider: &Arc<MemoryProvider>,
    arguments: &BTreeMap<String, Value>,
    timeout: Option<u64>,
) -> Result<Output, CliError> {
    let script = Arc::clone(script);
    let provider = Arc::clone(provider);
    let arguments = arguments.clone();
    let span = info_span!("run", id = %Uuid::new_v4());

    let task = tokio::task::spawn_blocking(move || {
        span.in_scope(|| {
            let result = script.run_with_arguments(provider.as_ref(), arguments);
            info!(ok = result.is_ok(), "run finished");
            result
        })
    });

    let result = match timeout {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), task)
            .await
            .map_err(|_| CliError::Timeout(secs))??,
        None => task.await?,
    };
    Ok(result.map_err(ScriptError::from)?)
}

fn print_output(output: &Output, pretty: bool) -> Result<(), CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(output)
    } else {
        serde_json::to_string(output)
    }
    .map_err(std::io::Error::other)?;
    println!("{}", json);
    Ok(())
}
