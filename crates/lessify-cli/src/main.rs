//! Lessify CLI.
//!
//! Compiles Less files honoring their first-line directives, either on demand,
//! whenever a file is saved, or on behalf of an editor over stdio.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use lessify_compiler::domain::{self, DomainManager, Request, Response};
use lessify_compiler::{Compiler, CompilerConfig, LesscService};

mod ui;

#[derive(Parser)]
#[command(name = "lessify")]
#[command(about = "Lessify - compiles Less files using the options on their first line")]
#[command(version)]
struct Cli {
    /// Path to the lessc executable
    #[arg(long, global = true, env = "LESSIFY_LESSC", default_value = "lessc")]
    lessc: PathBuf,

    /// Compilation service backend
    #[arg(long, global = true, default_value = "lessc")]
    service: String,

    /// Follow `main` redirect cycles instead of reporting them
    #[arg(long, global = true)]
    allow_redirect_cycles: bool,

    /// Enable debug logging (overridden by LESSIFY_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile one or more Less files
    Compile {
        /// Less source files
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },

    /// Watch a directory and compile Less files as they change
    Watch {
        /// Directory to watch
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Serve compile requests as line-delimited JSON over stdio
    Serve,

    /// Print the directives found on the first line of a file
    Inspect {
        /// Less source file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = CompilerConfig {
        service: cli.service.clone(),
        lessc_path: cli.lessc.clone(),
        detect_redirect_cycles: !cli.allow_redirect_cycles,
    };
    let compiler = Compiler::from_config(config)?;

    match cli.command {
        Commands::Compile { files } => {
            compile_files(&compiler, &files).await?;
        }

        Commands::Watch { dir } => {
            run_watch_mode(&compiler, &dir).await?;
        }

        Commands::Serve => {
            run_serve_mode(compiler).await?;
        }

        Commands::Inspect { file } => {
            let directives = compiler.inspect(&file).await?;
            let json = serde_json::to_string_pretty(&directives)
                .map_err(|e| miette::miette!("Failed to encode directives: {}", e))?;
            println!("{}", json);
        }
    }

    Ok(())
}

/// Logs go to stderr so `serve` keeps stdout for responses.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LESSIFY_LOG").unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Compile each file in turn, stopping at the first failure.
async fn compile_files(compiler: &Compiler<LesscService>, files: &[PathBuf]) -> miette::Result<()> {
    for file in files {
        let start = Instant::now();
        let spinner = ui::spinner(&format!("Compiling {}...", file.display()));
        let outcome = compiler.compile(file).await;
        spinner.finish_and_clear();

        match outcome? {
            Some(result) => ui::compiled(file, &result.filepath, start.elapsed().as_millis()),
            None => ui::skipped(file),
        }
    }

    Ok(())
}

/// Run watch mode: recompile every changed `.less` file until Ctrl-C.
async fn run_watch_mode(compiler: &Compiler<LesscService>, dir: &Path) -> miette::Result<()> {
    ui::info(&format!("Watching for changes in {}", dir.display()));
    println!();

    // Channel for file change events
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Vec<PathBuf>>();

    let mut debouncer = new_debouncer(
        Duration::from_millis(300),
        move |result: DebounceEventResult| match result {
            Ok(events) => {
                let paths: Vec<PathBuf> = events
                    .into_iter()
                    .map(|event| event.path)
                    .filter(|path| is_less_file(path))
                    .collect();
                if !paths.is_empty() {
                    let _ = tx.send(paths);
                }
            }
            Err(e) => tracing::warn!(error = %e, "file watcher error"),
        },
    )
    .map_err(|e| miette::miette!("Failed to create file watcher: {}", e))?;

    debouncer
        .watcher()
        .watch(dir, RecursiveMode::Recursive)
        .map_err(|e| miette::miette!("Failed to watch {}: {}", dir.display(), e))?;

    ui::info("Ready! Waiting for changes...");

    loop {
        tokio::select! {
            Some(paths) = rx.recv() => {
                println!();
                let changed: BTreeSet<PathBuf> = paths.into_iter().collect();
                for path in changed {
                    let start = Instant::now();
                    match compiler.compile(&path).await {
                        Ok(Some(result)) => {
                            ui::compiled(&path, &result.filepath, start.elapsed().as_millis());
                        }
                        Ok(None) => ui::skipped(&path),
                        Err(e) => ui::error(&format!("{}", e)),
                    }
                }
                println!();
                ui::info("Ready! Waiting for changes...");
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                ui::dim("Stopping watch mode.");
                break;
            }
        }
    }

    Ok(())
}

fn is_less_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "less") && path.is_file()
}

/// Run serve mode: one JSON request per stdin line, one JSON response per stdout line.
async fn run_serve_mode(compiler: Compiler<LesscService>) -> miette::Result<()> {
    let mut manager = DomainManager::new();
    domain::init(&mut manager, Rc::new(compiler));
    tracing::info!(domains = ?manager.describe(), "serving over stdio");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| miette::miette!("Failed to read request: {}", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => manager.dispatch(request).await,
            Err(e) => Response::err(serde_json::Value::Null, format!("invalid request: {}", e)),
        };

        let mut encoded = serde_json::to_string(&response)
            .map_err(|e| miette::miette!("Failed to encode response: {}", e))?;
        encoded.push('\n');
        stdout
            .write_all(encoded.as_bytes())
            .await
            .map_err(|e| miette::miette!("Failed to write response: {}", e))?;
        stdout
            .flush()
            .await
            .map_err(|e| miette::miette!("Failed to write response: {}", e))?;
    }

    Ok(())
}
