//! parley — console entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Build the LLM provider and the module registry (fatal on error)
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Run the console until shutdown or EOF

use std::io::IsTerminal as _;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::info;

use parley::error::AppError;
use parley::llm::providers;
use parley::modules::{InputMode, ModeController, Services};
use parley::output::Transcript;
use parley::{config, console, logger};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present; the file is optional.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let mut config = config::load(args.config_path.as_deref())?;
    if let Some(root) = &args.project_root {
        let root = config::expand_home(root);
        if !root.is_dir() {
            return Err(AppError::InvalidRoot(root));
        }
        config.project.root = root;
    }

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    let force_cli_level = args.log_level.is_some();
    logger::init(effective_log_level, force_cli_level, config.log_file.as_deref())?;

    info!(
        name = %config.name,
        project_root = %config.project.root.display(),
        provider = %config.llm.provider,
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    let llm = providers::build(&config.llm, config.llm_api_key.clone())?;
    let config = Arc::new(config);
    let mut controller = ModeController::new(Services::new(llm, config.clone()))?;

    // Shared shutdown token: Ctrl-C cancels it, the console watches it.
    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            ctrlc_token.cancel();
        }
    });

    let interactive = std::io::stdin().is_terminal();
    let mode = if args.voice { InputMode::Voice } else { InputMode::Typed };
    let mut output = Transcript::new(std::io::stdout(), mode);
    if interactive {
        output = output.with_prompt();
        print_banner(&config, &controller);
    }

    console::run(BufReader::new(tokio::io::stdin()), &mut controller, &mut output, shutdown.clone()).await?;
    shutdown.cancel();

    if interactive {
        println!("\nBye :) ...");
    }
    Ok(())
}

fn print_banner(config: &config::Config, controller: &ModeController) {
    println!("─────────────────────────────────────────");
    println!(" {}  (Ctrl-C or \"shut down\" to quit)", config.name);
    println!(" project: {}", config.project.root.display());
    println!(" llm:     {} ({})", config.llm.provider, config.llm.openai.model);
    let modules: Vec<String> =
        controller.router().descriptors().map(|d| format!("{}:{}", d.name, d.priority)).collect();
    println!(" modules: {}", modules.join(", "));
    println!("─────────────────────────────────────────");
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
    project_root: Option<String>,
    voice: bool,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;
    let mut project_root = None;
    let mut voice = false;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: parley [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -p, --project <DIR>        Project root for project mode (default: config or cwd)");
                println!("      --voice                Start in voice output mode");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => match iter.next() {
                Some(path) => config_path = Some(path),
                None => {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            },
            "-p" | "--project" => match iter.next() {
                Some(dir) => project_root = Some(dir),
                None => {
                    eprintln!("error: -p/--project requires a directory argument");
                    std::process::exit(1);
                }
            },
            "--voice" => voice = true,
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    CliArgs { log_level: logger::level_for_verbosity(verbosity), config_path, project_root, voice }
}
