//! archsetup - main entry point

use std::path::Path;
use std::process::ExitCode;

use crossterm::style::Stylize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use archsetup::cli::Cli;
use archsetup::config::SetupConfig;
use archsetup::error::{Result, SetupError};
use archsetup::hardware::{FixedSelection, SelectionSource, TerminalPrompt};
use archsetup::logger::Logger;
use archsetup::process_guard;
use archsetup::runner::{CommandRunner, DryRunRunner, SystemRunner};
use archsetup::setup::{SetupContext, run_setup};

/// Diagnostics go to stderr; RUST_LOG overrides the default level
fn init_tracing(verbose: bool) {
    let default = if verbose { "archsetup=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e.to_string().red());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<u8> {
    let home = dirs::home_dir()
        .ok_or_else(|| SetupError::config("cannot determine the home directory"))?;
    let user = current_user()?;
    let config = load_config(cli, &home)?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(0);
    }
    if let Some(path) = &cli.save_config {
        config.save_to_file(path)?;
        println!("Configuration written to {}", path.display());
        return Ok(0);
    }

    let log_dir = config.resolve_path(&config.log_dir, &home);
    let log = Logger::for_run(&log_dir)?;
    let runner: Box<dyn CommandRunner> = if cli.dry_run {
        Box::new(DryRunRunner::default())
    } else {
        Box::new(SystemRunner)
    };
    let strict = config.strict_packages;

    let mut ctx = SetupContext::new(config, log, runner, user, home).with_dry_run(cli.dry_run);
    let mut selection: Box<dyn SelectionSource> = match cli.hardware_selection() {
        Some(fixed) => Box::new(FixedSelection(fixed)),
        None => Box::new(TerminalPrompt::stdio()),
    };

    match run_setup(&mut ctx, selection.as_mut()) {
        Ok(report) => {
            info!("Setup finished: {:?}", report);
            Ok(report.exit_code(strict))
        }
        Err(e) => {
            // Log-write failures cannot be logged; anything else is recorded.
            if !matches!(e, SetupError::LogWrite(_)) {
                let _ = ctx.log.error(format!("Setup aborted: {}", e));
            }
            if let Some(path) = ctx.log.location() {
                eprintln!("See {} for details.", path.display());
            }
            Err(e)
        }
    }
}

/// Configuration file (or defaults) with command line overrides applied
fn load_config(cli: &Cli, home: &Path) -> Result<SetupConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            SetupConfig::load_from_file(path)?
        }
        None => SetupConfig::default(),
    };

    if let Some(repo) = &cli.repo {
        config.repo_root = repo.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = dir.clone();
    }
    if cli.strict {
        config.strict_packages = true;
    }
    config.validate()?;

    // Pin the repository to an absolute path so stow and the log agree.
    let repo = config.resolve_path(Path::new(""), home);
    config.repo_root = std::fs::canonicalize(&repo).map_err(|e| {
        SetupError::config(format!("repository root {} is not usable: {}", repo.display(), e))
    })?;
    debug!("Repository root: {}", config.repo_root.display());

    Ok(config)
}

fn current_user() -> Result<String> {
    match nix::unistd::User::from_uid(nix::unistd::getuid()) {
        Ok(Some(user)) => Ok(user.name),
        _ => std::env::var("USER")
            .map_err(|_| SetupError::config("cannot determine the current user name")),
    }
}
