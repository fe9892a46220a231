//! Setup orchestration.
//!
//! Runs the steps in a fixed order with no recovery between them:
//!
//! header → dependency check → packages → hardware → dotfiles → finalize → banner
//!
//! The dependency check and dotfiles deployment can stop the run (so can a
//! missing required package list). Everything else records failures in the
//! run log and carries on.

use std::io::{self, Write};

use crossterm::style::Stylize;

use crate::config::PackageListEntry;
use crate::dotfiles::deploy_dotfiles;
use crate::error::Result;
use crate::finalize::{FinalizeReport, finalize_setup};
use crate::hardware::{HardwareReport, SelectionSource, apply_selection};
use crate::packages::{InstallReport, install_packages};
use crate::preflight::check_dependencies;

pub use crate::context::SetupContext;

/// What a completed run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupReport {
    pub packages: InstallReport,
    pub hardware: HardwareReport,
    pub finalize: FinalizeReport,
}

impl SetupReport {
    /// Process exit status for a run that reached the end.
    ///
    /// Failed packages only count when `strict` is set.
    pub fn exit_code(&self, strict: bool) -> u8 {
        if strict && self.packages.has_failures() {
            1
        } else {
            0
        }
    }
}

/// Run the whole setup sequence.
pub fn run_setup(ctx: &mut SetupContext, selection: &mut dyn SelectionSource) -> Result<SetupReport> {
    if ctx.log.echoes() {
        print_header();
    }
    ctx.log.info(format!("Starting workstation setup for {}", ctx.user))?;
    if ctx.dry_run {
        ctx.log
            .warning("Dry run: commands are printed, nothing is changed")?;
    }

    check_dependencies(ctx)?;

    let lists: Vec<PackageListEntry> = ctx.config.package_lists.clone();
    let packages = install_packages(ctx, &lists)?;

    ctx.log.info("Configuring hardware...")?;
    let chosen = selection.select()?;
    let hardware = apply_selection(ctx, chosen)?;

    deploy_dotfiles(ctx)?;

    let finalize = finalize_setup(ctx)?;

    ctx.log.success("Setup complete")?;
    if ctx.log.echoes() {
        let location = ctx
            .log
            .location()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(memory)".to_string());
        print_completion(&location);
    }

    Ok(SetupReport {
        packages,
        hardware,
        finalize,
    })
}

fn print_header() {
    let mut out = io::stdout();
    let _ = writeln!(out, "{}", "╔══════════════════════════════════════════════╗".cyan());
    let _ = writeln!(out, "{}", "║          Arch workstation setup              ║".cyan().bold());
    let _ = writeln!(out, "{}", "╚══════════════════════════════════════════════╝".cyan());
}

fn print_completion(log_path: &str) {
    let mut out = io::stdout();
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "Setup finished. Log out and back in to apply group and shell changes.".green().bold());
    let _ = writeln!(out, "Full log: {}", log_path);
}
