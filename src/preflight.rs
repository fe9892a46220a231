//! Pre-flight checks
//!
//! Verifies, before anything is installed or linked:
//! - Every required external tool is on PATH
//! - The run is not happening as root (unless allowed)
//!
//! Any failure here stops the run before the first side effect.

use std::ffi::OsStr;
use std::path::PathBuf;

use crate::context::SetupContext;
use crate::error::{Result, SetupError};

/// Outcome of environment verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightReport {
    pub missing_tools: Vec<String>,
    pub is_root: bool,
}

impl PreflightReport {
    /// Returns true if the run may proceed
    pub fn is_ok(&self, forbid_root: bool) -> bool {
        self.missing_tools.is_empty() && !(forbid_root && self.is_root)
    }
}

/// Find an executable file named `name` in a PATH-style list of directories.
///
/// Names containing a slash are checked as given, relative to the working
/// directory.
pub fn find_in_path(name: &str, search_path: &OsStr) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    which::which_in(name, Some(search_path), cwd).ok()
}

/// Arch package that provides a tool, for the hint in the error line
pub fn package_hint(tool: &str) -> &str {
    match tool {
        "yay" => "yay (AUR, bootstrap with git + makepkg)",
        "paru" => "paru (AUR, bootstrap with git + makepkg)",
        "stow" => "stow",
        "fc-cache" => "fontconfig",
        "wal" => "python-pywal",
        "git" => "git",
        "sudo" => "sudo",
        other => other,
    }
}

/// Check tools and privileges without logging
pub fn verify_environment(ctx: &SetupContext) -> PreflightReport {
    let missing_tools = ctx
        .config
        .required_tools()
        .into_iter()
        .filter(|tool| ctx.find_tool(tool).is_none())
        .collect();

    PreflightReport {
        missing_tools,
        is_root: ctx.is_root,
    }
}

/// Verify required tools are present, logging one ERROR per missing tool.
///
/// Returns an error (and the caller must stop) if anything is missing.
pub fn check_dependencies(ctx: &mut SetupContext) -> Result<()> {
    ctx.log.info("Checking dependencies...")?;
    let report = verify_environment(ctx);

    for tool in &report.missing_tools {
        ctx.log.error(format!(
            "Required tool not found: {} (install: {})",
            tool,
            package_hint(tool)
        ))?;
    }

    if ctx.config.forbid_root && report.is_root {
        ctx.log
            .error("Running as root is not supported; run as your regular user")?;
    }

    if !report.is_ok(ctx.config.forbid_root) {
        if report.missing_tools.is_empty() {
            return Err(SetupError::RunningAsRoot);
        }
        return Err(SetupError::MissingDependencies(report.missing_tools));
    }

    ctx.log.success("All dependencies are installed")?;
    Ok(())
}
