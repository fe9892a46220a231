//! Package installation from plain-text lists.
//!
//! List format: one package name per line. Blank lines and lines whose first
//! non-blank character is `#` are ignored. Order and duplicates are kept as
//! written; the AUR helper's `--needed` flag makes repeats cheap.
//!
//! # Failure Policy
//!
//! - Required list missing or unreadable: **fatal**, nothing further is installed
//! - Optional list missing or unreadable: WARNING, list skipped
//! - Bytes that are not UTF-8 are replaced, never fatal
//! - Single package fails: ERROR, next package continues

use std::fs;

use crate::config::{ListPolicy, PackageListEntry};
use crate::context::SetupContext;
use crate::error::{Result, SetupError};
use crate::runner::CommandSpec;

/// Package names from list text, in file order.
pub fn parse_package_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Install command for one package: `<helper> -S --needed --noconfirm <pkg>`
pub fn install_command(aur_helper: &str, package: &str) -> CommandSpec {
    CommandSpec::new(aur_helper).args(["-S", "--needed", "--noconfirm", package])
}

/// Per-run installation tally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub installed: Vec<String>,
    pub failed: Vec<String>,
    /// Optional lists that were absent
    pub skipped_lists: Vec<String>,
}

impl InstallReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// One-line summary for the log.
    pub fn summary(&self) -> String {
        if self.failed.is_empty() {
            format!("Package installation finished: {} installed", self.installed.len())
        } else {
            format!(
                "Package installation finished: {} installed, {} failed ({})",
                self.installed.len(),
                self.failed.len(),
                self.failed.join(", ")
            )
        }
    }
}

/// Install every package of every list, strictly in order.
pub fn install_packages(ctx: &mut SetupContext, lists: &[PackageListEntry]) -> Result<InstallReport> {
    let mut report = InstallReport::default();

    for list in lists {
        let path = ctx.resolve(&list.path);
        let text = match fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                let reason = if e.kind() == std::io::ErrorKind::NotFound {
                    "not found".to_string()
                } else {
                    format!("unreadable: {}", e)
                };
                match list.policy {
                    ListPolicy::Required => {
                        ctx.log.error(format!(
                            "Package list {}: {}",
                            reason,
                            path.display()
                        ))?;
                        if e.kind() == std::io::ErrorKind::NotFound {
                            return Err(SetupError::MissingPackageList(path));
                        }
                        return Err(e.into());
                    }
                    ListPolicy::Optional => {
                        ctx.log.warning(format!(
                            "Optional package list '{}' {} at {}, skipping",
                            list.name,
                            reason,
                            path.display()
                        ))?;
                        report.skipped_lists.push(list.name.clone());
                        continue;
                    }
                }
            }
        };

        let packages = parse_package_list(&text);
        ctx.log.info(format!(
            "Installing {} package(s) from {} list...",
            packages.len(),
            list.name
        ))?;

        for package in packages {
            let spec = install_command(&ctx.config.aur_helper, &package);
            let outcome = ctx.run_logged(&spec)?;
            if outcome.success {
                ctx.log.success(format!("Installed {}", package))?;
                report.installed.push(package);
            } else {
                ctx.log.error(format!(
                    "Failed to install {} ({})",
                    package,
                    outcome.describe_failure()
                ))?;
                report.failed.push(package);
            }
        }
    }

    let summary = report.summary();
    if report.has_failures() {
        ctx.log.warning(summary)?;
    } else {
        ctx.log.success(summary)?;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let text = "# core\nbase-devel\n\n   \n  # indented comment\ngit\r\nneovim  \n";
        assert_eq!(parse_package_list(text), vec!["base-devel", "git", "neovim"]);
    }

    #[test]
    fn test_parse_keeps_duplicates_and_order() {
        let text = "zsh\ngit\nzsh";
        assert_eq!(parse_package_list(text), vec!["zsh", "git", "zsh"]);
    }

    #[test]
    fn test_parse_last_line_without_newline() {
        assert_eq!(parse_package_list("a\nb"), vec!["a", "b"]);
        assert!(parse_package_list("").is_empty());
    }

    #[test]
    fn test_install_command_uses_needed_noconfirm() {
        let spec = install_command("yay", "kitty");
        assert_eq!(spec.to_string(), "yay -S --needed --noconfirm kitty");
        assert!(spec.elevator.is_none());
    }

    #[test]
    fn test_summary() {
        let report = InstallReport {
            installed: vec!["a".into(), "b".into()],
            failed: vec!["c".into()],
            skipped_lists: vec![],
        };
        assert!(report.has_failures());
        assert_eq!(
            report.summary(),
            "Package installation finished: 2 installed, 1 failed (c)"
        );
    }
}
