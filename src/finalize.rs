//! Post-install housekeeping.
//!
//! A fixed sequence of independent steps:
//!
//! 1. Add the user to each configured group (`sudo usermod -aG`)
//! 2. Rebuild the font cache
//! 3. Install terminal multiplexer plugins, if the plugin manager is present
//! 4. Generate a colour scheme from the wallpaper, if the theming tool is present
//! 5. Change the login shell, if the shell is installed
//!
//! # Failure Policy
//!
//! Nothing here is fatal. Group failures are ERRORs, everything else is a
//! WARNING, and every step runs regardless of what happened before it.

use crate::context::SetupContext;
use crate::error::Result;
use crate::runner::CommandSpec;

/// Warnings and errors collected while finalizing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizeReport {
    pub problems: Vec<String>,
    /// Steps skipped because their tool or directory is absent
    pub skipped: Vec<String>,
}

impl FinalizeReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Run every housekeeping step in order.
pub fn finalize_setup(ctx: &mut SetupContext) -> Result<FinalizeReport> {
    ctx.log.info("Finalizing setup...")?;
    let mut report = FinalizeReport::default();

    add_user_to_groups(ctx, &mut report)?;
    rebuild_font_cache(ctx, &mut report)?;
    install_multiplexer_plugins(ctx, &mut report)?;
    apply_wallpaper_theme(ctx, &mut report)?;
    change_login_shell(ctx, &mut report)?;

    Ok(report)
}

fn add_user_to_groups(ctx: &mut SetupContext, report: &mut FinalizeReport) -> Result<()> {
    let groups = ctx.config.finalize.groups.clone();
    for group in groups {
        let spec = CommandSpec::new("usermod")
            .args(["-aG", group.as_str(), ctx.user.as_str()])
            .elevated(&ctx.config.elevator);
        let outcome = ctx.run_logged(&spec)?;
        if outcome.success {
            ctx.log
                .success(format!("Added {} to group {}", ctx.user, group))?;
        } else {
            let msg = format!(
                "Failed to add {} to group {} ({})",
                ctx.user,
                group,
                outcome.describe_failure()
            );
            ctx.log.error(&msg)?;
            report.problems.push(msg);
        }
    }
    Ok(())
}

fn rebuild_font_cache(ctx: &mut SetupContext, report: &mut FinalizeReport) -> Result<()> {
    let spec = CommandSpec::new(ctx.config.finalize.font_cache.clone()).arg("-f");
    let outcome = ctx.run_logged(&spec)?;
    if outcome.success {
        ctx.log.success("Font cache rebuilt")?;
    } else {
        let msg = format!("Font cache rebuild failed ({})", outcome.describe_failure());
        ctx.log.warning(&msg)?;
        report.problems.push(msg);
    }
    Ok(())
}

fn install_multiplexer_plugins(ctx: &mut SetupContext, report: &mut FinalizeReport) -> Result<()> {
    let dir = ctx.resolve(&ctx.config.finalize.plugin_manager_dir);
    if !dir.is_dir() {
        ctx.log.info(format!(
            "Plugin manager not found at {}, skipping plugin install",
            dir.display()
        ))?;
        report.skipped.push("plugins".to_string());
        return Ok(());
    }

    let script = dir.join(&ctx.config.finalize.plugin_install_script);
    let spec = CommandSpec::new(script.display().to_string());
    let outcome = ctx.run_logged(&spec)?;
    if outcome.success {
        ctx.log.success("Terminal multiplexer plugins installed")?;
    } else {
        let msg = format!("Plugin install failed ({})", outcome.describe_failure());
        ctx.log.warning(&msg)?;
        report.problems.push(msg);
    }
    Ok(())
}

fn apply_wallpaper_theme(ctx: &mut SetupContext, report: &mut FinalizeReport) -> Result<()> {
    let tool = ctx.config.finalize.theming_tool.clone();
    let Some(tool_path) = ctx.find_tool(&tool) else {
        ctx.log
            .info(format!("{} not installed, skipping wallpaper theme", tool))?;
        report.skipped.push("theme".to_string());
        return Ok(());
    };

    let wallpaper = ctx.resolve(&ctx.config.finalize.wallpaper);
    if !wallpaper.is_file() {
        let msg = format!("Wallpaper not found at {}, skipping theme", wallpaper.display());
        ctx.log.warning(&msg)?;
        report.problems.push(msg);
        return Ok(());
    }

    let spec = CommandSpec::new(tool_path.display().to_string())
        .args(["-i".to_string(), wallpaper.display().to_string()]);
    let outcome = ctx.run_logged(&spec)?;
    if outcome.success {
        ctx.log
            .success(format!("Colour scheme generated from {}", wallpaper.display()))?;
    } else {
        let msg = format!("{} failed ({})", tool, outcome.describe_failure());
        ctx.log.warning(&msg)?;
        report.problems.push(msg);
    }
    Ok(())
}

fn change_login_shell(ctx: &mut SetupContext, report: &mut FinalizeReport) -> Result<()> {
    let shell = ctx.config.finalize.shell.clone();
    let Some(shell_path) = ctx.find_tool(&shell) else {
        ctx.log
            .info(format!("{} not installed, keeping current login shell", shell))?;
        report.skipped.push("shell".to_string());
        return Ok(());
    };

    let spec = CommandSpec::new("chsh")
        .args([
            "-s".to_string(),
            shell_path.display().to_string(),
            ctx.user.clone(),
        ])
        .elevated(&ctx.config.elevator);
    let outcome = ctx.run_logged(&spec)?;
    if outcome.success {
        ctx.log
            .success(format!("Login shell changed to {}", shell_path.display()))?;
    } else {
        let msg = format!("Could not change login shell ({})", outcome.describe_failure());
        ctx.log.warning(&msg)?;
        report.problems.push(msg);
    }
    Ok(())
}
