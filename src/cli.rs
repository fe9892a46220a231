use clap::Parser;
use std::path::PathBuf;

use crate::hardware::{GpuDriver, HardwareSelection, KeyboardLayout};

/// archsetup - Bootstrap a personal Arch Linux workstation
///
/// Installs the package lists, applies the hardware fragments, links the
/// dotfiles into $HOME and finishes with group, font, plugin, theme and
/// shell housekeeping. Run with no arguments for the interactive setup.
#[derive(Parser, Debug)]
#[command(name = "archsetup")]
#[command(version)]
pub struct Cli {
    /// JSON configuration file (missing fields use defaults)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Dotfiles repository root (default: current directory)
    #[arg(short, long)]
    pub repo: Option<PathBuf>,

    /// Graphics driver fragment: nvidia or other
    #[arg(long)]
    pub gpu: Option<GpuDriver>,

    /// Keyboard layout fragment: us or latam
    #[arg(long)]
    pub keyboard: Option<KeyboardLayout>,

    /// Directory for the run log
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Show what would be executed without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Exit non-zero if any package failed to install
    #[arg(long)]
    pub strict: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    pub print_config: bool,

    /// Write the effective configuration to FILE and exit
    #[arg(long, value_name = "FILE")]
    pub save_config: Option<PathBuf>,

    /// Verbose diagnostics on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Non-interactive selection, available only when both choices are given.
    pub fn hardware_selection(&self) -> Option<HardwareSelection> {
        match (self.gpu, self.keyboard) {
            (Some(gpu), Some(keyboard)) => Some(HardwareSelection { gpu, keyboard }),
            _ => None,
        }
    }
}
