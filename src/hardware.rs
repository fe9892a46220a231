//! Hardware-specific configuration fragments.
//!
//! The dotfiles repository ships one fragment per graphics driver and per
//! keyboard layout. The chosen fragment is copied over a fixed destination
//! inside the config tree before the tree is symlinked into `$HOME`.
//!
//! # Selection
//!
//! The core takes a typed [`HardwareSelection`]. Where it comes from is a
//! [`SelectionSource`]: fixed (command line) or an interactive terminal menu.
//!
//! # Copy semantics
//!
//! - Destination directories are created when missing
//! - The fragment is written to a temporary file next to the destination and
//!   renamed over it, so the destination is either the old file or the new
//!   one, never a truncated mix
//! - A failed copy is logged as ERROR and does not stop the run

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::path::Path;

use strum::{EnumIter, EnumString, IntoEnumIterator};
use tempfile::NamedTempFile;

use crate::context::SetupContext;
use crate::error::{Result, SetupError};

/// Graphics driver family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum GpuDriver {
    #[strum(serialize = "nvidia")]
    Nvidia,
    /// Intel, AMD, virtual machines: no driver-specific settings
    #[strum(serialize = "other")]
    Other,
}

/// Keyboard layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum KeyboardLayout {
    #[strum(serialize = "us")]
    Us,
    #[strum(serialize = "latam")]
    Latam,
}

impl fmt::Display for GpuDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nvidia => write!(f, "NVIDIA"),
            Self::Other => write!(f, "Other (Intel/AMD/VM)"),
        }
    }
}

impl fmt::Display for KeyboardLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Us => write!(f, "US"),
            Self::Latam => write!(f, "Latin American"),
        }
    }
}

/// Both hardware choices for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareSelection {
    pub gpu: GpuDriver,
    pub keyboard: KeyboardLayout,
}

/// Where the hardware selection comes from.
pub trait SelectionSource {
    fn select(&mut self) -> Result<HardwareSelection>;
}

/// Selection decided up front (command line or configuration).
#[derive(Debug, Clone, Copy)]
pub struct FixedSelection(pub HardwareSelection);

impl SelectionSource for FixedSelection {
    fn select(&mut self) -> Result<HardwareSelection> {
        Ok(self.0)
    }
}

/// Numbered terminal menus. Invalid answers re-prompt; closed input is an error.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn choose<T>(&mut self, title: &str) -> Result<T>
    where
        T: IntoEnumIterator + fmt::Display + Copy,
    {
        let options: Vec<T> = T::iter().collect();
        loop {
            writeln!(self.output, "\n{}", title)?;
            for (i, option) in options.iter().enumerate() {
                writeln!(self.output, "  {}) {}", i + 1, option)?;
            }
            write!(self.output, "Choice [1-{}]: ", options.len())?;
            self.output.flush()?;

            let mut answer = String::new();
            if self.input.read_line(&mut answer)? == 0 {
                return Err(SetupError::input(format!(
                    "input closed before a choice was made for '{}'",
                    title
                )));
            }

            match answer.trim().parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(options[n - 1]),
                _ => writeln!(self.output, "Invalid option '{}', try again.", answer.trim())?,
            }
        }
    }
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> SelectionSource for TerminalPrompt<R, W> {
    fn select(&mut self) -> Result<HardwareSelection> {
        let gpu = self.choose::<GpuDriver>("Select your graphics driver:")?;
        let keyboard = self.choose::<KeyboardLayout>("Select your keyboard layout:")?;
        Ok(HardwareSelection { gpu, keyboard })
    }
}

/// Fragments copied and fragments that failed, by description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HardwareReport {
    pub applied: Vec<String>,
    pub failed: Vec<String>,
}

/// Copy the fragments matching `selection` into place.
pub fn apply_selection(ctx: &mut SetupContext, selection: HardwareSelection) -> Result<HardwareReport> {
    let gpu = &ctx.config.hardware.gpu;
    let gpu_source = match selection.gpu {
        GpuDriver::Nvidia => &gpu.nvidia,
        GpuDriver::Other => &gpu.other,
    };
    let keyboard = &ctx.config.hardware.keyboard;
    let keyboard_source = match selection.keyboard {
        KeyboardLayout::Us => &keyboard.us,
        KeyboardLayout::Latam => &keyboard.latam,
    };

    let steps = [
        (
            format!("{} graphics configuration", selection.gpu),
            ctx.resolve(gpu_source),
            ctx.resolve(&gpu.destination),
        ),
        (
            format!("{} keyboard layout", selection.keyboard),
            ctx.resolve(keyboard_source),
            ctx.resolve(&keyboard.destination),
        ),
    ];

    let mut report = HardwareReport::default();
    for (what, source, destination) in steps {
        if ctx.dry_run {
            ctx.log.info(format!(
                "[dry-run] Would copy {} to {}",
                source.display(),
                destination.display()
            ))?;
            report.applied.push(what);
            continue;
        }

        match install_fragment(&source, &destination) {
            Ok(()) => {
                ctx.log.success(format!("Applied {}", what))?;
                report.applied.push(what);
            }
            Err(e) => {
                ctx.log.error(format!(
                    "Failed to apply {} ({} -> {}): {}",
                    what,
                    source.display(),
                    destination.display(),
                    e
                ))?;
                report.failed.push(what);
            }
        }
    }
    Ok(report)
}

/// Atomically replace `destination` with the bytes of `source`.
fn install_fragment(source: &Path, destination: &Path) -> io::Result<()> {
    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut reader = File::open(source)?;
    let permissions = reader.metadata()?.permissions();
    let mut staged = NamedTempFile::new_in(parent)?;
    io::copy(&mut reader, &mut staged)?;
    // Temp files are created 0600; the fragment keeps the source's mode.
    staged.as_file().set_permissions(permissions)?;
    staged.as_file().sync_all()?;
    staged.persist(destination).map_err(|e| e.error)?;
    Ok(())
}
