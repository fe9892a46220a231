//! archsetup library
//!
//! Core of the workstation bootstrapper. Each setup step is a function over a
//! [`SetupContext`]; external programs are reached only through a
//! [`CommandRunner`], so the whole sequence can be driven in tests without
//! touching the real system.

pub mod cli;
pub mod config;
pub mod context;
pub mod dotfiles;
pub mod error;
pub mod finalize;
pub mod hardware;
pub mod logger;
pub mod packages;
pub mod preflight;
pub mod process_guard;
pub mod runner;
pub mod setup;

pub use config::{ListPolicy, PackageListEntry, SetupConfig};
pub use context::SetupContext;
pub use error::{Result, SetupError};
pub use hardware::{
    FixedSelection, GpuDriver, HardwareSelection, KeyboardLayout, SelectionSource, TerminalPrompt,
};
pub use logger::{Level, LogSink, Logger, MemorySink};
pub use process_guard::{ChildRegistry, CommandLifecycle};
pub use runner::{CommandOutcome, CommandRunner, CommandSpec, DryRunRunner, SystemRunner};
pub use setup::{SetupReport, run_setup};
