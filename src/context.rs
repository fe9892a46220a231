//! Run-wide state handed to every setup step.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::SetupConfig;
use crate::error::Result;
use crate::logger::Logger;
use crate::preflight::find_in_path;
use crate::runner::{CommandOutcome, CommandRunner, CommandSpec};

/// Everything a step needs: configuration, the run log, the command runner
/// and facts about the invoking user.
pub struct SetupContext {
    pub config: SetupConfig,
    pub log: Logger,
    pub runner: Box<dyn CommandRunner>,
    /// Login name of the invoking user
    pub user: String,
    pub home: PathBuf,
    /// Directories searched for tools, in PATH syntax
    pub search_path: OsString,
    pub is_root: bool,
    /// Skip file mutations done in-process (commands go through the runner)
    pub dry_run: bool,
}

impl SetupContext {
    /// Context for the current process: PATH and EUID come from the environment.
    pub fn new(
        config: SetupConfig,
        log: Logger,
        runner: Box<dyn CommandRunner>,
        user: impl Into<String>,
        home: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            log,
            runner,
            user: user.into(),
            home: home.into(),
            search_path: std::env::var_os("PATH").unwrap_or_default(),
            is_root: nix::unistd::geteuid().is_root(),
            dry_run: false,
        }
    }

    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = search_path.into();
        self
    }

    pub fn with_root(mut self, is_root: bool) -> Self {
        self.is_root = is_root;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Resolve a configured path (see [`SetupConfig::resolve_path`]).
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.config.resolve_path(path, &self.home)
    }

    pub fn repo_root(&self) -> PathBuf {
        self.resolve(Path::new(""))
    }

    /// Locate an executable on the context's search path.
    pub fn find_tool(&self, name: &str) -> Option<PathBuf> {
        find_in_path(name, &self.search_path)
    }

    /// Run a command and append whatever it printed to the run log.
    pub fn run_logged(&mut self, spec: &CommandSpec) -> Result<CommandOutcome> {
        let outcome = self.runner.run(spec);
        self.log.append_output(&outcome.combined_output())?;
        Ok(outcome)
    }
}
