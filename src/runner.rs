//! External command execution.
//!
//! Every side effect this program has on the system outside of plain file
//! copies goes through a [`CommandRunner`]. Each invocation yields a
//! [`CommandOutcome`] that the caller must inspect; there is no fire-and-forget
//! path.
//!
//! # Runners
//!
//! - [`SystemRunner`]: spawns real processes with a parent-death signal and
//!   registers them with [`ChildRegistry`] so an interrupt can stop them.
//! - [`DryRunRunner`]: records what would run and reports success.

use std::fmt;
use std::process::{Command, Stdio};

use crate::process_guard::{ChildRegistry, CommandLifecycle};

/// A single external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Privilege escalation program to run through (`sudo`, `doas`), if any.
    pub elevator: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            elevator: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run through `elevator` instead of directly.
    pub fn elevated(mut self, elevator: impl Into<String>) -> Self {
        self.elevator = Some(elevator.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(elevator) = &self.elevator {
            write!(f, "{} ", elevator)?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Result of one external command.
#[must_use = "command outcomes must be checked or explicitly discarded"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Exit code (None if the process could not start or died from a signal).
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn succeeded() -> Self {
        Self {
            exit_code: Some(0),
            success: true,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn failed(exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Short human-readable reason, e.g. `exit code 1: target not found: foo`.
    pub fn describe_failure(&self) -> String {
        let status = match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "did not exit normally".to_string(),
        };
        match self.stderr.lines().rev().find(|l| !l.trim().is_empty()) {
            Some(last) => format!("{}: {}", status, last.trim()),
            None => status,
        }
    }

    /// stdout followed by stderr, for appending to the run log.
    pub fn combined_output(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }
}

/// Executes external commands on behalf of the setup steps.
pub trait CommandRunner {
    fn run(&mut self, spec: &CommandSpec) -> CommandOutcome;
}

/// Spawns real processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn build(&self, spec: &CommandSpec) -> Command {
        let mut cmd = match &spec.elevator {
            Some(elevator) => {
                let mut cmd = Command::new(elevator);
                cmd.arg(&spec.program);
                cmd
            }
            None => Command::new(&spec.program),
        };
        cmd.args(&spec.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .dies_with_parent();
        cmd
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, spec: &CommandSpec) -> CommandOutcome {
        tracing::debug!("Spawning: {}", spec);

        let child = match self.build(spec).spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!("Failed to spawn {}: {}", spec.program, e);
                return CommandOutcome::failed(None, format!("failed to start {}: {}", spec.program, e));
            }
        };
        let pid = child.id();
        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.register(pid);
            tracing::debug!("{} external command(s) running", registry.count());
        }

        let waited = child.wait_with_output();

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.unregister(pid);
        }

        match waited {
            Ok(output) => {
                let outcome = CommandOutcome {
                    exit_code: output.status.code(),
                    success: output.status.success(),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };
                tracing::debug!("{} finished: {:?}", spec.program, outcome.exit_code);
                outcome
            }
            Err(e) => CommandOutcome::failed(None, format!("failed waiting for {}: {}", spec.program, e)),
        }
    }
}

/// Records commands instead of running them.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    issued: Vec<CommandSpec>,
}

impl DryRunRunner {
    pub fn issued(&self) -> &[CommandSpec] {
        &self.issued
    }
}

impl CommandRunner for DryRunRunner {
    fn run(&mut self, spec: &CommandSpec) -> CommandOutcome {
        tracing::info!("[dry-run] {}", spec);
        self.issued.push(spec.clone());
        let mut outcome = CommandOutcome::succeeded();
        outcome.stdout = format!("[dry-run] {}", spec);
        outcome
    }
}
