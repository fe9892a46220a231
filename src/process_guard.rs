//! Child process lifecycle for external tools
//!
//! Package builds, `stow` and friends run as separate processes. If the user
//! interrupts the run, those children must not keep mutating the package
//! database or the home directory behind our back.
//!
//! - Children get a parent-death signal, so they cannot outlive us
//! - Live child PIDs are tracked in a global registry
//! - SIGINT/SIGTERM/SIGHUP terminate every tracked child, then exit 128+signal
//!
//! Children stay in the terminal's foreground process group: `sudo` prompts
//! for a password on the tty, and a background group would be stopped with
//! SIGTTIN instead.

use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Registry of external commands currently running
#[derive(Debug, Default)]
pub struct ChildRegistry {
    pids: HashSet<u32>,
    terminating: bool,
}

impl ChildRegistry {
    /// Get or create the global child registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        tracing::debug!("Tracking child PID {}", pid);
    }

    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        tracing::debug!("Released child PID {}", pid);
    }

    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// SIGTERM every tracked child, wait up to `grace`, then SIGKILL
    /// whatever is left. Runs at most once per registry.
    pub fn terminate_all(&mut self, grace: Duration) {
        if self.terminating {
            return;
        }
        self.terminating = true;

        let pids: Vec<u32> = self.pids.drain().collect();
        if pids.is_empty() {
            return;
        }

        tracing::info!("Stopping {} running command(s)", pids.len());
        for &pid in &pids {
            if let Err(e) = signal::kill(to_pid(pid), Signal::SIGTERM) {
                tracing::debug!("SIGTERM to {} failed: {}", pid, e);
            }
        }

        let start = Instant::now();
        while start.elapsed() < grace {
            if pids.iter().all(|&pid| !is_process_alive(pid)) {
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        for &pid in pids.iter().filter(|&&pid| is_process_alive(pid)) {
            tracing::warn!("PID {} ignored SIGTERM, sending SIGKILL", pid);
            let _ = signal::kill(to_pid(pid), Signal::SIGKILL);
        }
    }
}

fn to_pid(pid: u32) -> Pid {
    Pid::from_raw(pid as i32)
}

/// Alive means the PID exists and is not a zombie
fn is_process_alive(pid: u32) -> bool {
    if signal::kill(to_pid(pid), None).is_err() {
        return false;
    }
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => !matches!(stat.split_whitespace().nth(2), Some("Z") | Some("X")),
        Err(_) => true,
    }
}

/// Install handlers for SIGINT, SIGTERM and SIGHUP.
///
/// The handler thread stops all tracked children and exits with 128+signal.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            tracing::warn!("Interrupted by signal {}, stopping child processes", sig);
            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.terminate_all(Duration::from_secs(3));
            }
            eprintln!("\nSetup interrupted. Partial changes are recorded in the run log.");
            std::process::exit(128 + sig);
        }
    });

    Ok(())
}

/// Extension trait for std::process::Command tying the child's life to ours
pub trait CommandLifecycle {
    /// Deliver SIGTERM to the child if this process dies first
    fn dies_with_parent(&mut self) -> &mut Self;
}

impl CommandLifecycle for std::process::Command {
    fn dies_with_parent(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: prctl is async-signal-safe and touches no shared state.
        unsafe {
            self.pre_exec(|| {
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
        self
    }
}
