//! Run log: timestamped, leveled entries persisted to a per-run file and
//! mirrored to the terminal with colour.
//!
//! The logger is an explicit value carried in [`crate::setup::SetupContext`];
//! nothing here is global. Tests swap the file for a [`MemorySink`].
//!
//! Entry format on disk:
//!
//! ```text
//! [2026-10-19 14:03:55] SUCCESS: Installed neovim
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};
use crossterm::style::Stylize;
use strum::Display;

use crate::error::{Result, SetupError};

/// Severity of a run log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
    /// File-only entries (captured command output). Never echoed.
    Detail,
}

/// Destination for formatted log lines.
pub trait LogSink: Send {
    /// Append one complete line. The sink adds the newline.
    fn append(&mut self, line: &str) -> io::Result<()>;
}

/// Append-only log file that belongs to a single run.
#[derive(Debug)]
pub struct FileSink {
    file: File,
}

impl FileSink {
    /// Create `path` for appending. Fails with `AlreadyExists` if another run
    /// already owns it.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(path)?;
        Ok(Self { file })
    }
}

impl LogSink for FileSink {
    fn append(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.file, "{}", line)?;
        self.file.flush()
    }
}

/// Shared in-memory sink; clones observe the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    /// Snapshot of every line appended so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl LogSink for MemorySink {
    fn append(&mut self, line: &str) -> io::Result<()> {
        self.lines
            .lock()
            .map_err(|_| io::Error::other("memory log sink poisoned"))?
            .push(line.to_string());
        Ok(())
    }
}

/// Leveled run logger.
pub struct Logger {
    sink: Box<dyn LogSink>,
    location: Option<PathBuf>,
    echo: bool,
}

impl Logger {
    /// Wrap an arbitrary sink. `location` is reported in the completion banner.
    pub fn new(sink: Box<dyn LogSink>, location: Option<PathBuf>, echo: bool) -> Self {
        Self {
            sink,
            location,
            echo,
        }
    }

    /// Create the per-run log file inside `dir`, named after the start time.
    pub fn for_run(dir: &Path) -> Result<Self> {
        let (sink, path) = create_run_log(dir, Local::now())?;
        tracing::debug!("Run log opened at {}", path.display());
        Ok(Self::new(Box::new(sink), Some(path), true))
    }

    /// Silent logger backed by memory, plus a handle to read it back.
    pub fn in_memory() -> (Self, MemorySink) {
        let sink = MemorySink::default();
        (Self::new(Box::new(sink.clone()), None, false), sink)
    }

    /// Whether entries are mirrored to the terminal.
    pub fn echoes(&self) -> bool {
        self.echo
    }

    /// Path of the backing log file, if any.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn log(&mut self, level: Level, message: impl AsRef<str>) -> Result<()> {
        let message = message.as_ref();
        let line = format_entry(Local::now(), level, message);
        self.sink.append(&line).map_err(SetupError::LogWrite)?;

        if self.echo {
            if let Some(styled) = terminal_line(level, message) {
                let _ = writeln!(io::stdout(), "{}", styled);
            }
        }
        Ok(())
    }

    pub fn info(&mut self, message: impl AsRef<str>) -> Result<()> {
        self.log(Level::Info, message)
    }

    pub fn success(&mut self, message: impl AsRef<str>) -> Result<()> {
        self.log(Level::Success, message)
    }

    pub fn warning(&mut self, message: impl AsRef<str>) -> Result<()> {
        self.log(Level::Warning, message)
    }

    pub fn error(&mut self, message: impl AsRef<str>) -> Result<()> {
        self.log(Level::Error, message)
    }

    /// Record captured command output, one `DETAIL` entry per non-blank line.
    pub fn append_output(&mut self, output: &str) -> Result<()> {
        for line in output.lines().filter(|l| !l.trim().is_empty()) {
            self.log(Level::Detail, line)?;
        }
        Ok(())
    }
}

/// `[YYYY-MM-DD HH:MM:SS] LEVEL: message`
pub fn format_entry(timestamp: DateTime<Local>, level: Level, message: &str) -> String {
    format!(
        "[{}] {}: {}",
        timestamp.format("%Y-%m-%d %H:%M:%S"),
        level,
        message
    )
}

/// File name for a run started at `started`.
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("setup_{}.log", started.format("%Y%m%d_%H%M%S"))
}

/// Runs started within the same second get `_1`, `_2`, ... suffixes.
fn create_run_log(dir: &Path, started: DateTime<Local>) -> Result<(FileSink, PathBuf)> {
    fs::create_dir_all(dir).map_err(SetupError::LogWrite)?;
    let base = log_file_name(started);
    let stem = base.trim_end_matches(".log");
    let mut attempt = 0u32;
    loop {
        let name = match attempt {
            0 => base.clone(),
            n => format!("{}_{}.log", stem, n),
        };
        let path = dir.join(name);
        match FileSink::create(&path) {
            Ok(sink) => return Ok((sink, path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt < 1000 => attempt += 1,
            Err(e) => return Err(SetupError::LogWrite(e)),
        }
    }
}

fn terminal_line(level: Level, message: &str) -> Option<String> {
    let line = match level {
        Level::Info => format!("{} {}", "ℹ".blue().bold(), message.blue()),
        Level::Success => format!("{} {}", "✓".green().bold(), message.green()),
        Level::Warning => format!("{} {}", "⚠".yellow().bold(), message.yellow()),
        Level::Error => format!("{} {}", "✗".red().bold(), message.red()),
        Level::Detail => return None,
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_entry() {
        let ts = Local.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(
            format_entry(ts, Level::Success, "Installed git"),
            "[2026-03-07 09:05:01] SUCCESS: Installed git"
        );
        assert_eq!(
            format_entry(ts, Level::Warning, "x"),
            "[2026-03-07 09:05:01] WARNING: x"
        );
    }

    #[test]
    fn test_log_file_name_embeds_start_time() {
        let ts = Local.with_ymd_and_hms(2026, 10, 19, 23, 59, 58).unwrap();
        assert_eq!(log_file_name(ts), "setup_20261019_235958.log");
    }

    #[test]
    fn test_level_names() {
        assert_eq!(Level::Error.to_string(), "ERROR");
        assert_eq!(Level::Detail.to_string(), "DETAIL");
    }

    struct BrokenSink;

    impl LogSink for BrokenSink {
        fn append(&mut self, _line: &str) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    #[test]
    fn test_failed_write_is_a_log_write_error() {
        let mut log = Logger::new(Box::new(BrokenSink), None, false);
        assert!(matches!(log.info("lost"), Err(SetupError::LogWrite(_))));
        assert!(matches!(log.append_output("x\n"), Err(SetupError::LogWrite(_))));
    }

    #[test]
    fn test_detail_never_reaches_terminal() {
        assert!(terminal_line(Level::Detail, "noise").is_none());
        let line = terminal_line(Level::Error, "boom").unwrap();
        assert!(line.contains("boom"));
    }

    #[test]
    fn test_memory_logger_records_in_order() {
        let (mut log, sink) = Logger::in_memory();
        log.info("first").unwrap();
        log.error("second").unwrap();
        log.log(Level::Detail, "third").unwrap();

        let lines = sink.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("INFO: first"));
        assert!(lines[1].ends_with("ERROR: second"));
        assert!(lines[2].ends_with("DETAIL: third"));
    }

    #[test]
    fn test_append_output_skips_blank_lines() {
        let (mut log, sink) = Logger::in_memory();
        log.append_output("resolving...\n\n  \nthere is nothing to do\n").unwrap();
        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("DETAIL: there is nothing to do"));
    }

    #[test]
    fn test_file_sink_never_reuses_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        fs::write(&path, "previous\n").unwrap();

        let err = FileSink::create(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous\n");
    }

    #[test]
    fn test_runs_in_the_same_second_get_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let ts = Local.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();

        let (mut first_sink, first) = create_run_log(dir.path(), ts).unwrap();
        let (mut second_sink, second) = create_run_log(dir.path(), ts).unwrap();
        let (_, third) = create_run_log(dir.path(), ts).unwrap();

        assert_eq!(first.file_name().unwrap(), "setup_20261019_080000.log");
        assert_eq!(second.file_name().unwrap(), "setup_20261019_080000_1.log");
        assert_eq!(third.file_name().unwrap(), "setup_20261019_080000_2.log");

        first_sink.append("one").unwrap();
        second_sink.append("two").unwrap();
        assert_eq!(fs::read_to_string(&first).unwrap(), "one\n");
        assert_eq!(fs::read_to_string(&second).unwrap(), "two\n");
    }

    #[test]
    fn test_for_run_creates_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("state/logs");
        let mut log = Logger::for_run(&nested).unwrap();
        log.echo = false;
        log.info("hello").unwrap();

        let path = log.location().unwrap().to_path_buf();
        assert!(path.starts_with(&nested));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("setup_") && name.ends_with(".log"));
        assert!(fs::read_to_string(&path).unwrap().contains("INFO: hello"));
    }
}
