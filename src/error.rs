//! Error handling module for archsetup
//!
//! Only fatal conditions are errors. Tolerated failures (a package that will
//! not install, a group that does not exist) are log entries, not values of
//! this type.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the setup run
#[derive(Error, Debug)]
pub enum SetupError {
    /// One or more required external tools are not on PATH
    #[error("Missing required tools: {}", .0.join(", "))]
    MissingDependencies(Vec<String>),

    /// Invoked as root while the configuration forbids it
    #[error("Refusing to run as root: AUR builds and shell changes must target a regular user")]
    RunningAsRoot,

    /// A package list marked as required does not exist
    #[error("Package list not found: {}", .0.display())]
    MissingPackageList(PathBuf),

    /// Symlinking a dotfiles tree failed
    #[error("Failed to deploy '{tree}': {detail}")]
    Deploy { tree: String, detail: String },

    /// The run log could not be written
    #[error("Failed to write run log: {0}")]
    LogWrite(#[source] std::io::Error),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Interactive input ended or could not be read
    #[error("Input error: {0}")]
    Input(String),

    /// IO errors outside the run log
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for setup operations
pub type Result<T> = std::result::Result<T, SetupError>;

impl SetupError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an input error
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Create a deployment error for the named tree
    pub fn deploy(tree: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Deploy {
            tree: tree.into(),
            detail: detail.into(),
        }
    }

    /// Process exit status for this error.
    ///
    /// Usage and configuration problems exit with 2, every other fatal
    /// setup failure with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Json(_) => 2,
            _ => 1,
        }
    }
}

impl From<anyhow::Error> for SetupError {
    fn from(err: anyhow::Error) -> Self {
        Self::Config(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SetupError::MissingDependencies(vec!["yay".into(), "stow".into()]);
        assert_eq!(err.to_string(), "Missing required tools: yay, stow");

        let err = SetupError::MissingPackageList(PathBuf::from("packages/base.txt"));
        assert_eq!(err.to_string(), "Package list not found: packages/base.txt");

        let err = SetupError::deploy("config", "stow exited with 1");
        assert_eq!(err.to_string(), "Failed to deploy 'config': stow exited with 1");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(SetupError::config("bad").exit_code(), 2);
        assert_eq!(SetupError::RunningAsRoot.exit_code(), 1);
        assert_eq!(SetupError::deploy("home", "x").exit_code(), 1);
        assert_eq!(SetupError::input("eof").exit_code(), 1);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SetupError = io_err.into();
        assert!(matches!(err, SetupError::Io(_)));
    }

    #[test]
    fn test_anyhow_becomes_config_error() {
        let err: SetupError = anyhow::anyhow!("outer").context("while loading").into();
        assert!(matches!(err, SetupError::Config(_)));
        assert!(err.to_string().contains("while loading"));
    }
}
