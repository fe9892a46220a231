//! Setup configuration.
//!
//! Every path and tool name the run depends on lives here instead of being
//! scattered through the steps. A JSON file may override any subset of
//! fields; everything missing falls back to [`SetupConfig::default`].
//!
//! Path fields follow one rule (see [`SetupConfig::resolve_path`]):
//! `~/...` is relative to the user's home, other relative paths are relative
//! to the dotfiles repository root, absolute paths are taken as-is.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};

/// What happens when a package list file is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ListPolicy {
    /// Missing file aborts the run
    Required,
    /// Missing file is reported and skipped
    Optional,
}

/// One package list file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageListEntry {
    pub name: String,
    pub path: PathBuf,
    pub policy: ListPolicy,
}

impl PackageListEntry {
    pub fn new(name: &str, path: &str, policy: ListPolicy) -> Self {
        Self {
            name: name.to_string(),
            path: PathBuf::from(path),
            policy,
        }
    }
}

/// Graphics driver fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuVariants {
    pub nvidia: PathBuf,
    pub other: PathBuf,
    pub destination: PathBuf,
}

impl Default for GpuVariants {
    fn default() -> Self {
        Self {
            nvidia: PathBuf::from("hardware/gpu/nvidia.conf"),
            other: PathBuf::from("hardware/gpu/dummy.conf"),
            destination: PathBuf::from("config/.config/hypr/hardware/gpu.conf"),
        }
    }
}

/// Keyboard layout fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardVariants {
    pub us: PathBuf,
    pub latam: PathBuf,
    pub destination: PathBuf,
}

impl Default for KeyboardVariants {
    fn default() -> Self {
        Self {
            us: PathBuf::from("hardware/keyboard/us.conf"),
            latam: PathBuf::from("hardware/keyboard/latam.conf"),
            destination: PathBuf::from("config/.config/hypr/hardware/keyboard.conf"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub gpu: GpuVariants,
    pub keyboard: KeyboardVariants,
}

/// Symlink farm settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DotfilesConfig {
    /// Symlink-farm program
    pub stow: String,
    /// Tree holding `~/.config` content, relative to the repo root
    pub config_tree: String,
    /// Tree holding plain home dotfiles, relative to the repo root
    pub home_tree: String,
}

impl Default for DotfilesConfig {
    fn default() -> Self {
        Self {
            stow: "stow".to_string(),
            config_tree: "config".to_string(),
            home_tree: "home".to_string(),
        }
    }
}

/// Post-install housekeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalizeConfig {
    pub groups: Vec<String>,
    pub font_cache: String,
    pub plugin_manager_dir: PathBuf,
    /// Relative to `plugin_manager_dir`
    pub plugin_install_script: PathBuf,
    pub theming_tool: String,
    pub wallpaper: PathBuf,
    pub shell: String,
}

impl Default for FinalizeConfig {
    fn default() -> Self {
        Self {
            groups: vec!["video".into(), "input".into(), "audio".into()],
            font_cache: "fc-cache".to_string(),
            plugin_manager_dir: PathBuf::from("~/.tmux/plugins/tpm"),
            plugin_install_script: PathBuf::from("bin/install_plugins"),
            theming_tool: "wal".to_string(),
            wallpaper: PathBuf::from("wallpapers/default.jpg"),
            shell: "zsh".to_string(),
        }
    }
}

/// Complete configuration for one setup run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    /// Dotfiles repository root
    pub repo_root: PathBuf,
    /// Directory receiving the per-run log file
    pub log_dir: PathBuf,
    /// AUR helper used for every package
    pub aur_helper: String,
    /// Privilege escalation program
    pub elevator: String,
    /// Tools checked in addition to the AUR helper and symlink tool
    pub extra_required_tools: Vec<String>,
    /// Abort when invoked as root
    pub forbid_root: bool,
    /// Package failures make the run exit non-zero
    pub strict_packages: bool,
    pub package_lists: Vec<PackageListEntry>,
    pub hardware: HardwareConfig,
    pub dotfiles: DotfilesConfig,
    pub finalize: FinalizeConfig,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            repo_root: PathBuf::from("."),
            log_dir: PathBuf::from("~/.local/state/archsetup"),
            aur_helper: "yay".to_string(),
            elevator: "sudo".to_string(),
            extra_required_tools: Vec::new(),
            forbid_root: true,
            strict_packages: false,
            package_lists: vec![
                PackageListEntry::new("base", "packages/base.txt", ListPolicy::Required),
                PackageListEntry::new("dev", "packages/dev.txt", ListPolicy::Required),
                PackageListEntry::new("gui", "packages/gui.txt", ListPolicy::Required),
                PackageListEntry::new("aur", "packages/aur.txt", ListPolicy::Optional),
            ],
            hardware: HardwareConfig::default(),
            dotfiles: DotfilesConfig::default(),
            finalize: FinalizeConfig::default(),
        }
    }
}

impl SetupConfig {
    /// Load configuration from a JSON file; absent fields take defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Required external tools, in check order
    pub fn required_tools(&self) -> Vec<String> {
        let mut tools = vec![self.aur_helper.clone(), self.dotfiles.stow.clone()];
        for tool in &self.extra_required_tools {
            if !tools.contains(tool) {
                tools.push(tool.clone());
            }
        }
        tools
    }

    /// Expand `path` against the home directory or the repository root.
    pub fn resolve_path(&self, path: &Path, home: &Path) -> PathBuf {
        if let Ok(rest) = path.strip_prefix("~") {
            return join_nonempty(home, rest);
        }
        if path.is_absolute() {
            return path.to_path_buf();
        }
        let root = match self.repo_root.strip_prefix("~") {
            Ok(rest) => join_nonempty(home, rest),
            Err(_) => self.repo_root.clone(),
        };
        join_nonempty(&root, path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.aur_helper.trim().is_empty() {
            anyhow::bail!("AUR helper must be specified");
        }
        if self.elevator.trim().is_empty() {
            anyhow::bail!("Privilege escalation program must be specified");
        }
        if self.dotfiles.stow.trim().is_empty() {
            anyhow::bail!("Symlink tool must be specified");
        }
        if self.dotfiles.config_tree.trim().is_empty() || self.dotfiles.home_tree.trim().is_empty()
        {
            anyhow::bail!("Both dotfiles trees must be named");
        }
        if self.extra_required_tools.iter().any(|t| t.trim().is_empty()) {
            anyhow::bail!("Required tool names cannot be empty");
        }

        if self.package_lists.is_empty() {
            anyhow::bail!("At least one package list must be configured");
        }
        let mut seen = HashSet::new();
        for list in &self.package_lists {
            if list.name.trim().is_empty() {
                anyhow::bail!("Package list names cannot be empty");
            }
            if !seen.insert(list.name.as_str()) {
                anyhow::bail!("Duplicate package list name: {}", list.name);
            }
        }

        if self.finalize.groups.iter().any(|g| g.trim().is_empty()) {
            anyhow::bail!("Group names cannot be empty");
        }

        Ok(())
    }
}

/// `Path::join` with an empty tail leaves a trailing separator
fn join_nonempty(base: &Path, tail: &Path) -> PathBuf {
    if tail.as_os_str().is_empty() {
        base.to_path_buf()
    } else {
        base.join(tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SetupConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.required_tools(), vec!["yay", "stow"]);
    }

    #[test]
    fn test_default_list_policies() {
        let config = SetupConfig::default();
        let policies: Vec<(&str, ListPolicy)> = config
            .package_lists
            .iter()
            .map(|l| (l.name.as_str(), l.policy))
            .collect();
        assert_eq!(
            policies,
            vec![
                ("base", ListPolicy::Required),
                ("dev", ListPolicy::Required),
                ("gui", ListPolicy::Required),
                ("aur", ListPolicy::Optional),
            ]
        );
    }

    #[test]
    fn test_required_tools_deduplicates_extras() {
        let config = SetupConfig {
            extra_required_tools: vec!["git".into(), "stow".into()],
            ..SetupConfig::default()
        };
        assert_eq!(config.required_tools(), vec!["yay", "stow", "git"]);
    }

    #[test]
    fn test_resolve_path_rules() {
        let config = SetupConfig {
            repo_root: PathBuf::from("/srv/dots"),
            ..SetupConfig::default()
        };
        let home = Path::new("/home/alice");

        assert_eq!(
            config.resolve_path(Path::new("~/.tmux/plugins/tpm"), home),
            PathBuf::from("/home/alice/.tmux/plugins/tpm")
        );
        assert_eq!(
            config.resolve_path(Path::new("packages/base.txt"), home),
            PathBuf::from("/srv/dots/packages/base.txt")
        );
        assert_eq!(
            config.resolve_path(Path::new("/etc/hosts"), home),
            PathBuf::from("/etc/hosts")
        );
    }

    #[test]
    fn test_resolve_empty_path_is_repo_root() {
        let config = SetupConfig {
            repo_root: PathBuf::from("/srv/dotfiles"),
            ..Default::default()
        };
        let home = Path::new("/home/alice");
        assert_eq!(config.resolve_path(Path::new(""), home), PathBuf::from("/srv/dotfiles"));
        assert_eq!(config.resolve_path(Path::new("~"), home), PathBuf::from("/home/alice"));
    }

    #[test]
    fn test_resolve_path_with_home_relative_repo() {
        let config = SetupConfig {
            repo_root: PathBuf::from("~/dotfiles"),
            ..SetupConfig::default()
        };
        assert_eq!(
            config.resolve_path(Path::new("config"), Path::new("/home/bob")),
            PathBuf::from("/home/bob/dotfiles/config")
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setup.json");
        fs::write(
            &path,
            r#"{ "aur_helper": "paru", "finalize": { "shell": "fish" } }"#,
        )
        .unwrap();

        let config = SetupConfig::load_from_file(&path).unwrap();
        assert_eq!(config.aur_helper, "paru");
        assert_eq!(config.finalize.shell, "fish");
        assert_eq!(config.finalize.font_cache, "fc-cache");
        assert_eq!(config.package_lists.len(), 4);
        assert_eq!(config.required_tools(), vec!["paru", "stow"]);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setup.json");
        let config = SetupConfig {
            strict_packages: true,
            ..SetupConfig::default()
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(SetupConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = SetupConfig::load_from_file("/nonexistent/setup.json");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setup.json");
        fs::write(
            &path,
            r#"{ "package_lists": [ { "name": "x", "path": "x.txt", "policy": "sometimes" } ] }"#,
        )
        .unwrap();
        assert!(SetupConfig::load_from_file(&path).is_err());
    }

    #[test]
    fn test_validation_rejects_duplicate_lists() {
        let mut config = SetupConfig::default();
        config
            .package_lists
            .push(PackageListEntry::new("base", "other.txt", ListPolicy::Optional));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate package list name: base"));
    }

    #[test]
    fn test_validation_rejects_empty_values() {
        let config = SetupConfig {
            aur_helper: " ".into(),
            ..SetupConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SetupConfig {
            package_lists: vec![],
            ..SetupConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = SetupConfig::default();
        config.finalize.groups.push(String::new());
        assert!(config.validate().is_err());
    }
}
