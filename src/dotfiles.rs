//! Dotfiles deployment through the symlink farm tool.
//!
//! Two trees of the repository are linked into `$HOME`: the config tree
//! first, then the home tree. `--restow` makes a second run replace the
//! links it created on the first.
//!
//! Deployment is all-or-stop: a failed tree is fatal and later trees are
//! not attempted.

use std::path::Path;

use crate::context::SetupContext;
use crate::error::{Result, SetupError};
use crate::runner::CommandSpec;

/// `<stow> --restow --dir <repo> --target <home> <tree>`
pub fn stow_command(stow: &str, repo: &Path, home: &Path, tree: &str) -> CommandSpec {
    CommandSpec::new(stow).args([
        "--restow".to_string(),
        "--dir".to_string(),
        repo.display().to_string(),
        "--target".to_string(),
        home.display().to_string(),
        tree.to_string(),
    ])
}

/// Link the config tree, then the home tree, into the home directory.
pub fn deploy_dotfiles(ctx: &mut SetupContext) -> Result<()> {
    ctx.log.info("Deploying dotfiles...")?;

    let repo = ctx.repo_root();
    let trees = [
        ("configuration files", ctx.config.dotfiles.config_tree.clone()),
        ("home files", ctx.config.dotfiles.home_tree.clone()),
    ];

    for (what, tree) in trees {
        let spec = stow_command(&ctx.config.dotfiles.stow, &repo, &ctx.home, &tree);
        let outcome = ctx.run_logged(&spec)?;
        if !outcome.success {
            let detail = outcome.describe_failure();
            ctx.log
                .error(format!("Failed to deploy {} from '{}': {}", what, tree, detail))?;
            return Err(SetupError::deploy(tree, detail));
        }
        ctx.log.success(format!("Deployed {} from '{}'", what, tree))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_stow_command_layout() {
        let spec = stow_command(
            "stow",
            &PathBuf::from("/home/alice/dotfiles"),
            &PathBuf::from("/home/alice"),
            "config",
        );
        assert_eq!(
            spec.to_string(),
            "stow --restow --dir /home/alice/dotfiles --target /home/alice config"
        );
    }
}
