mod build;
mod commands;
mod init;
mod repo;
mod secret;
mod user;

pub use build::{run_build_list, run_feed, run_log_show};
pub use commands::{BuildCommands, LogCommands, RepoCommands, SecretCommands, UserCommands};
pub use init::run_init;
pub use repo::{run_repo_add, run_repo_hook_token, run_repo_remove, run_repo_show, run_repo_update};
pub use secret::run_secret_encrypt;
pub use user::{run_user_add, run_user_list, run_user_remove, run_user_token, run_user_update};

use std::path::Path;

use crate::config::Config;
use crate::store::{SqliteStore, Store};
use crate::types::User;

/// Resolves the effective configuration: the file (if any), then the
/// `--data-dir` override.
pub fn load_config(config_path: Option<&Path>, data_dir: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = match config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir.to_path_buf();
    }
    Ok(config)
}

/// Initialize store from the configured data directory, checking it exists
pub fn init_store(config: &Config) -> anyhow::Result<SqliteStore> {
    let db_path = config.db_path();

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'conveyor init' first.",
            db_path.display()
        );
    }

    SqliteStore::open(config).map_err(Into::into)
}

/// Looks up the user a command acts on behalf of.
fn acting_user(store: &dyn Store, login: &str) -> anyhow::Result<User> {
    store
        .get_user_login(login)
        .map_err(|e| anyhow::anyhow!("{e}. Create it with 'conveyor user add'."))
}

pub fn confirm_action(message: &str, yes: bool, non_interactive: bool) -> anyhow::Result<bool> {
    if yes {
        Ok(true)
    } else if non_interactive {
        anyhow::bail!("--yes is required for destructive operations in non-interactive mode");
    } else {
        Ok(inquire::Confirm::new(message)
            .with_default(false)
            .prompt()?)
    }
}

fn format_time(ts: i64) -> String {
    if ts == 0 {
        return "-".to_string();
    }
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}
