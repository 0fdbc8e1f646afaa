use std::fs;

use inquire::Text;

use crate::config::Config;
use crate::crypto;
use crate::store::{SqliteStore, Store};
use crate::types::User;
use crate::types::validation::validate_owner;

pub fn run_init(config: &Config, non_interactive: bool) -> anyhow::Result<()> {
    fs::create_dir_all(&config.data_dir)?;

    let db_path = config.db_path();
    if db_path.exists() {
        anyhow::bail!("Already initialized. Database exists at: {}", db_path.display());
    }

    let store = SqliteStore::open(config)?;
    store.initialize()?;
    tracing::info!(path = %db_path.display(), "initialized database");

    println!();
    println!("Initialized database at {}", db_path.display());

    if !non_interactive {
        create_admin_prompt(&store)?;
    }

    println!();

    Ok(())
}

fn create_admin_prompt(store: &SqliteStore) -> anyhow::Result<()> {
    let create = inquire::Confirm::new("Would you like to create an administrator?")
        .with_default(false)
        .prompt()?;

    if !create {
        return Ok(());
    }

    let login = Text::new("Login:")
        .with_validator(|input: &str| {
            Ok(validate_owner(input)
                .map(|()| inquire::validator::Validation::Valid)
                .unwrap_or_else(|e| inquire::validator::Validation::Invalid(e.to_string().into())))
        })
        .prompt()?;

    let mut user = User {
        login,
        admin: true,
        hash: crypto::random_secret()?,
        ..User::default()
    };
    store.create_user(&mut user)?;

    println!("Created administrator '{}'", user.login);

    Ok(())
}
