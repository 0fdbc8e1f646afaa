use inquire::Text;
use serde::Serialize;

use crate::config::Config;
use crate::crypto;
use crate::store::Store;
use crate::types::validation::validate_owner;
use crate::types::{User, UserPatch};
use crate::users;

use super::{acting_user, confirm_action, format_time, init_store};

#[derive(Serialize)]
struct UserOutput {
    id: i64,
    login: String,
    email: String,
    admin: bool,
    created: i64,
}

pub fn run_user_add(
    config: &Config,
    login: Option<String>,
    email: String,
    admin: bool,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let store = init_store(config)?;

    let login = if let Some(login) = login {
        validate_owner(&login)?;
        login
    } else if non_interactive {
        anyhow::bail!("--login is required in non-interactive mode");
    } else {
        Text::new("Login:")
            .with_validator(|input: &str| {
                Ok(validate_owner(input)
                    .map(|()| inquire::validator::Validation::Valid)
                    .unwrap_or_else(|e| inquire::validator::Validation::Invalid(e.to_string().into())))
            })
            .prompt()?
    };

    let mut user = User {
        login,
        email,
        admin,
        hash: crypto::random_secret()?,
        ..User::default()
    };
    store.create_user(&mut user)?;

    println!();
    println!(
        "Created {} \"{}\" (id {})",
        if user.admin { "administrator" } else { "user" },
        user.login,
        user.id
    );
    println!();

    Ok(())
}

pub fn run_user_list(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = init_store(config)?;
    let users = store.list_users()?;

    if json {
        let output: Vec<UserOutput> = users
            .into_iter()
            .map(|u| UserOutput {
                id: u.id,
                login: u.login,
                email: u.email,
                admin: u.admin,
                created: u.created,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if users.is_empty() {
        println!("No users. Create one with 'conveyor user add'.");
        return Ok(());
    }

    println!();
    println!("{:<6} {:<24} {:<6} {:<20} EMAIL", "ID", "LOGIN", "ADMIN", "CREATED");
    for user in &users {
        println!(
            "{:<6} {:<24} {:<6} {:<20} {}",
            user.id,
            user.login,
            if user.admin { "yes" } else { "no" },
            format_time(user.created),
            user.email
        );
    }
    println!();
    println!("{} user(s)", store.count_users()?);

    Ok(())
}

pub fn run_user_update(
    config: &Config,
    login: String,
    actor: String,
    admin: Option<bool>,
    email: Option<String>,
    avatar: Option<String>,
) -> anyhow::Result<()> {
    let store = init_store(config)?;
    let actor = acting_user(&store, &actor)?;

    let patch = UserPatch {
        email,
        avatar,
        admin,
    };
    if patch.is_empty() {
        anyhow::bail!("Nothing to update. Pass --admin, --email or --avatar.");
    }

    let user = users::update_user(&store, &actor, &login, &patch)?;

    println!(
        "Updated {} \"{}\"",
        if user.admin { "administrator" } else { "user" },
        user.login
    );

    Ok(())
}

pub fn run_user_remove(
    config: &Config,
    login: String,
    actor: String,
    yes: bool,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let store = init_store(config)?;
    let actor = acting_user(&store, &actor)?;

    // Fail on unknown users before prompting.
    store.get_user_login(&login)?;

    let confirmed = confirm_action(&format!("Delete user '{login}'?"), yes, non_interactive)?;

    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    users::delete_user(&store, &actor, &login)?;

    println!("Deleted user '{login}'");

    Ok(())
}

pub fn run_user_token(config: &Config, login: String, actor: String) -> anyhow::Result<()> {
    let store = init_store(config)?;
    let actor = acting_user(&store, &actor)?;

    let token = users::issue_user_token(&store, &actor, &login)?;
    println!("{token}");

    Ok(())
}
