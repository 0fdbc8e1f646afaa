use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::provision::Provisioner;
use crate::remote::Detached;
use crate::store::Store;
use crate::types::RepoPatch;

use super::{acting_user, confirm_action, format_time, init_store};

#[derive(Serialize)]
struct RepoOutput {
    id: i64,
    full_name: String,
    owner_id: i64,
    timeout: i64,
    trusted: bool,
    allow_pull: bool,
    allow_push: bool,
    allow_deploy: bool,
    allow_tag: bool,
    created: i64,
    public_key: String,
}

fn provisioner(config: &Config) -> anyhow::Result<(Arc<dyn Store>, Provisioner)> {
    let store: Arc<dyn Store> = Arc::new(init_store(config)?);
    let provisioner = Provisioner::new(store.clone(), Arc::new(Detached), config.clone());
    Ok((store, provisioner))
}

pub fn run_repo_add(config: &Config, full_name: String, login: String) -> anyhow::Result<()> {
    let (store, provisioner) = provisioner(config)?;
    let user = acting_user(store.as_ref(), &login)?;

    // No provider is wired into the CLI, so the webhook is left for the
    // operator to install from the printed link.
    let out = provisioner.provision(&user, &full_name, false)?;

    println!();
    println!("Added repository '{}' (id {})", out.repo.full_name, out.repo.id);
    println!();
    println!("Webhook link:");
    println!("  {}", out.link);
    println!();

    Ok(())
}

pub fn run_repo_show(config: &Config, full_name: String, json: bool) -> anyhow::Result<()> {
    let (store, provisioner) = provisioner(config)?;
    let repo = store.get_repo_name(&full_name)?;
    let public_key = provisioner.public_key(&full_name)?;

    if json {
        let output = RepoOutput {
            id: repo.id,
            full_name: repo.full_name,
            owner_id: repo.user_id,
            timeout: repo.timeout,
            trusted: repo.is_trusted,
            allow_pull: repo.allow_pull,
            allow_push: repo.allow_push,
            allow_deploy: repo.allow_deploy,
            allow_tag: repo.allow_tag,
            created: repo.created,
            public_key,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("{} (id {})", repo.full_name, repo.id);
    println!("  Timeout:      {} minutes", repo.timeout);
    println!("  Trusted:      {}", repo.is_trusted);
    println!(
        "  Events:       pull={} push={} deploy={} tag={}",
        repo.allow_pull, repo.allow_push, repo.allow_deploy, repo.allow_tag
    );
    println!("  Created:      {}", format_time(repo.created));
    println!();
    println!("Deploy key:");
    println!("  {}", public_key.trim_end());
    println!();

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn run_repo_update(
    config: &Config,
    full_name: String,
    login: String,
    trusted: Option<bool>,
    timeout: Option<i64>,
    allow_pull: Option<bool>,
    allow_push: Option<bool>,
    allow_deploy: Option<bool>,
    allow_tag: Option<bool>,
) -> anyhow::Result<()> {
    let (store, provisioner) = provisioner(config)?;
    let user = acting_user(store.as_ref(), &login)?;

    let patch = RepoPatch {
        is_trusted: trusted,
        timeout,
        allow_pull,
        allow_push,
        allow_deploy,
        allow_tag,
    };
    if patch.is_empty() {
        anyhow::bail!("Nothing to update. Pass at least one setting flag.");
    }

    let repo = provisioner.patch(&user, &full_name, &patch)?;

    println!("Updated repository '{}'", repo.full_name);

    Ok(())
}

pub fn run_repo_remove(
    config: &Config,
    full_name: String,
    login: String,
    yes: bool,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let (store, provisioner) = provisioner(config)?;
    let user = acting_user(store.as_ref(), &login)?;

    // Fail on unknown repositories before prompting.
    store.get_repo_name(&full_name)?;

    let confirmed = confirm_action(
        &format!("Delete repository '{full_name}'? This also deletes all of its builds and logs."),
        yes,
        non_interactive,
    )?;

    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    provisioner.delete(&user, &full_name)?;

    println!("Deleted repository '{full_name}'");

    Ok(())
}

pub fn run_repo_hook_token(config: &Config, full_name: String, login: String) -> anyhow::Result<()> {
    let (store, provisioner) = provisioner(config)?;
    let user = acting_user(store.as_ref(), &login)?;

    let token = provisioner.hook_token(&user, &full_name)?;
    println!("{token}");

    Ok(())
}
