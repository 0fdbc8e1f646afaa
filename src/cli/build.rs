use std::io::{self, Write};

use crate::config::Config;
use crate::feed::get_feed;
use crate::store::Store;
use crate::types::Build;

use super::{format_time, init_store};

fn print_build(prefix: &str, build: &Build) {
    let commit: String = build.commit.chars().take(8).collect();
    println!(
        "{prefix}#{:<5} {:<8} {:<20} {:<8} {}",
        build.number,
        build.status,
        build.branch,
        commit,
        format_time(build.created)
    );
}

pub fn run_feed(config: &Config, full_names: Vec<String>, json: bool) -> anyhow::Result<()> {
    let store = init_store(config)?;

    let full_names = if full_names.is_empty() {
        store
            .list_repos()?
            .into_iter()
            .map(|repo| repo.full_name)
            .collect()
    } else {
        full_names
    };

    let items = get_feed(&store, &full_names)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No builds.");
        return Ok(());
    }

    for item in &items {
        print_build(&format!("{:<30} ", item.full_name), &item.build);
    }

    Ok(())
}

pub fn run_build_list(config: &Config, full_name: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(config)?;
    let repo = store.get_repo_name(&full_name)?;
    let builds = store.list_builds(repo.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&builds)?);
        return Ok(());
    }

    if builds.is_empty() {
        println!("No builds for '{}'.", repo.full_name);
        return Ok(());
    }

    for build in &builds {
        print_build("", build);
    }

    Ok(())
}

pub fn run_log_show(
    config: &Config,
    full_name: String,
    build_number: i64,
    job_number: i64,
) -> anyhow::Result<()> {
    let store = init_store(config)?;
    let repo = store.get_repo_name(&full_name)?;
    let build = store.get_build_number(repo.id, build_number)?;
    let job = store.get_job_number(build.id, job_number)?;
    let data = store.read_log(job.id)?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&data)?;
    stdout.flush()?;

    Ok(())
}
