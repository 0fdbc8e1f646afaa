use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use conveyor::cli::{
    BuildCommands, LogCommands, RepoCommands, SecretCommands, UserCommands, load_config,
    run_build_list, run_feed, run_init, run_log_show, run_repo_add, run_repo_hook_token,
    run_repo_remove, run_repo_show, run_repo_update, run_secret_encrypt, run_user_add,
    run_user_list, run_user_remove, run_user_token, run_user_update,
};

#[derive(Parser)]
#[command(name = "conveyor")]
#[command(about = "Operator tool for the CI build ledger", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory holding the database (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database
    Init {
        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },

    /// Encrypt repository secrets
    Secret {
        #[command(subcommand)]
        command: SecretCommands,
    },

    /// Show recent builds across repositories (all repositories when none are named)
    Feed {
        full_names: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect builds
    Build {
        #[command(subcommand)]
        command: BuildCommands,
    },

    /// Inspect job logs
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("conveyor=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Init { non_interactive } => run_init(&config, non_interactive)?,
        Commands::User { command } => match command {
            UserCommands::Add {
                login,
                email,
                admin,
                non_interactive,
            } => run_user_add(&config, login, email, admin, non_interactive)?,
            UserCommands::List { json } => run_user_list(&config, json)?,
            UserCommands::Update {
                login,
                user,
                admin,
                email,
                avatar,
            } => run_user_update(&config, login, user, admin, email, avatar)?,
            UserCommands::Remove {
                login,
                user,
                yes,
                non_interactive,
            } => run_user_remove(&config, login, user, yes, non_interactive)?,
            UserCommands::Token { login, user } => run_user_token(&config, login, user)?,
        },
        Commands::Repo { command } => match command {
            RepoCommands::Add { full_name, user } => run_repo_add(&config, full_name, user)?,
            RepoCommands::Show { full_name, json } => run_repo_show(&config, full_name, json)?,
            RepoCommands::Update {
                full_name,
                user,
                trusted,
                timeout,
                allow_pull,
                allow_push,
                allow_deploy,
                allow_tag,
            } => run_repo_update(
                &config,
                full_name,
                user,
                trusted,
                timeout,
                allow_pull,
                allow_push,
                allow_deploy,
                allow_tag,
            )?,
            RepoCommands::Remove {
                full_name,
                user,
                yes,
                non_interactive,
            } => run_repo_remove(&config, full_name, user, yes, non_interactive)?,
            RepoCommands::HookToken { full_name, user } => {
                run_repo_hook_token(&config, full_name, user)?
            }
        },
        Commands::Secret { command } => match command {
            SecretCommands::Encrypt { full_name, file } => {
                run_secret_encrypt(&config, full_name, file)?
            }
        },
        Commands::Feed { full_names, json } => run_feed(&config, full_names, json)?,
        Commands::Build { command } => match command {
            BuildCommands::List { full_name, json } => run_build_list(&config, full_name, json)?,
        },
        Commands::Log { command } => match command {
            LogCommands::Show {
                full_name,
                build,
                job,
            } => run_log_show(&config, full_name, build, job)?,
        },
    }

    Ok(())
}
