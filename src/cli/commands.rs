use std::path::PathBuf;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a new user
    Add {
        /// Login for the new user
        #[arg(long)]
        login: Option<String>,

        /// Email address
        #[arg(long, default_value = "")]
        email: String,

        /// Grant system administrator rights
        #[arg(long)]
        admin: bool,

        /// Skip interactive prompts (requires --login)
        #[arg(long)]
        non_interactive: bool,
    },

    /// List all users
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change another user's email, avatar or administrator flag
    Update {
        login: String,

        /// Login of the acting administrator
        #[arg(long)]
        user: String,

        /// Grant or revoke system administrator rights
        #[arg(long)]
        admin: Option<bool>,

        /// Email address
        #[arg(long)]
        email: Option<String>,

        /// Avatar URL
        #[arg(long)]
        avatar: Option<String>,
    },

    /// Remove a user who owns no repositories
    Remove {
        login: String,

        /// Login of the acting administrator
        #[arg(long)]
        user: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        yes: bool,

        /// Skip interactive prompts (requires --yes)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Print the API token of a user
    Token {
        login: String,

        /// Login of the acting user (the same user, or an administrator)
        #[arg(long)]
        user: String,
    },
}

#[derive(Subcommand)]
pub enum RepoCommands {
    /// Register a repository (owner/name)
    Add {
        /// Repository full name, e.g. octocat/hello-world
        full_name: String,

        /// Login of the owning user
        #[arg(long)]
        user: String,
    },

    /// Show a repository and its public deploy key
    Show {
        full_name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change repository settings
    Update {
        full_name: String,

        /// Login of the acting user
        #[arg(long)]
        user: String,

        /// Mark the repository as trusted (administrators only)
        #[arg(long)]
        trusted: Option<bool>,

        /// Build timeout in minutes (administrators only)
        #[arg(long)]
        timeout: Option<i64>,

        /// Build on pull requests
        #[arg(long)]
        allow_pull: Option<bool>,

        /// Build on pushes
        #[arg(long)]
        allow_push: Option<bool>,

        /// Build on deployments
        #[arg(long)]
        allow_deploy: Option<bool>,

        /// Build on tags
        #[arg(long)]
        allow_tag: Option<bool>,
    },

    /// Remove a repository with all of its builds and logs
    Remove {
        full_name: String,

        /// Login of the acting user
        #[arg(long)]
        user: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        yes: bool,

        /// Skip interactive prompts (requires --yes)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Print the webhook token of a repository
    HookToken {
        full_name: String,

        /// Login of the acting administrator
        #[arg(long)]
        user: String,
    },
}

#[derive(Subcommand)]
pub enum SecretCommands {
    /// Encrypt a YAML secrets document for a repository
    Encrypt {
        full_name: String,

        /// Read the document from a file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum BuildCommands {
    /// List builds of a repository, most recent first
    List {
        full_name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum LogCommands {
    /// Print the log of a job
    Show {
        full_name: String,

        /// Build number
        build: i64,

        /// Job number within the build
        #[arg(long, default_value = "1")]
        job: i64,
    },
}
