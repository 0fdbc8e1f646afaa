use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::BuildStatus;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub avatar: String,
    pub admin: bool,
    /// Signing secret for user-kind tokens.
    #[serde(skip)]
    pub hash: String,
    pub created: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Repo {
    pub id: i64,
    pub user_id: i64,
    pub owner: String,
    pub name: String,
    pub full_name: String,
    /// HMAC key for hook tokens. Rotating it revokes every issued hook token.
    #[serde(skip)]
    pub hash: String,
    pub timeout: i64,
    pub allow_push: bool,
    pub allow_pull: bool,
    pub allow_deploy: bool,
    pub allow_tag: bool,
    pub is_trusted: bool,
    pub created: i64,
}

impl Repo {
    #[must_use]
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            full_name: format!("{owner}/{name}"),
            ..Self::default()
        }
    }
}

/// Deploy key pair, one per repository.
#[derive(Debug, Clone, Default)]
pub struct Key {
    pub repo_id: i64,
    pub public: String,
    pub private: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Build {
    pub id: i64,
    pub repo_id: i64,
    /// Assigned by the store on creation; any caller-supplied value is replaced.
    pub number: i64,
    pub status: BuildStatus,
    pub commit: String,
    pub branch: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub message: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub author: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub avatar: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub link: String,
    pub created: i64,
    pub started: i64,
    pub finished: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub build_id: i64,
    pub number: i64,
    pub status: BuildStatus,
    pub exit_code: i32,
    pub environment: BTreeMap<String, String>,
    pub started: i64,
    pub finished: i64,
}

/// A build annotated with the full name of the repository it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub full_name: String,
    #[serde(flatten)]
    pub build: Build,
}
