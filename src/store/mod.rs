mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use std::io::Read;

use crate::error::Result;
use crate::types::*;

/// Store defines the ledger interface.
///
/// Lookups of a single entity fail with `Error::NotFound` on a miss. Build
/// and job numbers are always allocated here, inside the same transaction
/// that inserts the row; nothing above the store caches them.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &mut User) -> Result<()>;
    fn get_user(&self, id: i64) -> Result<User>;
    fn get_user_login(&self, login: &str) -> Result<User>;
    /// All users ordered by login.
    fn list_users(&self) -> Result<Vec<User>>;
    fn count_users(&self) -> Result<i64>;
    /// Updates email, avatar and the admin flag. Login and hash never change.
    fn update_user(&self, user: &User) -> Result<()>;
    fn delete_user(&self, id: i64) -> Result<()>;

    // Repo operations. A repo and its key are only ever created together.
    fn create_repo(&self, repo: &mut Repo, key: &mut Key) -> Result<()>;
    fn get_repo(&self, id: i64) -> Result<Repo>;
    fn get_repo_name(&self, full_name: &str) -> Result<Repo>;
    fn list_repos(&self) -> Result<Vec<Repo>>;
    fn update_repo(&self, repo: &Repo) -> Result<()>;
    /// Deletes the repo together with its key, builds, jobs and logs.
    fn delete_repo(&self, id: i64) -> Result<()>;
    fn get_key(&self, repo_id: i64) -> Result<Key>;

    // Build operations
    /// Numbers and inserts the build and its jobs in one transaction.
    /// On success `build` and `jobs` carry their assigned ids and numbers;
    /// on failure they are left untouched.
    fn create_build(&self, build: &mut Build, jobs: &mut [Job]) -> Result<()>;
    fn update_build(&self, build: &Build) -> Result<()>;
    fn get_build(&self, id: i64) -> Result<Build>;
    fn get_build_number(&self, repo_id: i64, number: i64) -> Result<Build>;
    fn get_build_ref(&self, repo_id: i64, git_ref: &str) -> Result<Build>;
    fn get_build_commit(&self, repo_id: i64, commit: &str, branch: &str) -> Result<Build>;
    fn get_last_build(&self, repo_id: i64, branch: &str) -> Result<Build>;
    fn get_last_build_before(&self, repo_id: i64, branch: &str, before_id: i64) -> Result<Build>;
    fn list_builds(&self, repo_id: i64) -> Result<Vec<Build>>;

    // Job operations
    /// Appends a job to an existing build, numbering it when `number` is 0.
    fn create_job(&self, job: &mut Job) -> Result<()>;
    fn update_job(&self, job: &Job) -> Result<()>;
    fn get_job(&self, id: i64) -> Result<Job>;
    fn get_job_number(&self, build_id: i64, number: i64) -> Result<Job>;
    fn list_jobs(&self, build_id: i64) -> Result<Vec<Job>>;

    // Log operations (whole-blob replace, no append)
    fn write_log(&self, job_id: i64, reader: &mut dyn Read) -> Result<()>;
    fn read_log(&self, job_id: i64) -> Result<Vec<u8>>;

    /// Builds of the named repos, most recent first.
    fn list_feed(&self, full_names: &[&str]) -> Result<Vec<FeedItem>>;
}
