use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{
    Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior, ffi, params,
    params_from_iter,
};

use super::Store;
use super::schema::SCHEMA;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::*;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const USER_COLUMNS: &str = "id, login, email, avatar, admin, hash, created";

const REPO_COLUMNS: &str = "id, user_id, owner, name, full_name, hash, timeout, \
     allow_push, allow_pull, allow_deploy, allow_tag, is_trusted, created";

const BUILD_COLUMNS: &str = "id, repo_id, number, status, commit_sha, branch, git_ref, \
     message, author, avatar, link, created, started, finished";

const JOB_COLUMNS: &str =
    "id, build_id, number, status, exit_code, environment, started, finished";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        Self::with_busy_timeout(db_path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Opens the database at `config.db_path()` using the configured lock wait.
    pub fn open(config: &Config) -> Result<Self> {
        Self::with_busy_timeout(
            config.db_path(),
            Duration::from_millis(config.busy_timeout_ms),
        )
    }

    pub fn with_busy_timeout<P: AsRef<Path>>(db_path: P, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(busy_timeout)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::DatabaseBusy || e.code == ErrorCode::DatabaseLocked
    )
}

/// Opens a write transaction for number allocation. A lock wait that runs
/// past the busy timeout is reported as a retryable `ConstraintViolation`.
fn begin_numbering<'c>(
    conn: &'c mut Connection,
    scope: impl FnOnce() -> String,
) -> Result<rusqlite::Transaction<'c>> {
    match conn.transaction_with_behavior(TransactionBehavior::Immediate) {
        Ok(tx) => Ok(tx),
        Err(e) if is_busy(&e) => Err(Error::ConstraintViolation(format!(
            "{} is locked by another writer",
            scope()
        ))),
        Err(e) => Err(Error::from(e)),
    }
}

fn status_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<BuildStatus> {
    row.get::<_, String>(idx)?
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn environment_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<BTreeMap<String, String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        login: row.get(1)?,
        email: row.get(2)?,
        avatar: row.get(3)?,
        admin: row.get(4)?,
        hash: row.get(5)?,
        created: row.get(6)?,
    })
}

fn repo_from_row(row: &Row<'_>) -> rusqlite::Result<Repo> {
    Ok(Repo {
        id: row.get(0)?,
        user_id: row.get(1)?,
        owner: row.get(2)?,
        name: row.get(3)?,
        full_name: row.get(4)?,
        hash: row.get(5)?,
        timeout: row.get(6)?,
        allow_push: row.get(7)?,
        allow_pull: row.get(8)?,
        allow_deploy: row.get(9)?,
        allow_tag: row.get(10)?,
        is_trusted: row.get(11)?,
        created: row.get(12)?,
    })
}

fn build_from_row(row: &Row<'_>) -> rusqlite::Result<Build> {
    Ok(Build {
        id: row.get(0)?,
        repo_id: row.get(1)?,
        number: row.get(2)?,
        status: status_column(row, 3)?,
        commit: row.get(4)?,
        branch: row.get(5)?,
        git_ref: row.get(6)?,
        message: row.get(7)?,
        author: row.get(8)?,
        avatar: row.get(9)?,
        link: row.get(10)?,
        created: row.get(11)?,
        started: row.get(12)?,
        finished: row.get(13)?,
    })
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    Ok(Job {
        id: row.get(0)?,
        build_id: row.get(1)?,
        number: row.get(2)?,
        status: status_column(row, 3)?,
        exit_code: row.get(4)?,
        environment: environment_column(row, 5)?,
        started: row.get(6)?,
        finished: row.get(7)?,
    })
}

impl SqliteStore {
    fn query_build(&self, filter: &str, args: impl rusqlite::Params, key: String) -> Result<Build> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {BUILD_COLUMNS} FROM builds WHERE {filter}"),
            args,
            build_from_row,
        )
        .optional()?
        .ok_or_else(|| Error::not_found("build", key))
    }

    fn query_job(&self, filter: &str, args: impl rusqlite::Params, key: String) -> Result<Job> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE {filter}"),
            args,
            job_from_row,
        )
        .optional()?
        .ok_or_else(|| Error::not_found("job", key))
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &mut User) -> Result<()> {
        let created = if user.created == 0 { now() } else { user.created };
        let conn = self.conn();
        let result = conn.execute(
            "INSERT INTO users (login, email, avatar, admin, hash, created)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![user.login, user.email, user.avatar, user.admin, user.hash, created],
        );

        match result {
            Ok(_) => {
                user.id = conn.last_insert_rowid();
                user.created = created;
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(Error::Conflict(format!(
                "user '{}' already exists",
                user.login
            ))),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: i64) -> Result<User> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()?
        .ok_or_else(|| Error::not_found("user", id))
    }

    fn get_user_login(&self, login: &str) -> Result<User> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE login = ?1"),
            params![login],
            user_from_row,
        )
        .optional()?
        .ok_or_else(|| Error::not_found("user", login))
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY login"))?;

        let rows = stmt.query_map([], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_users(&self) -> Result<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    fn update_user(&self, user: &User) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET email = ?1, avatar = ?2, admin = ?3 WHERE id = ?4",
            params![user.email, user.avatar, user.admin, user.id],
        )?;
        if rows == 0 {
            return Err(Error::not_found("user", user.id));
        }
        Ok(())
    }

    fn delete_user(&self, id: i64) -> Result<()> {
        let result = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id]);

        match result {
            Ok(0) => Err(Error::not_found("user", id)),
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => Err(Error::Conflict(format!(
                "user {id} still owns repositories"
            ))),
            Err(e) => Err(Error::from(e)),
        }
    }

    // Repo operations

    fn create_repo(&self, repo: &mut Repo, key: &mut Key) -> Result<()> {
        let created = if repo.created == 0 { now() } else { repo.created };

        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let result = tx.execute(
            "INSERT INTO repos (user_id, owner, name, full_name, hash, timeout,
                 allow_push, allow_pull, allow_deploy, allow_tag, is_trusted, created)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                repo.user_id,
                repo.owner,
                repo.name,
                repo.full_name,
                repo.hash,
                repo.timeout,
                repo.allow_push,
                repo.allow_pull,
                repo.allow_deploy,
                repo.allow_tag,
                repo.is_trusted,
                created,
            ],
        );
        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(Error::Conflict(format!(
                    "repository '{}' already exists",
                    repo.full_name
                )));
            }
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(Error::not_found("user", repo.user_id));
            }
            Err(e) => return Err(Error::from(e)),
        }
        let repo_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO keys (repo_id, public, private) VALUES (?1, ?2, ?3)",
            params![repo_id, key.public, key.private],
        )?;

        tx.commit()?;

        repo.id = repo_id;
        repo.created = created;
        key.repo_id = repo_id;
        Ok(())
    }

    fn get_repo(&self, id: i64) -> Result<Repo> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {REPO_COLUMNS} FROM repos WHERE id = ?1"),
            params![id],
            repo_from_row,
        )
        .optional()?
        .ok_or_else(|| Error::not_found("repo", id))
    }

    fn get_repo_name(&self, full_name: &str) -> Result<Repo> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {REPO_COLUMNS} FROM repos WHERE full_name = ?1"),
            params![full_name],
            repo_from_row,
        )
        .optional()?
        .ok_or_else(|| Error::not_found("repo", full_name))
    }

    fn list_repos(&self) -> Result<Vec<Repo>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {REPO_COLUMNS} FROM repos ORDER BY full_name"
        ))?;

        let rows = stmt.query_map([], repo_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_repo(&self, repo: &Repo) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE repos SET user_id = ?1, timeout = ?2, allow_push = ?3, allow_pull = ?4,
                 allow_deploy = ?5, allow_tag = ?6, is_trusted = ?7
             WHERE id = ?8",
            params![
                repo.user_id,
                repo.timeout,
                repo.allow_push,
                repo.allow_pull,
                repo.allow_deploy,
                repo.allow_tag,
                repo.is_trusted,
                repo.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::not_found("repo", repo.id));
        }
        Ok(())
    }

    fn delete_repo(&self, id: i64) -> Result<()> {
        let rows = self
            .conn()
            .execute("DELETE FROM repos WHERE id = ?1", params![id])?;

        if rows == 0 {
            return Err(Error::not_found("repo", id));
        }
        Ok(())
    }

    fn get_key(&self, repo_id: i64) -> Result<Key> {
        let conn = self.conn();
        conn.query_row(
            "SELECT repo_id, public, private FROM keys WHERE repo_id = ?1",
            params![repo_id],
            |row| {
                Ok(Key {
                    repo_id: row.get(0)?,
                    public: row.get(1)?,
                    private: row.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| Error::not_found("key", repo_id))
    }

    // Build operations

    fn create_build(&self, build: &mut Build, jobs: &mut [Job]) -> Result<()> {
        let created = if build.created == 0 { now() } else { build.created };

        let mut conn = self.conn();
        // IMMEDIATE takes the write lock before the max is read, so no other
        // writer (in this process or another) can observe the same maximum.
        let tx = begin_numbering(&mut conn, || {
            format!("build numbering for repo {}", build.repo_id)
        })?;

        let number: i64 = tx.query_row(
            "SELECT COALESCE(MAX(number), 0) + 1 FROM builds WHERE repo_id = ?1",
            params![build.repo_id],
            |row| row.get(0),
        )?;

        let result = tx.execute(
            "INSERT INTO builds (repo_id, number, status, commit_sha, branch, git_ref,
                 message, author, avatar, link, created, started, finished)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                build.repo_id,
                number,
                build.status.as_str(),
                build.commit,
                build.branch,
                build.git_ref,
                build.message,
                build.author,
                build.avatar,
                build.link,
                created,
                build.started,
                build.finished,
            ],
        );
        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(Error::ConstraintViolation(format!(
                    "build number {number} already taken in repo {}",
                    build.repo_id
                )));
            }
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(Error::not_found("repo", build.repo_id));
            }
            Err(e) => return Err(Error::from(e)),
        }
        let build_id = tx.last_insert_rowid();

        let mut assigned = Vec::with_capacity(jobs.len());
        for (position, job) in jobs.iter().enumerate() {
            let job_number = if job.number > 0 {
                job.number
            } else {
                position as i64 + 1
            };
            let environment = serde_json::to_string(&job.environment)?;

            let result = tx.execute(
                "INSERT INTO jobs (build_id, number, status, exit_code, environment, started, finished)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    build_id,
                    job_number,
                    job.status.as_str(),
                    job.exit_code,
                    environment,
                    job.started,
                    job.finished,
                ],
            );
            match result {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    return Err(Error::ConstraintViolation(format!(
                        "duplicate job number {job_number} in build"
                    )));
                }
                Err(e) => return Err(Error::from(e)),
            }
            assigned.push((tx.last_insert_rowid(), job_number));
        }

        tx.commit()?;

        build.id = build_id;
        build.number = number;
        build.created = created;
        for (job, (id, job_number)) in jobs.iter_mut().zip(assigned) {
            job.id = id;
            job.build_id = build_id;
            job.number = job_number;
        }
        Ok(())
    }

    fn update_build(&self, build: &Build) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE builds SET status = ?1, commit_sha = ?2, branch = ?3, git_ref = ?4,
                 message = ?5, author = ?6, avatar = ?7, link = ?8, started = ?9, finished = ?10
             WHERE id = ?11",
            params![
                build.status.as_str(),
                build.commit,
                build.branch,
                build.git_ref,
                build.message,
                build.author,
                build.avatar,
                build.link,
                build.started,
                build.finished,
                build.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::not_found("build", build.id));
        }
        Ok(())
    }

    fn get_build(&self, id: i64) -> Result<Build> {
        self.query_build("id = ?1", params![id], id.to_string())
    }

    fn get_build_number(&self, repo_id: i64, number: i64) -> Result<Build> {
        self.query_build(
            "repo_id = ?1 AND number = ?2",
            params![repo_id, number],
            format!("{repo_id}#{number}"),
        )
    }

    fn get_build_ref(&self, repo_id: i64, git_ref: &str) -> Result<Build> {
        self.query_build(
            "repo_id = ?1 AND git_ref = ?2 ORDER BY number DESC LIMIT 1",
            params![repo_id, git_ref],
            format!("{repo_id}@{git_ref}"),
        )
    }

    fn get_build_commit(&self, repo_id: i64, commit: &str, branch: &str) -> Result<Build> {
        self.query_build(
            "repo_id = ?1 AND commit_sha = ?2 AND branch = ?3 ORDER BY number DESC LIMIT 1",
            params![repo_id, commit, branch],
            format!("{repo_id}@{commit} ({branch})"),
        )
    }

    fn get_last_build(&self, repo_id: i64, branch: &str) -> Result<Build> {
        self.query_build(
            "repo_id = ?1 AND branch = ?2 ORDER BY number DESC LIMIT 1",
            params![repo_id, branch],
            format!("{repo_id} last on {branch}"),
        )
    }

    fn get_last_build_before(&self, repo_id: i64, branch: &str, before_id: i64) -> Result<Build> {
        self.query_build(
            "repo_id = ?1 AND branch = ?2 AND id < ?3 ORDER BY number DESC LIMIT 1",
            params![repo_id, branch, before_id],
            format!("{repo_id} on {branch} before {before_id}"),
        )
    }

    fn list_builds(&self, repo_id: i64) -> Result<Vec<Build>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {BUILD_COLUMNS} FROM builds WHERE repo_id = ?1 ORDER BY number DESC"
        ))?;

        let rows = stmt.query_map(params![repo_id], build_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Job operations

    fn create_job(&self, job: &mut Job) -> Result<()> {
        let environment = serde_json::to_string(&job.environment)?;

        let mut conn = self.conn();
        let tx = begin_numbering(&mut conn, || {
            format!("job numbering for build {}", job.build_id)
        })?;

        let number = if job.number > 0 {
            job.number
        } else {
            tx.query_row(
                "SELECT COALESCE(MAX(number), 0) + 1 FROM jobs WHERE build_id = ?1",
                params![job.build_id],
                |row| row.get(0),
            )?
        };

        let result = tx.execute(
            "INSERT INTO jobs (build_id, number, status, exit_code, environment, started, finished)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                job.build_id,
                number,
                job.status.as_str(),
                job.exit_code,
                environment,
                job.started,
                job.finished,
            ],
        );
        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(Error::ConstraintViolation(format!(
                    "job number {number} already taken in build {}",
                    job.build_id
                )));
            }
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(Error::not_found("build", job.build_id));
            }
            Err(e) => return Err(Error::from(e)),
        }
        let id = tx.last_insert_rowid();

        tx.commit()?;

        job.id = id;
        job.number = number;
        Ok(())
    }

    fn update_job(&self, job: &Job) -> Result<()> {
        let environment = serde_json::to_string(&job.environment)?;
        let rows = self.conn().execute(
            "UPDATE jobs SET status = ?1, exit_code = ?2, environment = ?3, started = ?4, finished = ?5
             WHERE id = ?6",
            params![
                job.status.as_str(),
                job.exit_code,
                environment,
                job.started,
                job.finished,
                job.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::not_found("job", job.id));
        }
        Ok(())
    }

    fn get_job(&self, id: i64) -> Result<Job> {
        self.query_job("id = ?1", params![id], id.to_string())
    }

    fn get_job_number(&self, build_id: i64, number: i64) -> Result<Job> {
        self.query_job(
            "build_id = ?1 AND number = ?2",
            params![build_id, number],
            format!("{build_id}#{number}"),
        )
    }

    fn list_jobs(&self, build_id: i64) -> Result<Vec<Job>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE build_id = ?1 ORDER BY number"
        ))?;

        let rows = stmt.query_map(params![build_id], job_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Log operations

    fn write_log(&self, job_id: i64, reader: &mut dyn Read) -> Result<()> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        let result = self.conn().execute(
            "INSERT INTO logs (job_id, data) VALUES (?1, ?2)
             ON CONFLICT(job_id) DO UPDATE SET data = excluded.data",
            params![job_id, data],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => Err(Error::not_found("job", job_id)),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn read_log(&self, job_id: i64) -> Result<Vec<u8>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT data FROM logs WHERE job_id = ?1",
            params![job_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| Error::not_found("log", job_id))
    }

    fn list_feed(&self, full_names: &[&str]) -> Result<Vec<FeedItem>> {
        if full_names.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; full_names.len()].join(", ");
        let columns = BUILD_COLUMNS
            .split(", ")
            .map(|c| format!("b.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");

        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {columns}, r.full_name
             FROM builds b
             JOIN repos r ON r.id = b.repo_id
             WHERE r.full_name IN ({placeholders})
             ORDER BY b.created DESC, b.id DESC"
        ))?;

        let rows = stmt.query_map(params_from_iter(full_names.iter()), |row| {
            Ok(FeedItem {
                build: build_from_row(row)?,
                full_name: row.get(14)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}
