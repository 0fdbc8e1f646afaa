//! CLI integration tests for the conveyor operator commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use conveyor::crypto;
use conveyor::store::{SqliteStore, Store};
use conveyor::types::{Build, BuildStatus, Job};
use predicates::prelude::*;
use serde_json::Value;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("conveyor").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd.args(["--data-dir", &self.data_dir_str()]);
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd().args(["init", "--non-interactive"]).assert()
    }

    fn add_user(&self, login: &str, admin: bool) {
        let mut cmd = self.cmd();
        cmd.args(["user", "add", "--login", login, "--non-interactive"]);
        if admin {
            cmd.arg("--admin");
        }
        cmd.assert().success();
    }

    fn add_repo(&self, full_name: &str, login: &str) -> assert_cmd::assert::Assert {
        self.cmd()
            .args(["repo", "add", full_name, "--user", login])
            .assert()
    }

    fn show_repo_json(&self, full_name: &str) -> Value {
        let output = self
            .cmd()
            .args(["repo", "show", full_name, "--json"])
            .output()
            .expect("failed to run command");

        serde_json::from_slice(&output.stdout).expect("failed to parse JSON")
    }

    fn open_store(&self) -> SqliteStore {
        SqliteStore::new(self.data_dir().join("conveyor.db")).expect("open store")
    }
}

fn setup() -> TestContext {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.add_user("octocat", true);
    ctx
}

fn record_build(store: &SqliteStore, full_name: &str, branch: &str, log: &str) -> Build {
    let repo = store.get_repo_name(full_name).expect("repo");
    let mut build = Build {
        repo_id: repo.id,
        status: BuildStatus::Success,
        branch: branch.to_string(),
        commit: "85f8c029b902ed9400bc600bac301a0aadb144ac".to_string(),
        ..Build::default()
    };
    let mut jobs = [Job::default()];
    store.create_build(&mut build, &mut jobs).expect("create build");
    store
        .write_log(jobs[0].id, &mut log.as_bytes())
        .expect("write log");
    build
}

#[test]
fn test_init_creates_database() {
    let ctx = TestContext::new();
    ctx.init()
        .success()
        .stdout(predicate::str::contains("Initialized database"));

    ctx.temp_dir
        .child("conveyor.db")
        .assert(predicate::path::exists());
}

#[test]
fn test_init_twice_fails() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.init()
        .failure()
        .stderr(predicate::str::contains("Already initialized"));
}

#[test]
fn test_commands_require_init() {
    let ctx = TestContext::new();
    ctx.cmd()
        .args(["repo", "show", "octocat/hello-world"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("conveyor init"));
}

#[test]
fn test_user_add_requires_login_non_interactive() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.cmd()
        .args(["user", "add", "--non-interactive"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--login is required"));
}

#[test]
fn test_duplicate_user_rejected() {
    let ctx = setup();
    ctx.cmd()
        .args(["user", "add", "--login", "octocat", "--non-interactive"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_repo_add_and_show() {
    let ctx = setup();
    ctx.add_repo("octocat/hello-world", "octocat")
        .success()
        .stdout(predicate::str::contains("Added repository 'octocat/hello-world'"))
        .stdout(predicate::str::contains("/hook?access_token="));

    let repo = ctx.show_repo_json("octocat/hello-world");
    assert_eq!(repo["full_name"], "octocat/hello-world");
    assert_eq!(repo["timeout"], 60);
    assert_eq!(repo["allow_push"], true);
    assert_eq!(repo["allow_pull"], true);
    assert_eq!(repo["trusted"], false);

    let public_key = repo["public_key"].as_str().expect("public key");
    assert!(public_key.starts_with("ssh-ed25519 "));
    assert!(!public_key.contains("PRIVATE"));
}

#[test]
fn test_repo_add_duplicate_conflicts() {
    let ctx = setup();
    ctx.add_repo("octocat/hello-world", "octocat").success();
    let before = ctx.show_repo_json("octocat/hello-world");

    ctx.add_repo("octocat/hello-world", "octocat")
        .failure()
        .stderr(predicate::str::contains("already exists"));

    let after = ctx.show_repo_json("octocat/hello-world");
    assert_eq!(before["id"], after["id"]);
    assert_eq!(before["public_key"], after["public_key"]);
}

#[test]
fn test_repo_add_unknown_user() {
    let ctx = setup();
    ctx.add_repo("octocat/hello-world", "nobody")
        .failure()
        .stderr(predicate::str::contains("user not found"));
}

#[test]
fn test_repo_add_invalid_name() {
    let ctx = setup();
    ctx.add_repo("hello-world", "octocat")
        .failure()
        .stderr(predicate::str::contains("owner/name"));
}

#[test]
fn test_repo_update_permissions() {
    let ctx = setup();
    ctx.add_user("hubot", false);
    ctx.add_repo("octocat/hello-world", "octocat").success();

    ctx.cmd()
        .args([
            "repo",
            "update",
            "octocat/hello-world",
            "--user",
            "octocat",
            "--trusted",
            "true",
            "--timeout",
            "90",
        ])
        .assert()
        .success();

    let repo = ctx.show_repo_json("octocat/hello-world");
    assert_eq!(repo["trusted"], true);
    assert_eq!(repo["timeout"], 90);

    ctx.cmd()
        .args([
            "repo",
            "update",
            "octocat/hello-world",
            "--user",
            "hubot",
            "--allow-tag",
            "true",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("permission denied"));

    assert_eq!(ctx.show_repo_json("octocat/hello-world")["allow_tag"], false);
}

#[test]
fn test_hook_token_verifies() {
    let ctx = setup();
    ctx.add_repo("octocat/hello-world", "octocat").success();

    let output = ctx
        .cmd()
        .args(["repo", "hook-token", "octocat/hello-world", "--user", "octocat"])
        .output()
        .expect("failed to run command");
    assert!(output.status.success());
    let token = String::from_utf8(output.stdout).expect("utf8");

    let store = ctx.open_store();
    let repo = conveyor::provision::verify_hook_token(&store, token.trim()).expect("verify");
    assert_eq!(repo.full_name, "octocat/hello-world");
}

#[test]
fn test_hook_token_requires_admin() {
    let ctx = setup();
    ctx.add_user("hubot", false);
    ctx.add_repo("hubot/hello-world", "hubot").success();

    ctx.cmd()
        .args(["repo", "hook-token", "hubot/hello-world", "--user", "hubot"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("permission denied"));
}

#[test]
fn test_secret_encrypt() {
    let ctx = setup();
    ctx.add_repo("octocat/hello-world", "octocat").success();

    let file = ctx.temp_dir.child("secrets.yml");
    file.write_str("password: hunter2\n").unwrap();

    let output = ctx
        .cmd()
        .args(["secret", "encrypt", "octocat/hello-world", "--file"])
        .arg(file.path())
        .output()
        .expect("failed to run command");
    assert!(output.status.success());
    let sealed = String::from_utf8(output.stdout).expect("utf8");
    assert!(sealed.starts_with("v1:"));
    assert!(!sealed.contains("hunter2"));

    let store = ctx.open_store();
    let repo = store.get_repo_name("octocat/hello-world").unwrap();
    let key = store.get_key(repo.id).unwrap();
    let opened = crypto::decrypt(sealed.trim(), &key.private).unwrap();
    assert_eq!(opened, b"password: hunter2\n");
}

#[test]
fn test_secret_encrypt_from_stdin_rejects_list() {
    let ctx = setup();
    ctx.add_repo("octocat/hello-world", "octocat").success();

    ctx.cmd()
        .args(["secret", "encrypt", "octocat/hello-world"])
        .write_stdin("- a\n- b\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid format"));
}

#[test]
fn test_build_list_feed_and_log() {
    let ctx = setup();
    ctx.add_repo("octocat/hello-world", "octocat").success();
    ctx.add_repo("octocat/spoon-knife", "octocat").success();

    let store = ctx.open_store();
    record_build(&store, "octocat/hello-world", "master", "echo hi\n");
    record_build(&store, "octocat/hello-world", "dev", "echo allo?\n");
    record_build(&store, "octocat/spoon-knife", "master", "make\n");
    drop(store);

    let output = ctx
        .cmd()
        .args(["build", "list", "octocat/hello-world", "--json"])
        .output()
        .expect("failed to run command");
    let builds: Vec<Value> = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(builds.len(), 2);
    assert_eq!(builds[0]["number"], 2);
    assert_eq!(builds[0]["branch"], "dev");
    assert_eq!(builds[1]["number"], 1);

    let output = ctx
        .cmd()
        .args(["feed", "octocat/hello-world", "octocat/spoon-knife", "--json"])
        .output()
        .expect("failed to run command");
    let feed: Vec<Value> = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(feed.len(), 3);
    assert_eq!(feed[0]["full_name"], "octocat/spoon-knife");

    ctx.cmd()
        .args(["log", "show", "octocat/hello-world", "2"])
        .assert()
        .success()
        .stdout("echo allo?\n");

    ctx.cmd()
        .args(["log", "show", "octocat/hello-world", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("build not found"));
}

#[test]
fn test_repo_remove_requires_yes_non_interactive() {
    let ctx = setup();
    ctx.add_repo("octocat/hello-world", "octocat").success();

    ctx.cmd()
        .args([
            "repo",
            "remove",
            "octocat/hello-world",
            "--user",
            "octocat",
            "--non-interactive",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes is required"));
}

#[test]
fn test_repo_remove_cascades() {
    let ctx = setup();
    ctx.add_repo("octocat/hello-world", "octocat").success();

    let store = ctx.open_store();
    let build = record_build(&store, "octocat/hello-world", "master", "echo hi\n");
    drop(store);

    ctx.cmd()
        .args([
            "repo",
            "remove",
            "octocat/hello-world",
            "--user",
            "octocat",
            "--non-interactive",
            "--yes",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted repository"));

    let store = ctx.open_store();
    assert!(store.get_repo_name("octocat/hello-world").is_err());
    assert!(store.get_build(build.id).is_err());
}

#[test]
fn test_config_file_sets_base_url() {
    let ctx = setup();
    let config = ctx.temp_dir.child("conveyor.toml");
    config
        .write_str("public_base_url = \"https://ci.example.com\"\n")
        .unwrap();

    ctx.cmd()
        .arg("--config")
        .arg(config.path())
        .args(["repo", "add", "octocat/hello-world", "--user", "octocat"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "https://ci.example.com/hook?access_token=",
        ));
}

#[test]
fn test_user_list_json() {
    let ctx = setup();
    ctx.add_user("hubot", false);

    let output = ctx
        .cmd()
        .args(["user", "list", "--json"])
        .output()
        .expect("failed to run command");
    assert!(output.status.success());

    let users: Value = serde_json::from_slice(&output.stdout).expect("failed to parse JSON");
    let users = users.as_array().expect("array");
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["login"], "hubot");
    assert_eq!(users[0]["admin"], false);
    assert_eq!(users[1]["login"], "octocat");
    assert_eq!(users[1]["admin"], true);
    assert!(users[0].get("hash").is_none());

    ctx.cmd()
        .args(["user", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 user(s)"));
}

#[test]
fn test_user_update_grants_admin() {
    let ctx = setup();
    ctx.add_user("hubot", false);

    ctx.cmd()
        .args([
            "user",
            "update",
            "hubot",
            "--user",
            "octocat",
            "--admin",
            "true",
            "--email",
            "hubot@example.com",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated administrator \"hubot\""));

    let user = ctx.open_store().get_user_login("hubot").expect("user");
    assert!(user.admin);
    assert_eq!(user.email, "hubot@example.com");
}

#[test]
fn test_user_cannot_update_or_remove_self() {
    let ctx = setup();

    ctx.cmd()
        .args(["user", "update", "octocat", "--user", "octocat", "--admin", "false"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("permission denied"));

    ctx.cmd()
        .args([
            "user",
            "remove",
            "octocat",
            "--user",
            "octocat",
            "--non-interactive",
            "--yes",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("permission denied"));

    let user = ctx.open_store().get_user_login("octocat").expect("user");
    assert!(user.admin);
}

#[test]
fn test_user_remove() {
    let ctx = setup();
    ctx.add_user("hubot", false);

    ctx.cmd()
        .args(["user", "remove", "hubot", "--user", "octocat", "--non-interactive"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes is required"));

    ctx.cmd()
        .args([
            "user",
            "remove",
            "hubot",
            "--user",
            "octocat",
            "--non-interactive",
            "--yes",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted user 'hubot'"));

    let store = ctx.open_store();
    assert!(store.get_user_login("hubot").is_err());
    assert_eq!(store.count_users().expect("count"), 1);
}

#[test]
fn test_user_remove_owner_of_repos_conflicts() {
    let ctx = setup();
    ctx.add_user("hubot", false);
    ctx.add_repo("hubot/hello-world", "hubot").success();

    ctx.cmd()
        .args([
            "user",
            "remove",
            "hubot",
            "--user",
            "octocat",
            "--non-interactive",
            "--yes",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("still owns repositories"));
}

#[test]
fn test_user_token_verifies() {
    let ctx = setup();
    ctx.add_user("hubot", false);

    let output = ctx
        .cmd()
        .args(["user", "token", "hubot", "--user", "hubot"])
        .output()
        .expect("failed to run command");
    assert!(output.status.success());
    let token = String::from_utf8(output.stdout).expect("utf8");

    let store = ctx.open_store();
    let user = conveyor::users::verify_user_token(&store, token.trim()).expect("verify");
    assert_eq!(user.login, "hubot");

    ctx.cmd()
        .args(["user", "token", "octocat", "--user", "hubot"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("permission denied"));
}
