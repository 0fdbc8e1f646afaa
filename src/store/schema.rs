pub const SCHEMA: &str = r#"
-- Accounts that own repositories
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    login TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL DEFAULT '',
    avatar TEXT NOT NULL DEFAULT '',
    admin INTEGER NOT NULL DEFAULT 0,
    hash TEXT NOT NULL,                -- signing secret for user tokens
    created INTEGER NOT NULL
);

-- Provisioned repositories
CREATE TABLE IF NOT EXISTS repos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    owner TEXT NOT NULL,
    name TEXT NOT NULL,
    full_name TEXT NOT NULL UNIQUE,
    hash TEXT NOT NULL,                -- hook token signing secret
    timeout INTEGER NOT NULL DEFAULT 60,
    allow_push INTEGER NOT NULL DEFAULT 0,
    allow_pull INTEGER NOT NULL DEFAULT 0,
    allow_deploy INTEGER NOT NULL DEFAULT 0,
    allow_tag INTEGER NOT NULL DEFAULT 0,
    is_trusted INTEGER NOT NULL DEFAULT 0,
    created INTEGER NOT NULL
);

-- Deploy key pair, exactly one per repository
CREATE TABLE IF NOT EXISTS keys (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    repo_id INTEGER NOT NULL UNIQUE REFERENCES repos(id) ON DELETE CASCADE,
    public TEXT NOT NULL,
    private TEXT NOT NULL
);

-- Builds, numbered per repository
CREATE TABLE IF NOT EXISTS builds (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    repo_id INTEGER NOT NULL REFERENCES repos(id) ON DELETE CASCADE,
    number INTEGER NOT NULL CHECK (number > 0),
    status TEXT NOT NULL,
    commit_sha TEXT NOT NULL DEFAULT '',
    branch TEXT NOT NULL DEFAULT '',
    git_ref TEXT NOT NULL DEFAULT '',
    message TEXT NOT NULL DEFAULT '',
    author TEXT NOT NULL DEFAULT '',
    avatar TEXT NOT NULL DEFAULT '',
    link TEXT NOT NULL DEFAULT '',
    created INTEGER NOT NULL,
    started INTEGER NOT NULL DEFAULT 0,
    finished INTEGER NOT NULL DEFAULT 0,

    UNIQUE(repo_id, number)
);

-- Jobs, numbered per build
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    build_id INTEGER NOT NULL REFERENCES builds(id) ON DELETE CASCADE,
    number INTEGER NOT NULL CHECK (number > 0),
    status TEXT NOT NULL,
    exit_code INTEGER NOT NULL DEFAULT 0,
    environment TEXT NOT NULL DEFAULT '{}',  -- JSON object
    started INTEGER NOT NULL DEFAULT 0,
    finished INTEGER NOT NULL DEFAULT 0,

    UNIQUE(build_id, number)
);

-- Latest full log output per job; each write replaces the previous blob
CREATE TABLE IF NOT EXISTS logs (
    job_id INTEGER PRIMARY KEY REFERENCES jobs(id) ON DELETE CASCADE,
    data BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_repos_user ON repos(user_id);
CREATE INDEX IF NOT EXISTS idx_builds_repo_branch ON builds(repo_id, branch);
CREATE INDEX IF NOT EXISTS idx_builds_repo_ref ON builds(repo_id, git_ref);
CREATE INDEX IF NOT EXISTS idx_builds_repo_commit ON builds(repo_id, commit_sha);
CREATE INDEX IF NOT EXISTS idx_builds_created ON builds(created);
CREATE INDEX IF NOT EXISTS idx_jobs_build ON jobs(build_id);
"#;
