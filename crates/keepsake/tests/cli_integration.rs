//! CLI integration tests for the Keepsake command-line interface.
//!
//! Every test points `--config-dir` at a temp dir and runs from another temp
//! dir so no user or project config leaks in.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use chrono::{Duration, Utc};
use keepsake_store::{
    DocumentStore, FindOneAndUpdateOptions, SqliteDocumentStore, Update, UpdateOptions,
    timestamp_value,
};
use predicates::prelude::*;
use tempfile::TempDir;

struct Env {
    config_dir: TempDir,
    work_dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            config_dir: TempDir::new().unwrap(),
            work_dir: TempDir::new().unwrap(),
        }
    }

    fn db(&self) -> PathBuf {
        self.work_dir.path().join("sessions.db")
    }

    fn keepsake(&self) -> Command {
        let mut cmd = Command::cargo_bin("keepsake").unwrap();
        cmd.current_dir(self.work_dir.path())
            .env_remove("KEEPSAKE_DB")
            .env_remove("KEEPSAKE_CONFIG_DIR")
            .arg("--config-dir")
            .arg(self.config_dir.path())
            .arg("--db")
            .arg(self.db());
        cmd
    }

    fn write_config(&self, contents: &str) {
        std::fs::write(self.config_dir.path().join("config.toml"), contents).unwrap();
    }
}

/// Create a session read `reads` times, last read `idle_secs` ago.
fn seed_session(db: &Path, id: &str, idle_secs: i64, lifetime: Option<i64>) {
    let store = SqliteDocumentStore::open(db).unwrap();
    store
        .find_one_and_update(
            id,
            &Update::new()
                .inc("reads", 1)
                .set("data.cart", serde_json::json!({ "items": 2 })),
            FindOneAndUpdateOptions::upsert_returning_after(),
        )
        .unwrap();

    let mut update =
        Update::new().set("last_read_at", timestamp_value(Utc::now() - Duration::seconds(idle_secs)));
    if let Some(lifetime) = lifetime {
        update = update.set("lifetime", lifetime);
    }
    store
        .update_one(id, &update, UpdateOptions::default())
        .unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("keepsake")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("gc"))
        .stdout(predicate::str::contains("collector"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("destroy"))
        .stdout(predicate::str::contains("lifetime"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    Command::cargo_bin("keepsake")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("keepsake"));
}

#[test]
fn test_unknown_subcommand_rejected() {
    Command::cargo_bin("keepsake")
        .unwrap()
        .arg("frobnicate")
        .assert()
        .failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifetime
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_lifetime_for_browser() {
    let env = Env::new();
    env.keepsake()
        .args(["--json", "lifetime", "2", "--user-agent", "Mozilla/5.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"lifetime_secs\": 240"))
        .stdout(predicate::str::contains("\"bot\": false"));
}

#[test]
fn test_lifetime_for_bot() {
    let env = Env::new();
    env.keepsake()
        .args(["lifetime", "50", "--user-agent", "Googlebot/2.1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("30s"))
        .stdout(predicate::str::contains("(bot)"));
}

#[test]
fn test_lifetime_capped() {
    let env = Env::new();
    env.keepsake()
        .args(["--json", "lifetime", "101"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"lifetime_secs\": 2592000"));
}

#[test]
fn test_lifetime_uses_configured_policy() {
    let env = Env::new();
    env.write_config("[lifetime]\nread_factor_secs = 1\nbot_pattern = \"curl\"\n");

    env.keepsake()
        .args(["--json", "lifetime", "3", "--user-agent", "Googlebot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"lifetime_secs\": 27"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Store Commands
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_show_prints_document() {
    let env = Env::new();
    seed_session(&env.db(), "abc", 0, Some(3600));

    env.keepsake()
        .args(["--json", "show", "abc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"_id\": \"abc\""))
        .stdout(predicate::str::contains("\"items\": 2"));
}

#[test]
fn test_show_missing_session_fails() {
    let env = Env::new();
    env.keepsake()
        .args(["show", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_destroy_marks_session() {
    let env = Env::new();
    seed_session(&env.db(), "abc", 0, Some(3600));

    env.keepsake().args(["destroy", "abc"]).assert().success();

    let store = SqliteDocumentStore::open(env.db()).unwrap();
    let doc = store.find_one("abc").unwrap().unwrap();
    assert!(doc.destroyed);
    assert!(doc.destroyed_at.is_some());
}

#[test]
fn test_destroy_missing_session_fails() {
    let env = Env::new();
    env.keepsake().args(["destroy", "ghost"]).assert().failure();
}

#[test]
fn test_gc_deletes_expired_only() {
    let env = Env::new();
    seed_session(&env.db(), "expired", 3600, Some(30));
    seed_session(&env.db(), "live", 0, Some(3600));

    env.keepsake()
        .args(["--json", "gc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"deleted\": 1"));

    let store = SqliteDocumentStore::open(env.db()).unwrap();
    assert!(store.find_one("expired").unwrap().is_none());
    assert!(store.find_one("live").unwrap().is_some());
}

#[test]
fn test_gc_with_zero_retention_removes_destroyed() {
    let env = Env::new();
    seed_session(&env.db(), "abc", 0, Some(3600));
    env.keepsake().args(["destroy", "abc"]).assert().success();

    // Destroyed within the default retention window.
    env.keepsake()
        .args(["--json", "gc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"deleted\": 0"));

    std::thread::sleep(std::time::Duration::from_millis(20));
    env.keepsake()
        .args(["--json", "gc", "--max-lifetime", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"deleted\": 1"));
}

#[test]
fn test_gc_rejects_negative_retention() {
    let env = Env::new();
    env.keepsake()
        .args(["gc", "--max-lifetime=-5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not be negative"));
}

#[test]
fn test_collector_rejects_negative_retention() {
    let env = Env::new();
    env.keepsake()
        .args(["collector", "--max-lifetime=-5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not be negative"));
}

#[test]
fn test_collector_rejects_zero_interval() {
    let env = Env::new();
    env.keepsake()
        .args(["collector", "--interval", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("greater than zero"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_shows_loaded_values() {
    let env = Env::new();
    env.write_config("[gc]\ninterval_secs = 42\n");

    env.keepsake()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("interval_secs = 42"))
        .stdout(predicate::str::contains("(loaded)"));
}

#[test]
fn test_project_config_overrides_user() {
    let env = Env::new();
    env.write_config("[gc]\ninterval_secs = 42\n");
    std::fs::write(env.work_dir.path().join("keepsake.toml"), "[gc]\ninterval_secs = 7\n").unwrap();

    env.keepsake()
        .args(["--json", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"interval_secs\": 7"));
}

#[test]
fn test_invalid_config_rejected() {
    let env = Env::new();
    env.write_config("[gc]\ninterval_secs = 0\n");

    env.keepsake()
        .args(["lifetime", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("gc.interval_secs"));
}
