#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn docsweep(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("docsweep").unwrap();
    cmd.current_dir(dir.path())
        .env("DOCSWEEP_ROOT", dir.path())
        .env_remove("DOCSWEEP_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn write(dir: &TempDir, rel: &str, body: &str) {
    let path = dir.path().join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

fn git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(["-c", "commit.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

const SHARED: &str = "Releases are cut from the main branch every second Tuesday after the \
                      integration suite passes and the changelog has been reviewed by two maintainers.";

/// README -> docs/guide.md -> docs/api.md, a broken link, a duplicate
/// paragraph and one unreachable page. The orphaned copy is written first so
/// the guide is also the most recently modified.
fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(&dir, "docs/old-notes.md", &format!("# Notes\n\n{SHARED}\n"));
    write(
        &dir,
        "README.md",
        "# Project\n\nStart with the [guide](docs/guide.md).\n\nSee also [setup](docs/setup.md).\n",
    );
    write(
        &dir,
        "docs/guide.md",
        &format!("# Guide\n\n## Releases\n\n{SHARED}\n\nAPI details live in [the API](api.md#endpoints).\n"),
    );
    write(&dir, "docs/api.md", "# API\n\n## Endpoints\n\nGET /health\n");
    dir
}

// ---------------------------------------------------------------------------
// init / config
// ---------------------------------------------------------------------------

#[test]
fn init_writes_default_config_once() {
    let dir = TempDir::new().unwrap();
    docsweep(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created"));
    assert!(dir.path().join(".docsweep.yaml").exists());

    std::fs::write(dir.path().join(".docsweep.yaml"), "roots: [index.md]\n").unwrap();
    docsweep(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists"));
    let content = std::fs::read_to_string(dir.path().join(".docsweep.yaml")).unwrap();
    assert_eq!(content, "roots: [index.md]\n");
}

#[test]
fn config_show_merges_defaults() {
    let dir = TempDir::new().unwrap();
    write(&dir, ".docsweep.yaml", "duplicates:\n  threshold: 0.9\n");
    docsweep(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("threshold: 0.9"))
        .stdout(predicate::str::contains("shingle_size: 5"));
}

#[test]
fn config_validate_rejects_bad_banding() {
    let dir = TempDir::new().unwrap();
    write(&dir, "README.md", "# Hi\n");
    write(&dir, ".docsweep.yaml", "duplicates:\n  num_hashes: 100\n  bands: 7\n");
    docsweep(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn config_validate_clean() {
    let dir = TempDir::new().unwrap();
    write(&dir, "README.md", "# Hi\n");
    docsweep(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn explicit_missing_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    docsweep(&dir)
        .args(["--config", "nope.yaml", "scan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

// ---------------------------------------------------------------------------
// scan / links / dupes / orphans / stale
// ---------------------------------------------------------------------------

#[test]
fn scan_counts_documents() {
    let dir = fixture();
    docsweep(&dir)
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("4 documents"))
        .stdout(predicate::str::contains("full"));
}

#[test]
fn scan_json_lists_documents() {
    let dir = fixture();
    let out = docsweep(&dir).args(["scan", "--json"]).output().unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["mode"]["kind"], "full");
    assert_eq!(value["documents"].as_array().unwrap().len(), 4);
}

#[test]
fn links_reports_file_and_line() {
    let dir = fixture();
    docsweep(&dir)
        .arg("links")
        .assert()
        .success()
        .stdout(predicate::str::contains("README.md:5"))
        .stdout(predicate::str::contains("missing file"))
        .stdout(predicate::str::contains("1 broken"));
}

#[test]
fn links_json_has_broken_entries() {
    let dir = fixture();
    let out = docsweep(&dir).args(["links", "-j"]).output().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let broken = value["broken"].as_array().unwrap();
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0]["source"], "README.md");
    assert_eq!(broken[0]["line"], 5);
    assert_eq!(broken[0]["kind"], "missing_file");
}

#[test]
fn dupes_suggests_authoritative_source() {
    let dir = fixture();
    let out = docsweep(&dir).args(["dupes", "--json"]).output().unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let clusters = value["clusters"].as_array().unwrap();
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0]["authoritative"], "docs/guide.md");
}

#[test]
fn dupes_threshold_out_of_range() {
    let dir = fixture();
    docsweep(&dir)
        .args(["dupes", "--threshold", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--threshold"));
}

#[test]
fn orphans_lists_unreachable_pages() {
    let dir = fixture();
    docsweep(&dir)
        .arg("orphans")
        .assert()
        .success()
        .stdout(predicate::str::contains("docs/old-notes.md"))
        .stdout(predicate::str::contains("roots: README.md"));
}

#[test]
fn stale_without_sources_reports_none() {
    let dir = fixture();
    docsweep(&dir)
        .arg("stale")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 stale"));
}

#[test]
fn since_and_days_conflict() {
    let dir = fixture();
    docsweep(&dir)
        .args(["links", "--since", "v1", "--days", "3"])
        .assert()
        .failure();
}

#[test]
fn incremental_scan_outside_git_fails() {
    if which::which("git").is_err() {
        return;
    }
    let dir = fixture();
    docsweep(&dir)
        .args(["scan", "--days", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a git repository"));
}

#[test]
fn incremental_links_limited_to_changed_documents() {
    if which::which("git").is_err() {
        return;
    }
    let dir = fixture();
    git(dir.path(), &["init", "-q"]);
    git(dir.path(), &["add", "-A"]);
    git(dir.path(), &["commit", "-q", "-m", "docs"]);
    git(dir.path(), &["tag", "v1"]);

    write(&dir, "docs/api.md", "# API\n\n## Endpoints\n\n[broken](nowhere.md)\n");

    let out = docsweep(&dir).args(["links", "--since", "v1", "--json"]).output().unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let broken = value["broken"].as_array().unwrap();
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0]["source"], "docs/api.md");

    docsweep(&dir)
        .args(["scan", "--since", "v1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("docs/api.md"));

    docsweep(&dir)
        .args(["links", "--since", "no-such-tag"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown git reference"));
}

// ---------------------------------------------------------------------------
// plan / prune / check
// ---------------------------------------------------------------------------

#[test]
fn plan_writes_markdown_file() {
    let dir = fixture();
    docsweep(&dir)
        .args(["plan", "--output", "PLAN.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote"));
    let plan = std::fs::read_to_string(dir.path().join("PLAN.md")).unwrap();
    assert!(plan.contains("## Fix broken links (1)"));
    assert!(plan.contains("## Consolidate duplicates (1)"));
    assert!(plan.contains("## Prune orphaned documents (1)"));
    assert!(plan.contains("`README.md:5`"));
}

#[test]
fn plan_json_orders_actions() {
    let dir = fixture();
    let out = docsweep(&dir).args(["plan", "--json"]).output().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let kinds: Vec<&str> = value["actions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["fix_link", "consolidate", "prune"]);
}

#[test]
fn prune_is_dry_run_by_default() {
    let dir = fixture();
    docsweep(&dir)
        .arg("prune")
        .assert()
        .success()
        .stdout(predicate::str::contains("would remove"))
        .stdout(predicate::str::contains("docs/old-notes.md"));
    assert!(dir.path().join("docs/old-notes.md").exists());
}

#[test]
fn prune_apply_deletes_orphans_only() {
    let dir = fixture();
    write(&dir, "CHANGELOG.md", "# Changes\n");
    docsweep(&dir).args(["prune", "--apply"]).assert().success();
    assert!(!dir.path().join("docs/old-notes.md").exists());
    assert!(dir.path().join("CHANGELOG.md").exists());
    assert!(dir.path().join("README.md").exists());
    assert!(dir.path().join("docs/api.md").exists());
}

#[test]
fn check_fails_on_high_severity() {
    let dir = fixture();
    docsweep(&dir)
        .arg("check")
        .assert()
        .failure()
        .stdout(predicate::str::contains("high"))
        .stderr(predicate::str::contains("check failed"));
}

#[test]
fn check_passes_after_fix_at_high() {
    let dir = fixture();
    write(&dir, "docs/setup.md", "# Setup\n");
    docsweep(&dir)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("check passed"));
    docsweep(&dir).args(["check", "--fail-on", "medium"]).assert().failure();
}

#[test]
fn check_rejects_unknown_severity() {
    let dir = fixture();
    docsweep(&dir)
        .args(["check", "--fail-on", "urgent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown severity"));
}

#[test]
fn check_empty_repository_passes() {
    let dir = TempDir::new().unwrap();
    docsweep(&dir)
        .args(["check", "--fail-on", "low"])
        .assert()
        .success();
}
