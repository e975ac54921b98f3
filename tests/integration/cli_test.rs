use assert_cmd::Command;
use serde_json::{json, Value};
use tempfile::TempDir;

fn sourcelink() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("sourcelink").unwrap()
}

fn init(dir: &TempDir) {
    sourcelink()
        .arg("init")
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains(".sourcelink"));
}

fn write_json(dir: &TempDir, relative: &str, value: &Value) {
    std::fs::write(
        dir.path().join(relative),
        serde_json::to_string_pretty(value).unwrap(),
    )
    .unwrap();
}

fn read_json(dir: &TempDir, relative: &str) -> Value {
    let data = std::fs::read_to_string(dir.path().join(relative)).unwrap();
    serde_json::from_str(&data).unwrap()
}

/// Seed the local tracker with one developer and two open issues.
fn seed_tracker(dir: &TempDir) {
    write_json(
        dir,
        ".sourcelink/users.json",
        &json!([{
            "id": 1,
            "login": "alice",
            "realname": "Alice Adams",
            "email": "alice@example.com",
            "access_level": 55
        }]),
    );
    write_json(
        dir,
        ".sourcelink/issues.json",
        &json!([
            {
                "id": 42,
                "project_id": 1,
                "status": 10,
                "resolution": 10,
                "handler_id": 0,
                "fixed_in_version": "",
                "last_updated": "2026-01-01T00:00:00Z"
            },
            {
                "id": 43,
                "project_id": 1,
                "status": 10,
                "resolution": 10,
                "handler_id": 0,
                "fixed_in_version": "",
                "last_updated": "2026-01-01T00:00:00Z"
            }
        ]),
    );
}

fn seed_repo_with_mapping(dir: &TempDir) {
    sourcelink()
        .args(["repo", "add", "billing", "--type", "git"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("Created repository 'billing' (id 1)"));

    sourcelink()
        .args([
            "mapping", "set", "billing", "main",
            "--strategy", "explicit",
            "--version", "1.2.0",
        ])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("Mapped branch 'main' of 'billing'"));
}

fn write_batch(dir: &TempDir, name: &str, message: &str) {
    write_json(
        dir,
        name,
        &json!([{
            "revision": "abc123",
            "branch": "main",
            "timestamp": "2026-01-02 10:00:00",
            "author": "Alice Adams",
            "author_email": "alice@example.com",
            "message": message,
            "files": [
                { "action": "mod", "path": "src/parser.rs" }
            ]
        }]),
    );
}

#[test]
fn init_creates_data_dir() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    assert!(dir.path().join(".sourcelink").exists());
    assert!(dir.path().join(".sourcelink/repositories.json").exists());
    assert!(dir.path().join(".sourcelink/changesets.json").exists());
}

#[test]
fn init_twice_fails() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    sourcelink()
        .arg("init")
        .current_dir(dir.path())
        .assert()
        .failure();
}

#[test]
fn commands_fail_outside_a_data_store() {
    let dir = TempDir::new().unwrap();
    sourcelink()
        .args(["repo", "list"])
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("not a sourcelink data store"));
}

#[test]
fn repo_add_list_show_rm() {
    let dir = TempDir::new().unwrap();
    init(&dir);

    sourcelink()
        .args(["repo", "add", "billing", "--type", "git", "--url", "https://example.com/billing.git"])
        .current_dir(dir.path())
        .assert()
        .success();

    sourcelink()
        .args(["repo", "list"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("billing"))
        .stdout(predicates::str::contains("git"));

    sourcelink()
        .args(["repo", "show", "billing"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("Repository: billing (id 1)"))
        .stdout(predicates::str::contains("https://example.com/billing.git"));

    sourcelink()
        .args(["repo", "rm", "billing"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("Deleted repository 'billing'"));

    sourcelink()
        .args(["repo", "list"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("No repositories"));
}

#[test]
fn repo_add_rejects_blank_type() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    sourcelink()
        .args(["repo", "add", "billing", "--type", " "])
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("type cannot be empty"));
}

#[test]
fn mapping_set_list_rm() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    seed_repo_with_mapping(&dir);

    sourcelink()
        .args(["mapping", "list", "billing"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("main"))
        .stdout(predicates::str::contains("explicit"))
        .stdout(predicates::str::contains("version=1.2.0"));

    sourcelink()
        .args(["mapping", "rm", "billing", "main"])
        .current_dir(dir.path())
        .assert()
        .success();

    sourcelink()
        .args(["mapping", "list", "billing"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("No mappings"));
}

#[test]
fn mapping_set_rejects_unknown_strategy() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    seed_repo_with_mapping(&dir);
    sourcelink()
        .args(["mapping", "set", "billing", "main", "--strategy", "sideways"])
        .current_dir(dir.path())
        .assert()
        .failure();
}

#[test]
fn user_set_list_rm() {
    let dir = TempDir::new().unwrap();
    init(&dir);

    sourcelink()
        .args(["user", "set", "3", "walter"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("Associated username 'walter' with user 3"));

    sourcelink()
        .args(["user", "list"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("walter"));

    sourcelink()
        .args(["user", "rm", "3"])
        .current_dir(dir.path())
        .assert()
        .success();

    sourcelink()
        .args(["user", "list"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("No username associations"));
}

#[test]
fn parse_separates_references_from_fixes() {
    let dir = TempDir::new().unwrap();
    sourcelink()
        .args(["parse", "Fixes bug 42, see bug 43"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("References: 42, 43"))
        .stdout(predicates::str::contains("Fixes: 42"));

    sourcelink()
        .args(["parse", "refactoring only"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("References: none"))
        .stdout(predicates::str::contains("Fixes: none"));
}

#[test]
fn import_stores_changesets() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    seed_repo_with_mapping(&dir);
    write_batch(&dir, "batch.json", "Fixed #42 in the parser");

    sourcelink()
        .args(["import", "batch.json", "--repo", "billing"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("Imported 1 changesets into 'billing'"));

    let changesets = read_json(&dir, ".sourcelink/changesets.json");
    let rows = changesets.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["revision"], "abc123");
    assert_eq!(rows[0]["files"][0]["action"], "mod");

    sourcelink()
        .args(["repo", "show", "billing"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("Changesets: 1"))
        .stdout(predicates::str::contains("main"));
}

#[test]
fn process_resolves_fixed_issues() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    seed_repo_with_mapping(&dir);
    seed_tracker(&dir);
    write_batch(&dir, "batch.json", "Fixed #42 in the parser, see bug 43");

    sourcelink()
        .args(["process", "batch.json", "--repo", "billing"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("Processed 1 changesets; resolved #42"));

    // the fixed issue moved to resolved/fixed with handler and version set
    let issues = read_json(&dir, ".sourcelink/issues.json");
    let issue42 = issues
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["id"] == 42)
        .unwrap()
        .clone();
    assert_eq!(issue42["status"], 80);
    assert_eq!(issue42["resolution"], 20);
    assert_eq!(issue42["handler_id"], 1);
    assert_eq!(issue42["fixed_in_version"], "1.2.0");

    // the merely-referenced issue is linked but untouched
    let issue43 = issues
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["id"] == 43)
        .unwrap()
        .clone();
    assert_eq!(issue43["status"], 10);

    // both links were audited and a silent note was posted
    let history = read_json(&dir, ".sourcelink/history.json");
    let attached: Vec<i64> = history
        .as_array()
        .unwrap()
        .iter()
        .filter(|h| h["kind"] == "changeset_attached")
        .map(|h| h["issue_id"].as_i64().unwrap())
        .collect();
    assert_eq!(attached, vec![43, 42]);

    let notes = read_json(&dir, ".sourcelink/notes.json");
    let notes = notes.as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["issue_id"], 42);
    assert_eq!(notes[0]["notified"], false);
    assert_eq!(notes[0]["user_id"], 1);

    // the changeset carries both links: the reference first, then the
    // merged fix id
    let changesets = read_json(&dir, ".sourcelink/changesets.json");
    assert_eq!(changesets[0]["issues"], json!([43, 42]));
}

#[test]
fn reprocessing_is_idempotent() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    seed_repo_with_mapping(&dir);
    seed_tracker(&dir);
    write_batch(&dir, "batch.json", "Fixed #42 in the parser");

    for _ in 0..2 {
        sourcelink()
            .args(["process", "batch.json", "--repo", "billing"])
            .current_dir(dir.path())
            .assert()
            .success();
    }

    // one changeset row, one attach audit entry, issue fields stable
    let changesets = read_json(&dir, ".sourcelink/changesets.json");
    assert_eq!(changesets.as_array().unwrap().len(), 1);

    let history = read_json(&dir, ".sourcelink/history.json");
    assert_eq!(history.as_array().unwrap().len(), 1);

    let issues = read_json(&dir, ".sourcelink/issues.json");
    let issue42 = issues
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["id"] == 42)
        .unwrap()
        .clone();
    assert_eq!(issue42["status"], 80);

    // the note posts on both runs; only the second notifies on its own
    let notes = read_json(&dir, ".sourcelink/notes.json");
    let notes = notes.as_array().unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0]["notified"], false);
    assert_eq!(notes[1]["notified"], true);
}

#[test]
fn process_with_config_file() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    seed_repo_with_mapping(&dir);
    seed_tracker(&dir);
    write_batch(&dir, "batch.json", "Fixed #42 in the parser");

    std::fs::write(
        dir.path().join("resolve.toml"),
        "enable_message = false\nfixed_status = 85\n",
    )
    .unwrap();

    sourcelink()
        .args([
            "process", "batch.json",
            "--repo", "billing",
            "--config", "resolve.toml",
        ])
        .current_dir(dir.path())
        .assert()
        .success();

    let issues = read_json(&dir, ".sourcelink/issues.json");
    let issue42 = issues
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["id"] == 42)
        .unwrap()
        .clone();
    assert_eq!(issue42["status"], 85);

    // messaging disabled, so no note was posted
    assert!(!dir.path().join(".sourcelink/notes.json").exists());
}

#[test]
fn process_ignores_unknown_issue_ids() {
    let dir = TempDir::new().unwrap();
    init(&dir);
    seed_repo_with_mapping(&dir);
    seed_tracker(&dir);
    write_batch(&dir, "batch.json", "Fixed #999");

    sourcelink()
        .args(["process", "batch.json", "--repo", "billing"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("no issues resolved"));
}
