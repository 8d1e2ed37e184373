//! E2E CLI tests covering the ticket workflow:
//! - `qd init` seeding and onboarding output
//! - `qd create` → `qd vote` → `qd comment add` → `qd list` / `qd show`
//! - role-based visibility of tickets and internal comments
//! - error contract (`{"error": {...}}`, non-zero exit)
//!
//! Each test runs `qd` as a subprocess in an isolated temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

const ADMIN: &str = "admin@quickdesk.com";
const AGENT: &str = "agent@quickdesk.com";
const END_USER: &str = "user@quickdesk.com";

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the `qd` binary, rooted in `dir`, acting as `user`.
fn qd_as(dir: &Path, user: &str) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("qd"));
    cmd.current_dir(dir);
    cmd.env("QUICKDESK_USER", user);
    cmd.env("QUICKDESK_LOG", "error");
    cmd.env("QUICKDESK_AUTH_LATENCY_MS", "0");
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd.env_remove("FORMAT");
    cmd.env_remove("QUICKDESK_TIMING");
    cmd
}

fn qd(dir: &Path) -> Command {
    qd_as(dir, END_USER)
}

fn init_project(dir: &Path) {
    qd(dir).args(["init"]).assert().success();
}

fn json_of(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("qd should not crash");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("--json should produce valid JSON")
}

/// Create a ticket as the end user, return its id.
fn create_ticket(dir: &Path, subject: &str, priority: &str) -> String {
    let json = json_of(qd(dir).args([
        "create",
        "--subject",
        subject,
        "--description",
        "details",
        "--category",
        "Technical Issue",
        "--priority",
        priority,
        "--json",
    ]));
    json["id"].as_str().expect("create output should have 'id'").to_string()
}

fn list_ids(json: &Value) -> Vec<String> {
    json["tickets"]
        .as_array()
        .expect("tickets array")
        .iter()
        .map(|t| t["id"].as_str().expect("id").to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn init_seeds_demo_data() {
    let dir = TempDir::new().expect("tempdir");
    let json = json_of(qd(dir.path()).args(["init", "--json"]));
    assert_eq!(json["ok"], true);
    assert_eq!(json["users"], 3);
    assert_eq!(json["categories"], 4);
    assert_eq!(json["tickets"], 2);
    assert_eq!(json["comments"], 1);

    assert!(dir.path().join(".quickdesk/quickdesk_tickets.json").is_file());
}

#[test]
fn init_twice_without_force_fails() {
    let dir = TempDir::new().expect("tempdir");
    init_project(dir.path());
    qd(dir.path())
        .args(["init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn commands_outside_a_project_report_not_initialized() {
    let dir = TempDir::new().expect("tempdir");
    let output = qd(dir.path()).args(["list", "--json"]).output().expect("run");
    assert!(!output.status.success());
    let err: Value = serde_json::from_slice(&output.stderr).expect("json error");
    assert_eq!(err["error"]["error_code"], "E1001");
}

#[test]
fn create_vote_comment_show_roundtrip() {
    let dir = TempDir::new().expect("tempdir");
    init_project(dir.path());
    let id = create_ticket(dir.path(), "Printer on fire", "urgent");

    // The new ticket comes first in insertion order.
    let all = json_of(qd_as(dir.path(), ADMIN).args(["list", "--sort", "insertion", "--json"]));
    assert_eq!(all["total"], 3);
    assert_eq!(list_ids(&all)[0], id);

    json_of(qd(dir.path()).args(["vote", &id, "up", "--json"]));
    json_of(qd_as(dir.path(), AGENT).args(["vote", &id, "up", "--json"]));
    let switched = json_of(qd_as(dir.path(), AGENT).args(["vote", &id, "down", "--json"]));
    assert_eq!(switched["previous"], "upvote");
    assert_eq!(switched["upvotes"], 1);
    assert_eq!(switched["downvotes"], 1);
    assert_eq!(switched["netVotes"], 0);

    // Repeating a vote changes nothing.
    let repeat = json_of(qd(dir.path()).args(["vote", &id, "up", "--json"]));
    assert_eq!(repeat["upvotes"], 1);

    let comment = json_of(qd(dir.path()).args(["comment", "add", &id, "Smoke visible", "--json"]));
    assert_eq!(comment["ticketId"], id.as_str());
    assert_eq!(comment["userRole"], "end_user");
    assert_eq!(comment["isInternal"], false);

    let shown = json_of(qd(dir.path()).args(["show", &id, "--json"]));
    assert_eq!(shown["subject"], "Printer on fire");
    assert_eq!(shown["priority"], "urgent");
    assert_eq!(shown["categoryName"], "Technical Issue");
    assert_eq!(shown["createdBy"], "3");
    assert_eq!(shown["myVote"], "upvote");
    assert_eq!(shown["comments"].as_array().expect("comments").len(), 1);
    assert_eq!(shown["upvotes"].as_array().expect("upvotes").len(), 1);
}

#[test]
fn end_users_list_only_their_own_tickets() {
    let dir = TempDir::new().expect("tempdir");
    init_project(dir.path());
    let mine = create_ticket(dir.path(), "Mine", "low");

    let other = json_of(qd_as(dir.path(), AGENT).args([
        "create",
        "-s",
        "Agent ticket",
        "-d",
        "internal follow-up",
        "-c",
        "3",
        "--json",
    ]));
    let other_id = other["id"].as_str().expect("id").to_string();

    let seen = list_ids(&json_of(qd(dir.path()).args(["list", "--json"])));
    assert!(seen.contains(&mine));
    assert!(!seen.contains(&other_id));

    let staff_view = list_ids(&json_of(qd_as(dir.path(), AGENT).args(["list", "--json"])));
    assert!(staff_view.contains(&mine));
    assert!(staff_view.contains(&other_id));
}

#[test]
fn list_filters_sort_and_limit() {
    let dir = TempDir::new().expect("tempdir");
    init_project(dir.path());
    create_ticket(dir.path(), "Keyboard sticky", "low");

    let by_priority =
        json_of(qd_as(dir.path(), ADMIN).args(["list", "--sort", "priority", "--json"]));
    let first = &by_priority["tickets"][0];
    assert_eq!(first["priority"], "urgent");

    let searched =
        json_of(qd_as(dir.path(), ADMIN).args(["list", "--search", "KEYBOARD", "--json"]));
    assert_eq!(searched["total"], 1);

    let open = json_of(qd_as(dir.path(), ADMIN).args(["list", "--status", "open", "--json"]));
    assert!(
        open["tickets"]
            .as_array()
            .expect("tickets")
            .iter()
            .all(|t| t["status"] == "open")
    );

    let limited = json_of(qd_as(dir.path(), ADMIN).args(["list", "-n", "1", "--json"]));
    assert_eq!(limited["total"], 3);
    assert_eq!(limited["tickets"].as_array().expect("tickets").len(), 1);

    let queue = json_of(qd_as(dir.path(), AGENT).args(["list", "--assigned-to-me", "--json"]));
    assert_eq!(list_ids(&queue), vec!["2".to_string()]);
}

#[test]
fn internal_comments_are_staff_only() {
    let dir = TempDir::new().expect("tempdir");
    init_project(dir.path());

    json_of(qd_as(dir.path(), AGENT).args([
        "comment", "add", "2", "Known regression", "--internal", "--json",
    ]));

    let staff = json_of(qd_as(dir.path(), ADMIN).args(["comments", "2", "--json"]));
    assert_eq!(staff["comments"].as_array().expect("comments").len(), 2);

    let end_user = json_of(qd(dir.path()).args(["comments", "2", "--json"]));
    let thread = end_user["comments"].as_array().expect("comments");
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0]["isInternal"], false);

    let output = qd(dir.path())
        .args(["comment", "add", "2", "sneaky", "--internal", "--json"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let err: Value = serde_json::from_slice(&output.stderr).expect("json error");
    assert_eq!(err["error"]["error_code"], "permission_denied");
}

#[test]
fn status_changes_and_assignment_need_staff() {
    let dir = TempDir::new().expect("tempdir");
    init_project(dir.path());

    qd(dir.path())
        .args(["update", "1", "--status", "closed"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("change ticket status"));
    qd(dir.path()).args(["assign", "1"]).assert().failure();

    // The creator may still edit their own ticket's other fields.
    let edited = json_of(qd(dir.path()).args(["update", "1", "--priority", "low", "--json"]));
    assert_eq!(edited["priority"], "low");

    let assigned = json_of(qd_as(dir.path(), AGENT).args(["assign", "1", "--json"]));
    assert_eq!(assigned["assignedTo"], "2");

    let resolved = json_of(qd_as(dir.path(), AGENT).args([
        "update", "1", "--status", "resolved", "--json",
    ]));
    assert_eq!(resolved["status"], "resolved");

    let unassigned =
        json_of(qd_as(dir.path(), ADMIN).args(["assign", "1", "--unassign", "--json"]));
    assert!(unassigned.get("assignedTo").is_none());
}

#[test]
fn missing_ticket_reports_e2001() {
    let dir = TempDir::new().expect("tempdir");
    init_project(dir.path());

    for args in [
        vec!["show", "nope", "--json"],
        vec!["vote", "nope", "up", "--json"],
        vec!["comments", "nope", "--json"],
    ] {
        let output = qd(dir.path()).args(&args).output().expect("run");
        assert!(!output.status.success(), "{args:?} should fail");
        let err: Value = serde_json::from_slice(&output.stderr).expect("json error");
        assert_eq!(err["error"]["error_code"], "E2001", "{args:?}");
    }
}

#[test]
fn create_validates_input() {
    let dir = TempDir::new().expect("tempdir");
    init_project(dir.path());

    qd(dir.path())
        .args(["create", "-s", "   ", "-d", "x", "-c", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid subject"));

    let output = qd(dir.path())
        .args(["create", "-s", "ok", "-d", "x", "-c", "Plumbing", "--json"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let err: Value = serde_json::from_slice(&output.stderr).expect("json error");
    assert_eq!(err["error"]["error_code"], "E2002");
}

#[test]
fn text_output_is_tab_separated() {
    let dir = TempDir::new().expect("tempdir");
    init_project(dir.path());

    qd_as(dir.path(), ADMIN)
        .args(["list", "--format", "text", "--sort", "oldest"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("2\tin_progress\turgent\tTechnical Issue\t1\t"));
}
