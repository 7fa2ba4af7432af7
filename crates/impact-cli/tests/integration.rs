#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SEED: &str = r#"
systems:
  - id: sys-a
    name: OrderRouter
    components:
      - id: c-val
        name: Order Validation
        description: Pre-trade order checks
        classNames:
          - oms.OrderValidator
          - oms.LeiLookup
          - oms.LimitCheck
          - oms.ValidationRule
          - oms.RuleRegistry
          - oms.ValidationResult
workflows:
  - id: w1
    name: Cash equities order flow
    workflowType: Equities Cash
    impactedSystems: [OrderRouter]
  - id: w2
    name: FX spot flow
    workflowType: FX Spot
    impactedSystems: [OrderRouter, Ghost]
regulations:
  - id: mifid-ii
    name: MiFID II
"#;

fn impact(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("impact").unwrap();
    cmd.current_dir(dir.path()).env("IMPACT_ROOT", dir.path());
    cmd
}

fn init_project(dir: &TempDir) {
    impact(dir).arg("init").assert().success();
}

fn seeded_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let seed = dir.path().join("seed.yaml");
    std::fs::write(&seed, SEED).unwrap();
    impact(&dir)
        .args(["seed", seed.to_str().unwrap()])
        .assert()
        .success();
    dir
}

fn json_of(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.output().unwrap();
    assert!(
        out.status.success(),
        "{}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).unwrap()
}

fn assess_w1(dir: &TempDir) -> serde_json::Value {
    json_of(impact(dir).args([
        "assess",
        "--workflow",
        "w1",
        "--regulation",
        "mifid-ii",
        "--change",
        "LEI validation for order checks",
        "--json",
    ]))
}

// ---------------------------------------------------------------------------
// impact init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config_and_store() {
    let dir = TempDir::new().unwrap();
    impact(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: .impact/config.yaml"));

    assert!(dir.path().join(".impact").is_dir());
    assert!(dir.path().join(".impact/config.yaml").exists());
    assert!(dir.path().join(".impact/impact.db").exists());
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    impact(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  .impact/config.yaml"));
}

#[test]
fn commands_require_init() {
    let dir = TempDir::new().unwrap();
    impact(&dir)
        .arg("workflows")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

// ---------------------------------------------------------------------------
// impact seed / workflows / analyze
// ---------------------------------------------------------------------------

#[test]
fn seed_reports_counts() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let seed = dir.path().join("seed.yaml");
    std::fs::write(&seed, SEED).unwrap();

    let summary = json_of(impact(&dir).args(["seed", seed.to_str().unwrap(), "--json"]));
    assert_eq!(summary["workflows"], 2);
    assert_eq!(summary["systems"], 1);
    assert_eq!(summary["regulations"], 1);
}

#[test]
fn workflows_lists_and_filters_by_type() {
    let dir = seeded_project();

    let all = json_of(impact(&dir).args(["workflows", "--json"]));
    assert_eq!(all.as_array().unwrap().len(), 2);

    let fx = json_of(impact(&dir).args(["workflows", "--type", "FX Spot", "--json"]));
    let fx = fx.as_array().unwrap();
    assert_eq!(fx.len(), 1);
    assert_eq!(fx[0]["id"], "w2");

    impact(&dir)
        .arg("workflows")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cash equities order flow"));
}

#[test]
fn analyze_reports_unresolved_systems() {
    let dir = seeded_project();
    let analysis = json_of(impact(&dir).args(["analyze", "w2", "--json"]));
    assert_eq!(analysis["workflow"]["id"], "w2");
    assert_eq!(analysis["systems"][0]["name"], "OrderRouter");
    assert_eq!(analysis["unresolvedSystems"][0], "Ghost");
}

// ---------------------------------------------------------------------------
// impact assess / assessment
// ---------------------------------------------------------------------------

#[test]
fn assess_completes_with_local_ticket() {
    let dir = seeded_project();
    let assessment = assess_w1(&dir);

    assert_eq!(assessment["status"], "COMPLETE");
    let systems = assessment["impactedSystems"].as_array().unwrap();
    assert_eq!(systems.len(), 1);
    assert_eq!(systems[0]["systemName"], "OrderRouter");
    let ticket = systems[0]["jiraTicketId"].as_str().unwrap();
    assert!(ticket.starts_with("LOCAL-"), "{ticket}");
    assert!(!assessment["generatedRequirements"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[test]
fn assess_unknown_workflow_fails() {
    let dir = seeded_project();
    impact(&dir)
        .args([
            "assess",
            "--workflow",
            "nope",
            "--regulation",
            "mifid-ii",
            "--change",
            "LEI validation",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));

    let listed = json_of(impact(&dir).args(["assessment", "list", "--json"]));
    assert!(listed.as_array().unwrap().is_empty());
}

#[test]
fn assessment_show_and_list() {
    let dir = seeded_project();
    let created = assess_w1(&dir);
    let id = created["id"].as_str().unwrap();

    let shown = json_of(impact(&dir).args(["assessment", "show", id, "--json"]));
    assert_eq!(shown["id"], id);
    assert_eq!(shown["status"], "COMPLETE");

    let listed = json_of(impact(&dir).args(["assessment", "list", "--workflow", "w1", "--json"]));
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let other = json_of(impact(&dir).args(["assessment", "list", "--workflow", "w2", "--json"]));
    assert!(other.as_array().unwrap().is_empty());

    impact(&dir)
        .args(["assessment", "show", id])
        .assert()
        .success()
        .stdout(predicate::str::contains("COMPLETE"))
        .stdout(predicate::str::contains("OrderRouter"));
}

#[test]
fn retry_of_complete_assessment_is_a_no_op() {
    let dir = seeded_project();
    let created = assess_w1(&dir);
    let id = created["id"].as_str().unwrap();

    let retried = json_of(impact(&dir).args(["assessment", "retry", id, "--json"]));
    assert_eq!(retried["id"], id);
    assert_eq!(
        retried["impactedSystems"][0]["jiraTicketId"],
        created["impactedSystems"][0]["jiraTicketId"]
    );
}

#[test]
fn show_unknown_assessment_fails() {
    let dir = seeded_project();
    impact(&dir)
        .args(["assessment", "show", "missing-id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing-id"));
}

// ---------------------------------------------------------------------------
// impact tickets
// ---------------------------------------------------------------------------

#[test]
fn tickets_pending_empty_after_assessment() {
    let dir = seeded_project();
    assess_w1(&dir);

    let pending = json_of(impact(&dir).args(["tickets", "pending", "--json"]));
    assert!(pending.as_array().unwrap().is_empty());

    impact(&dir)
        .args(["tickets", "drain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created 0 ticket(s)"));
}

// ---------------------------------------------------------------------------
// impact config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_warns_without_jira() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    impact(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[warning] no jira section"));
}

#[test]
fn config_validate_rejects_inverted_thresholds() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let path = dir.path().join(".impact/config.yaml");
    std::fs::write(&path, "analysis:\n  highAbove: 2\n  mediumAbove: 5\n").unwrap();

    impact(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn config_show_json() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let config = json_of(impact(&dir).args(["config", "show", "--json"]));
    assert_eq!(config["server"]["port"], 8080);
}
