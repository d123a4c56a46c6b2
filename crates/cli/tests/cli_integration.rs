//! CLI integration tests for all subcommands.
//!
//! Uses `assert_cmd` to spawn the `pagemorph` binary and verify
//! exit codes, stdout content, and stderr content. Fixtures are written
//! into a temporary directory per test.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Helper: create a Command for the `pagemorph` binary, rooted at workspace.
fn pagemorph() -> Command {
    let mut cmd = cargo_bin_cmd!("pagemorph");
    cmd.current_dir(workspace_root());
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

const CUSTOM_MAPPING: &str = r#"{
  "layouts": [
    {
      "name": "NewsArticle",
      "also_applies_to": ["ArticleLinks"],
      "fields": [
        { "source": "Title", "target": "Title" },
        { "source": "Comments", "target": "Description", "functions": "TextCleanup({Comments})" }
      ]
    }
  ]
}"#;

const ITEM: &str = r#"{
  "id": 12,
  "fields": {
    "Title": "Hello",
    "Flag": "yes",
    "Owner": { "key": "contoso\\ann", "display_name": "Ann" }
  }
}"#;

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    pagemorph()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Legacy page to modern page transformation",
        ));
}

#[test]
fn version_exits_0() {
    pagemorph()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pagemorph"));
}

#[test]
fn no_subcommand_exits_2() {
    pagemorph().assert().code(2);
}

// ──────────────────────────────────────────────
// 2. Validate
// ──────────────────────────────────────────────

#[test]
fn validate_default_mapping_exits_0() {
    pagemorph()
        .args(["validate", "crates/core/defaults/default-mapping.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Valid mapping"));
}

#[test]
fn validate_json_output() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "custom.json", CUSTOM_MAPPING);
    let output = pagemorph()
        .args(["--output", "json", "validate"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v["valid"], true);
    assert_eq!(v["layouts"], 1);
}

#[test]
fn validate_schema_violation_exits_1() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "bad.json", r#"{ "layouts": [ { "fields": [] } ] }"#);
    pagemorph()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Schema validation failed"));
}

#[test]
fn validate_missing_file_exits_1() {
    pagemorph()
        .args(["validate", "no/such/mapping.json"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

// ──────────────────────────────────────────────
// 3. Merge and resolve
// ──────────────────────────────────────────────

#[test]
fn merge_overlays_custom_rules() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "custom.json", CUSTOM_MAPPING);
    let output = pagemorph()
        .arg("merge")
        .arg("--custom")
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = v["layouts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"NewsArticle"));
    assert!(names.contains(&"ArticleLeft"));
}

#[test]
fn resolve_alias_to_rule() {
    pagemorph()
        .args(["resolve", "articlelinks"])
        .assert()
        .success()
        .stdout(predicate::str::contains("articlelinks -> ArticleLeft"));
}

#[test]
fn resolve_custom_alias_wins() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "custom.json", CUSTOM_MAPPING);
    pagemorph()
        .args(["resolve", "ArticleLinks", "--mapping"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("ArticleLinks -> NewsArticle"));
}

#[test]
fn resolve_unknown_layout_exits_1() {
    pagemorph()
        .args(["resolve", "NoSuchLayout"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("NoSuchLayout"));
}

// ──────────────────────────────────────────────
// 4. Layout inference
// ──────────────────────────────────────────────

#[test]
fn layout_infers_sections() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "fragments.json",
        r#"[
          { "row": 1, "column": 1, "kind": "image" },
          { "row": 1, "column": 2, "kind": "text" },
          { "row": 2, "column": 1, "kind": "text" }
        ]"#,
    );
    let output = pagemorph()
        .args(["--output", "json", "layout"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let sections = v.as_array().unwrap();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0]["template"]["columns"], "two_column_narrow_left");
    assert_eq!(sections[1]["template"]["columns"], "one_column");
}

#[test]
fn layout_text_output_with_vertical() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "fragments.json",
        r#"[{ "row": 1, "column": 1, "kind": "text" }, { "row": 1, "column": 2, "kind": "text" }]"#,
    );
    pagemorph()
        .arg("layout")
        .arg(&path)
        .arg("--vertical")
        .assert()
        .success()
        .stdout(predicate::str::contains("section 1 (row 1): one_column +vertical"));
}

#[test]
fn layout_four_columns_exits_1() {
    let dir = TempDir::new().unwrap();
    let fragments: Vec<String> = (1..=4)
        .map(|c| format!(r#"{{ "row": 1, "column": {}, "kind": "text" }}"#, c))
        .collect();
    let path = write(&dir, "fragments.json", &format!("[{}]", fragments.join(",")));
    pagemorph()
        .arg("layout")
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("at most 3 columns"));
}

// ──────────────────────────────────────────────
// 5. Expression evaluation
// ──────────────────────────────────────────────

#[test]
fn eval_prefix_round_trip() {
    let dir = TempDir::new().unwrap();
    let item = write(&dir, "item.json", ITEM);
    pagemorph()
        .args(["eval", "{Out} = Prefix('<b>', {Title}, 'false')", "--item"])
        .arg(&item)
        .assert()
        .success()
        .stdout(predicate::str::contains("Out = <b>Hello"));
}

#[test]
fn eval_json_output_for_bool() {
    let dir = TempDir::new().unwrap();
    let item = write(&dir, "item.json", ITEM);
    let output = pagemorph()
        .args(["--output", "json", "eval", "ToBoolean({@Name})", "--field", "Flag", "--item"])
        .arg(&item)
        .output()
        .unwrap();
    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v["output"], "Flag");
    assert_eq!(v["value"], "true");
}

#[test]
fn eval_unknown_function_has_no_value() {
    let dir = TempDir::new().unwrap();
    let item = write(&dir, "item.json", ITEM);
    pagemorph()
        .args(["eval", "Frobnicate({Title})", "--item"])
        .arg(&item)
        .assert()
        .success()
        .stdout(predicate::str::contains("(no value)"));
}

#[test]
fn eval_malformed_expression_exits_1() {
    let dir = TempDir::new().unwrap();
    let item = write(&dir, "item.json", ITEM);
    pagemorph()
        .args(["eval", "Prefix('a', {Title}", "--item"])
        .arg(&item)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("expression error"));
}

// ──────────────────────────────────────────────
// 6. Transform
// ──────────────────────────────────────────────

const RUN_CONFIG: &str = r#"
[run]
mapping = "custom.json"
target_context = "https://contoso/sites/news"

[[fields]]
name = "Title"

[[fields]]
name = "Description"
kind = "note"
"#;

const PAGE: &str = r#"{
  "layout": "ArticleLinks",
  "fragments": [
    { "row": 1, "column": 1, "kind": "text" },
    { "row": 2, "column": 1, "kind": "image" },
    { "row": 2, "column": 2, "kind": "text" }
  ],
  "item": {
    "id": "page-7",
    "fields": { "Title": "Quarterly", "Comments": "  Up   again " }
  }
}"#;

#[test]
fn transform_page_with_config() {
    let dir = TempDir::new().unwrap();
    write(&dir, "custom.json", CUSTOM_MAPPING);
    let config = write(&dir, "run.toml", RUN_CONFIG);
    let page = write(&dir, "page.json", PAGE);

    let output = pagemorph()
        .args(["--output", "json", "transform"])
        .arg(&page)
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v["rule"], "NewsArticle");
    assert_eq!(v["sections"].as_array().unwrap().len(), 2);
    assert_eq!(v["report"]["values"]["Description"], "Up again");
    assert_eq!(v["report"]["state"], "persisted");
}

#[test]
fn transform_text_summary() {
    let dir = TempDir::new().unwrap();
    write(&dir, "custom.json", CUSTOM_MAPPING);
    let config = write(&dir, "run.toml", RUN_CONFIG);
    let page = write(&dir, "page.json", PAGE);
    pagemorph()
        .arg("transform")
        .arg(&page)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Page page-7 (ArticleLinks -> NewsArticle)"))
        .stdout(predicate::str::contains("sections: 2"));
}

#[test]
fn transform_logs_progress_at_debug_level() {
    let dir = TempDir::new().unwrap();
    write(&dir, "custom.json", CUSTOM_MAPPING);
    let config = write(&dir, "run.toml", RUN_CONFIG);
    let page = write(&dir, "page.json", PAGE);
    pagemorph()
        .args(["--log-level", "debug", "transform"])
        .arg(&page)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stderr(predicate::str::contains("loaded run configuration"))
        .stderr(predicate::str::contains("loaded effective mapping"))
        .stderr(predicate::str::contains("page transformed"));
}

#[test]
fn transform_bad_config_exits_1() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "run.toml", "[run]\nunknown_key = true\n");
    let page = write(&dir, "page.json", PAGE);
    pagemorph()
        .arg("transform")
        .arg(&page)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("could not parse"));
}
