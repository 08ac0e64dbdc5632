#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use relalg::Relation;
use serde_json::Value;
use tempfile::TempDir;

fn setup_data() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let data = dir.path().join("data");
    fs::create_dir(&data).expect("data dir");
    fs::write(
        data.join("people.csv"),
        "id,name,age\n1,alice,30\n2,bob,25\n3,carol,41\n",
    )
    .expect("people");
    fs::write(
        data.join("skills.csv"),
        "id,skill\n1,C\n1,Rust\n2,C\n3,Python\n",
    )
    .expect("skills");
    fs::write(data.join("dates.csv"), "date\n2020-01-01\n2021-06-15\n").expect("dates");
    (dir, data)
}

/// Binary with no user configuration and logging left at its default.
fn relalg(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("relalg");
    cmd.env("RELALG_CONFIG", dir.join("absent.toml"))
        .env_remove("RELALG_LOG");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).expect("utf8 stdout")
}

#[test]
fn eval_prints_csv() {
    let (dir, data) = setup_data();
    let stdout = stdout_of(
        relalg(dir.path())
            .arg("--data-dir")
            .arg(&data)
            .args(["eval", "--format", "csv", "π name (σ age > 26 (people))"]),
    );
    assert_eq!(stdout, "name\nalice\ncarol\n");
}

#[test]
fn eval_prints_json_for_loaded_files() {
    let (dir, data) = setup_data();
    let binding = format!("staff={}", data.join("people.csv").display());
    let output = relalg(dir.path())
        .args(["--load", &binding, "eval", "--format", "json", "σ id == 2 (staff)"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["header"], serde_json::json!(["id", "name", "age"]));
    assert_eq!(json["content"], serde_json::json!([["2", "bob", "25"]]));
}

#[test]
fn eval_prints_a_table_by_default() {
    let (dir, data) = setup_data();
    let stdout = stdout_of(
        relalg(dir.path())
            .arg("--data-dir")
            .arg(&data)
            .args(["eval", "--optimize", "π name (σ skill == 'C' (people ⋈ skills))"]),
    );
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, ["name", "-----", "alice", "bob"]);
}

#[test]
fn eval_saves_results() {
    let (dir, data) = setup_data();
    let target = dir.path().join("out.json");
    relalg(dir.path())
        .arg("--data-dir")
        .arg(&data)
        .args(["eval", "people ⋈ skills", "--output"])
        .arg(&target)
        .assert()
        .success();
    let saved = Relation::load(&target).expect("saved relation");
    assert_eq!(saved.len(), 4);
    assert_eq!(saved.header().attributes(), ["id", "name", "age", "skill"]);
}

#[test]
fn optimize_prints_the_rewritten_query() {
    let (dir, data) = setup_data();
    let query = "σ skill=='C' (people ⋈ skills)";
    let full = stdout_of(
        relalg(dir.path())
            .arg("--data-dir")
            .arg(&data)
            .args(["optimize", query]),
    );
    assert_eq!(full.trim_end(), "people⋈σ skill=='C' (skills)");

    let general = stdout_of(
        relalg(dir.path())
            .arg("--data-dir")
            .arg(&data)
            .args(["optimize", "--general-only", query]),
    );
    assert_eq!(general.trim_end(), "σ skill=='C' (people⋈skills)");
}

#[test]
fn optimize_trace_lists_each_rule() {
    let (dir, data) = setup_data();
    let stdout = stdout_of(relalg(dir.path()).arg("--data-dir").arg(&data).args([
        "optimize",
        "--trace",
        "π name (π name,age (σ age > 20 (σ age < 34 (people))))",
    ]));
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3, "{stdout}");
    assert!(lines[0].starts_with("duplicated_select (1): "));
    assert!(lines[1].starts_with("duplicated_projection (1): "));
    assert_eq!(lines[2], "π name (σ age < 34 and age > 20 (people))");
}

#[test]
fn split_prints_named_steps() {
    let (dir, _data) = setup_data();
    let stdout = stdout_of(relalg(dir.path()).args([
        "split",
        "--no-optimize",
        "σ id > 1 (a ⋈ b) ∪ π id (a ⋈ b)",
    ]));
    assert_eq!(
        stdout,
        "optm_a = a⋈b\n\
         optm_b = σ id > 1 (optm_a)\n\
         optm_c = π id (optm_a)\n\
         optm_d = optm_b∪optm_c\n"
    );
}

#[test]
fn program_files_are_optimized_and_split() {
    let (dir, data) = setup_data();
    let program = dir.path().join("query.ra");
    fs::write(
        &program,
        "ppl_skills = people ⋈ skills\n\
         \n\
         ppl_skills1 = ppl_skills ∪ (people ⋈ skills)\n\
         ppl_skills ∩ ppl_skills1 ⋈ dates\n",
    )
    .expect("program");
    let stdout = stdout_of(
        relalg(dir.path())
            .arg("--data-dir")
            .arg(&data)
            .arg("program")
            .arg(&program),
    );
    assert_eq!(stdout, "optm_a = people⋈skills\noptm_b = optm_a⋈dates\n");
}

#[test]
fn explain_shows_the_plan() {
    let (dir, _data) = setup_data();
    let stdout = stdout_of(relalg(dir.path()).args(["explain", "π name (σ age > 26 (people))"]));
    assert_eq!(
        stdout,
        "Projection [attributes=name]\n\
         \x20 Selection [predicate=age > 26]\n\
         \x20   Scan [relation=people]\n"
    );
}

#[test]
fn config_file_drives_the_defaults() {
    let (dir, data) = setup_data();
    let config = dir.path().join("config.toml");
    fs::write(
        &config,
        format!(
            "[optimizer]\nspecific = false\n\n[data]\ndir = {:?}\n",
            data.display().to_string()
        ),
    )
    .expect("config");
    let stdout = stdout_of(
        cargo_bin_cmd!("relalg")
            .env_remove("RELALG_LOG")
            .arg("--config")
            .arg(&config)
            .args(["optimize", "σ skill=='C' (people ⋈ skills)"]),
    );
    assert_eq!(stdout.trim_end(), "σ skill=='C' (people⋈skills)");
}

#[test]
fn completions_are_generated() {
    let (dir, _data) = setup_data();
    let stdout = stdout_of(relalg(dir.path()).args(["completions", "bash"]));
    assert!(stdout.contains("relalg"));
    assert!(stdout.contains("optimize"));
}

#[test]
fn failures_exit_nonzero_with_a_message() {
    let (dir, data) = setup_data();
    let output = relalg(dir.path())
        .arg("--data-dir")
        .arg(&data)
        .args(["eval", "ghosts ∪ people"])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf8 stderr");
    assert!(stderr.starts_with("error: name error"), "{stderr}");

    relalg(dir.path())
        .args(["eval", "(people"])
        .assert()
        .failure();
    relalg(dir.path())
        .args(["--load", "no-equals-sign", "eval", "people"])
        .assert()
        .failure();
    relalg(dir.path())
        .args(["optimize", "--general-only", "--specific-only", "people"])
        .assert()
        .failure();
}
