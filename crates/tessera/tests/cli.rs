use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn write(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).expect("Failed to write manifest");
}

#[test]
fn test_list_command() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write(dir.path(), "b-module.json", "1");
    write(dir.path(), "a.toml", "x = 1\n");
    write(dir.path(), "README.md", "not a manifest");

    let mut cmd = Command::cargo_bin("tessera")?;
    cmd.arg("list").arg(dir.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::diff("a\nbModule\n"));

    Ok(())
}

#[test]
fn test_plan_command() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write(dir.path(), "web.json", r#"{ "value": "web", "dependencies": ["db"] }"#);
    write(dir.path(), "db.json", r#"{ "url": "postgres://localhost" }"#);

    let mut cmd = Command::cargo_bin("tessera")?;
    cmd.arg("plan").arg(dir.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::diff("0 db\n1 web\n"));

    Ok(())
}

#[test]
fn test_run_command_prints_values() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write(dir.path(), "defaults.json", r#"{ "port": 80 }"#);
    write(dir.path(), "overrides.yaml", "port: 8080\n");
    write(
        dir.path(),
        "server.json",
        r#"{ "kind": "merge", "dependencies": ["defaults", "overrides"] }"#,
    );

    let mut cmd = Command::cargo_bin("tessera")?;
    cmd.arg("run").arg(dir.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("defaults = {\"port\":80}"))
        .stdout(predicate::str::contains("server = {\"port\":8080}"));

    Ok(())
}

#[test]
fn test_run_with_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let modules = dir.path().join("modules");
    std::fs::create_dir(&modules)?;
    write(&modules, "answer.json", "42");
    let config = dir.path().join("loader.toml");
    std::fs::write(&config, "stop_strategy = \"tiered\"\n")?;

    let mut cmd = Command::cargo_bin("tessera")?;
    cmd.arg("run").arg(&modules).arg("--config").arg(&config);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("answer = 42"));

    Ok(())
}

#[test]
fn test_cycle_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write(dir.path(), "root.json", "true");
    write(dir.path(), "a.json", r#"{ "value": 1, "dependencies": ["root", "b"] }"#);
    write(dir.path(), "b.json", r#"{ "value": 2, "dependencies": "a" }"#);

    let mut cmd = Command::cargo_bin("tessera")?;
    cmd.arg("plan").arg(dir.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Circular dependencies detected"));

    let mut cmd = Command::cargo_bin("tessera")?;
    cmd.arg("run").arg(dir.path());
    cmd.assert().failure();

    Ok(())
}

#[test]
fn test_missing_path_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    let mut cmd = Command::cargo_bin("tessera")?;
    cmd.arg("list").arg(dir.path().join("absent.json"));
    cmd.assert().failure().stderr(predicate::str::contains("Error:"));

    Ok(())
}

#[test]
fn test_subcommand_required() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("tessera")?;
    cmd.assert().failure();
    Ok(())
}
