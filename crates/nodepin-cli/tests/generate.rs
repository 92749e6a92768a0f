//! Integration tests for the `nodepin` binary.
//!
//! Fixtures only use git, local and digest-pinned registry sources so no
//! test touches the network.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::{tempdir, TempDir};

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-q", "-p", "nodepin-cli", "--bin", "nodepin", "--"]);
    cmd
}

/// Run nodepin in `dir` with an isolated cache.
fn run_in(dir: &TempDir, args: &[&str]) -> Output {
    cargo_bin()
        .env("NODEPIN_CACHE_DIR", dir.path().join(".cache"))
        .arg("--cwd")
        .arg(dir.path())
        .args(args)
        .output()
        .expect("Failed to run nodepin")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|_| panic!("stdout should be valid JSON: {stdout}"))
}

fn read_manifest(path: &Path) -> Vec<serde_json::Value> {
    let content = fs::read_to_string(path).unwrap();
    serde_json::from_str(&content).unwrap()
}

const NPM_LOCK: &str = r#"{
  "name": "app",
  "version": "1.0.0",
  "lockfileVersion": 2,
  "packages": {
    "": { "name": "app", "version": "1.0.0" },
    "node_modules/nop": {
      "version": "1.0.0",
      "resolved": "git+ssh://git@github.com/supershabam/nop.git#f110e75f62cfe3bf4468ac3b74e3dc72ab9ae4bf"
    },
    "node_modules/shared": {
      "version": "0.1.0",
      "resolved": "file:../shared"
    },
    "node_modules/lodash": {
      "version": "4.17.21",
      "resolved": "https://registry.npmjs.org/lodash/-/lodash-4.17.21.tgz",
      "integrity": "sha1-Kq5sNclPz7QV2+lfQIuc6R7oRu0="
    },
    "node_modules/jest": {
      "version": "29.0.0",
      "resolved": "https://registry.npmjs.org/jest/-/jest-29.0.0.tgz",
      "integrity": "sha1-Kq5sNclPz7QV2+lfQIuc6R7oRu0=",
      "dev": true
    }
  }
}"#;

const YARN_LOCK: &str = r#"# yarn lockfile v1


left-pad@^1.3.0:
  version "1.3.0"
  resolved "https://registry.yarnpkg.com/left-pad/-/left-pad-1.3.0.tgz#5b8a3a7765dfe001261dde915589e782f8c94d1e"

to-camel-case@github:ianstormtaylor/to-camel-case:
  version "1.0.0"
  resolved "git+https://github.com/ianstormtaylor/to-camel-case.git#00a20429b600ddb6e4f8ff5b17c52914f40fe67d"
"#;

#[test]
fn test_npm_lockfile_writes_manifest() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("package-lock.json"), NPM_LOCK).unwrap();

    let output = run_in(&dir, &["--json", "npm", "package-lock.json"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "nodepin failed: {stderr}");

    let result = stdout_json(&output);
    assert_eq!(result["ok"], true);
    assert_eq!(result["packages"], 4);
    assert_eq!(result["entries"], 3);

    let manifest = read_manifest(&dir.path().join("generated-sources.json"));
    assert_eq!(manifest.len(), 3);

    let git = manifest.iter().find(|e| e["type"] == "git").unwrap();
    assert_eq!(git["url"], "https://git@github.com/supershabam/nop.git");
    assert_eq!(git["commit"], "f110e75f62cfe3bf4468ac3b74e3dc72ab9ae4bf");

    let files: Vec<_> = manifest.iter().filter(|e| e["type"] == "file").collect();
    assert_eq!(files.len(), 2);
    assert!(files
        .iter()
        .all(|e| e["dest"] == "offline-cache/npm/packages" && e["sha1"].is_string()));
}

#[test]
fn test_no_devel_and_custom_output() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("package-lock.json"), NPM_LOCK).unwrap();

    let output = run_in(
        &dir,
        &["npm", "package-lock.json", "--no-devel", "-o", "out/sources.json"],
    );
    assert!(output.status.success());

    let manifest = read_manifest(&dir.path().join("out").join("sources.json"));
    assert_eq!(manifest.len(), 2);
    assert!(manifest
        .iter()
        .all(|e| e["dest-filename"] != "jest-29.0.0.tgz"));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Wrote 2 sources"));
}

#[test]
fn test_yarn_lockfile() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("yarn.lock"), YARN_LOCK).unwrap();

    let output = run_in(&dir, &["yarn", "yarn.lock"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "nodepin failed: {stderr}");

    let manifest = read_manifest(&dir.path().join("generated-sources.json"));
    assert_eq!(manifest.len(), 2);

    let file = manifest.iter().find(|e| e["type"] == "file").unwrap();
    assert_eq!(
        file["url"],
        "https://registry.yarnpkg.com/left-pad/-/left-pad-1.3.0.tgz"
    );
    assert_eq!(file["sha1"], "5b8a3a7765dfe001261dde915589e782f8c94d1e");
    assert_eq!(file["dest"], "offline-cache/yarn/packages");

    let git = manifest.iter().find(|e| e["type"] == "git").unwrap();
    assert_eq!(git["url"], "https://github.com/ianstormtaylor/to-camel-case.git");
}

#[test]
fn test_malformed_git_reference_fails() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("package-lock.json"),
        r#"{"lockfileVersion": 2, "packages": {"node_modules/b": {"version": "1.0.0", "resolved": "git+https://github.com/o/b.git"}}}"#,
    )
    .unwrap();

    let output = run_in(&dir, &["--json", "npm", "package-lock.json"]);
    assert!(!output.status.success());

    let result = stdout_json(&output);
    assert_eq!(result["ok"], false);
    assert_eq!(result["error"]["code"], "MALFORMED_GIT_REFERENCE");
    assert!(!dir.path().join("generated-sources.json").exists());
}

#[test]
fn test_missing_lockfile() {
    let dir = tempdir().unwrap();

    let output = run_in(&dir, &["--json", "npm", "package-lock.json"]);
    assert!(!output.status.success());
    assert_eq!(stdout_json(&output)["error"]["code"], "LOCKFILE_NOT_FOUND");
}

#[test]
fn test_rcfile_target_without_runtime_skips_headers() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("package-lock.json"), NPM_LOCK).unwrap();
    fs::write(dir.path().join(".npmrc"), "target=18.0.0\n").unwrap();

    let output = run_in(&dir, &["--json", "npm", "package-lock.json"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "nodepin failed: {stderr}");
    assert!(stderr.contains("MISSING_CONFIG_KEY"), "stderr: {stderr}");

    assert_eq!(stdout_json(&output)["ok"], true);
    let manifest = read_manifest(&dir.path().join("generated-sources.json"));
    assert_eq!(manifest.len(), 3);
    assert!(manifest
        .iter()
        .all(|e| e["type"] != "archive" && e["type"] != "inline"));
}

#[test]
fn test_unknown_dialect_rejected() {
    let dir = tempdir().unwrap();
    let output = run_in(&dir, &["pnpm", "pnpm-lock.yaml"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("pnpm"), "stderr: {stderr}");
}

#[test]
fn test_zero_parallel_rejected() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("package-lock.json"), NPM_LOCK).unwrap();

    let output = run_in(
        &dir,
        &["--json", "npm", "package-lock.json", "--max-parallel", "0"],
    );
    assert!(!output.status.success());
    assert_eq!(stdout_json(&output)["error"]["code"], "INVALID_CONFIG");
}
