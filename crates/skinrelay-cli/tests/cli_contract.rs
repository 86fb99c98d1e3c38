#![allow(deprecated)] // cargo_bin is deprecated but still supported by assert_cmd
//! Exit code and output contract for the `skinrelay` binary.
//! Every scenario here runs offline: uploads and configured defaults never
//! reach the upstream services.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use skinrelay_common::{SkinVariant, TexturesPayload};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};
use uuid::Uuid;

const NOTCH: &str = "069a79f4-44e9-4726-a5be-fca90e38aaf5";
const SIGNATURE: &str = "c2lnbmF0dXJl";

fn textures(texture: &str, variant: SkinVariant) -> String {
    TexturesPayload::for_skin(
        Uuid::nil(),
        "uploader",
        format!("http://textures.minecraft.net/texture/{}", texture),
        variant,
        1_700_000_000_000,
    )
    .encode()
}

/// A working directory holding a config that keeps records under `skins/`.
///
/// Signatures are only checked for shape: the fixtures are not signed.
fn workspace(extra: &str) -> TempDir {
    workspace_with(&format!("upstream:\n  signature_verification: structural\n{}", extra))
}

fn workspace_with(extra: &str) -> TempDir {
    let dir = tempdir().expect("tempdir");
    let store = dir.path().join("skins");
    let config = format!(
        "storage:\n  backend: file\n  path: \"{}\"\n{}",
        store.display(),
        extra
    );
    fs::write(dir.path().join("skinrelay.yaml"), config).expect("write config");
    dir
}

fn skinrelay(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("skinrelay").expect("skinrelay binary");
    cmd.current_dir(cwd)
        .env("RUST_LOG", "warn")
        .env_remove("SKINRELAY_STORAGE")
        .env_remove("SKINRELAY_STORAGE_PATH");
    cmd
}

fn json_stdout(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn test_help_lists_commands() {
    let dir = tempdir().unwrap();
    skinrelay(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("detect"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_upload_then_show_list_resolve_purge() {
    let dir = workspace("");
    let value = textures("abc123", SkinVariant::Slim);

    let output = skinrelay(dir.path())
        .args(["set", NOTCH, "Notch", "--upload", value.as_str(), "--signature", SIGNATURE, "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let set = json_stdout(&output);
    assert_eq!(set["source"], "custom_upload");
    assert_eq!(set["intent"]["kind"], "upload");
    assert_eq!(set["persisted"], true);

    let output = skinrelay(dir.path())
        .args(["show", NOTCH, "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
    let shown = json_stdout(&output);
    assert_eq!(shown["name"], "Notch");
    assert_eq!(shown["variant"], "slim");
    assert!(shown["expires_at"].is_null(), "uploads never expire");
    assert_eq!(shown["hash"], set["hash"]);

    skinrelay(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Notch"))
        .stdout(predicate::str::contains("custom_upload"));

    // a fresh process finds the choice in storage, not upstream
    let output = skinrelay(dir.path())
        .args(["resolve", NOTCH, "Notch", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let resolved = json_stdout(&output);
    assert_eq!(resolved["origin"], "storage");
    assert_eq!(resolved["hash"], set["hash"]);

    skinrelay(dir.path())
        .args(["purge", NOTCH])
        .assert()
        .success()
        .stdout(predicate::str::contains("purged"));

    skinrelay(dir.path())
        .args(["show", NOTCH])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("no skin stored"));
}

#[test]
fn test_explicit_config_flag_is_used() {
    let dir = workspace("");
    let elsewhere = tempdir().unwrap();
    let value = textures("def456", SkinVariant::Classic);

    skinrelay(elsewhere.path())
        .arg("--config")
        .arg(dir.path().join("skinrelay.yaml"))
        .args(["set", NOTCH, "Notch", "--upload", value.as_str(), "--signature", SIGNATURE])
        .assert()
        .success();

    assert!(dir.path().join("skins").read_dir().unwrap().next().is_some());
}

#[test]
fn test_default_intent_uses_configured_property() {
    let value = textures("fallback", SkinVariant::Classic);
    let dir = workspace(&format!(
        "defaults:\n  property:\n    value: \"{}\"\n    signature: \"{}\"\n",
        value, SIGNATURE
    ));

    let output = skinrelay(dir.path())
        .args(["resolve", NOTCH, "Notch", "--intent", "default", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report = json_stdout(&output);
    assert_eq!(report["source"], "default");
    assert_eq!(report["apply"]["applied"], 0);
}

#[test]
fn test_default_intent_without_default_is_not_found() {
    let dir = workspace("");
    skinrelay(dir.path())
        .args(["resolve", NOTCH, "Notch", "--intent", "default"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No skin exists for that player."));
}

#[test]
fn test_invalid_requests_exit_rejected() {
    let dir = workspace("");

    skinrelay(dir.path())
        .args(["set", NOTCH, "Notch", "--url", "ftp://example.com/skin.png"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("That skin request is not valid."));

    skinrelay(dir.path())
        .args(["set", NOTCH, "Notch", "--upload", "bm90IGpzb24=", "--signature", SIGNATURE])
        .assert()
        .code(5);

    // nothing was stored by the failed attempts
    skinrelay(dir.path()).args(["show", NOTCH]).assert().code(3);
}

#[test]
fn test_unverifiable_upload_rejected_by_default() {
    let dir = workspace_with("");
    let value = textures("abc123", SkinVariant::Classic);

    skinrelay(dir.path())
        .args(["set", NOTCH, "Notch", "--upload", value.as_str(), "--signature", SIGNATURE])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Could not resolve skin."));

    skinrelay(dir.path()).args(["show", NOTCH]).assert().code(3);
}

#[test]
fn test_usage_errors() {
    let dir = workspace("");

    skinrelay(dir.path())
        .args(["set", NOTCH, "Notch"])
        .assert()
        .code(2);

    skinrelay(dir.path())
        .args(["resolve", NOTCH, "not a name"])
        .assert()
        .code(2);

    skinrelay(dir.path())
        .args(["purge", "--all"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn test_purge_all_with_confirmation() {
    let dir = workspace("");
    let value = textures("abc123", SkinVariant::Classic);
    let other = Uuid::new_v4().to_string();

    for (uuid, name) in [(NOTCH, "Notch"), (other.as_str(), "jeb_")] {
        skinrelay(dir.path())
            .args(["set", uuid, name, "--upload", value.as_str(), "--signature", SIGNATURE])
            .assert()
            .success();
    }

    let output = skinrelay(dir.path())
        .args(["purge", "--all", "--yes", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(json_stdout(&output)["removed"], 2);

    skinrelay(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("no skins stored"));
}

#[test]
fn test_broken_config_is_a_config_error() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("skinrelay.yaml"), "cache:\n  memory_capacity: 0\n").unwrap();

    skinrelay(dir.path())
        .arg("list")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Skins are not configured correctly."));
}

#[test]
fn test_detect_paper_split_era() {
    let dir = tempdir().unwrap();
    let output = skinrelay(dir.path())
        .args(["detect", "--version", "git-Paper-196 (MC: 1.20.4)", "--marker", "paper", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let detection = json_stdout(&output);
    assert_eq!(detection["variant"], "paper");
    assert_eq!(detection["info_style"], "split");
}

#[test]
fn test_detect_respects_allowlist() {
    let dir = workspace("platform:\n  allowlist: [spigot]\n");
    skinrelay(dir.path())
        .args(["detect", "--version", "1.19.2", "--marker", "paper"])
        .assert()
        .success()
        .stdout(predicate::str::contains("spigot 1.19.2"))
        .stdout(predicate::str::contains("action packets"));

    skinrelay(dir.path())
        .args(["detect", "--version", "1.20.4", "--marker", "folia"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not supported"));
}

#[test]
fn test_detect_unsupported_version() {
    let dir = tempdir().unwrap();
    skinrelay(dir.path())
        .args(["detect", "--version", "1.7.10"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Skins are not supported on this server version.",
        ));
}
