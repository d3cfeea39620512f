//! Integration tests for the tfimport CLI
//!
//! These tests run the built binary end-to-end against temporary directories.

use std::path::Path;
use std::process::Command;

/// Get the path to the tfimport binary
fn tfimport_binary() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_tfimport"))
}

/// Run tfimport and return output
fn run_tfimport(args: &[&str]) -> std::process::Output {
    Command::new(tfimport_binary())
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("TFIMPORT_INVENTORY")
        .output()
        .expect("Failed to execute tfimport")
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

const GENERATED_AKS: &str = r#"resource "azurerm_kubernetes_cluster" "aks" {
  dns_prefix              = "aks"
  node_os_upgrade_channel = null
  run_command_enabled     = true
  support_plan            = "KubernetesOfficial"
  default_node_pool {
    max_count = 0
    name      = "system"
  }
}
"#;

#[test]
fn test_tfimport_version() {
    let output = run_tfimport(&["--version"]);

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("tfimport"));
}

#[test]
fn test_tfimport_help() {
    let output = run_tfimport(&["--help"]);

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("import"));
    assert!(stdout.contains("clean"));
    assert!(stdout.contains("rules"));
}

#[test]
fn test_tfimport_import_help() {
    let output = run_tfimport(&["import", "--help"]);

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--subscription-id"));
    assert!(stdout.contains("--local-repo-path"));
    assert!(stdout.contains("--resource"));
}

#[test]
fn test_tfimport_invalid_command() {
    let output = run_tfimport(&["frobnicate"]);

    assert!(!output.status.success());
}

mod clean {
    use super::*;

    #[test]
    fn test_clean_rewrites_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("generated-plan-import-aks.tf");
        std::fs::write(&file, GENERATED_AKS).unwrap();

        let output = run_tfimport(&["clean", &path_arg(&file)]);

        assert!(output.status.success(), "{:?}", output);
        let cleaned = std::fs::read_to_string(&file).unwrap();
        assert!(!cleaned.contains("node_os_upgrade_channel"));
        assert!(!cleaned.contains("max_count"));
        assert!(cleaned.contains("dns_prefix"));
        assert!(cleaned.contains("default_node_pool {"));
    }

    #[test]
    fn test_clean_dir_leaves_hand_written_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let generated = dir.path().join("generated-plan-import-aks.tf");
        let main_tf = dir.path().join("main.tf");
        std::fs::write(&generated, GENERATED_AKS).unwrap();
        std::fs::write(&main_tf, "locals {\n  x = null\n}\n").unwrap();

        let output = run_tfimport(&["clean", "--dir", &path_arg(dir.path())]);

        assert!(output.status.success(), "{:?}", output);
        assert_eq!(
            std::fs::read_to_string(&main_tf).unwrap(),
            "locals {\n  x = null\n}\n"
        );
        assert!(!std::fs::read_to_string(&generated)
            .unwrap()
            .contains("= null"));
    }

    #[test]
    fn test_clean_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("generated-plan-import-aks.tf");
        std::fs::write(&file, GENERATED_AKS).unwrap();

        let output = run_tfimport(&["clean", "--json", &path_arg(&file)]);

        assert!(output.status.success(), "{:?}", output);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let reports: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        assert_eq!(reports.as_array().map(|r| r.len()), Some(1));
    }

    #[test]
    fn test_clean_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();

        let output = run_tfimport(&["clean", &path_arg(&dir.path().join("nope.tf"))]);

        assert!(!output.status.success());
    }
}

mod rules {
    use super::*;

    #[test]
    fn test_rules_show_prints_builtin_table() {
        let output = run_tfimport(&["rules", "show"]);

        assert!(output.status.success(), "{:?}", output);
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("azurerm_kubernetes_cluster"));
    }

    #[test]
    fn test_rules_check_accepts_valid_table() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("rules.yaml");
        std::fs::write(
            &file,
            "resources:\n  azurerm_lb:\n    - action: delete\n      pattern: \"= 0\"\n",
        )
        .unwrap();

        let output = run_tfimport(&["rules", "check", &path_arg(&file)]);

        assert!(output.status.success(), "{:?}", output);
    }

    #[test]
    fn test_rules_check_rejects_malformed_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("rules.yaml");
        std::fs::write(&file, "global:\n  patterns:\n    - regex: \"(unclosed\"\n").unwrap();

        let output = run_tfimport(&["rules", "check", &path_arg(&file)]);

        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("(unclosed"));
    }
}

mod import {
    use super::*;

    const INVENTORY: &str = r#"
resources:
  - kind: storage
    name: stlogs
    id: /subscriptions/0000/resourceGroups/rg-st/providers/Microsoft.Storage/storageAccounts/stlogs
  - kind: storage
    name: stother
    id: /subscriptions/1111/resourceGroups/rg-st/providers/Microsoft.Storage/storageAccounts/stother
"#;

    #[test]
    fn test_import_dry_run_writes_import_files_only() {
        let repo = tempfile::tempdir().unwrap();
        std::fs::write(repo.path().join("inventory.yaml"), INVENTORY).unwrap();

        let output = run_tfimport(&[
            "import",
            "--subscription-id",
            "0000",
            "--local-repo-path",
            &path_arg(repo.path()),
            "--resource",
            "storage",
            "--dry-run",
        ]);

        assert!(output.status.success(), "{:?}", output);
        let rendered = std::fs::read_to_string(repo.path().join("import-stlogs.tf")).unwrap();
        assert!(rendered.contains("azurerm_storage_account.stlogs"));
        assert!(!repo.path().join("import-stother.tf").exists());
        assert!(!repo.path().join("providers.tf").exists());
    }

    #[test]
    fn test_import_unknown_resource_fails() {
        let repo = tempfile::tempdir().unwrap();
        std::fs::write(repo.path().join("inventory.yaml"), INVENTORY).unwrap();

        let output = run_tfimport(&[
            "import",
            "--subscription-id",
            "0000",
            "--local-repo-path",
            &path_arg(repo.path()),
            "--resource",
            "redis",
            "--dry-run",
        ]);

        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("redis"));
    }

    #[test]
    fn test_import_missing_inventory_fails() {
        let repo = tempfile::tempdir().unwrap();

        let output = run_tfimport(&[
            "import",
            "--subscription-id",
            "0000",
            "--local-repo-path",
            &path_arg(repo.path()),
            "--resource",
            "storage",
            "--dry-run",
        ]);

        assert!(!output.status.success());
    }
}
