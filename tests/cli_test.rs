// Exit status and stdout contract of the retail_cleaner binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

const SAMPLE_CSV: &str = "InvoiceNo,Quantity,UnitPrice,CustomerID\n\
                          536365,5,10,17850\n\
                          536366,2,3.5,13047\n\
                          536367,0,1,13047\n";

fn cleaner(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_retail_cleaner"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .arg("--log-dir")
        .arg(dir)
        .args(args)
        .output()
        .expect("failed to run retail_cleaner")
}

#[test]
fn run_with_missing_input_exits_non_zero() {
    let dir = tempdir().unwrap();
    let output = cleaner(
        dir.path(),
        &["run", "--input", "absent.xlsx", "--skip-resource-check"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("backups").exists());
    assert!(!dir.path().join("Online_Retail_Data_Set_Cleaned.csv").exists());
}

#[test]
fn run_on_valid_csv_prints_summary_and_exits_zero() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("retail.csv"), SAMPLE_CSV).unwrap();

    let output = cleaner(
        dir.path(),
        &[
            "run",
            "--input",
            "retail.csv",
            "--output",
            "cleaned.csv",
            "--skip-resource-check",
        ],
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("count"), "stdout: {}", stdout);
    assert!(stdout.contains("Revenue"), "stdout: {}", stdout);
    assert!(dir.path().join("cleaned.csv").exists());
    assert!(dir.path().join("data_cleanup.log").exists());
}

#[test]
fn run_json_prints_only_the_report() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("retail.csv"), SAMPLE_CSV).unwrap();

    let output = cleaner(
        dir.path(),
        &[
            "run",
            "--input",
            "retail.csv",
            "--output",
            "cleaned.csv",
            "--skip-resource-check",
            "--json",
        ],
    );

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout)
        .unwrap_or_else(|e| panic!("stdout is not one JSON value: {}", e));
    assert_eq!(report["rows_loaded"], 3);
    assert_eq!(report["rows_final"], 2);
}

#[test]
fn invalid_outlier_cap_exits_non_zero() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("retail.csv"), SAMPLE_CSV).unwrap();

    let output = cleaner(
        dir.path(),
        &["run", "--input", "retail.csv", "--outlier-cap", "1.5"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("backups").exists());
}
