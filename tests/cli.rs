//! End-to-end tests driving the `spoolbook` binary

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn spoolbook(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("spoolbook").unwrap();
    cmd.env("SPOOLBOOK_DATA_DIR", data_dir).env_remove("RUST_LOG");
    cmd
}

/// Add a profile and return its full id from the command output
fn add_filament(data_dir: &Path, args: &[&str]) -> String {
    let output = spoolbook(data_dir)
        .args(["filament", "add"])
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);

    let stdout = String::from_utf8(output.stdout).unwrap();
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("ID: "))
        .map(str::to_string)
        .expect("add prints the new id")
}

fn stored_filaments(data_dir: &Path) -> Vec<serde_json::Value> {
    let path = data_dir.join("data/filaments.json");
    if !path.exists() {
        return Vec::new();
    }
    let contents = std::fs::read_to_string(path).unwrap();
    let data: serde_json::Value = serde_json::from_str(&contents).unwrap();
    data["filaments"].as_array().cloned().unwrap_or_default()
}

#[test]
fn test_add_list_and_show() {
    let home = TempDir::new().unwrap();
    let id = add_filament(
        home.path(),
        &["PLA", "red", "--brand", "Prusament", "--weight", "1000", "--price", "20.00"],
    );

    spoolbook(home.path())
        .args(["filament", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Prusament PLA red"))
        .stdout(predicate::str::contains("1 spool(s)"));

    spoolbook(home.path())
        .args(["filament", "show", &id[..8]])
        .assert()
        .success()
        .stdout(predicate::str::contains("$20.00"));

    spoolbook(home.path())
        .arg("audit")
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE Filament"));
}

#[test]
fn test_negative_weight_is_rejected() {
    let home = TempDir::new().unwrap();

    spoolbook(home.path())
        .args(["filament", "add", "PLA", "red", "--weight=-5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("weight_grams cannot be negative"));

    assert!(stored_filaments(home.path()).is_empty());
}

#[test]
fn test_unknown_filament_is_reported() {
    let home = TempDir::new().unwrap();

    spoolbook(home.path())
        .args(["filament", "show", "deadbeef"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_export_then_import_into_empty_store() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let archive = source.path().join("profiles.tar.gz");

    let id = add_filament(source.path(), &["PLA", "red", "--weight", "1000", "--price", "20.00"]);
    let short_id = format!("fil-{}", &id[..8]);

    spoolbook(source.path())
        .arg("export")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 profile(s)"));

    spoolbook(target.path())
        .arg("import")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported: 1"))
        .stdout(predicate::str::contains("Changed profiles:"))
        .stdout(predicate::str::contains(short_id.as_str()));

    let imported = stored_filaments(target.path());
    assert_eq!(imported.len(), 1);
    assert_eq!(imported, stored_filaments(source.path()));

    // a second import changes nothing
    spoolbook(target.path())
        .arg("import")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped:  1"))
        .stdout(predicate::str::contains("Changed profiles:").not());
    assert_eq!(stored_filaments(target.path()).len(), 1);
}

#[test]
fn test_price_record_and_stats() {
    let home = TempDir::new().unwrap();
    let id = add_filament(home.path(), &["PETG", "black", "--weight", "750"]);

    for (price, at) in [("20.00", "2024-01-01"), ("25.00", "2024-02-01")] {
        spoolbook(home.path())
            .args(["price", "record", &id, price, "--vendor", "shop", "--at", at])
            .assert()
            .success();
    }

    spoolbook(home.path())
        .args(["price", "stats", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Observations: 2"))
        .stdout(predicate::str::contains("Average:      $22.50"))
        .stdout(predicate::str::contains("increasing"));

    spoolbook(home.path())
        .args(["price", "stats", &id, "--days", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No price data in this period."));
}

#[test]
fn test_usage_record_report_and_savings() {
    let home = TempDir::new().unwrap();
    let id = add_filament(home.path(), &["PLA", "red", "--weight", "1000", "--price", "20.00"]);

    spoolbook(home.path())
        .args(["usage", "record", &id, "250", "--project", "vase", "--at", "2024-05-02"])
        .arg("--consume")
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded 250.0 g"))
        .stdout(predicate::str::contains("($5.00)"))
        .stdout(predicate::str::contains("Remaining on spool: 750.0 g"));
    assert_eq!(stored_filaments(home.path())[0]["weight_grams"], 750.0);

    spoolbook(home.path())
        .args(["usage", "record", &id, "50", "-p", "benchy", "--at", "2024-05-10"])
        .args(["--cost-per-kg", "40"])
        .assert()
        .success()
        .stdout(predicate::str::contains("($2.00)"));

    let reports = home.path().join("reports");
    spoolbook(home.path())
        .args(["usage", "report", "--from", "2024-05-01", "--to", "2024-05-31"])
        .arg("--export")
        .arg(&reports)
        .args(["--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cost Report (custom)"))
        .stdout(predicate::str::contains("Total cost:   $7.00"))
        .stdout(predicate::str::contains("Projects:     2"))
        .stdout(predicate::str::contains("Report written to"));
    let csv = reports.join("cost_report_custom_2024-05-02_to_2024-05-10.csv");
    let contents = std::fs::read_to_string(csv).unwrap();
    assert!(contents.contains("PLA,300.00,7.00,23.33"));

    spoolbook(home.path())
        .args(["usage", "report", "--period", "daily"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No usage recorded in this period."));

    spoolbook(home.path())
        .args(["usage", "savings"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PLA: paid $23.33/kg on average"))
        .stdout(predicate::str::contains("Up to $1.00"));

    spoolbook(home.path())
        .args(["usage", "record", &id, "0", "--project", "nothing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("grams"));
}

#[test]
fn test_backup_create_and_list() {
    let home = TempDir::new().unwrap();
    spoolbook(home.path())
        .args(["config", "--auto-backup", "false"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Scheduled backups: off"));
    add_filament(home.path(), &["ABS", "white", "--weight", "500"]);

    spoolbook(home.path())
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups found."));

    spoolbook(home.path())
        .args(["backup", "create"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup created: backup-"));

    spoolbook(home.path())
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 backup(s)"));

    spoolbook(home.path())
        .args(["backup", "info", "latest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Filaments:          1"));
}

fn backup_files(data_dir: &Path) -> usize {
    std::fs::read_dir(data_dir.join("backups"))
        .map(|entries| entries.filter_map(|e| e.ok()).count())
        .unwrap_or(0)
}

#[test]
fn test_scheduled_backup_runs_at_startup() {
    let home = TempDir::new().unwrap();
    spoolbook(home.path()).arg("init").assert().success();
    add_filament(home.path(), &["PLA", "green", "--weight", "1000"]);
    // nothing to back up before the first profile existed
    assert_eq!(backup_files(home.path()), 0);

    spoolbook(home.path())
        .args(["filament", "list"])
        .assert()
        .success();
    assert_eq!(backup_files(home.path()), 1);

    // daily interval: the next command finds a fresh backup
    spoolbook(home.path())
        .args(["filament", "list"])
        .assert()
        .success();
    assert_eq!(backup_files(home.path()), 1);
}

#[test]
fn test_scheduled_backup_off_creates_nothing() {
    let home = TempDir::new().unwrap();
    spoolbook(home.path())
        .args(["config", "--auto-backup", "false"])
        .assert()
        .success();
    add_filament(home.path(), &["PLA", "green", "--weight", "1000"]);

    spoolbook(home.path())
        .args(["filament", "list"])
        .assert()
        .success();
    assert_eq!(backup_files(home.path()), 0);
}

#[test]
fn test_config_updates_settings() {
    let home = TempDir::new().unwrap();

    spoolbook(home.path())
        .args(["config", "--max-backups", "3", "--backup-interval", "6h"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Max backups:       3"))
        .stdout(predicate::str::contains("every 6h"));

    spoolbook(home.path())
        .args(["config", "--backup-interval", "fortnightly"])
        .assert()
        .failure();
}
