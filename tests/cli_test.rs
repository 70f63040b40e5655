use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/actions.csv").arg("--admin").arg("1");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "order,requester,context,status,price,invoice,reason",
        ))
        // Paid after the invoice was settled
        .stdout(predicate::str::contains("O1,100,9,paid,1500,1,"))
        // Rejected, late accept refused
        .stdout(predicate::str::contains("O2,101,9,rejected,,,spam detected"))
        // Negative price refused, still pending
        .stdout(predicate::str::contains("O3,102,9,pending,,,"))
        .stderr(predicate::str::contains("not observed yet"))
        .stderr(predicate::str::contains("already handled"))
        .stderr(predicate::str::contains("Price must be positive"));

    Ok(())
}

#[test]
fn test_cli_missing_input_fails() {
    let mut cmd = Command::new(cargo_bin!("orderflow"));
    cmd.arg("tests/fixtures/does_not_exist.csv");
    cmd.assert().failure();
}
