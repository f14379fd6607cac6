use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_missing_input_reports_error_and_fails() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("missing.md");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md-pdf");
    cmd.arg(&input);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: Input file not found:"));

    assert!(!dir.path().join("missing.pdf").exists());
}

#[test]
fn test_no_arguments_fails() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md-pdf");
    cmd.assert().failure();
}

#[test]
fn test_unknown_mode_is_rejected() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    fs::write(&input, "# Doc").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md-pdf");
    cmd.arg(&input).arg("--mode").arg("SEPIA").arg("--html");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: Configuration Error: Unknown color mode"));

    assert!(!dir.path().join("doc.html").exists());
}

#[test]
fn test_negative_margin_is_rejected() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    fs::write(&input, "# Doc").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md-pdf");
    cmd.arg(&input).arg("--margin").arg("-0.5").arg("--html");
    cmd.assert()
        .failure()
        .stderr(predicate::str::starts_with("Error: "));
}

#[test]
fn test_html_output_defaults_next_to_input() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("report.md");
    fs::write(&input, "# Report\n\n```rust\nfn main() {}\n```\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md-pdf");
    cmd.arg(&input).arg("--html").arg("--size").arg("A4");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("HTML written to:"))
        .stderr(predicate::str::contains("report.html"));

    let html = fs::read_to_string(dir.path().join("report.html")).unwrap();
    assert!(html.contains("@page { size: A4; margin: 0.5in; }"));
    assert!(html.contains("<h1 id=\"report\">Report</h1>"));
    assert!(html.contains("class=\"codehilite\""));
}

#[test]
fn test_html_output_never_overwrites_input() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.html");
    fs::write(&input, "# Page\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md-pdf");
    cmd.arg(&input).arg("--html");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::starts_with("Error:"))
        .stderr(predicate::str::contains("same as the input"));

    assert_eq!(fs::read_to_string(&input).unwrap(), "# Page\n");
}

#[test]
fn test_explicit_output_and_quiet() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("notes.md");
    fs::write(&input, "Some *notes*.").unwrap();
    let output = dir.path().join("custom.html");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md-pdf");
    cmd.arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--html")
        .arg("--mode")
        .arg("DARK")
        .arg("-q");
    cmd.assert().success().stderr(predicate::str::is_empty());

    let html = fs::read_to_string(&output).unwrap();
    assert!(html.contains("<em>notes</em>"));
    assert!(!dir.path().join("notes.html").exists());
}

#[test]
fn test_config_file_is_applied() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    fs::write(&input, "text").unwrap();
    let config = dir.path().join("md-pdf.toml");
    fs::write(&config, "size = \"A4\"\nmargin = 1.5\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md-pdf");
    cmd.arg(&input).arg("-c").arg(&config).arg("--html");
    cmd.assert().success();

    let html = fs::read_to_string(dir.path().join("doc.html")).unwrap();
    assert!(html.contains("@page { size: A4; margin: 1.5in; }"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    fs::write(&input, "text").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md-pdf");
    cmd.arg(&input)
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("--html");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error: Configuration Error"));
}

#[test]
fn test_missing_output_directory_is_conversion_failure() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    fs::write(&input, "text").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md-pdf");
    cmd.arg(&input)
        .arg("-o")
        .arg(dir.path().join("no").join("such").join("doc.html"))
        .arg("--html");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Conversion failed:"))
        .stderr(predicate::str::contains("Output directory does not exist"));
}

#[test]
fn test_list_bundled_fonts_without_input() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("md-pdf");
    cmd.arg("--list-bundled-fonts");
    cmd.assert().success();
}
