//! End-to-end tests for the `without` binary.

use std::process::{Command, Output};
use tempfile::TempDir;

const BLOCK: &str = "Sub Main()\n    With New Person()\n        .Go()\n    End With\nEnd Sub\n";
const FIXED: &str = "Sub Main()\n    Dim __withPerson1 = New Person()\n    __withPerson1.Go()\nEnd Sub\n";

fn without(args: &[&str], dir: &TempDir) -> Output {
    Command::new(env!("CARGO_BIN_EXE_without"))
        .args(args)
        .current_dir(dir.path())
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn lint_reports_and_exits_zero_for_warnings() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.vb"), BLOCK).unwrap();

    let output = without(&["a.vb"], &temp);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(
        out.contains("a.vb:2:5: warning: with_block [WITHOUT001]: Don't use With blocks"),
        "{out}"
    );
    assert!(out.contains("1 diagnostics for a.vb"));
}

#[test]
fn deny_warnings_exits_one() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.vb"), BLOCK).unwrap();

    let output = without(&["--deny-warnings", "a.vb"], &temp);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn json_output_carries_code_and_span() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.vb"), BLOCK).unwrap();

    let output = without(&["lint", "--format", "json", "a.vb"], &temp);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let diag = &json[0];
    assert_eq!(diag["lint"], "with_block");
    assert_eq!(diag["code"], "WITHOUT001");
    assert_eq!(diag["level"], "warning");
    assert_eq!(diag["row"], 2);
    assert_eq!(diag["column"], 5);
    assert_eq!(diag["end_row"], 4);
    assert_eq!(diag["fixable"], true);
    assert_eq!(diag["applicability"], "machine-applicable");
}

#[test]
fn directories_are_searched_for_vb_files() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("src/obj")).unwrap();
    std::fs::write(temp.path().join("src/a.vb"), BLOCK).unwrap();
    std::fs::write(temp.path().join("src/B.VB"), BLOCK).unwrap();
    std::fs::write(temp.path().join("src/notes.txt"), BLOCK).unwrap();
    std::fs::write(temp.path().join("src/obj/gen.vb"), BLOCK).unwrap();

    let output = without(&["src"], &temp);
    let out = stdout(&output);
    assert_eq!(out.matches("with_block [WITHOUT001]").count(), 2, "{out}");
    assert!(!out.contains("gen.vb"));
}

#[test]
fn fix_rewrites_file_and_keeps_backup() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("a.vb");
    std::fs::write(&file, BLOCK).unwrap();

    let output = without(&["--fix", "a.vb"], &temp);
    assert!(output.status.success());
    assert_eq!(std::fs::read_to_string(&file).unwrap(), FIXED);
    assert_eq!(
        std::fs::read_to_string(temp.path().join("a.vb.bak")).unwrap(),
        BLOCK
    );
    assert!(stdout(&output).contains("Applied 1 fix(es) to 1 file(s)"));
}

#[test]
fn fix_without_backup() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.vb"), BLOCK).unwrap();

    let output = without(&["--fix", "--no-backup", "a.vb"], &temp);
    assert!(output.status.success());
    assert!(!temp.path().join("a.vb.bak").exists());
}

#[test]
fn dry_run_prints_diff_and_leaves_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("a.vb");
    std::fs::write(&file, BLOCK).unwrap();

    let output = without(&["--fix-dry-run", "a.vb"], &temp);
    assert!(output.status.success());
    assert_eq!(std::fs::read_to_string(&file).unwrap(), BLOCK);

    let out = stdout(&output);
    assert!(out.contains("-    With New Person()"), "{out}");
    assert!(out.contains("+    Dim __withPerson1 = New Person()"), "{out}");
    assert!(out.contains("1 fix(es) would be applied to 1 file(s)"));
}

#[test]
fn config_file_is_picked_up() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.vb"), BLOCK).unwrap();
    std::fs::write(
        temp.path().join("without.toml"),
        "[lints]\nwith_block = \"error\"\n",
    )
    .unwrap();

    let output = without(&["a.vb"], &temp);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("error: with_block"));
}

#[test]
fn parse_failure_exits_two() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("bad.vb"), "With p\n").unwrap();

    let output = without(&["bad.vb"], &temp);
    assert_eq!(output.status.code(), Some(2));
    let err = String::from_utf8_lossy(&output.stderr);
    assert!(err.contains("failed to lint bad.vb"), "{err}");
}

#[test]
fn explain_accepts_code() {
    let temp = TempDir::new().unwrap();

    let output = without(&["explain", "WITHOUT001"], &temp);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("name: with_block"));
    assert!(out.contains("category: design"));
    assert!(out.contains("fix: available"));
}

#[test]
fn list_rules_shows_the_lint() {
    let temp = TempDir::new().unwrap();

    let output = without(&["list-rules"], &temp);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.starts_with("with_block\tWITHOUT001\tdesign\t"), "{out}");
    assert!(out.trim_end().ends_with("[fix]"), "{out}");
}

#[test]
fn parse_failure_does_not_stop_other_files() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("bad.vb"), "With p\n").unwrap();
    std::fs::write(temp.path().join("good.vb"), BLOCK).unwrap();

    let output = without(&["."], &temp);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("bad.vb"));
    assert!(stdout(&output).contains("with_block [WITHOUT001]"));

    let output = without(&["lint", "--format", "json", "."], &temp);
    assert_eq!(output.status.code(), Some(2));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json.as_array().map(Vec::len), Some(1));
    assert!(json[0]["file"].as_str().unwrap().ends_with("good.vb"));
}

#[test]
fn fix_continues_past_unparsable_file() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("bad.vb"), "With p\n").unwrap();
    std::fs::write(temp.path().join("good.vb"), BLOCK).unwrap();

    let output = without(&["--fix", "--no-backup", "."], &temp);
    assert_eq!(output.status.code(), Some(2));
    let err = String::from_utf8_lossy(&output.stderr);
    assert!(err.contains("failed to fix") && err.contains("bad.vb"), "{err}");
    assert_eq!(
        std::fs::read_to_string(temp.path().join("good.vb")).unwrap(),
        FIXED
    );
    assert_eq!(
        std::fs::read_to_string(temp.path().join("bad.vb")).unwrap(),
        "With p\n"
    );
}

#[test]
fn commented_block_needs_unsafe_fixes() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("a.vb");
    let source = "With p\n    ' keep me\n    .Go()\nEnd With\n";
    std::fs::write(&file, source).unwrap();

    let output = without(&["--fix", "--no-backup", "a.vb"], &temp);
    assert!(output.status.success());
    assert_eq!(std::fs::read_to_string(&file).unwrap(), source);
    assert!(stdout(&output).contains("1 fix(es) skipped (use --unsafe-fixes to apply)"));

    let output = without(&["--fix", "--no-backup", "--unsafe-fixes", "a.vb"], &temp);
    assert!(output.status.success());
    assert_eq!(
        std::fs::read_to_string(&file).unwrap(),
        "Dim __with1 = p\n__with1.Go()\n"
    );
}
