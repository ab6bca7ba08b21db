use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_smtsampler"))
}

fn write_formula(dir: &Path, source: &str) -> PathBuf {
    let input = dir.join("formula.smt2");
    fs::write(&input, source).unwrap();
    input
}

fn run_sampler(input: &Path, extra: &[&str]) -> Output {
    Command::new(get_binary_path())
        .arg(input)
        .args(extra)
        .output()
        .expect("Failed to execute smtsampler")
}

const ABOVE_FIVE: &str = "\
(declare-const x Bool)
(declare-const y (_ BitVec 4))
(assert (or x (not x)))
(assert (bvugt y #x5))
";

#[test]
fn test_sat_formula_samples_are_valid() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_formula(dir.path(), ABOVE_FIVE);

    let output = run_sampler(&input, &["--epochs", "30", "--seed", "7"]);

    assert!(
        output.status.success(),
        "Command failed with status: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Stopped: epoch limit"), "stdout: {}", stdout);

    let samples = fs::read_to_string(dir.path().join("formula.smt2.samples")).unwrap();
    assert!(!samples.is_empty());
    for (i, line) in samples.lines().enumerate() {
        let (index, sample) = line.split_once(": ").unwrap();
        assert_eq!(index, (i + 1).to_string());
        let bits = sample
            .split_terminator(';')
            .find_map(|field| field.strip_prefix("y:"))
            .unwrap();
        assert!(u32::from_str_radix(bits, 2).unwrap() > 5, "{}", line);
    }
}

#[test]
fn test_unsat_formula_exits_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_formula(
        dir.path(),
        "(declare-const x Bool)\n(assert (and x (not x)))\n",
    );

    let output = run_sampler(&input, &[]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Stopped: formula is unsat"), "stdout: {}", stdout);
    let samples = fs::read_to_string(dir.path().join("formula.smt2.samples")).unwrap();
    assert!(samples.is_empty());
}

#[test]
fn test_sat_strategy_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_formula(dir.path(), ABOVE_FIVE);

    let output = run_sampler(&input, &["--strategy", "sat"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"), "stderr: {}", stderr);
}

#[test]
fn test_missing_input_is_reported() {
    let dir = tempfile::tempdir().unwrap();

    let output = run_sampler(&dir.path().join("absent.smt2"), &[]);

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_quantified_formula_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_formula(
        dir.path(),
        "(declare-const c Int)\n(assert (forall ((i Int)) (> i c)))\n",
    );

    let output = run_sampler(&input, &[]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unsupported term"), "stderr: {}", stderr);
}

#[test]
fn test_infinite_time_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_formula(dir.path(), ABOVE_FIVE);

    let output = run_sampler(&input, &["-t", "inf"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--time"), "stderr: {}", stderr);
}
