//! Builds programs with nasm and ld and checks their exit status. Skipped when either tool
//! is missing from the PATH.

use std::{env, fs, path::PathBuf, process::Command};

use catoc::driver::{Options, Stage};

fn toolchain_available() -> bool {
    which::which("nasm").is_ok() && which::which("ld").is_ok()
}

fn scratch_dir(test: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("catoc-{}-{test}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Returns `None` when the toolchain is missing.
fn run_source(test: &str, source: &str) -> Option<i32> {
    if !toolchain_available() {
        eprintln!("skipping {test}: nasm or ld not found");
        return None;
    }

    let dir = scratch_dir(test);
    let input = dir.join("main.cato");
    fs::write(&input, source).unwrap();

    let opts = Options::new(input, Stage::Compile);
    opts.execute().unwrap();

    assert!(!opts.assembly_file.exists());
    assert!(!opts.object_file.exists());

    let status = Command::new(&opts.output_file).status().unwrap();
    fs::remove_dir_all(&dir).unwrap();

    Some(status.code().expect("program was killed by a signal"))
}

fn run_demo(name: &str) -> Option<i32> {
    let path = format!("{}/demos/{name}.cato", env!("CARGO_MANIFEST_DIR"));
    run_source(name, &fs::read_to_string(path).unwrap())
}

#[test]
fn test_exit_literal() {
    if let Some(code) = run_source("exit_literal", "exit(42);") {
        assert_eq!(code, 42);
    }
}

#[test]
fn test_exit_status_keeps_low_byte() {
    if let Some(code) = run_source("exit_low_byte", "exit(263);") {
        assert_eq!(code, 7);
    }
    if let Some(code) = run_source("exit_negative", "exit(0 - 1);") {
        assert_eq!(code, 255);
    }
}

#[test]
fn test_for_iteration_declaration() {
    let source = "int a = 42; for (int i = 0; i < 3; int j = i) { i = i + 1; } exit(a);";
    if let Some(code) = run_source("iteration_declaration", source) {
        assert_eq!(code, 42);
    }
}

#[test]
fn test_function_named_like_instruction() {
    let source = "function push(a, b) { return a - b; } exit(push(9, 2));";
    if let Some(code) = run_source("instruction_name", source) {
        assert_eq!(code, 7);
    }
}

#[test]
fn test_variables() {
    if let Some(code) = run_source("variables", "int a = 5; int b = a + 1; exit(b);") {
        assert_eq!(code, 6);
    }
}

#[test]
fn test_if_chain() {
    let source =
        "int a = 0; if (a == 1) { exit(1); } elif (a == 0) { exit(2); } else { exit(3); }";
    if let Some(code) = run_source("if_chain", source) {
        assert_eq!(code, 2);
    }
}

#[test]
fn test_for_loop_sum() {
    let source = "int sum = 0; for (int i = 0; i < 5; i = i + 1) { sum = sum + i; } exit(sum);";
    if let Some(code) = run_source("for_sum", source) {
        assert_eq!(code, 10);
    }
}

#[test]
fn test_precedence() {
    if let Some(code) = run_source("precedence", "exit(2 + 3 * 4);") {
        assert_eq!(code, 14);
    }
    if let Some(code) = run_source("parens", "exit((2 + 3) * 4);") {
        assert_eq!(code, 20);
    }
}

#[test]
fn test_argument_order() {
    let source = "function f(a, b) { return a - b; } exit(f(10, 3));";
    if let Some(code) = run_source("argument_order", source) {
        assert_eq!(code, 7);
    }
}

#[test]
fn test_division_and_comparisons() {
    if let Some(code) = run_source("division", "exit(17 / 5 + (3 > 2) + (2 != 2));") {
        assert_eq!(code, 4);
    }
}

#[test]
fn test_demos() {
    for (demo, expected) in [
        ("exit", 42),
        ("fib", 55),
        ("fact", 120),
        ("branches", 11),
        ("strings", 3),
    ] {
        if let Some(code) = run_demo(demo) {
            assert_eq!(code, expected, "{demo}");
        }
    }
}

#[test]
fn test_assembly_stage_keeps_file() {
    if !toolchain_available() {
        return;
    }

    let dir = scratch_dir("assembly_stage");
    let input = dir.join("main.cato");
    fs::write(&input, "exit(1);").unwrap();

    let opts = Options::new(input, Stage::Assembly);
    opts.execute().unwrap();

    let asm = fs::read_to_string(&opts.assembly_file).unwrap();
    assert!(asm.contains("_start:"));
    assert!(!opts.output_file.exists());

    fs::remove_dir_all(&dir).unwrap();
}
