//! End-to-end driver tests: write a temporary project, run `tocinc`,
//! assert on exit codes, diagnostics, and emitted artifacts.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn write_source(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write test source");
    path
}

fn tocinc() -> Command {
    Command::cargo_bin("tocinc").expect("tocinc binary")
}

#[test]
fn arithmetic_program_compiles_clean() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(dir.path(), "main.to", "let x: int = 2 + 3 * 4\n");
    tocinc()
        .arg("compile")
        .arg(&file)
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn type_mismatch_exits_one_with_t001() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(dir.path(), "main.to", "let x: int = \"hi\"\n");
    tocinc()
        .arg("compile")
        .arg(&file)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("T001"));
}

#[test]
fn json_error_format_is_machine_readable() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(dir.path(), "main.to", "let x: int = \"hi\"\n");
    let output = tocinc()
        .arg("compile")
        .arg(&file)
        .arg("--error-format=json")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stderr.lines().next().expect("one diagnostic line");
    let value: serde_json::Value = serde_json::from_str(line).expect("valid JSON");
    assert_eq!(value["code"], "T001");
    assert_eq!(value["severity"], "error");
    assert_eq!(value["line"], 1);
    // Column of the string literal.
    assert_eq!(value["column"], 14);
}

#[test]
fn use_after_move_exits_one_with_b001() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(
        dir.path(),
        "main.to",
        "let a = [1, 2, 3]\nlet b = move a\nprint(a)\n",
    );
    tocinc()
        .arg("compile")
        .arg(&file)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("B001"));
}

#[test]
fn non_exhaustive_match_cites_the_missing_constructor() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(
        dir.path(),
        "main.to",
        "let opt = Some(1)\nlet r = match opt { Some(x) -> x }\n",
    );
    tocinc()
        .arg("compile")
        .arg(&file)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("P001").and(predicate::str::contains("None")));
}

#[test]
fn trait_bound_failure_names_the_trait() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(
        dir.path(),
        "main.to",
        "fn show<T: Display>(x: T) { }\nclass Blob { }\nshow(new Blob())\n",
    );
    tocinc()
        .arg("compile")
        .arg(&file)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("T001").and(predicate::str::contains("Display")));
}

#[test]
fn async_lowering_emits_both_wrapper_and_body() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(
        dir.path(),
        "main.to",
        "async fn g() -> int { return 1 }\nprint(g())\n",
    );
    tocinc()
        .arg("compile")
        .arg(&file)
        .arg("--emit=ir")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("g$async")
                .and(predicate::str::contains("wrapper-of g$async"))
                .and(predicate::str::contains("Future<int>")),
        );
}

#[test]
fn generic_cache_emits_one_specialization_per_instantiation() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(
        dir.path(),
        "main.to",
        "fn id<T>(x: T) -> T { return x }\n\
         let a = id<int>(3)\n\
         let b = id<int>(4)\n\
         let c = id<float64>(1.0)\n",
    );
    let output = tocinc()
        .arg("compile")
        .arg(&file)
        .arg("--emit=ir")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    // One `id_int` function line despite two uses; `id_float64` besides.
    let id_int_fns = stdout
        .lines()
        .filter(|l| l.contains("specialization-of id<int>"))
        .count();
    let id_float_fns = stdout
        .lines()
        .filter(|l| l.contains("specialization-of id<float64>"))
        .count();
    assert_eq!(id_int_fns, 1);
    assert_eq!(id_float_fns, 1);
}

#[test]
fn warnings_alone_keep_exit_code_zero() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(
        dir.path(),
        "main.to",
        "let r = match 1 { 1 -> \"a\", 1 -> \"b\", _ -> \"c\" }\n",
    );
    tocinc()
        .arg("compile")
        .arg(&file)
        .assert()
        .success()
        .stderr(predicate::str::contains("P002"));
}

#[test]
fn emit_ast_prints_the_item_tree() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(dir.path(), "main.to", "fn main() { print(1) }\n");
    tocinc()
        .arg("compile")
        .arg(&file)
        .arg("--emit=ast")
        .assert()
        .success()
        .stdout(predicate::str::contains("fn main"));
}

#[test]
fn emit_typed_ast_prints_expression_types() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(dir.path(), "main.to", "let x = 1 + 2\n");
    tocinc()
        .arg("compile")
        .arg(&file)
        .arg("--emit=typed-ast")
        .assert()
        .success()
        .stdout(predicate::str::contains(": int"));
}

#[test]
fn module_path_resolves_on_disk_modules() {
    let dir = tempfile::tempdir().unwrap();
    write_source(
        dir.path(),
        "Math.to",
        "fn add(a: int, b: int) -> int { return a + b }\n",
    );
    let file = write_source(
        dir.path(),
        "main.to",
        "import Math.{add}\nlet s: int = add(1, 2)\n",
    );
    tocinc()
        .arg("compile")
        .arg(&file)
        .env("TOCIN_MODULE_PATH", dir.path())
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn missing_file_exits_two() {
    tocinc()
        .arg("compile")
        .arg("does-not-exist.to")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn extension_rewrite_appears_in_ir() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(
        dir.path(),
        "main.to",
        "extend int { fn double(self) -> int { return self * 2 } }\nlet d = (21).double()\n",
    );
    tocinc()
        .arg("compile")
        .arg(&file)
        .arg("--emit=ir")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("extension int_double")
                .and(predicate::str::contains("-> int_double")),
        );
}
