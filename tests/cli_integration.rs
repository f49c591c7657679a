//! CLI integration tests for Quay.
//!
//! These tests drive the `quay` binary against small build roots on disk.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the quay binary command.
fn quay() -> Command {
    Command::cargo_bin("quay").unwrap()
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A build root with two published python targets, `foo` depending on `bar`.
fn python_root() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "quay.toml", "[cache]\nenabled = false\n");
    write(
        root,
        "src/python/foo/BUILD.toml",
        r#"
[[target]]
name = "foo"
kind = "library"
sources = ["foo/__init__.py"]
dependencies = [":impl", "src/python/bar"]
provides = { name = "foo", version = "0.1.0" }

[[target]]
name = "impl"
kind = "library"
sources = ["foo/impl.py"]

[[target]]
name = "loose"
kind = "library"
"#,
    );
    write(root, "src/python/foo/foo/__init__.py", "");
    write(root, "src/python/foo/foo/impl.py", "VALUE = 1\n");
    write(
        root,
        "src/python/bar/BUILD.toml",
        r#"
[[target]]
name = "bar"
kind = "library"
sources = ["bar/__init__.py"]
provides = { name = "bar", version = "1.2.3" }
"#,
    );
    write(root, "src/python/bar/bar/__init__.py", "");
    tmp
}

// ============================================================================
// quay --help
// ============================================================================

#[test]
fn test_help_lists_commands() {
    quay()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve-local"))
        .stdout(predicate::str::contains("setup-py"))
        .stdout(predicate::str::contains("node-install"))
        .stdout(predicate::str::contains("invalidate"));
}

#[test]
fn test_fails_outside_build_root() {
    let tmp = TempDir::new().unwrap();

    quay()
        .arg("clean")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find quay.toml"));
}

#[test]
fn test_targets_are_required() {
    let tmp = python_root();

    quay()
        .arg("setup-py")
        .current_dir(tmp.path())
        .assert()
        .failure();
}

// ============================================================================
// quay setup-py
// ============================================================================

#[test]
fn test_setup_py_creates_sdist() {
    let tmp = python_root();

    quay()
        .args(["setup-py", "src/python/foo"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Created dist/foo-0.1.0.tar.gz"));

    assert!(tmp.path().join("dist/foo-0.1.0.tar.gz").is_file());
    assert!(!tmp.path().join("dist/bar-1.2.3.tar.gz").exists());

    let setup = fs::read_to_string(tmp.path().join("dist/foo-0.1.0/setup.py")).unwrap();
    assert!(setup.contains("bar==1.2.3"));
    assert!(tmp.path().join("dist/foo-0.1.0/src/foo/foo/impl.py").is_file());
}

#[test]
fn test_setup_py_recursive_from_subdirectory() {
    let tmp = python_root();

    quay()
        .args(["setup-py", "--recursive", "src/python/foo"])
        .current_dir(tmp.path().join("src/python"))
        .assert()
        .success();

    assert!(tmp.path().join("dist/foo-0.1.0.tar.gz").is_file());
    assert!(tmp.path().join("dist/bar-1.2.3.tar.gz").is_file());
}

#[test]
fn test_setup_py_rejects_unpublished_target() {
    let tmp = python_root();

    quay()
        .args(["setup-py", "src/python/foo:impl"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a published target"));
}

#[test]
fn test_unknown_target_is_reported() {
    let tmp = python_root();

    quay()
        .args(["setup-py", "src/python/nope"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid target `src/python/nope`"));
}

// ============================================================================
// quay owners
// ============================================================================

#[test]
fn test_owners_output() {
    let tmp = python_root();

    quay()
        .args(["owners", "src/python/foo", "src/python/foo:impl"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::diff(
            "src/python/foo:foo -> src/python/foo:foo\n  \
             depends on src/python/foo:impl\n  \
             depends on src/python/bar:bar\n  \
             requires bar==1.2.3\n\
             src/python/foo:impl -> src/python/foo:foo\n",
        ));
}

#[test]
fn test_owners_of_orphan_fails() {
    let tmp = python_root();

    quay()
        .args(["owners", "src/python/foo:loose"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no published target owns"));
}

// ============================================================================
// quay clean / invalidate
// ============================================================================

#[test]
fn test_invalidate_then_clean() {
    let tmp = python_root();
    write(tmp.path(), ".quay.d/build_invalidator/resolve.json", "{}");
    write(tmp.path(), ".quay.d/resolve/keep.txt", "");

    quay()
        .arg("invalidate")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Removed"));

    assert!(!tmp.path().join(".quay.d/build_invalidator").exists());
    assert!(tmp.path().join(".quay.d/resolve/keep.txt").exists());

    quay()
        .arg("clean")
        .current_dir(tmp.path())
        .assert()
        .success();

    assert!(!tmp.path().join(".quay.d").exists());
    assert!(tmp.path().join("quay.toml").exists());
}

// ============================================================================
// quay resolve
// ============================================================================

#[test]
fn test_resolve_without_node_targets_is_a_no_op() {
    let tmp = python_root();

    quay()
        .args(["resolve", "src/python/foo"])
        .current_dir(tmp.path())
        .assert()
        .success();

    assert!(!tmp.path().join(".quay.d/resolve").exists());
}
