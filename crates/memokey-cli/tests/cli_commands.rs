//! # CLI Command Tests
//!
//! Exercises the code paths behind `memokey digest`, `freeze`, `verify`
//! and `handlers` against documents written to a temporary directory.

use std::path::{Path, PathBuf};

use memokey_cli::digest::{digest_hex, DigestArgs};
use memokey_cli::freeze::{frozen, render, FreezeArgs};
use memokey_cli::handlers::{run_handlers, HandlersArgs};
use memokey_cli::input::{InputArgs, InputFormat};
use memokey_cli::verify::{run_verify, VerifyArgs};
use memokey_cli::{build_dispatcher, load_config};
use memokey_core::{HashAlgorithm, MemokeyConfig};
use memokey_engine::TypeDispatcher;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

fn input(file: PathBuf) -> InputArgs {
    InputArgs {
        file,
        format: None,
        arrays_as_sets: false,
    }
}

fn dispatcher() -> TypeDispatcher {
    build_dispatcher(MemokeyConfig::default())
}

fn digest_of(file: PathBuf) -> String {
    let args = DigestArgs {
        input: input(file),
        quiet: true,
    };
    digest_hex(&args, &dispatcher()).unwrap()
}

// ---------------------------------------------------------------------------
// digest
// ---------------------------------------------------------------------------

#[test]
fn json_key_order_does_not_change_digest() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.json", r#"{"a": 2, "nest": {"list": [1, 2], "x": null}}"#);
    let b = write(dir.path(), "b.json", r#"{"nest": {"x": null, "list": [1, 2]}, "a": 2}"#);
    assert_eq!(digest_of(a), digest_of(b));
}

#[test]
fn json_and_yaml_of_same_document_agree() {
    let dir = tempfile::tempdir().unwrap();
    let json = write(dir.path(), "doc.json", r#"{"name": "x", "tags": ["a", "b"], "n": 1.5}"#);
    let yaml = write(dir.path(), "doc.yaml", "name: x\ntags: [a, b]\nn: 1.5\n");
    assert_eq!(digest_of(json), digest_of(yaml));
}

#[test]
fn explicit_format_overrides_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "doc.txt", "a: 1\n");
    let args = DigestArgs {
        input: InputArgs {
            file: path,
            format: Some(InputFormat::Yaml),
            arrays_as_sets: false,
        },
        quiet: true,
    };
    assert!(digest_hex(&args, &dispatcher()).is_ok());
}

#[test]
fn arrays_as_sets_ignores_array_order() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.json", r#"["x", 1, true]"#);
    let b = write(dir.path(), "b.json", r#"[true, "x", 1]"#);
    let as_sets = |file| {
        let args = DigestArgs {
            input: InputArgs {
                file,
                format: None,
                arrays_as_sets: true,
            },
            quiet: true,
        };
        digest_hex(&args, &dispatcher()).unwrap()
    };
    assert_ne!(digest_of(a.clone()), digest_of(b.clone()));
    assert_eq!(as_sets(a), as_sets(b));
}

#[test]
fn ndarray_documents_hash_through_tensor_handler() {
    let dir = tempfile::tempdir().unwrap();
    let array = write(
        dir.path(),
        "w.json",
        r#"{"$ndarray": {"shape": [2, 2], "dtype": "f64", "data": [1, 2, 3, 4]}}"#,
    );
    let reshaped = write(
        dir.path(),
        "v.json",
        r#"{"$ndarray": {"shape": [4], "dtype": "f64", "data": [1, 2, 3, 4]}}"#,
    );
    assert_ne!(digest_of(array), digest_of(reshaped));
}

#[test]
fn algorithm_changes_digest() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "a.json", r#"{"k": [1, 2, 3]}"#);
    let blake = build_dispatcher(load_config(None, Some(HashAlgorithm::Blake3)).unwrap());
    let args = DigestArgs {
        input: input(path.clone()),
        quiet: true,
    };
    assert_ne!(digest_hex(&args, &blake).unwrap(), digest_of(path));
}

#[test]
fn unreadable_input_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let args = DigestArgs {
        input: input(dir.path().join("missing.json")),
        quiet: true,
    };
    assert!(digest_hex(&args, &dispatcher()).is_err());

    let bad = write(dir.path(), "bad.json", "{not json");
    let args = DigestArgs {
        input: input(bad),
        quiet: true,
    };
    assert!(digest_hex(&args, &dispatcher()).is_err());
}

#[test]
fn failed_command_reports_once_and_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    let output = std::process::Command::new(env!("CARGO_BIN_EXE_memokey"))
        .arg("digest")
        .arg(&missing)
        .env_remove("RUST_LOG")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("failed to read").count(), 1, "{stderr}");
}

// ---------------------------------------------------------------------------
// freeze
// ---------------------------------------------------------------------------

#[test]
fn freeze_renders_sorted_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "a.json", r#"{"b": 1, "a": [true, null]}"#);
    let args = FreezeArgs {
        input: input(path),
        text: false,
        compact: true,
    };
    let form = frozen(&args, &dispatcher()).unwrap();
    assert_eq!(render(&args, &form).unwrap(), r#"{"a":[true,null],"b":1}"#);
}

#[test]
fn freeze_text_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "a.yaml", "b: 1\na: x\n");
    let args = FreezeArgs {
        input: input(path),
        text: true,
        compact: false,
    };
    let form = frozen(&args, &dispatcher()).unwrap();
    assert_eq!(render(&args, &form).unwrap(), "{a: x, b: 1}");
}

// ---------------------------------------------------------------------------
// verify
// ---------------------------------------------------------------------------

#[test]
fn verify_matches_digest_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "a.json", r#"{"a": 1}"#);
    let hex = digest_of(path.clone());

    let ok = VerifyArgs {
        input: input(path.clone()),
        expect: hex,
    };
    assert_eq!(run_verify(&ok, &dispatcher()).unwrap(), 0);

    let wrong = VerifyArgs {
        input: input(path),
        expect: "0".repeat(64),
    };
    assert_eq!(run_verify(&wrong, &dispatcher()).unwrap(), 1);
}

#[test]
fn verify_rejects_malformed_expectation() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "a.json", "1");
    let args = VerifyArgs {
        input: input(path),
        expect: "xyz".to_string(),
    };
    assert!(run_verify(&args, &dispatcher()).is_err());
}

// ---------------------------------------------------------------------------
// handlers
// ---------------------------------------------------------------------------

#[test]
fn handlers_listing_succeeds() {
    assert_eq!(run_handlers(&HandlersArgs { json: true }, &dispatcher()).unwrap(), 0);
    assert_eq!(run_handlers(&HandlersArgs { json: false }, &dispatcher()).unwrap(), 0);
}
