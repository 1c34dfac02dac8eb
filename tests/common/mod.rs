#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

fn tests_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests")
}

pub fn fixture(name: &str) -> String {
    let path = tests_root().join("fixtures").join(name);
    fs::read_to_string(&path).unwrap_or_else(|_| panic!("fixture {:?} not found", path))
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = tests_root().join("snapshots").join(name);
    if std::env::var("MEDIAN_DEGREE_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set MEDIAN_DEGREE_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}
