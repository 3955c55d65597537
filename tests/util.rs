//! Shared test utilities for integration tests
//!
//! Record builders plus on-disk corpus fixtures used by the library and
//! CLI test files.

#![allow(dead_code)]

use std::path::PathBuf;

use assert_fs::prelude::*;
use cedup::Record;
use serde_json::{Value, json};

/// Code shared by the duplicate fixtures
pub const DUP_CODE: &str = "int main() {\n  int x = 1;\n  return x;\n}";

/// Build a record in memory
pub fn rec(
    id: &str,
    category: &str,
    subcategory: &str,
    code: &str,
    detail: &str,
) -> Record
{
    Record::new(id, category, subcategory, code, detail)
}

/// Same record as JSON, in the on-disk schema
pub fn rec_json(
    id: &str,
    category: &str,
    subcategory: &str,
    code: &str,
    detail: &str,
) -> Value
{
    json!({
        "uuid": id,
        "error_type": category,
        "error_type_detail": subcategory,
        "error_example_llm_code": code,
        "error_example_llm_detail": detail,
    })
}

/// Small corpus with one duplicate pair, one unrelated record and one
/// record that repeats the pair's code under another category.
pub fn mixed_corpus() -> Vec<Value>
{
    vec![
        rec_json("u1", "syntax", "missing_semicolon", DUP_CODE, "main.c:3:12: error: expected ';'"),
        rec_json(
            "u2",
            "type",
            "implicit_conversion",
            "float f = \"text\";",
            "conv.c:1:11: error: incompatible types",
        ),
        rec_json(
            "u3",
            "syntax",
            "missing_semicolon",
            "int main() { int x = 1; /* init */ return x; }",
            "other.c:8:2: error: expected ';'",
        ),
        rec_json("u4", "semantic", "undeclared", DUP_CODE, "main.c:3:12: error: expected ';'"),
    ]
}

/// Write `records` as a JSON array into a fresh temp dir
pub fn write_corpus(
    tmp: &assert_fs::TempDir,
    name: &str,
    records: &[Value],
) -> PathBuf
{
    let child = tmp.child(name);
    child
        .write_str(&serde_json::to_string_pretty(records).expect("serialize corpus"))
        .expect("write corpus");
    child
        .path()
        .to_path_buf()
}

/// Read a JSON document written by the binary
pub fn read_json(path: &std::path::Path) -> Value
{
    let text = std::fs::read_to_string(path).expect("read output");
    serde_json::from_str(&text).expect("parse output")
}
