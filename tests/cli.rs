// End-to-end tests that spawn the compiled binary against temp corpora.
use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use std::process::Command;

mod util;

use util::{mixed_corpus, read_json, rec_json, write_corpus};

// Binary with logging silenced and the temp dir as working directory, so
// no developer config file leaks into the run.
fn cedup(tmp: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cedup").expect("bin");
    cmd.current_dir(tmp.path()).env("CEDUP_LOG", "off");
    cmd
}

#[test]
fn find_writes_groups_summary_and_report() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let input = write_corpus(&tmp, "errors.json", &mixed_corpus());

    cedup(&tmp)
        .arg("find")
        .arg(&input)
        .args(["-o", "out", "--seed", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 1 groups"));

    let out = tmp.child("out");
    out.child("compile_errors_similar_group_1.json")
        .assert(predicate::path::exists());

    let summary = read_json(out.child("compile_errors_similarity_summary.json").path());
    assert_eq!(summary["total_groups"], 1);
    assert_eq!(summary["total_duplicates"], 2);
    assert_eq!(summary["total_buckets"], 3);
    assert_eq!(summary["naive_comparisons"], 6);
    assert_eq!(summary["comparisons_made"], 1);
    assert_eq!(summary["groups_info"][0]["uuids"], serde_json::json!(["u1", "u3"]));
    assert_eq!(
        summary["groups_info"][0]["file"],
        "compile_errors_similar_group_1.json"
    );

    // Group files carry the original objects
    let group = read_json(out.child("compile_errors_similar_group_1.json").path());
    assert_eq!(group.as_array().map(Vec::len), Some(2));
    assert_eq!(group[1]["uuid"], "u3");
    assert_eq!(group[1]["error_type_detail"], "missing_semicolon");

    let report = read_json(out.child("compile_errors_analysis_report.json").path());
    assert_eq!(report["analysis_summary"]["total_records"], 4);
    assert_eq!(report["analysis_summary"]["duplicate_ratio"], 0.5);
    assert_eq!(report["analysis_summary"]["similarity_threshold_used"], 0.9);
    assert_eq!(report["error_type_analysis"]["most_common"][0][0], "syntax");
    assert_eq!(report["error_type_analysis"]["most_common"][0][1], 2);
    assert!(report["similarity_distribution"]["total_comparisons"].is_number());
}

#[test]
fn find_honours_base_name() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let input = write_corpus(&tmp, "errors.json", &mixed_corpus());

    cedup(&tmp)
        .arg("find")
        .arg(&input)
        .args(["-o", "out", "--base-name", "train", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    tmp.child("out/train_similarity_summary.json")
        .assert(predicate::path::exists());
}

#[test]
fn find_without_duplicates_writes_nothing() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let input = write_corpus(
        &tmp,
        "errors.json",
        &[
            rec_json("a", "t", "d", "int a;", "x"),
            rec_json("b", "t", "d", "while (1) { run(); }", "y"),
        ],
    );

    cedup(&tmp)
        .arg("find")
        .arg(&input)
        .args(["-o", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing written"));

    tmp.child("out").assert(predicate::path::missing());
}

#[test]
fn find_dry_run_leaves_disk_untouched() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let input = write_corpus(&tmp, "errors.json", &mixed_corpus());

    cedup(&tmp)
        .arg("--dry-run")
        .arg("find")
        .arg(&input)
        .args(["-o", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY RUN"));

    tmp.child("out").assert(predicate::path::missing());
}

#[test]
fn find_rejects_non_array_input() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    tmp.child("bad.json")
        .write_str(r#"{"uuid": "a"}"#)
        .expect("write");

    cedup(&tmp)
        .args(["find", "bad.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON array"));
}

#[test]
fn find_rejects_threshold_outside_unit_range() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let input = write_corpus(&tmp, "errors.json", &mixed_corpus());

    cedup(&tmp)
        .arg("find")
        .arg(&input)
        .args(["-t", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("within [0, 1]"));
}

#[test]
fn config_file_in_working_directory_is_applied() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let input = write_corpus(&tmp, "errors.json", &mixed_corpus());
    tmp.child("cedup.toml")
        .write_str("[similarity]\nthreshold = 0.999\n")
        .expect("write config");

    cedup(&tmp)
        .arg("find")
        .arg(&input)
        .args(["-o", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("100% similarity threshold"));
}

#[test]
fn unbalanced_weights_fail_fast() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let input = write_corpus(&tmp, "errors.json", &mixed_corpus());

    cedup(&tmp)
        .env("CEDUP_SIMILARITY__RECORD_WEIGHTS__CODE", "0.9")
        .arg("find")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("must sum to 1.0"));
}

#[test]
fn analyze_prints_json_statistics() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let input = write_corpus(&tmp, "errors.json", &mixed_corpus());

    let assert = cedup(&tmp)
        .arg("analyze")
        .arg(&input)
        .arg("--json")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let v: Value = serde_json::from_str(&stdout).expect("json");
    // 4 records, window of 10: 3 + 2 + 1
    assert_eq!(v["total_comparisons"], 6);
    assert_eq!(v["sampled_records"], 4);
    assert!(v["avg_similarity"].as_f64().is_some());
}

#[test]
fn analyze_reports_missing_data() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let input = write_corpus(&tmp, "one.json", &[rec_json("a", "t", "d", "int a;", "x")]);

    cedup(&tmp)
        .arg("analyze")
        .arg(&input)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("No similarities calculated"));
}

#[test]
fn dedupe_keeps_one_record_per_group() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let input = write_corpus(&tmp, "errors.json", &mixed_corpus());

    cedup(&tmp)
        .arg("find")
        .arg(&input)
        .args(["-o", "out", "--quiet"])
        .assert()
        .success();

    cedup(&tmp)
        .arg("dedupe")
        .arg(&input)
        .args(["-s", "out/compile_errors_similarity_summary.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed 1"));

    let kept = read_json(tmp.child("errors_deduplicated.json").path());
    let ids: Vec<&str> = kept
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|r| r["uuid"].as_str())
        .collect();
    assert_eq!(ids, vec!["u1", "u2", "u4"]);

    let report = read_json(
        tmp.child("errors_deduplicated_deduplication_report.json")
            .path(),
    );
    assert_eq!(report["deduplication_summary"]["original_count"], 4);
    assert_eq!(report["deduplication_summary"]["removed_count"], 1);
    assert_eq!(report["deduplication_summary"]["deduplication_rate"], 25.0);
    assert_eq!(report["similarity_analysis"]["similarity_threshold"], "90%");
    assert_eq!(report["group_size_distribution"]["2"], 1);
}

#[test]
fn dedupe_writes_kept_objects_exactly_as_read() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let mut corpus = mixed_corpus();
    // Numeric ids, nulls, extra fields and a non-schema key order
    corpus[1] = serde_json::json!({
        "score": 1,
        "error_example_llm_code": "float f = \"text\";",
        "uuid": 2,
        "error_type": "type",
        "error_type_detail": null,
        "notes": ["a", {"b": 2.5}]
    });
    corpus.push(serde_json::json!({"id": 9, "uuid": "u9", "error_type": null}));
    let input = write_corpus(&tmp, "errors.json", &corpus);

    cedup(&tmp)
        .arg("find")
        .arg(&input)
        .args(["-o", "out", "-t", "0.8", "--quiet"])
        .assert()
        .success();

    let group = read_json(tmp.child("out/compile_errors_similar_group_1.json").path());
    assert_eq!(
        serde_json::to_string(&group[1]).expect("serialize"),
        serde_json::to_string(&corpus[2]).expect("serialize")
    );

    cedup(&tmp)
        .arg("dedupe")
        .arg(&input)
        .args(["-s", "out/compile_errors_similarity_summary.json", "-o", "clean.json"])
        .assert()
        .success();

    let kept = read_json(tmp.child("clean.json").path());
    let kept = kept.as_array().expect("array");
    let expected: Vec<&Value> = [0, 1, 3, 4].iter().map(|&i| &corpus[i]).collect();
    assert_eq!(kept.len(), expected.len());
    for (got, want) in kept.iter().zip(expected) {
        assert_eq!(
            serde_json::to_string(got).expect("serialize"),
            serde_json::to_string(want).expect("serialize")
        );
    }

    // Threshold comes from the summary, not the current config
    let report = read_json(tmp.child("clean_deduplication_report.json").path());
    assert_eq!(report["similarity_analysis"]["similarity_threshold"], "80%");
}

#[test]
fn dedupe_rejects_malformed_summary() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let input = write_corpus(&tmp, "errors.json", &mixed_corpus());
    tmp.child("summary.json")
        .write_str(r#"{"groups": []}"#)
        .expect("write");

    cedup(&tmp)
        .arg("dedupe")
        .arg(&input)
        .args(["-s", "summary.json", "-o", "clean.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a similarity summary"));

    tmp.child("clean.json").assert(predicate::path::missing());
}

#[test]
fn sample_writes_requested_subset() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let input = write_corpus(&tmp, "errors.json", &mixed_corpus());

    cedup(&tmp)
        .arg("sample")
        .arg(&input)
        .args(["-n", "2", "--seed", "7", "-o", "subset.json"])
        .assert()
        .success();

    let subset = read_json(tmp.child("subset.json").path());
    assert_eq!(subset.as_array().map(Vec::len), Some(2));
}

#[test]
fn sample_of_small_corpus_keeps_everything() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let input = write_corpus(&tmp, "errors.json", &mixed_corpus());

    cedup(&tmp)
        .arg("sample")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("only 4 records"));

    let subset = read_json(tmp.child("errors_sample_100.json").path());
    assert_eq!(subset.as_array().map(Vec::len), Some(4));
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    cedup(&tmp).arg("init").assert().success();
    tmp.child("cedup.toml")
        .assert(predicate::str::contains("[similarity]"));

    cedup(&tmp)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    cedup(&tmp).args(["init", "--force"]).assert().success();
}

#[test]
fn completions_print_to_stdout() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    cedup(&tmp)
        .args(["completions", "bash", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cedup"));
}
