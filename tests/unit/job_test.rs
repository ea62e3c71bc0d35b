//! Tests for job specs

use shell_pool::core::{summarize, JobSpec, SUMMARY_LEN};

#[test]
fn test_job_spec_from_json() {
    let spec: JobSpec = serde_json::from_str(r#"{"command": "make"}"#).unwrap();
    assert_eq!(spec.command, "make");
    assert_eq!(spec.cpus, 0);
    assert_eq!(spec.units(), 1);
    assert_eq!(spec.prefix, "");
}

#[test]
fn test_normalized_raises_zero_cpus() {
    let spec = JobSpec::new("true").with_cpus(0).normalized();
    assert_eq!(spec.cpus, 1);
    let spec = JobSpec::new("true").with_cpus(7).normalized();
    assert_eq!(spec.cpus, 7);
}

#[test]
fn test_summary_short_command_unchanged() {
    assert_eq!(summarize("ls -lh"), "ls -lh");
    assert_eq!(JobSpec::new("ls -lh").summary(), "ls -lh");
}

#[test]
fn test_summary_truncates_long_command() {
    let command = "a".repeat(SUMMARY_LEN * 2);
    assert_eq!(summarize(&command).chars().count(), SUMMARY_LEN);
}
