//! Tests for error types

use shell_pool::core::{JobError, JobErrorKind, SchedulerError};

#[test]
fn test_pool_killed_error() {
    assert_eq!(SchedulerError::PoolKilled.to_string(), "pool has been killed");
}

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("total_units must be greater than 0".into());
    assert_eq!(
        err.to_string(),
        "invalid configuration: total_units must be greater than 0"
    );
}

#[test]
fn test_backend_error() {
    let err = SchedulerError::Backend("failed to build runtime".to_string());
    assert_eq!(err.to_string(), "backend error: failed to build runtime");
}

#[test]
fn test_job_error_is_transparent() {
    let job = JobError {
        prefix: "fetch".into(),
        command: "curl example.invalid".into(),
        kind: JobErrorKind::Launch("No such file or directory".into()),
    };
    let err = SchedulerError::from(job.clone());
    assert_eq!(err.to_string(), job.to_string());
    assert_eq!(
        err.to_string(),
        "job `fetch` (curl example.invalid) failed to start: No such file or directory"
    );
}

#[test]
fn test_signal_exit_message() {
    let kind = JobErrorKind::Exit {
        code: None,
        signal: Some(9),
    };
    assert_eq!(
        kind.to_string(),
        "exited unsuccessfully (code: None, signal: Some(9))"
    );
}
