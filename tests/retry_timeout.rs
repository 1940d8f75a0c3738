#![cfg(unix)]

mod common;
use crate::common::builders::{counting_executor, quick_retries, sh, sh_with};
use crate::common::{drain, init_tracing, with_timeout};

use std::time::{Duration, Instant};

use procstream::ErrorKind;
use procstream::errors::TIMEOUT_EXIT_CODE;
use procstream::exec::{SpawnOptions, SpawnRequest};

#[tokio::test]
async fn nonzero_exit_is_retried_until_attempts_run_out() {
    init_tracing();
    let (executor, launcher) = counting_executor();

    let started = Instant::now();
    let err = with_timeout(executor.run(sh_with("echo try; exit 1", quick_retries(2))))
        .await
        .unwrap_err();

    assert_eq!(launcher.launches(), 3);
    assert!(started.elapsed() >= Duration::from_millis(20));
    assert_eq!(err.kind, ErrorKind::Exit);
    assert_eq!(err.exit_code, Some(1));
    assert_eq!(err.attempt, 3);
    // Only the final attempt's output is kept.
    assert_eq!(err.stdout.as_deref(), Some("try\n"));
    assert!(err.message.starts_with("try\n"));
    assert!(err.message.ends_with("failed with exit code: 1"));
}

#[tokio::test]
async fn retry_stops_at_first_success() {
    init_tracing();
    let (executor, launcher) = counting_executor();
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("marker");

    // Fails once, succeeds on the second launch.
    let script = format!(
        "if [ -e '{m}' ]; then echo ok; else touch '{m}'; echo nope; exit 3; fi",
        m = marker.display()
    );
    let out = with_timeout(executor.run(sh_with(&script, quick_retries(5))))
        .await
        .unwrap();

    assert_eq!(out, "ok\n");
    assert_eq!(launcher.launches(), 2);
}

#[tokio::test]
async fn every_attempt_is_visible_on_the_event_stream() {
    init_tracing();
    let (executor, _launcher) = counting_executor();

    let (events, err) =
        with_timeout(drain(executor.spawn(sh_with("echo x; exit 2", quick_retries(1))))).await;

    let attempts: Vec<u32> = events.iter().map(|e| e.attempt).collect();
    assert_eq!(attempts, vec![1, 2]);
    assert_eq!(err.unwrap().attempt, 2);
}

#[tokio::test]
async fn launch_failure_is_not_retried() {
    init_tracing();
    let (executor, launcher) = counting_executor();

    let request = SpawnRequest::new("procstream-definitely-missing-binary", Vec::<String>::new())
        .with_options(quick_retries(3));
    let err = with_timeout(executor.run(request)).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Launch);
    assert_eq!(err.exit_code, None);
    assert_eq!(launcher.launches(), 1);
}

#[tokio::test]
async fn deadline_kills_the_process() {
    init_tracing();
    let (executor, launcher) = counting_executor();

    let options = SpawnOptions::new().timeout(Duration::from_millis(50));
    let started = Instant::now();
    let err = with_timeout(executor.run(sh_with("exec sleep 5", options)))
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(err.kind, ErrorKind::Timeout);
    assert_eq!(err.exit_code, Some(TIMEOUT_EXIT_CODE));
    assert_eq!(launcher.kills(), 1);
    assert_eq!(launcher.terminations(), 0);
}

#[tokio::test]
async fn timeout_is_not_retried() {
    init_tracing();
    let (executor, launcher) = counting_executor();

    let options = quick_retries(2).timeout(Duration::from_millis(50));
    let err = with_timeout(executor.run(sh_with("exec sleep 5", options)))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Timeout);
    assert_eq!(launcher.launches(), 1);
}

#[tokio::test]
async fn deadline_applies_per_attempt() {
    init_tracing();
    let (executor, launcher) = counting_executor();

    // Each attempt finishes well inside the deadline, even though all
    // attempts together take longer than it.
    let options = quick_retries(2)
        .retry_delay(Duration::from_millis(60))
        .timeout(Duration::from_millis(100));
    let err = with_timeout(executor.run(sh_with("exit 1", options)))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Exit);
    assert_eq!(launcher.launches(), 3);
}

#[tokio::test]
async fn zero_timeout_means_no_deadline() {
    init_tracing();
    let (executor, _launcher) = counting_executor();

    let options = SpawnOptions::new().timeout(Duration::ZERO);
    let out = with_timeout(executor.run(sh_with("sleep 0.1; echo done", options)))
        .await
        .unwrap();
    assert_eq!(out, "done\n");
}

#[tokio::test]
async fn success_without_retries_launches_once() {
    init_tracing();
    let (executor, launcher) = counting_executor();
    let out = with_timeout(executor.run(sh("echo hi"))).await.unwrap();
    assert_eq!(out, "hi\n");
    assert_eq!(launcher.launches(), 1);
}

#[tokio::test]
async fn deadline_covers_output_held_open_after_exit() {
    init_tracing();
    let (executor, launcher) = counting_executor();

    // The shell exits at once; its background child keeps the pipes open.
    let options = SpawnOptions::new().timeout(Duration::from_millis(100));
    let started = Instant::now();
    let err = with_timeout(executor.run(sh_with("sleep 3 & exit 0", options)))
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(err.kind, ErrorKind::Timeout);
    assert_eq!(err.exit_code, Some(TIMEOUT_EXIT_CODE));
    assert_eq!(launcher.launches(), 1);
}

#[tokio::test]
async fn detached_deadline_after_exit_kills_the_group() {
    init_tracing();
    let (executor, launcher) = counting_executor();

    let options = SpawnOptions::new().timeout(Duration::from_millis(100));
    let started = Instant::now();
    let err = with_timeout(executor.run_detached(sh_with("sleep 3 & exit 0", options)))
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(err.kind, ErrorKind::Timeout);
    assert_eq!(launcher.kills(), 1);
}
