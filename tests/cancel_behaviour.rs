#![cfg(unix)]

mod common;
use crate::common::builders::{counting_executor, sh, sh_with};
use crate::common::{eventually, init_tracing, with_timeout};

use std::time::Duration;

use futures::StreamExt;
use procstream::exec::SpawnOptions;
use procstream::exec::jobber::channel_name;
use tokio::net::UnixListener;
use tokio::time::timeout;

#[tokio::test]
async fn dropping_last_subscriber_terminates_running_process() {
    init_tracing();
    let (executor, launcher) = counting_executor();
    let stream = executor.process_stream(sh("exec sleep 5"));

    let mut a = stream.subscribe();
    let b = stream.subscribe();
    // Nothing is printed; polling just starts the activation.
    assert!(timeout(Duration::from_millis(200), a.next()).await.is_err());
    assert_eq!(launcher.launches(), 1);

    drop(a);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(launcher.terminations(), 0, "one subscriber is still attached");
    assert!(stream.is_running());

    drop(b);
    eventually(|| launcher.terminations() == 1).await;
    assert!(!stream.is_running());

    // SIGTERM is enough for `sleep`; no forced kill within the grace period.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(launcher.terminations(), 1);
    assert_eq!(launcher.kills(), 0);
}

#[tokio::test]
async fn dropping_after_exit_does_not_terminate() {
    init_tracing();
    let (executor, launcher) = counting_executor();

    // The shell exits at once; its background child keeps stdout open.
    let stream = executor.process_stream(sh("(sleep 0.5; echo late) & exit 0"));
    let mut sub = stream.subscribe();
    assert!(timeout(Duration::from_millis(200), sub.next()).await.is_err());

    drop(sub);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(launcher.launches(), 1);
    assert_eq!(launcher.terminations(), 0);
    assert_eq!(launcher.kills(), 0);
}

#[tokio::test]
async fn dropping_unpolled_subscription_launches_nothing() {
    init_tracing();
    let (executor, launcher) = counting_executor();
    let stream = executor.process_stream(sh("echo never"));

    drop(stream.subscribe());
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(launcher.launches(), 0);
    assert_eq!(stream.activations(), 0);
}

#[tokio::test]
async fn dropping_decorated_stream_terminates_process() {
    init_tracing();
    let (executor, launcher) = counting_executor();
    let request =
        sh("exec sleep 5").with_options(SpawnOptions::new().timeout(Duration::from_secs(10)));

    let mut events = executor.spawn(request);
    assert!(timeout(Duration::from_millis(200), events.next()).await.is_err());
    drop(events);

    eventually(|| launcher.terminations() == 1).await;
    assert_eq!(launcher.kills(), 0);
}

#[tokio::test]
async fn ignored_termination_request_escalates_to_kill() {
    init_tracing();
    let (executor, launcher) = counting_executor();

    let options = SpawnOptions::new().termination_grace(Duration::from_millis(100));
    let stream =
        executor.process_stream(sh_with("trap '' TERM; echo ready; exec sleep 5", options));
    let mut sub = stream.subscribe();
    let ready = with_timeout(sub.next()).await.unwrap().unwrap();
    assert_eq!(ready.text, "ready\n");

    drop(sub);
    eventually(|| launcher.kills() == 1).await;
    assert_eq!(launcher.terminations(), 1);
}

#[tokio::test]
async fn jobber_mode_requests_shutdown_over_the_channel() {
    init_tracing();
    let (executor, launcher) = counting_executor();
    // `env` execs the real command, so it stands in for the helper and the
    // pid stays the same.
    let executor = executor.with_jobber_binary("env");

    let mut options = SpawnOptions::new().termination_grace(Duration::from_millis(100));
    options.jobber = true;
    let stream = executor.process_stream(sh_with("echo ready; exec sleep 5", options));
    let mut sub = stream.subscribe();
    with_timeout(sub.next()).await.unwrap().unwrap();

    assert!(launcher.launched()[0].cmd.ends_with("env"));
    let pid = launcher.pids()[0];
    let path = channel_name(pid);
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path).unwrap();

    drop(sub);
    let accepted = with_timeout(listener.accept()).await;
    assert!(accepted.is_ok());

    // Nothing acts on the request here, so the grace period runs out.
    eventually(|| launcher.kills() == 1).await;
    assert_eq!(launcher.terminations(), 0);
    let _ = std::fs::remove_file(&path);
}
