//! Subprocess invoker tests against stub model runners.
#![cfg(unix)]

use std::time::Duration;

use tempfile::TempDir;

use draftsman_core::invoker::{InvokeError, ModelInvoker, SubprocessInvoker};
use draftsman_test_utils::write_stub_runner;

fn invoker_for(dir: &TempDir, body: &str) -> SubprocessInvoker {
    let runner = write_stub_runner(dir.path(), "runner", body);
    SubprocessInvoker::new(runner.to_string_lossy().into_owned())
}

#[tokio::test]
async fn echoes_prompt_through_stdout_trimmed() {
    let dir = TempDir::new().unwrap();
    let invoker = invoker_for(&dir, "cat");

    let out = invoker.invoke("  hello model  \n", "m").await.unwrap();
    assert_eq!(out, "hello model");
}

#[tokio::test]
async fn runner_receives_run_and_model_arguments() {
    let dir = TempDir::new().unwrap();
    let invoker = invoker_for(&dir, "cat > /dev/null\necho \"$1|$2|$#\"");

    let out = invoker.invoke("prompt", "codellama:7b").await.unwrap();
    assert_eq!(out, "run|codellama:7b|2");
}

#[tokio::test]
async fn stderr_alone_is_not_a_failure() {
    let dir = TempDir::new().unwrap();
    let invoker = invoker_for(&dir, "cat > /dev/null\necho 'pulling manifest' >&2\necho answer");

    let out = invoker.invoke("p", "m").await.unwrap();
    assert_eq!(out, "answer");
}

#[tokio::test]
async fn non_zero_exit_is_tool_execution_failed() {
    let dir = TempDir::new().unwrap();
    let invoker = invoker_for(&dir, "cat > /dev/null\necho 'model not found' >&2\nexit 3");

    let err = invoker.invoke("p", "m").await.unwrap_err();
    match err {
        InvokeError::ToolExecutionFailed { exit_code, stderr } => {
            assert_eq!(exit_code, Some(3));
            assert!(stderr.contains("model not found"), "stderr: {stderr:?}");
        }
        other => panic!("expected ToolExecutionFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_utf8_is_replaced_not_fatal() {
    let dir = TempDir::new().unwrap();
    let invoker = invoker_for(&dir, "cat > /dev/null\nprintf 'ok \\377 done'");

    let out = invoker.invoke("p", "m").await.unwrap();
    assert_eq!(out, "ok \u{FFFD} done");
}

#[tokio::test]
async fn non_ascii_round_trips() {
    let dir = TempDir::new().unwrap();
    let invoker = invoker_for(&dir, "cat");

    let out = invoker.invoke("créer un dossier « rapports » 📁", "m").await.unwrap();
    assert_eq!(out, "créer un dossier « rapports » 📁");
}

#[tokio::test]
async fn large_prompt_does_not_deadlock() {
    let dir = TempDir::new().unwrap();
    let invoker = invoker_for(&dir, "cat");
    let prompt = "x".repeat(1024 * 1024);

    let out = invoker.invoke(&prompt, "m").await.unwrap();
    assert_eq!(out.len(), prompt.len());
}

#[tokio::test]
async fn runner_ignoring_stdin_still_succeeds() {
    let dir = TempDir::new().unwrap();
    let invoker = invoker_for(&dir, "echo fixed");

    let out = invoker.invoke("short prompt", "m").await.unwrap();
    assert_eq!(out, "fixed");
}

#[tokio::test]
async fn timeout_kills_hung_runner() {
    let dir = TempDir::new().unwrap();
    let invoker =
        invoker_for(&dir, "sleep 60").with_timeout(Some(Duration::from_secs(1)));

    let err = invoker.invoke("p", "m").await.unwrap_err();
    match err {
        InvokeError::ToolIoFailed { context, source } => {
            assert!(context.contains("timed out"), "context: {context}");
            assert_eq!(source.kind(), std::io::ErrorKind::TimedOut);
        }
        other => panic!("expected ToolIoFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn non_executable_runner_is_io_failure() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("not-executable");
    std::fs::write(&path, "#!/bin/sh\necho hi\n").unwrap();

    let invoker = SubprocessInvoker::new(path.to_string_lossy().into_owned());
    let err = invoker.invoke("p", "m").await.unwrap_err();
    assert!(matches!(err, InvokeError::ToolIoFailed { .. }), "got {err:?}");
}
