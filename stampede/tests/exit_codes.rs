use std::path::Path;
use std::process::{Command, Output};

use anyhow::Context as _;
use stampede_testserver::TestServer;

fn status_code(out: &Output) -> i32 {
    out.status.code().unwrap_or(-1)
}

fn ensure_code(out: &Output, expected: i32) -> anyhow::Result<()> {
    anyhow::ensure!(
        status_code(out) == expected,
        "expected exit code {expected}, got {}\nstdout:\n{}\nstderr:\n{}",
        status_code(out),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    Ok(())
}

/// Runs a short two-second ramp against `base_url` from inside `cwd`.
async fn short_run(cwd: &Path, base_url: String, extra: &[&str]) -> anyhow::Result<Output> {
    let exe = env!("CARGO_BIN_EXE_stampede");
    let cwd = cwd.to_path_buf();
    let extra: Vec<String> = extra.iter().map(|s| s.to_string()).collect();

    tokio::task::spawn_blocking(move || {
        Command::new(exe)
            .current_dir(&cwd)
            .arg("run")
            .args(&extra)
            .args(["--stage", "2s:2", "--control-interval", "100ms"])
            .args(["--output", "json"])
            .env("BASE_URL", &base_url)
            .output()
    })
    .await
    .context("spawn_blocking join")?
    .context("run stampede binary")
}

#[test]
fn invalid_flags_exit_30() -> anyhow::Result<()> {
    let out = Command::new(env!("CARGO_BIN_EXE_stampede"))
        .args(["run", "--stage", "10x:5"])
        .output()
        .context("run stampede binary")?;

    ensure_code(&out, 30)
}

#[test]
fn help_exits_0() -> anyhow::Result<()> {
    let out = Command::new(env!("CARGO_BIN_EXE_stampede"))
        .arg("--help")
        .output()
        .context("run stampede binary")?;

    ensure_code(&out, 0)
}

#[tokio::test]
async fn malformed_threshold_exits_30() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("bad.yaml");
    std::fs::write(
        &config,
        "stages:\n  - { duration: 1s, target: 1 }\nthresholds:\n  http_req_duration: \"p(95)<<5\"\n",
    )?;

    let config = config.display().to_string();
    let out = short_run(dir.path(), "http://127.0.0.1:1".to_string(), &[&config]).await?;
    ensure_code(&out, 30)
}

#[tokio::test]
async fn negative_stage_in_config_exits_30() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("negative.yaml");
    std::fs::write(&config, "stages:\n  - { duration: -5, target: 1 }\n")?;

    let exe = env!("CARGO_BIN_EXE_stampede");
    let out = Command::new(exe)
        .current_dir(dir.path())
        .arg("run")
        .arg(&config)
        .output()
        .context("run stampede binary")?;

    ensure_code(&out, 30)
}

#[tokio::test]
async fn escaping_summary_export_exits_30() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let out = short_run(
        dir.path(),
        "http://127.0.0.1:1".to_string(),
        &["--summary-export", "../escape.json"],
    )
    .await?;
    ensure_code(&out, 30)
}

#[tokio::test]
async fn thresholds_failed_exit_11() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let dir = tempfile::tempdir()?;

    let out = short_run(dir.path(), server.urls().broken_base_url.clone(), &[]).await?;
    let rejected = server.stats().tickets_rejected();
    server.shutdown().await;

    ensure_code(&out, 11)?;
    anyhow::ensure!(rejected > 0, "expected the broken endpoint to be hit");

    // The verdict is still exported.
    let export = dir.path().join("results/stress-summary.json");
    anyhow::ensure!(export.is_file(), "missing {}", export.display());
    Ok(())
}

#[tokio::test]
async fn healthy_service_exits_0_and_exports_summary() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let dir = tempfile::tempdir()?;

    let out = short_run(
        dir.path(),
        server.base_url().to_string(),
        &["--summary-export", "out/summary.json"],
    )
    .await?;
    let created = server.stats().tickets_created();
    server.shutdown().await;

    ensure_code(&out, 0)?;
    anyhow::ensure!(created > 0, "expected at least one ticket");

    let export = std::fs::read(dir.path().join("out/summary.json")).context("read export")?;
    let v: serde_json::Value = serde_json::from_slice(&export)?;
    anyhow::ensure!(v.get("passed").and_then(serde_json::Value::as_bool) == Some(true), "{v}");

    let stdout = String::from_utf8_lossy(&out.stdout);
    let summary = stdout
        .lines()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .find(|v| v.get("kind").and_then(serde_json::Value::as_str) == Some("summary"))
        .context("no summary line on stdout")?;
    anyhow::ensure!(
        summary.pointer("/report/title").and_then(serde_json::Value::as_str)
            == Some("TICKETERO STRESS TEST RESULTS"),
        "{summary}"
    );
    Ok(())
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn unwritable_stdout_is_logged_and_keeps_the_verdict() -> anyhow::Result<()> {
    use std::process::Stdio;

    let server = TestServer::start().await.context("start test server")?;
    let base_url = server.base_url().to_string();
    let dir = tempfile::tempdir()?;
    let cwd = dir.path().to_path_buf();

    for output in ["human-readable", "json"] {
        let exe = env!("CARGO_BIN_EXE_stampede");
        let cwd = cwd.clone();
        let base_url = base_url.clone();
        let out = tokio::task::spawn_blocking(move || -> anyhow::Result<Output> {
            let full = std::fs::OpenOptions::new().write(true).open("/dev/full")?;
            Ok(Command::new(exe)
                .current_dir(&cwd)
                .args(["run", "--stage", "2s:2", "--control-interval", "100ms"])
                .args(["--output", output])
                .env("BASE_URL", &base_url)
                .stdout(Stdio::from(full))
                .stderr(Stdio::piped())
                .output()?)
        })
        .await
        .context("spawn_blocking join")??;

        ensure_code(&out, 0)?;
        let stderr = String::from_utf8_lossy(&out.stderr);
        anyhow::ensure!(
            stderr.contains("failed to print summary"),
            "{output}: sink failure was not logged\nstderr:\n{stderr}"
        );
    }

    server.shutdown().await;
    Ok(())
}
