//! Batch runner: every discovered model under every variant, one child
//! process at a time.
//!
//! Each invocation re-executes this binary's `run` subcommand so that a crash
//! or hang in one model never takes the batch down. Progress goes to a
//! timestamped text log and a JSON log in the log directory.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::BatchError;

const RULE: &str = "================================================================================";

/// Outcome of one child invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub success: bool,
    pub error: Option<String>,
    pub stdout: String,
    pub stderr: String,
}

impl InvocationResult {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            error: None,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(
        error: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// Runs one model under one variant.
#[async_trait]
pub trait InvocationRunner: Send + Sync {
    /// Display form of the command, for the logs.
    fn describe(&self, model: &str, variant: &str) -> String;

    /// Run to completion or until `timeout` elapses. Only spawn failures are
    /// errors; a failing child is an unsuccessful [`InvocationResult`].
    async fn invoke(
        &self,
        model: &str,
        variant: &str,
        timeout: Duration,
    ) -> Result<InvocationResult, BatchError>;
}

/// Spawns `{program} run --model M --variant V [--config C]`.
pub struct SubprocessRunner {
    program: PathBuf,
    config: Option<PathBuf>,
}

impl SubprocessRunner {
    pub fn new(program: PathBuf, config: Option<PathBuf>) -> Self {
        Self { program, config }
    }

    /// Re-execute the running binary.
    pub fn current_exe(config: Option<PathBuf>) -> Result<Self, BatchError> {
        Ok(Self::new(std::env::current_exe()?, config))
    }

    fn args(&self, model: &str, variant: &str) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--model".to_string(),
            model.to_string(),
            "--variant".to_string(),
            variant.to_string(),
        ];
        if let Some(config) = &self.config {
            args.push("--config".to_string());
            args.push(config.display().to_string());
        }
        args
    }
}

#[async_trait]
impl InvocationRunner for SubprocessRunner {
    fn describe(&self, model: &str, variant: &str) -> String {
        format!(
            "{} {}",
            self.program.display(),
            self.args(model, variant).join(" ")
        )
    }

    async fn invoke(
        &self,
        model: &str,
        variant: &str,
        timeout: Duration,
    ) -> Result<InvocationResult, BatchError> {
        let mut child = tokio::process::Command::new(&self.program)
            .args(self.args(model, variant))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BatchError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let stdout = OutputBuffer::default();
        let stderr = OutputBuffer::default();
        let readers = [
            child.stdout.take().map(|pipe| tokio::spawn(stdout.clone().drain(pipe))),
            child.stderr.take().map(|pipe| tokio::spawn(stderr.clone().drain(pipe))),
        ];

        let waited = tokio::time::timeout(timeout, child.wait()).await;
        if waited.is_err()
            && let Err(e) = child.kill().await
        {
            tracing::warn!(model, variant, "Failed to kill timed out child: {e}");
        }

        // A grandchild can keep a pipe open after the child dies.
        for reader in readers.into_iter().flatten() {
            if tokio::time::timeout(PIPE_DRAIN_GRACE, reader).await.is_err() {
                tracing::debug!(model, variant, "Output pipe still open; keeping partial output");
            }
        }
        let (stdout, stderr) = (stdout.text(), stderr.text());

        match waited {
            Ok(Ok(status)) if status.success() => Ok(InvocationResult {
                success: true,
                error: None,
                stdout,
                stderr,
            }),
            Ok(Ok(status)) => {
                let code = status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                Ok(InvocationResult::failed(
                    format!("Exit code: {code}"),
                    stdout,
                    stderr,
                ))
            }
            Ok(Err(e)) => Ok(InvocationResult::failed(
                format!("Failed to wait for child: {e}"),
                stdout,
                stderr,
            )),
            Err(_) => Ok(InvocationResult::failed(
                format!("Timeout after {}", format_duration(timeout)),
                stdout,
                stderr,
            )),
        }
    }
}

const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Child output collected chunk by chunk, readable while the reader still runs.
#[derive(Clone, Default)]
struct OutputBuffer(Arc<Mutex<Vec<u8>>>);

impl OutputBuffer {
    async fn drain<R: AsyncRead + Unpin>(self, mut pipe: R) {
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Ok(mut buf) = self.0.lock() {
                        buf.extend_from_slice(&chunk[..n]);
                    }
                }
            }
        }
    }

    fn text(&self) -> String {
        self.0
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

#[derive(Debug, Serialize)]
struct SessionLog {
    start_time: String,
    end_time: Option<String>,
    duration_seconds: Option<f64>,
    command_line_args: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
struct ModelsLog {
    discovered: Vec<String>,
    excluded: Vec<String>,
    tested: Vec<String>,
}

/// One entry of the JSON log's `tests` array.
#[derive(Debug, Clone, Serialize)]
pub struct TestEntry {
    pub model: String,
    pub variant: String,
    /// Command line of the invocation.
    pub script: String,
    pub success: bool,
    pub duration_seconds: f64,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

/// Final counts for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total_tests: usize,
    pub completed: usize,
    pub failed: usize,
}

impl BatchSummary {
    /// 0 when every invocation succeeded, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.failed == 0 { 0 } else { 1 }
    }
}

#[derive(Debug, Serialize)]
struct BatchLog {
    session: SessionLog,
    models: ModelsLog,
    tests: Vec<TestEntry>,
    summary: BatchSummary,
}

/// Text + JSON batch logs.
pub struct BatchLogger {
    text_path: PathBuf,
    json_path: PathBuf,
    text: File,
    data: BatchLog,
    started: Instant,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl BatchLogger {
    /// Create `batch_run_{timestamp}.log` in `log_dir`; the JSON file is
    /// written by [`BatchLogger::finalize`].
    pub fn create(log_dir: &Path, args: Vec<String>) -> Result<Self, BatchError> {
        std::fs::create_dir_all(log_dir)?;
        let now = Local::now();
        let stamp = now.format("%Y-%m-%d_%H-%M-%S");
        let text_path = log_dir.join(format!("batch_run_{stamp}.log"));
        let json_path = log_dir.join(format!("batch_run_{stamp}.json"));
        let text = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&text_path)?;

        let mut logger = Self {
            text_path,
            json_path,
            text,
            data: BatchLog {
                session: SessionLog {
                    start_time: iso(now),
                    end_time: None,
                    duration_seconds: None,
                    command_line_args: args,
                },
                models: ModelsLog::default(),
                tests: Vec::new(),
                summary: BatchSummary::default(),
            },
            started: Instant::now(),
        };

        logger.write_raw(&format!("{RULE}\nEnneagram LLM Test Suite - Batch Run Log\n{RULE}\n"))?;
        logger.write_raw(&format!(
            "Started at: {}\n",
            now.format("%Y-%m-%d %H:%M:%S")
        ))?;
        let paths = format!(
            "Text log: {}\nJSON log: {}\n{RULE}\n\n",
            logger.text_path.display(),
            logger.json_path.display()
        );
        logger.write_raw(&paths)?;
        Ok(logger)
    }

    pub fn text_path(&self) -> &Path {
        &self.text_path
    }

    pub fn json_path(&self) -> &Path {
        &self.json_path
    }

    pub fn tests(&self) -> &[TestEntry] {
        &self.data.tests
    }

    fn write_raw(&mut self, text: &str) -> Result<(), BatchError> {
        self.text.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Timestamped line in the text log, echoed through tracing.
    pub fn log(&mut self, message: &str) -> Result<(), BatchError> {
        tracing::info!("{message}");
        let line = format!(
            "[{}] {message}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        self.write_raw(&line)
    }

    pub fn models_discovered(&mut self, models: &[String]) -> Result<(), BatchError> {
        self.data.models.discovered = models.to_vec();
        self.log(&format!(
            "Discovered {} model(s): {}",
            models.len(),
            models.join(", ")
        ))
    }

    pub fn models_excluded(&mut self, excluded: &[String]) -> Result<(), BatchError> {
        self.data.models.excluded = excluded.to_vec();
        if excluded.is_empty() {
            return Ok(());
        }
        self.log(&format!(
            "Excluded {} model(s): {}",
            excluded.len(),
            excluded.join(", ")
        ))
    }

    pub fn models_tested(&mut self, models: &[String]) -> Result<(), BatchError> {
        self.data.models.tested = models.to_vec();
        self.log(&format!(
            "Testing {} model(s): {}",
            models.len(),
            models.join(", ")
        ))
    }

    pub fn test_start(
        &mut self,
        command: &str,
        test_num: usize,
        total: usize,
    ) -> Result<Instant, BatchError> {
        self.log(RULE)?;
        self.log(&format!("Test {test_num}/{total}: {command}"))?;
        self.log(RULE)?;
        Ok(Instant::now())
    }

    pub fn test_end(
        &mut self,
        model: &str,
        variant: &str,
        command: &str,
        result: &InvocationResult,
        started: Instant,
    ) -> Result<(), BatchError> {
        let duration = started.elapsed().as_secs_f64();
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());

        let entry = if result.success {
            TestEntry {
                model: model.to_string(),
                variant: variant.to_string(),
                script: command.to_string(),
                success: true,
                duration_seconds: round2(duration),
                timestamp: iso(Local::now()),
                error: None,
                stdout: None,
                stderr: None,
            }
        } else {
            TestEntry {
                model: model.to_string(),
                variant: variant.to_string(),
                script: command.to_string(),
                success: false,
                duration_seconds: round2(duration),
                timestamp: iso(Local::now()),
                error: Some(
                    result
                        .error
                        .clone()
                        .unwrap_or_else(|| "Unknown error".to_string()),
                ),
                stdout: non_empty(&result.stdout),
                stderr: non_empty(&result.stderr),
            }
        };

        if result.success {
            self.log(&format!("SUCCESS - Duration: {duration:.2}s"))?;
        } else {
            tracing::warn!(model, variant, error = ?entry.error, "Batch invocation failed");
            self.log(&format!("FAILED - Duration: {duration:.2}s"))?;
            if let Some(error) = &entry.error {
                self.write_raw(&format!("    Error: {error}\n"))?;
            }
            if let Some(stderr) = &entry.stderr {
                self.write_raw(&format!("    stderr: {stderr}\n"))?;
            }
        }

        self.data.tests.push(entry);
        Ok(())
    }

    /// Write the summary to the text log and the full JSON log.
    pub fn finalize(&mut self, summary: BatchSummary) -> Result<(), BatchError> {
        let duration = self.started.elapsed().as_secs_f64();
        self.data.session.end_time = Some(iso(Local::now()));
        self.data.session.duration_seconds = Some(round2(duration));
        self.data.summary = summary;

        self.log(RULE)?;
        self.log("FINAL SUMMARY")?;
        self.log(RULE)?;
        self.log(&format!("Total tests: {}", summary.total_tests))?;
        self.log(&format!("Completed: {}", summary.completed))?;
        self.log(&format!("Failed: {}", summary.failed))?;
        self.log(&format!(
            "Duration: {:.2} minutes ({:.0} seconds)",
            duration / 60.0,
            duration
        ))?;
        self.log(RULE)?;

        let json = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(&self.json_path, json)?;

        let text_path = self.text_path.display().to_string();
        let json_path = self.json_path.display().to_string();
        self.log(&format!("Logs saved: {text_path}, {json_path}"))
    }
}

fn iso(ts: DateTime<Local>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// What a batch runs.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub variants: Vec<String>,
    pub exclude: Vec<String>,
    pub model_timeout: Duration,
}

/// Run every remaining model under every variant.
///
/// Fails with [`BatchError::NoModels`] when nothing is left to test; the
/// logs are finalized in that case too.
pub async fn run_batch(
    discovered: Vec<String>,
    plan: &BatchPlan,
    runner: &dyn InvocationRunner,
    logger: &mut BatchLogger,
) -> Result<BatchSummary, BatchError> {
    if discovered.is_empty() {
        logger.log("No models found. Exiting.")?;
        logger.finalize(BatchSummary::default())?;
        return Err(BatchError::NoModels(String::new()));
    }
    logger.models_discovered(&discovered)?;

    let models: Vec<String> = discovered
        .into_iter()
        .filter(|m| !plan.exclude.contains(m))
        .collect();
    logger.models_excluded(&plan.exclude)?;

    if models.is_empty() {
        logger.log("No models remaining after exclusions. Exiting.")?;
        logger.finalize(BatchSummary::default())?;
        return Err(BatchError::NoModels(" after exclusions".to_string()));
    }
    logger.models_tested(&models)?;

    let mut summary = BatchSummary {
        total_tests: models.len() * plan.variants.len(),
        ..Default::default()
    };

    let mut test_num = 0;
    for (model_idx, model) in models.iter().enumerate() {
        logger.log(&format!(
            "MODEL {}/{}: {model}",
            model_idx + 1,
            models.len()
        ))?;

        for variant in &plan.variants {
            test_num += 1;
            let command = runner.describe(model, variant);
            let started = logger.test_start(
                &command,
                test_num,
                summary.total_tests,
            )?;

            let result = match runner.invoke(model, variant, plan.model_timeout).await {
                Ok(result) => result,
                Err(e) => InvocationResult::failed(e.to_string(), "", ""),
            };

            logger.test_end(model, variant, &command, &result, started)?;
            if result.success {
                summary.completed += 1;
            } else {
                summary.failed += 1;
            }
        }
    }

    logger.finalize(summary)?;
    for entry in logger.tests() {
        let mark = if entry.success { "ok" } else { "FAILED" };
        tracing::info!("{mark}: {} - {}", entry.model, entry.variant);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Fails any invocation whose model is listed in `failing`.
    struct FakeRunner {
        failing: Vec<&'static str>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl FakeRunner {
        fn new(failing: Vec<&'static str>) -> Self {
            Self {
                failing,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl InvocationRunner for FakeRunner {
        fn describe(&self, model: &str, variant: &str) -> String {
            format!("fake run --model {model} --variant {variant}")
        }

        async fn invoke(
            &self,
            model: &str,
            variant: &str,
            _timeout: Duration,
        ) -> Result<InvocationResult, BatchError> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), variant.to_string()));
            if self.failing.contains(&model) {
                Ok(InvocationResult::failed("Exit code: 1", "partial", "boom"))
            } else {
                Ok(InvocationResult::ok("done"))
            }
        }
    }

    fn plan(exclude: &[&str]) -> BatchPlan {
        BatchPlan {
            variants: vec!["labeled".to_string(), "unlabeled".to_string()],
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            model_timeout: Duration::from_secs(5),
        }
    }

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn read_json(logger: &BatchLogger) -> serde_json::Value {
        let text = std::fs::read_to_string(logger.json_path()).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_batch_runs_every_model_and_variant() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = BatchLogger::create(dir.path(), vec!["batch".to_string()]).unwrap();
        let runner = FakeRunner::new(vec![]);

        let summary = run_batch(models(&["a", "b", "skip"]), &plan(&["skip"]), &runner, &mut logger)
            .await
            .unwrap();

        assert_eq!(summary.total_tests, 4);
        assert_eq!(summary.completed, 4);
        assert_eq!(summary.exit_code(), 0);

        let calls = runner.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                ("a".to_string(), "labeled".to_string()),
                ("a".to_string(), "unlabeled".to_string()),
                ("b".to_string(), "labeled".to_string()),
                ("b".to_string(), "unlabeled".to_string()),
            ]
        );

        let json = read_json(&logger);
        assert_eq!(json["models"]["discovered"], serde_json::json!(["a", "b", "skip"]));
        assert_eq!(json["models"]["excluded"], serde_json::json!(["skip"]));
        assert_eq!(json["models"]["tested"], serde_json::json!(["a", "b"]));
        assert_eq!(json["session"]["command_line_args"], serde_json::json!(["batch"]));
        assert!(json["session"]["end_time"].is_string());
        assert!(json["tests"][0].get("error").is_none());
    }

    #[tokio::test]
    async fn test_batch_records_failures_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = BatchLogger::create(dir.path(), vec![]).unwrap();
        let runner = FakeRunner::new(vec!["bad"]);

        let summary = run_batch(models(&["bad", "good"]), &plan(&[]), &runner, &mut logger)
            .await
            .unwrap();

        assert_eq!(summary.failed, 2);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.exit_code(), 1);

        let json = read_json(&logger);
        let first = &json["tests"][0];
        assert_eq!(first["model"], "bad");
        assert_eq!(first["success"], false);
        assert_eq!(first["error"], "Exit code: 1");
        assert_eq!(first["stderr"], "boom");
        assert_eq!(first["script"], "fake run --model bad --variant labeled");
        assert_eq!(first["variant"], "labeled");
        assert_eq!(json["summary"]["failed"], 2);

        let text = std::fs::read_to_string(logger.text_path()).unwrap();
        assert!(text.contains("Test 1/4: fake run --model bad --variant labeled"));
        assert!(text.contains("    Error: Exit code: 1"));
        assert!(text.contains("FINAL SUMMARY"));
    }

    #[tokio::test]
    async fn test_batch_without_models_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = BatchLogger::create(dir.path(), vec![]).unwrap();
        let runner = FakeRunner::new(vec![]);

        let err = run_batch(vec![], &plan(&[]), &runner, &mut logger)
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::NoModels(_)));

        let err = run_batch(models(&["only"]), &plan(&["only"]), &runner, &mut logger)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("after exclusions"), "got: {err}");
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_subprocess_args() {
        let runner = SubprocessRunner::new(
            PathBuf::from("/usr/bin/enneabench"),
            Some(PathBuf::from("bench.toml")),
        );
        assert_eq!(
            runner.args("qwen2:7b", "labeled"),
            vec!["run", "--model", "qwen2:7b", "--variant", "labeled", "--config", "bench.toml"]
        );
        assert!(runner.describe("m", "v").starts_with("/usr/bin/enneabench run"));
    }

    #[tokio::test]
    async fn test_subprocess_spawn_failure() {
        let runner = SubprocessRunner::new(PathBuf::from("/nonexistent/enneabench"), None);
        let err = runner
            .invoke("m", "v", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Spawn { .. }));
    }

    /// Executable `/bin/sh` script standing in for the re-executed binary.
    #[cfg(unix)]
    fn shell_script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-enneabench");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_subprocess_timeout_keeps_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let script = shell_script(
            dir.path(),
            "echo partial-progress\necho err-progress >&2\nexec sleep 5",
        );
        let runner = SubprocessRunner::new(script, None);

        let started = Instant::now();
        let result = runner
            .invoke("m", "v", Duration::from_secs(1))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Timeout after 1s"));
        assert_eq!(result.stdout, "partial-progress\n");
        assert_eq!(result.stderr, "err-progress\n");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_subprocess_exit_code_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let script = shell_script(dir.path(), "echo \"args: $*\"\necho bad model >&2\nexit 3");
        let runner = SubprocessRunner::new(script, None);

        let result = runner
            .invoke("qwen2:7b", "labeled", Duration::from_secs(10))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Exit code: 3"));
        assert_eq!(result.stdout, "args: run --model qwen2:7b --variant labeled\n");
        assert_eq!(result.stderr, "bad model\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_batch_timeout_entry_is_logged_as_failed() {
        let dir = tempfile::tempdir().unwrap();
        let script = shell_script(dir.path(), "echo started\nexec sleep 5");
        let runner = SubprocessRunner::new(script, None);
        let mut logger = BatchLogger::create(&dir.path().join("logs"), vec![]).unwrap();
        let plan = BatchPlan {
            variants: vec!["unlabeled".to_string()],
            exclude: vec![],
            model_timeout: Duration::from_secs(1),
        };

        let summary = run_batch(models(&["slow"]), &plan, &runner, &mut logger)
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.exit_code(), 1);
        let json = read_json(&logger);
        assert_eq!(json["tests"][0]["error"], "Timeout after 1s");
        assert_eq!(json["tests"][0]["stdout"], "started\n");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(7200)), "2h");
        assert_eq!(format_duration(Duration::from_secs(600)), "10m");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
    }
}
