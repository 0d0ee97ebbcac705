//! BirdNET-Pi helper scripts
//!
//! Scripts run through a `CommandRunner`; this module only builds argument
//! lists and interprets output.

use bnp_common::process::CommandRunner;
use bnp_common::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const PREVIEW_TIMEOUT: Duration = Duration::from_secs(60);
pub const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PREVIEW_THRESHOLD: f64 = 0.03;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesPreview {
    pub threshold: f64,
    pub count: usize,
    pub species: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationResult {
    pub success: bool,
    pub message: String,
}

#[derive(Clone)]
pub struct HelperScripts {
    base_path: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl HelperScripts {
    pub fn new(base_path: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            base_path: base_path.into(),
            runner,
        }
    }

    fn python(&self) -> PathBuf {
        self.base_path.join("birdnet").join("bin").join("python3")
    }

    fn script(&self, name: &str) -> PathBuf {
        self.base_path.join("scripts").join(name)
    }

    /// Species the model would report at `threshold` for this location and week
    pub async fn preview_species(&self, threshold: f64) -> Result<SpeciesPreview> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::InvalidInput(format!(
                "threshold must be between 0 and 1, got {}",
                threshold
            )));
        }

        let args = vec![
            path_arg(&self.python()),
            path_arg(&self.script("species.py")),
            "--threshold".to_string(),
            threshold.to_string(),
        ];
        let output = self.runner.run(&args, PREVIEW_TIMEOUT).await?;

        if !output.success() {
            warn!(exit_code = output.exit_code, stderr = %output.stderr.trim(), "species.py failed");
            return Err(Error::Unavailable(format!(
                "Species preview failed: {}",
                output.stderr.trim()
            )));
        }

        let species: Vec<String> = output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Ok(SpeciesPreview {
            threshold,
            count: species.len(),
            species,
        })
    }

    /// Send a test notification through the configured notification services
    ///
    /// Failures are reported in the result rather than as errors.
    pub async fn send_test_notification(
        &self,
        title: Option<&str>,
        body: Option<&str>,
    ) -> Result<NotificationResult> {
        let script = self.script("send_test_notification.py");
        if !tokio::fs::try_exists(&script).await.unwrap_or(false) {
            return Err(Error::Unavailable("Notification script not found".to_string()));
        }

        let mut args = vec![path_arg(&self.python()), path_arg(&script)];
        if let Some(title) = title.filter(|t| !t.is_empty()) {
            args.push("--title".to_string());
            args.push(title.to_string());
        }
        if let Some(body) = body.filter(|b| !b.is_empty()) {
            args.push("--body".to_string());
            args.push(body.to_string());
        }

        let result = match self.runner.run(&args, NOTIFICATION_TIMEOUT).await {
            Ok(output) if output.success() => NotificationResult {
                success: true,
                message: non_empty_or(output.stdout.trim(), "Test notification sent"),
            },
            Ok(output) => NotificationResult {
                success: false,
                message: non_empty_or(output.stderr.trim(), "Notification failed"),
            },
            Err(e) => NotificationResult {
                success: false,
                message: e.to_string(),
            },
        };

        info!(success = result.success, "Test notification attempted");
        Ok(result)
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn non_empty_or(text: &str, fallback: &str) -> String {
    if text.is_empty() {
        fallback.to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bnp_common::process::CommandOutput;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Runner returning a canned output and recording the arguments
    struct ScriptedRunner {
        output: Result<CommandOutput>,
        seen: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedRunner {
        fn new(output: Result<CommandOutput>) -> Arc<Self> {
            Arc::new(Self {
                output,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, args: &[String], _timeout: Duration) -> Result<CommandOutput> {
            self.seen.lock().unwrap().push(args.to_vec());
            match &self.output {
                Ok(output) => Ok(output.clone()),
                Err(e) => Err(Error::Unavailable(e.to_string())),
            }
        }
    }

    fn output(code: i32, stdout: &str, stderr: &str) -> Result<CommandOutput> {
        Ok(CommandOutput {
            exit_code: code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        })
    }

    #[tokio::test]
    async fn test_preview_parses_lines() {
        let runner = ScriptedRunner::new(output(
            0,
            "Turdus migratorius_American Robin\n\nCardinalis cardinalis_Northern Cardinal\n",
            "",
        ));
        let scripts = HelperScripts::new("/opt/birdnet", runner.clone());

        let preview = scripts.preview_species(0.05).await.unwrap();
        assert_eq!(preview.count, 2);
        assert_eq!(preview.species[0], "Turdus migratorius_American Robin");

        let seen = runner.seen.lock().unwrap();
        assert_eq!(
            seen[0],
            vec![
                "/opt/birdnet/birdnet/bin/python3",
                "/opt/birdnet/scripts/species.py",
                "--threshold",
                "0.05"
            ]
        );
    }

    #[tokio::test]
    async fn test_preview_failure_is_unavailable() {
        let runner = ScriptedRunner::new(output(1, "", "model missing"));
        let scripts = HelperScripts::new("/opt/birdnet", runner);
        assert!(matches!(
            scripts.preview_species(0.03).await,
            Err(Error::Unavailable(msg)) if msg.contains("model missing")
        ));
    }

    #[tokio::test]
    async fn test_preview_rejects_bad_threshold() {
        let runner = ScriptedRunner::new(output(0, "", ""));
        let scripts = HelperScripts::new("/opt/birdnet", runner.clone());
        assert!(matches!(scripts.preview_species(1.5).await, Err(Error::InvalidInput(_))));
        assert!(runner.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notification_reports_failure_in_payload() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("scripts")).unwrap();
        std::fs::write(dir.path().join("scripts/send_test_notification.py"), "").unwrap();

        let runner = ScriptedRunner::new(Err(Error::Unavailable("timed out".to_string())));
        let scripts = HelperScripts::new(dir.path(), runner.clone());

        let result = scripts.send_test_notification(Some("Hi"), None).await.unwrap();
        assert!(!result.success);
        assert!(result.message.contains("timed out"));

        let seen = runner.seen.lock().unwrap();
        assert_eq!(&seen[0][2..], &["--title".to_string(), "Hi".to_string()]);
    }

    #[tokio::test]
    async fn test_notification_success() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("scripts")).unwrap();
        std::fs::write(dir.path().join("scripts/send_test_notification.py"), "").unwrap();

        let runner = ScriptedRunner::new(output(0, "", ""));
        let scripts = HelperScripts::new(dir.path(), runner);
        let result = scripts.send_test_notification(None, None).await.unwrap();
        assert_eq!(
            result,
            NotificationResult {
                success: true,
                message: "Test notification sent".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_notification_without_script_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let scripts = HelperScripts::new(dir.path(), ScriptedRunner::new(output(0, "", "")));
        assert!(matches!(
            scripts.send_test_notification(None, None).await,
            Err(Error::Unavailable(_))
        ));
    }
}
