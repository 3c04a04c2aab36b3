//! External transformation command with a hard timeout.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info};

use pixelmill_core::config::transform::TransformConfig;
use pixelmill_core::error::{AppError, ErrorKind};
use pixelmill_core::result::AppResult;
use pixelmill_core::traits::Transformer;

/// [`Transformer`] that shells out to an external command.
///
/// Arguments come from a template with `{input}`, `{output}`, `{width}`
/// and `{height}` placeholders. The child runs under a hard wall-clock
/// timeout and is killed when it expires; a timeout or a non-zero exit
/// is a permanent job failure.
#[derive(Debug, Clone)]
pub struct CommandTransformer {
    config: TransformConfig,
}

impl CommandTransformer {
    /// Create a transformer from its configuration.
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    /// Substitute template placeholders in the argument list.
    fn substitute_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input_str = input.to_string_lossy();
        let output_str = output.to_string_lossy();
        let width = self.config.width.to_string();
        let height = self.config.height.to_string();

        self.config
            .args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input_str)
                    .replace("{output}", &output_str)
                    .replace("{width}", &width)
                    .replace("{height}", &height)
            })
            .collect()
    }
}

#[async_trait]
impl Transformer for CommandTransformer {
    async fn transform(&self, input: &Path, output: &Path) -> AppResult<()> {
        let args = self.substitute_args(input, output);
        info!(
            command = %self.config.command,
            ?args,
            "Running transform command"
        );

        let mut cmd = Command::new(&self.config.command);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let timeout = Duration::from_secs(self.config.timeout_seconds);
        let result = tokio::time::timeout(timeout, cmd.output()).await;

        match result {
            Ok(Ok(out)) if out.status.success() => Ok(()),
            Ok(Ok(out)) => {
                let code = out.status.code().unwrap_or(-1);
                let stderr = String::from_utf8_lossy(&out.stderr);
                error!(
                    command = %self.config.command,
                    code,
                    stderr = %stderr.chars().take(500).collect::<String>(),
                    "Transform command failed"
                );
                Err(AppError::transform(format!(
                    "transform exited with status {code}"
                )))
            }
            Ok(Err(e)) => Err(AppError::with_source(
                ErrorKind::Transform,
                format!("failed to run transform command '{}'", self.config.command),
                e,
            )),
            // The timeout drops the future, and kill_on_drop reaps the child.
            Err(_) => {
                error!(
                    command = %self.config.command,
                    timeout_seconds = self.config.timeout_seconds,
                    "Transform command timed out; child killed"
                );
                Err(AppError::transform(format!(
                    "transform timed out after {}s",
                    self.config.timeout_seconds
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn shell_transformer(script: &str, timeout_seconds: u64) -> CommandTransformer {
        CommandTransformer::new(TransformConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            timeout_seconds,
            ..TransformConfig::default()
        })
    }

    #[test]
    fn test_substitute_args() {
        let transformer = CommandTransformer::new(TransformConfig::default());
        let args =
            transformer.substitute_args(&PathBuf::from("/tmp/in.png"), &PathBuf::from("/tmp/out.png"));
        assert_eq!(args[0], "/tmp/in.png");
        assert!(args.contains(&"512x512".to_string()));
        assert_eq!(args.last().unwrap(), "/tmp/out.png");
    }

    #[tokio::test]
    async fn test_successful_command_copies_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.bin");
        let output = dir.path().join("out.bin");
        tokio::fs::write(&input, b"payload").await.unwrap();

        let transformer = shell_transformer("cp \"{input}\" \"{output}\"", 10);
        transformer.transform(&input, &output).await.unwrap();

        assert_eq!(tokio::fs::read(&output).await.unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_transform_error() {
        let dir = tempfile::tempdir().unwrap();
        let transformer = shell_transformer("exit 2", 10);
        let err = transformer
            .transform(&dir.path().join("in"), &dir.path().join("out"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transform);
        assert!(err.message.contains("status 2"));
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let transformer = CommandTransformer::new(TransformConfig {
            command: "sleep".to_string(),
            args: vec!["5".to_string()],
            timeout_seconds: 1,
            ..TransformConfig::default()
        });

        let start = std::time::Instant::now();
        let err = transformer
            .transform(&dir.path().join("in"), &dir.path().join("out"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transform);
        assert!(err.message.contains("timed out"));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_missing_command_is_transform_error() {
        let dir = tempfile::tempdir().unwrap();
        let transformer = CommandTransformer::new(TransformConfig {
            command: "definitely-not-a-real-command".to_string(),
            args: vec![],
            ..TransformConfig::default()
        });
        let err = transformer
            .transform(&dir.path().join("in"), &dir.path().join("out"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transform);
    }
}
