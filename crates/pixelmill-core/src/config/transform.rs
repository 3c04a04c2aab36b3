//! External transformation command configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the external transformation command.
///
/// The argument list is a template; `{input}`, `{output}`, `{width}` and
/// `{height}` placeholders are substituted per job. The default invokes
/// ImageMagick to produce a fixed-size, letterboxed image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// The command to execute.
    #[serde(default = "default_command")]
    pub command: String,
    /// Argument template with placeholders.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Target width in pixels.
    #[serde(default = "default_dimension")]
    pub width: u32,
    /// Target height in pixels.
    #[serde(default = "default_dimension")]
    pub height: u32,
    /// Hard wall-clock timeout in seconds; the child process is killed
    /// on expiry.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            width: default_dimension(),
            height: default_dimension(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_command() -> String {
    "convert".to_string()
}

fn default_args() -> Vec<String> {
    [
        "{input}",
        "-resize",
        "{width}x{height}",
        "-background",
        "white",
        "-gravity",
        "center",
        "-extent",
        "{width}x{height}",
        "{output}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_dimension() -> u32 {
    512
}

fn default_timeout() -> u64 {
    60
}
