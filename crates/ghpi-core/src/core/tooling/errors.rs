use std::io;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

/// Response bodies are clipped to this many characters in messages.
const BODY_EXCERPT_CHARS: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{message}")]
    Config { message: String, hint: String },

    #[error("repository {repo} has no releases")]
    NotFound { repo: String },

    #[error("failed to query releases for {repo}: {message}")]
    ReleaseQuery { repo: String, message: String },

    #[error("failed to download {asset} after {attempts} attempt(s): {last_error}")]
    Download {
        asset: String,
        attempts: u32,
        last_error: String,
    },

    #[error("failed to upload {filename}: {source}")]
    Upload {
        filename: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("index rejected {filename} with HTTP {status}{}", body_suffix(.body))]
    UploadRejected {
        filename: String,
        status: u16,
        body: String,
    },

    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RelayError {
    pub fn config(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            hint: hint.into(),
        }
    }

    pub fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Stable, machine-readable classification used in JSON details.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            RelayError::Config { .. } => "missing_config",
            RelayError::NotFound { .. } => "no_releases",
            RelayError::ReleaseQuery { .. } => "release_query_failed",
            RelayError::Download { .. } => "download_failed",
            RelayError::Upload { .. } => "upload_failed",
            RelayError::UploadRejected { .. } => "upload_rejected",
            RelayError::Io { .. } => "io_error",
        }
    }

    /// Configuration mistakes and empty repositories are the caller's to fix;
    /// everything else is an operational failure.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(self, RelayError::Config { .. } | RelayError::NotFound { .. })
    }

    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            RelayError::Config { hint, .. } => Some(hint.clone()),
            RelayError::NotFound { repo } => Some(format!(
                "Publish a release for {repo} or check that the token can read it."
            )),
            RelayError::Download { .. } => {
                Some("Files downloaded before the failure were kept; re-run to retry.".to_string())
            }
            RelayError::UploadRejected { status: 401 | 403, .. } => {
                Some("Check DEVPI_USER / DEVPI_PASSWORD for this index.".to_string())
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn details(&self) -> Value {
        let mut details = json!({ "reason": self.reason() });
        if let Some(hint) = self.hint() {
            details["hint"] = Value::String(hint);
        }
        match self {
            RelayError::NotFound { repo } | RelayError::ReleaseQuery { repo, .. } => {
                details["repo"] = Value::String(repo.clone());
            }
            RelayError::Download {
                asset, attempts, ..
            } => {
                details["asset"] = Value::String(asset.clone());
                details["attempts"] = json!(attempts);
            }
            RelayError::UploadRejected { status, body, .. } => {
                details["status"] = json!(status);
                details["body"] = Value::String(excerpt(body));
            }
            RelayError::Io { path, .. } => {
                details["path"] = Value::String(path.display().to_string());
            }
            RelayError::Config { .. } | RelayError::Upload { .. } => {}
        }
        details
    }
}

/// First [`BODY_EXCERPT_CHARS`] characters of a response body.
pub(crate) fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

fn body_suffix(body: &str) -> String {
    let text = excerpt(body);
    if text.is_empty() {
        String::new()
    } else {
        format!(": {text}")
    }
}
