use std::fmt::Display;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;

use crate::tooling::progress::DownloadProgress;
use crate::RelayError;

const CHUNK_SIZE: usize = 64 * 1024;

/// How often a failed asset download is retried and how long to wait between tries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Linear backoff: the wait after attempt `n` is `base_delay * n`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

#[derive(Debug)]
pub(crate) struct RetryExhausted<E> {
    pub(crate) attempts: u32,
    pub(crate) last: E,
}

pub(crate) fn retry<T, E: Display>(
    policy: &RetryPolicy,
    label: &str,
    mut op: impl FnMut(u32) -> Result<T, E>,
) -> Result<T, RetryExhausted<E>> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => {
                return Err(RetryExhausted { attempts, last: err });
            }
            Err(err) => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    asset = label,
                    attempt,
                    attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "download attempt failed; retrying"
                );
                thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}

/// Rejects asset names that would escape the output directory.
pub(crate) fn validate_asset_name(name: &str) -> Result<(), RelayError> {
    let unsafe_name = name.trim().is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\');
    if unsafe_name {
        return Err(RelayError::Download {
            asset: name.to_string(),
            attempts: 0,
            last_error: "asset name is not a plain file name".to_string(),
        });
    }
    Ok(())
}

/// Refuses to wipe `dir` when it is `cwd` or one of its ancestors.
fn ensure_clearable(dir: &Path, cwd: &Path) -> Result<(), RelayError> {
    let target = dir
        .canonicalize()
        .map_err(|err| RelayError::io("resolve", dir, err))?;
    let cwd = cwd.canonicalize().unwrap_or_else(|_| cwd.to_path_buf());
    if cwd.starts_with(&target) {
        return Err(RelayError::config(
            format!(
                "refusing to clear {}: it contains the working directory",
                dir.display()
            ),
            "Point --output at a dedicated directory or pass --keep-existing.",
        ));
    }
    Ok(())
}

/// Ensures `dir` exists, optionally wiping whatever a previous run left there.
pub fn prepare_output_dir(dir: &Path, clear: bool) -> Result<(), RelayError> {
    if clear && dir.exists() {
        let cwd = std::env::current_dir()
            .map_err(|err| RelayError::io("resolve", Path::new("."), err))?;
        ensure_clearable(dir, &cwd)?;
        tracing::debug!(dir = %dir.display(), "clearing output directory");
        fs::remove_dir_all(dir).map_err(|err| RelayError::io("clear", dir, err))?;
    }
    fs::create_dir_all(dir).map_err(|err| RelayError::io("create", dir, err))
}

pub(crate) struct AssetRequest<'a> {
    pub(crate) name: &'a str,
    pub(crate) url: &'a str,
    pub(crate) token: &'a str,
    pub(crate) size: Option<u64>,
}

/// Streams one asset into a temp file beside `dest` and renames it into place.
pub(crate) fn download_once(
    client: &Client,
    request: &AssetRequest<'_>,
    dest: &Path,
    progress: &DownloadProgress,
) -> Result<u64> {
    let dir = dest
        .parent()
        .ok_or_else(|| anyhow!("{} has no parent directory", dest.display()))?;
    let mut response = client
        .get(request.url)
        .bearer_auth(request.token)
        .header(ACCEPT, "application/octet-stream")
        .send()
        .with_context(|| format!("failed to fetch {}", request.name))?;
    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("unexpected HTTP {status} for {}", request.name));
    }

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create a temp file in {}", dir.display()))?;
    let mut buffer = vec![0_u8; CHUNK_SIZE];
    let mut written: u64 = 0;
    loop {
        let read = response
            .read(&mut buffer)
            .with_context(|| format!("stream error for {}", request.name))?;
        if read == 0 {
            break;
        }
        tmp.write_all(&buffer[..read])?;
        written += read as u64;
        progress.advance(read as u64);
    }
    if let Some(expected) = request.size.filter(|size| *size > 0) {
        if written != expected {
            return Err(anyhow!(
                "{} ended after {written} of {expected} bytes",
                request.name
            ));
        }
    }
    tmp.flush()?;
    tmp.persist(dest)
        .map_err(|err| anyhow!("failed to move {} into place: {}", dest.display(), err.error))?;
    Ok(written)
}

pub(crate) fn download_with_retry(
    client: &Client,
    request: &AssetRequest<'_>,
    dir: &Path,
    policy: &RetryPolicy,
    progress_enabled: bool,
) -> Result<PathBuf, RelayError> {
    validate_asset_name(request.name)?;
    let dest = dir.join(request.name);
    let progress = DownloadProgress::start(request.name, request.size, progress_enabled);
    let result = retry(policy, request.name, |attempt| {
        if attempt > 1 {
            progress.restart();
        }
        download_once(client, request, &dest, &progress)
    });
    progress.finish();
    match result {
        Ok(bytes) => {
            tracing::debug!(asset = request.name, bytes, "downloaded asset");
            Ok(dest)
        }
        Err(exhausted) => Err(RelayError::Download {
            asset: request.name.to_string(),
            attempts: exhausted.attempts,
            last_error: format!("{:#}", exhausted.last),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::tempdir;

    fn instant_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            base_delay: Duration::ZERO,
        }
    }

    #[test]
    fn default_policy_backs_off_linearly() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
    }

    #[test]
    fn retry_stops_at_first_success() {
        let calls = Cell::new(0);
        let value = retry(&instant_policy(), "demo", |attempt| {
            calls.set(calls.get() + 1);
            if attempt < 2 {
                Err("flaky")
            } else {
                Ok(attempt)
            }
        })
        .expect("second attempt succeeds");
        assert_eq!(value, 2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn retry_reports_last_error_after_exhaustion() {
        let calls = Cell::new(0);
        let err = retry(&instant_policy(), "demo", |attempt| -> Result<(), String> {
            calls.set(calls.get() + 1);
            Err(format!("failure {attempt}"))
        })
        .expect_err("all attempts fail");
        assert_eq!(err.attempts, 3);
        assert_eq!(err.last, "failure 3");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn asset_names_must_be_plain_files() {
        for bad in ["../evil.whl", "nested/demo.whl", "nested\\demo.whl", "..", "", "."] {
            let err = validate_asset_name(bad).expect_err(bad);
            assert_eq!(err.reason(), "download_failed");
        }
        assert!(validate_asset_name("demo-1.0.0-py3-none-any.whl").is_ok());
    }

    #[test]
    fn prepare_output_dir_clears_only_when_asked() -> Result<()> {
        let tmp = tempdir()?;
        let dir = tmp.path().join("artifacts");
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("stale.whl"), b"old")?;

        prepare_output_dir(&dir, false)?;
        assert!(dir.join("stale.whl").exists());

        prepare_output_dir(&dir, true)?;
        assert!(dir.is_dir());
        assert!(!dir.join("stale.whl").exists());
        Ok(())
    }

    #[test]
    fn output_dir_containing_the_working_directory_is_never_cleared() -> Result<()> {
        let tmp = tempdir()?;
        let project = tmp.path().join("project");
        let nested = project.join("src");
        fs::create_dir_all(&nested)?;

        let err = ensure_clearable(&project, &project).expect_err("cwd itself");
        assert!(err.is_user_error());
        assert!(err.to_string().contains("working directory"), "{err}");
        ensure_clearable(tmp.path(), &nested).expect_err("ancestor of cwd");
        ensure_clearable(&project.join("."), &project).expect_err("dotted cwd");

        let sibling = tmp.path().join("artifacts");
        fs::create_dir_all(&sibling)?;
        ensure_clearable(&sibling, &project)?;
        ensure_clearable(&nested, &project)?;
        Ok(())
    }

    #[test]
    fn clearing_the_working_directory_leaves_it_intact() -> Result<()> {
        let cwd = std::env::current_dir()?;
        let err = prepare_output_dir(Path::new("."), true).expect_err("refused");
        assert_eq!(err.reason(), "missing_config");
        assert!(cwd.join("Cargo.toml").exists());
        Ok(())
    }
}
