use std::fs;
use std::path::{Path, PathBuf};

use ghpi_domain::{digest_reader, format_size, FileDigest, ParsedPackage};
use serde::Serialize;
use serde_json::json;

use crate::distribution::{upload, DevpiTarget, UploadFile, UploadOutcome};
use crate::tooling::progress::status_line;
use crate::{ExecutionOutcome, RelayError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Uploaded,
    AlreadyExists,
    Failed,
}

#[derive(Clone, Debug, Serialize)]
pub struct FileResult {
    pub file: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Per-file results of one upload batch, in the order the files were tried.
#[derive(Clone, Debug, Default, Serialize)]
pub struct UploadReport {
    pub files: Vec<FileResult>,
}

impl UploadReport {
    fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|file| file.status == status).count()
    }

    #[must_use]
    pub fn uploaded(&self) -> usize {
        self.count(FileStatus::Uploaded)
    }

    #[must_use]
    pub fn already_present(&self) -> usize {
        self.count(FileStatus::AlreadyExists)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(FileStatus::Failed)
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    #[must_use]
    pub fn summary(&self) -> String {
        let mut text = format!("uploaded {} of {} file(s)", self.uploaded(), self.files.len());
        if self.already_present() > 0 {
            text.push_str(&format!(", {} already present", self.already_present()));
        }
        if self.has_failures() {
            text.push_str(&format!(", {} failed", self.failed()));
        }
        text
    }

    pub(crate) fn details(&self, index_url: &str) -> serde_json::Value {
        json!({
            "index_url": index_url,
            "uploaded": self.uploaded(),
            "already_present": self.already_present(),
            "failed": self.failed(),
            "files": self.files,
        })
    }

    /// Any hard failure fails the command; duplicates do not.
    pub(crate) fn into_outcome(self, index_url: &str) -> ExecutionOutcome {
        let mut details = self.details(index_url);
        if self.has_failures() {
            details["reason"] = json!("upload_failed");
            details["hint"] = json!("Fix the failing files and re-run; uploaded files are skipped by the index.");
            ExecutionOutcome::failure(self.summary(), details)
        } else {
            ExecutionOutcome::success(self.summary(), details)
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

/// Reads `path` once; the digest is computed over the exact bytes sent.
fn read_for_upload(path: &Path) -> Result<(Vec<u8>, FileDigest), RelayError> {
    let bytes = fs::read(path).map_err(|err| RelayError::io("read", path, err))?;
    let digest = digest_reader(bytes.as_slice()).map_err(|err| RelayError::io("hash", path, err))?;
    Ok((bytes, digest))
}

fn upload_path(
    path: &Path,
    filename: &str,
    target: &DevpiTarget,
) -> Result<(ParsedPackage, UploadOutcome), (ParsedPackage, RelayError)> {
    let package = ParsedPackage::parse(filename);
    if package.is_fallback() {
        tracing::warn!(file = filename, "could not parse name/version from file name");
    }
    let (bytes, digest) = match read_for_upload(path) {
        Ok(read) => read,
        Err(err) => return Err((package, err)),
    };
    let file = UploadFile {
        package: &package,
        digest: &digest,
        filename,
        bytes: &bytes,
    };
    match upload(
        &file,
        &target.credentials,
        &target.index_url,
        target.use_proxy,
    ) {
        Ok(outcome) => Ok((package, outcome)),
        Err(err) => Err((package, err)),
    }
}

/// Parses, hashes and uploads each file in turn. A failing file is recorded
/// and the batch moves on.
pub fn upload_files(paths: &[PathBuf], target: &DevpiTarget, announce: bool) -> UploadReport {
    let mut report = UploadReport::default();
    if !target.use_proxy {
        tracing::debug!("uploading without proxy");
    }
    for path in paths {
        let filename = file_label(path);
        let size = fs::metadata(path).map(|meta| meta.len()).unwrap_or_default();
        status_line(announce, format!("uploading {filename} ({})", format_size(size)));
        let result = match upload_path(path, &filename, target) {
            Ok((package, outcome)) => {
                let file_status = match outcome {
                    UploadOutcome::Uploaded => {
                        tracing::info!(file = %filename, "uploaded");
                        FileStatus::Uploaded
                    }
                    UploadOutcome::AlreadyExists => {
                        tracing::info!(file = %filename, "already present on index");
                        FileStatus::AlreadyExists
                    }
                };
                FileResult {
                    file: filename,
                    status: file_status,
                    name: Some(package.distribution_name),
                    version: Some(package.version),
                    reason: None,
                    message: None,
                }
            }
            Err((package, err)) => {
                tracing::warn!(file = %filename, error = %err, "upload failed");
                FileResult {
                    file: filename,
                    status: FileStatus::Failed,
                    name: Some(package.distribution_name),
                    version: Some(package.version),
                    reason: Some(err.reason()),
                    message: Some(err.to_string()),
                }
            }
        };
        report.files.push(result);
    }
    report
}
