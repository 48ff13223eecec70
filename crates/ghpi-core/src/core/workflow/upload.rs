use std::path::PathBuf;

use anyhow::Result;
use serde_json::json;

use crate::distribution::collect_package_files;
use crate::tooling::progress::status_line;
use crate::{CommandContext, ExecutionOutcome, RelayError};

use super::batch::upload_files;

#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub dir: PathBuf,
}

/// Uploads every package file found directly inside `request.dir`.
///
/// # Errors
/// Returns [`RelayError::Config`] when the directory or the DevPI server is
/// missing; per-file failures are reported in the outcome instead.
pub fn upload_directory(ctx: &CommandContext, request: &UploadRequest) -> Result<ExecutionOutcome> {
    let dir = &request.dir;
    if !dir.is_dir() {
        return Err(RelayError::config(
            format!("directory {} does not exist", dir.display()),
            "Run `ghpi download --skip-upload` first or pass the directory holding your packages.",
        )
        .into());
    }
    let target = ctx.config().devpi().target()?;
    let files = collect_package_files(dir)?;
    if files.is_empty() {
        return Ok(ExecutionOutcome::success(
            format!("no package files found in {}", dir.display()),
            json!({
                "dir": dir.display().to_string(),
                "index_url": target.index_url,
                "files": [],
            }),
        ));
    }

    status_line(
        ctx.status_enabled(),
        format!("uploading {} file(s) to {}", files.len(), target.index_url),
    );
    let report = upload_files(&files, &target, ctx.status_enabled());
    Ok(report.into_outcome(&target.index_url))
}
