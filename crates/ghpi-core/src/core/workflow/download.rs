use std::path::PathBuf;

use anyhow::Result;
use ghpi_domain::{format_size, is_package_file};
use serde_json::json;

use crate::config::DevpiOverrides;
use crate::release::{prepare_output_dir, GithubClient, ReleaseInfo};
use crate::tooling::progress::status_line;
use crate::{CommandContext, ExecutionOutcome};

use super::batch::upload_files;

pub const DEFAULT_OUTPUT_DIR: &str = "artifacts";

#[derive(Clone, Debug)]
pub struct DownloadRequest {
    pub repo: Option<String>,
    pub token: Option<String>,
    pub output: PathBuf,
    pub devpi: DevpiOverrides,
    pub skip_upload: bool,
    pub keep_existing: bool,
}

impl Default for DownloadRequest {
    fn default() -> Self {
        Self {
            repo: None,
            token: None,
            output: PathBuf::from(DEFAULT_OUTPUT_DIR),
            devpi: DevpiOverrides::default(),
            skip_upload: false,
            keep_existing: false,
        }
    }
}

fn release_summary(release: &ReleaseInfo) -> Vec<String> {
    let mut lines = vec![
        format!("name: {}", release.display_name()),
        format!("tag_name: {}", release.tag_name),
    ];
    if let Some(published) = &release.published_at {
        lines.push(format!("published_at: {published}"));
    }
    if !release.html_url.is_empty() {
        lines.push(format!("url: {}", release.html_url));
    }
    lines
}

/// Downloads every asset of the latest release and, unless told otherwise,
/// uploads the package files among them.
///
/// All configuration is validated before the first request. A download that
/// exhausts its retries stops the command; files already written stay.
///
/// # Errors
/// Returns the underlying [`crate::RelayError`] for configuration, listing
/// and download failures.
pub fn download_release(ctx: &CommandContext, request: &DownloadRequest) -> Result<ExecutionOutcome> {
    let config = ctx.config();
    let github = config
        .github()
        .resolve(request.repo.as_deref(), request.token.as_deref())?;
    let devpi = if request.skip_upload {
        None
    } else {
        Some(config.devpi().merged(&request.devpi).target()?)
    };
    let announce = ctx.status_enabled();

    let client = GithubClient::new(github, config.network())?.with_progress(ctx.progress_enabled());
    let repo = client.target().repo.to_string();
    let release = client.latest_release()?;
    status_line(announce, format!("latest release of {repo}:"));
    for line in release_summary(&release) {
        status_line(announce, format!("  {line}"));
    }

    let assets = client.release_assets(&release)?;
    if assets.is_empty() {
        return Ok(ExecutionOutcome::success(
            format!("release {} of {repo} has no assets", release.tag_name),
            json!({
                "repo": repo,
                "release": release,
                "downloaded": [],
            }),
        ));
    }

    let output = &request.output;
    prepare_output_dir(output, !request.keep_existing)?;
    status_line(
        announce,
        format!("downloading {} asset(s) into {}", assets.len(), output.display()),
    );
    let mut downloaded = Vec::with_capacity(assets.len());
    for asset in &assets {
        let created = asset
            .created_at
            .as_deref()
            .map(|stamp| format!(", created {stamp}"))
            .unwrap_or_default();
        status_line(
            announce,
            format!("{} ({}{created})", asset.name, format_size(asset.size)),
        );
        downloaded.push(client.download(asset, output)?);
    }
    let downloaded_names: Vec<String> = assets.iter().map(|asset| asset.name.clone()).collect();
    let mut details = json!({
        "repo": repo,
        "release": release,
        "output": output.display().to_string(),
        "downloaded": downloaded_names,
    });

    let Some(target) = devpi else {
        return Ok(ExecutionOutcome::success(
            format!(
                "downloaded {} asset(s) from {repo} {} into {}",
                downloaded.len(),
                release.tag_name,
                output.display()
            ),
            details,
        ));
    };

    let packages: Vec<PathBuf> = downloaded
        .into_iter()
        .filter(|path| is_package_file(path))
        .collect();
    if packages.is_empty() {
        details["upload"] = json!({ "index_url": target.index_url, "files": [] });
        return Ok(ExecutionOutcome::success(
            format!(
                "downloaded {} asset(s); none are package files, nothing to upload",
                downloaded_names.len()
            ),
            details,
        ));
    }

    status_line(
        announce,
        format!("uploading {} file(s) to {}", packages.len(), target.index_url),
    );
    let report = upload_files(&packages, &target, announce);
    let message = format!(
        "downloaded {} asset(s); {}",
        downloaded_names.len(),
        report.summary()
    );
    let upload = report.into_outcome(&target.index_url);
    details["upload"] = upload.details;
    if let Some(reason) = details["upload"].get("reason").cloned() {
        details["reason"] = reason;
    }
    if let Some(hint) = details["upload"].get("hint").cloned() {
        details["hint"] = hint;
    }
    Ok(ExecutionOutcome {
        status: upload.status,
        message,
        details,
    })
}
