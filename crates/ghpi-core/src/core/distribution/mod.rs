//! Upload of Python distributions to a DevPI index.

mod artifacts;
mod form;

use std::fmt;

use ghpi_domain::{FileDigest, ParsedPackage};
use reqwest::StatusCode;
use serde::Serialize;

use crate::net::{build_http_client, ProxyMode, UPLOAD_TIMEOUT};
use crate::RelayError;

pub use artifacts::collect_package_files;
use form::MultipartForm;

#[derive(Clone)]
pub struct DevpiCredentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for DevpiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DevpiCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Resolved upload endpoint `{server}/{user}/{index}/` plus how to reach it.
#[derive(Clone, Debug)]
pub struct DevpiTarget {
    pub index_url: String,
    pub credentials: DevpiCredentials,
    pub use_proxy: bool,
}

/// Everything sent for one file.
pub struct UploadFile<'a> {
    pub package: &'a ParsedPackage,
    pub digest: &'a FileDigest,
    pub filename: &'a str,
    pub bytes: &'a [u8],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadOutcome {
    Uploaded,
    /// The index answered 409: this exact file is already present.
    AlreadyExists,
}

fn build_upload_body(file: &UploadFile<'_>) -> MultipartForm {
    let mut form = MultipartForm::new(&file.digest.sha256);
    form.text(":action", "file_upload")
        .text("protocol_version", "1")
        .text("name", &file.package.distribution_name)
        .text("version", &file.package.version)
        .text("filetype", file.package.filetype());
    if let Some(pyversion) = file.package.pyversion() {
        form.text("pyversion", pyversion);
    }
    form.text("md5_digest", &file.digest.md5)
        .text("sha256_digest", &file.digest.sha256)
        .file("content", file.filename, file.bytes);
    form
}

/// POSTs one file to the index.
///
/// When `use_proxy` is false the request goes through a client built without
/// proxy support; nothing else in the process is affected.
///
/// # Errors
/// [`RelayError::Upload`] on transport failure and
/// [`RelayError::UploadRejected`] for any non-2xx status other than 409.
pub fn upload(
    file: &UploadFile<'_>,
    credentials: &DevpiCredentials,
    index_url: &str,
    use_proxy: bool,
) -> Result<UploadOutcome, RelayError> {
    let transport = |source: reqwest::Error| RelayError::Upload {
        filename: file.filename.to_string(),
        source,
    };
    let client = build_http_client(UPLOAD_TIMEOUT, ProxyMode::from_flag(use_proxy))
        .map_err(transport)?;
    let form = build_upload_body(file);
    let content_type = form.content_type();
    tracing::debug!(
        file = file.filename,
        name = %file.package.distribution_name,
        version = %file.package.version,
        url = index_url,
        "uploading"
    );
    let response = client
        .post(index_url)
        .basic_auth(&credentials.user, Some(&credentials.password))
        .header(reqwest::header::CONTENT_TYPE, content_type)
        .body(form.finish())
        .send()
        .map_err(transport)?;
    let status = response.status();
    if status.is_success() {
        return Ok(UploadOutcome::Uploaded);
    }
    if status == StatusCode::CONFLICT {
        return Ok(UploadOutcome::AlreadyExists);
    }
    let body = response.text().unwrap_or_default();
    Err(RelayError::UploadRejected {
        filename: file.filename.to_string(),
        status: status.as_u16(),
        body,
    })
}
