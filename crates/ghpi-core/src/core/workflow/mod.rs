mod batch;
mod download;
mod upload;

pub use batch::{FileResult, FileStatus, UploadReport};
pub use download::{download_release, DownloadRequest, DEFAULT_OUTPUT_DIR};
pub use upload::{upload_directory, UploadRequest};
