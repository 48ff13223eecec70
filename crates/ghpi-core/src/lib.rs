#![deny(clippy::all, warnings)]
#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod core;

pub(crate) use crate::core::{config, distribution, net, release, tooling};

pub use crate::core::config::{
    CommandContext, CommandGroup, CommandInfo, Config, DevpiOverrides, EnvSnapshot, GlobalOptions,
};
pub use crate::core::distribution::{
    collect_package_files, upload, DevpiCredentials, DevpiTarget, UploadFile, UploadOutcome,
};
pub use crate::core::release::{
    prepare_output_dir, GithubClient, GithubTarget, ReleaseAsset, ReleaseInfo, RepoSlug,
    RetryPolicy,
};
pub use crate::core::tooling::errors::RelayError;
pub use crate::core::tooling::outcome::{
    format_status_message, to_json_response, CommandStatus, ExecutionOutcome,
};
pub use crate::core::workflow::{
    download_release, upload_directory, DownloadRequest, FileResult, FileStatus, UploadReport,
    UploadRequest, DEFAULT_OUTPUT_DIR,
};
