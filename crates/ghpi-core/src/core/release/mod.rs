pub mod download;
pub mod github;

pub use download::{prepare_output_dir, RetryPolicy};
pub use github::{GithubClient, GithubTarget, ReleaseAsset, ReleaseInfo, RepoSlug};
