use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use ghpi_core::DEFAULT_OUTPUT_DIR;

pub const GHPI_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nCommands:\n{subcommands}\n\nGlobal options:\n{options}\n{after-help}";

pub const GHPI_BEFORE_HELP: &str = concat!(
    "ghpi ",
    env!("CARGO_PKG_VERSION"),
    " – GitHub Release artifacts → DevPI\n"
);

pub const GHPI_AFTER_HELP: &str = concat!(
    "Environment:\n",
    "  GITHUB_PAT, GITHUB_REPO            token and owner/repo for `download`\n",
    "  DEVPI_SERVER, DEVPI_USER, DEVPI_PASSWORD, DEVPI_INDEX, DEVPI_USE_PROXY\n",
    "  GITHUB_API_URL                     GitHub API base (default https://api.github.com)\n",
    "  GHPI_PROGRESS=0                    hide download progress bars\n",
    "A .env file in the working directory is loaded first; real variables win.\n",
);

#[derive(Parser, Debug)]
#[command(
    name = "ghpi",
    version,
    disable_help_subcommand = true,
    before_help = GHPI_BEFORE_HELP,
    after_help = GHPI_AFTER_HELP,
    help_template = GHPI_HELP_TEMPLATE
)]
#[allow(clippy::struct_excessive_bools)]
pub struct GhpiCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches debug)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(
        about = "Download every asset of the latest GitHub release, then upload the packages to DevPI.",
        override_usage = "ghpi download [-r OWNER/REPO] [-o DIR] [--skip-upload] [--keep-existing]",
        after_help = "Examples:\n  ghpi download -r octo/widgets\n  ghpi download -r octo/widgets -s http://devpi.internal:3141 -i staging\n  ghpi download --skip-upload -o dist"
    )]
    Download(DownloadArgs),
    #[command(
        about = "Upload the package files found in a directory to DevPI.",
        override_usage = "ghpi upload [DIR]",
        after_help = "Examples:\n  ghpi upload\n  DEVPI_INDEX=staging ghpi upload dist"
    )]
    Upload(UploadArgs),
}

#[derive(Args, Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct DownloadArgs {
    #[arg(
        short = 'r',
        long = "repo",
        value_name = "OWNER/REPO",
        help = "Repository to read (defaults to GITHUB_REPO)"
    )]
    pub repo: Option<String>,
    #[arg(
        short = 't',
        long = "token",
        value_name = "TOKEN",
        help = "GitHub token (defaults to GITHUB_PAT)"
    )]
    pub token: Option<String>,
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        default_value = DEFAULT_OUTPUT_DIR,
        help = "Directory that receives the downloaded assets"
    )]
    pub output: PathBuf,
    #[arg(
        short = 'p',
        long = "devpi-password",
        value_name = "PASSWORD",
        help = "DevPI password (defaults to DEVPI_PASSWORD)"
    )]
    pub devpi_password: Option<String>,
    #[arg(
        short = 'u',
        long = "devpi-user",
        value_name = "USER",
        help = "DevPI user (defaults to DEVPI_USER, then root)"
    )]
    pub devpi_user: Option<String>,
    #[arg(
        short = 's',
        long = "devpi-server",
        value_name = "URL",
        help = "DevPI server URL (defaults to DEVPI_SERVER)"
    )]
    pub devpi_server: Option<String>,
    #[arg(
        short = 'i',
        long = "devpi-index",
        value_name = "INDEX",
        help = "DevPI index (defaults to DEVPI_INDEX, then dev)"
    )]
    pub devpi_index: Option<String>,
    #[arg(long = "devpi-use-proxy", help = "Send uploads through the system proxy")]
    pub devpi_use_proxy: bool,
    #[arg(long = "skip-upload", help = "Only download; do not contact DevPI")]
    pub skip_upload: bool,
    #[arg(
        long = "keep-existing",
        help = "Do not clear the output directory before downloading"
    )]
    pub keep_existing: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    #[arg(
        value_name = "DIR",
        default_value = DEFAULT_OUTPUT_DIR,
        help = "Directory holding .whl/.tar.gz/.zip/.tar.bz2/.egg files"
    )]
    pub dir: PathBuf,
}
