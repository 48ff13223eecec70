use ghpi_core::{
    download_release, upload_directory, CommandContext, CommandGroup, CommandInfo,
    DevpiOverrides, DownloadRequest, ExecutionOutcome, RelayError, UploadRequest,
};
use serde_json::json;

use crate::cli::{CommandGroupCli, DownloadArgs};

pub fn dispatch_command(
    ctx: &CommandContext,
    group: &CommandGroupCli,
) -> (CommandInfo, ExecutionOutcome) {
    match group {
        CommandGroupCli::Download(args) => {
            let info = CommandInfo::new(CommandGroup::Download, "download");
            let request = download_request_from_args(args);
            core_call(info, || download_release(ctx, &request))
        }
        CommandGroupCli::Upload(args) => {
            let info = CommandInfo::new(CommandGroup::Upload, "upload");
            let request = UploadRequest {
                dir: args.dir.clone(),
            };
            core_call(info, || upload_directory(ctx, &request))
        }
    }
}

fn download_request_from_args(args: &DownloadArgs) -> DownloadRequest {
    DownloadRequest {
        repo: args.repo.clone(),
        token: args.token.clone(),
        output: args.output.clone(),
        devpi: DevpiOverrides {
            server: args.devpi_server.clone(),
            user: args.devpi_user.clone(),
            password: args.devpi_password.clone(),
            index: args.devpi_index.clone(),
            use_proxy: args.devpi_use_proxy,
        },
        skip_upload: args.skip_upload,
        keep_existing: args.keep_existing,
    }
}

fn core_call<F>(info: CommandInfo, action: F) -> (CommandInfo, ExecutionOutcome)
where
    F: FnOnce() -> anyhow::Result<ExecutionOutcome>,
{
    tracing::debug!(command = %info.group, "running");
    match action() {
        Ok(outcome) => (info, outcome),
        Err(err) => {
            if let Some(relay) = err.downcast_ref::<RelayError>() {
                return (info, ExecutionOutcome::from_error(relay));
            }
            let issues: Vec<String> = err.chain().map(ToString::to_string).collect();
            (
                info,
                ExecutionOutcome::failure(
                    err.to_string(),
                    json!({
                        "reason": "internal_error",
                        "issues": issues,
                        "hint": "Re-run with `--trace` for more detail.",
                    }),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghpi_core::CommandStatus;

    #[test]
    fn relay_errors_become_classified_outcomes() {
        let info = CommandInfo::new(CommandGroup::Upload, "upload");
        let (_, outcome) = core_call(info, || {
            Err(RelayError::config("DEVPI_SERVER is not set", "export DEVPI_SERVER").into())
        });
        assert_eq!(outcome.status, CommandStatus::UserError);
        assert_eq!(outcome.details["reason"], "missing_config");
    }

    #[test]
    fn other_errors_are_internal_failures() {
        let info = CommandInfo::new(CommandGroup::Download, "download");
        let (_, outcome) = core_call(info, || Err(anyhow::anyhow!("boom")));
        assert_eq!(outcome.status, CommandStatus::Failure);
        assert_eq!(outcome.details["reason"], "internal_error");
    }
}
