use atty::Stream;
use color_eyre::Result;
use ghpi_core::{
    format_status_message, to_json_response, CommandInfo, CommandStatus, ExecutionOutcome,
    FileStatus,
};
use serde_json::Value;

use crate::cli::GhpiCli;
use crate::style::Style;

/// Renders `outcome` and returns the process exit code.
pub fn emit_output(cli: &GhpiCli, info: CommandInfo, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = outcome.exit_code();
    let message = format_status_message(info, &outcome.message);

    if cli.json {
        let payload = to_json_response(info, outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if cli.quiet {
        if outcome.status != CommandStatus::Ok {
            eprintln!("{message}");
        }
    } else {
        let style = Style::new(cli.no_color, atty::is(Stream::Stdout));
        println!("{}", style.status(outcome.status, &message));
        for line in file_lines(&style, &outcome.details) {
            println!("{line}");
        }
        if let Some(hint) = hint_from_details(&outcome.details) {
            println!("{}", style.info(&format!("Hint: {hint}")));
        }
    }

    Ok(code)
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details.get("hint").and_then(Value::as_str)
}

/// Per-file upload results live at `files` for `upload` and at `upload.files`
/// for `download`.
fn file_entries(details: &Value) -> &[Value] {
    details
        .get("files")
        .or_else(|| details.get("upload").and_then(|upload| upload.get("files")))
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice)
}

fn file_lines(style: &Style, details: &Value) -> Vec<String> {
    file_entries(details)
        .iter()
        .filter_map(|entry| {
            let file = entry.get("file")?.as_str()?;
            let line = match entry.get("status")?.as_str()? {
                "uploaded" => style.file(FileStatus::Uploaded, file),
                "already_exists" => {
                    style.file(FileStatus::AlreadyExists, &format!("{file} (already present)"))
                }
                _ => {
                    let reason = entry
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("failed");
                    style.file(FileStatus::Failed, &format!("{file}: {reason}"))
                }
            };
            Some(line)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_lines_cover_both_commands() {
        let style = Style::new(true, false);
        let upload = json!({
            "files": [
                {"file": "a.whl", "status": "uploaded"},
                {"file": "b.tar.gz", "status": "failed", "message": "HTTP 500"},
            ]
        });
        assert_eq!(
            file_lines(&style, &upload),
            ["  ✔ a.whl", "  ✖ b.tar.gz: HTTP 500"]
        );

        let download = json!({
            "upload": { "files": [{"file": "c.whl", "status": "already_exists"}] }
        });
        assert_eq!(
            file_lines(&style, &download),
            ["  = c.whl (already present)"]
        );
        assert!(file_lines(&style, &json!({})).is_empty());
    }
}
