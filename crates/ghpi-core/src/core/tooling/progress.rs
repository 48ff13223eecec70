use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str =
    "ghpi ▸ {msg:.bold} [{bar:30}] {binary_bytes}/{binary_total_bytes} ({bytes_per_sec})";
const SPINNER_TEMPLATE: &str = "ghpi ▸ {msg:.bold} {spinner} {binary_bytes}";

/// Prints a one-line status update on stderr, outside of any progress bar.
pub(crate) fn status_line(enabled: bool, message: impl AsRef<str>) {
    if enabled {
        eprintln!("ghpi ▸ {}", message.as_ref());
    }
}

/// Byte-level progress for a single download, drawn on stderr.
///
/// A disabled reporter is a no-op so callers never branch on it.
pub(crate) struct DownloadProgress {
    bar: Option<ProgressBar>,
}

impl DownloadProgress {
    pub(crate) fn start(label: &str, total: Option<u64>, enabled: bool) -> Self {
        if !enabled {
            return Self { bar: None };
        }
        let total = total.filter(|len| *len > 0);
        let bar = ProgressBar::with_draw_target(total, ProgressDrawTarget::stderr());
        let style = match total {
            Some(_) => ProgressStyle::with_template(BAR_TEMPLATE)
                .map(|style| style.progress_chars("=> ")),
            None => ProgressStyle::with_template(SPINNER_TEMPLATE),
        };
        if let Ok(style) = style {
            bar.set_style(style);
        }
        bar.set_message(label.to_string());
        if total.is_none() {
            bar.enable_steady_tick(Duration::from_millis(100));
        }
        Self { bar: Some(bar) }
    }

    pub(crate) fn advance(&self, bytes: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(bytes);
        }
    }

    /// Rewinds after a failed attempt.
    pub(crate) fn restart(&self) {
        if let Some(bar) = &self.bar {
            bar.set_position(0);
        }
    }

    pub(crate) fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
