use std::fmt;

use serde::Serialize;

use crate::config::{Config, EnvSnapshot, GlobalOptions};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandGroup {
    Download,
    Upload,
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandGroup::Download => "download",
            CommandGroup::Upload => "upload",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CommandInfo {
    pub group: CommandGroup,
    pub name: &'static str,
}

impl CommandInfo {
    #[must_use]
    pub const fn new(group: CommandGroup, name: &'static str) -> Self {
        Self { group, name }
    }
}

/// Everything a command handler needs: global flags plus the configuration
/// resolved once from the environment.
pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    config: Config,
}

impl<'a> CommandContext<'a> {
    #[must_use]
    pub fn new(global: &'a GlobalOptions) -> Self {
        Self::from_snapshot(global, &EnvSnapshot::capture())
    }

    #[must_use]
    pub fn from_snapshot(global: &'a GlobalOptions, env: &EnvSnapshot) -> Self {
        Self {
            global,
            config: Config::from_snapshot(env),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Byte-level progress bars are drawn only for interactive, non-quiet runs.
    #[must_use]
    pub fn progress_enabled(&self) -> bool {
        self.config.progress() && !self.global.quiet && !self.global.json
    }

    /// Whether human-readable status lines go to stderr.
    #[must_use]
    pub fn status_enabled(&self) -> bool {
        !self.global.quiet && !self.global.json
    }
}
