pub mod context;
pub mod settings;

pub use context::{CommandContext, CommandGroup, CommandInfo};
pub use settings::{Config, DevpiOverrides, EnvSnapshot, GlobalOptions, NetworkSettings};
