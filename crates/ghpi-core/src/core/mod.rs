pub mod config;
pub mod distribution;
pub mod net;
pub mod release;
pub mod tooling;
pub mod workflow;
