pub mod cli;
pub mod load_config;
pub mod provider;

pub use cli::{run, Cli, Commands};
