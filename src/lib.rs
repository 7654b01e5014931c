pub mod aws;
pub mod cli;
pub mod commands;
pub mod kubernetes;
pub mod sso;

pub use cli::{Cli, Commands};
