mod cli;
pub mod daily;

pub use cli::{run, Cli};
