mod bootstrap;
mod console;
mod runner;
mod transcript;

pub(crate) use bootstrap::{build_app, StartupOverrides};
pub(crate) use runner::{run_interactive, run_script, Runner};
