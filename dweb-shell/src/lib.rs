//! Interactive shell: turns lines of input into page loads.
mod command;
mod shell;

pub use command::{Command, parse_command};
pub use shell::{Shell, USAGE};
