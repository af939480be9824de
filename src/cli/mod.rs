//! Terminal front-end pieces: command parsing, dispatch and table output.

mod commands;
pub mod outputformatter;

pub use commands::{execute, parse_command, tokenize, Command, Flow, RolesCmd, UsersCmd, HELP};
