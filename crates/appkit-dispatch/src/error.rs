use serde_json::Value;
use thiserror::Error;

use crate::parameter::ParameterError;

/// Errors raised while building or routing a command tree.
///
/// Everything except [`DispatchError::Command`] is a programming error in the
/// tree declaration or in how the mapping was produced.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid command name '{0}'")]
    InvalidCommandName(String),

    #[error("duplicate command '{name}' under '{parent}'")]
    DuplicateCommand { parent: String, name: String },

    #[error("command tree is nested deeper than {0} levels")]
    TooDeep(usize),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error("command '{path}' has no subcommands but was routed to {value}")]
    UnexpectedSubcommand { path: String, value: Value },

    #[error("command '{path}' has no subcommand '{name}'")]
    UnknownSubcommand { path: String, name: String },

    #[error("invalid subcommand selector for '{path}': {value}")]
    InvalidDiscriminator { path: String, value: Value },

    #[error("command '{path}' failed: {source:#}")]
    Command {
        path: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, DispatchError>;
