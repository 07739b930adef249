//! Error types for the application layer.

use appkit_dispatch::{DispatchError, HookError, ParameterError};
use appkit_store::StoreError;
use thiserror::Error;

use crate::registry::RegistryError;

/// Errors surfaced by [`Application`](crate::Application) and its builder.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hook(#[from] HookError),

    /// The command line did not parse. Includes `--help`/`--version` requests.
    #[error(transparent)]
    Parse(#[from] clap::Error),

    #[error("unknown plugin '{0}'")]
    PluginNotFound(String),

    #[error("plugin '{name}' failed to load: {source}")]
    Plugin {
        name: String,
        #[source]
        source: Box<AppError>,
    },

    #[error("could not change log level: {0}")]
    Logging(#[from] tracing_subscriber::reload::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
