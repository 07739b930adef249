//! Application toolkit: extension registry, nested command dispatch and a
//! hierarchical settings store, wired together behind one [`Application`].
//!
//! # Features
//!
//! - **Extension registry**: named commands (new instance per lookup) and
//!   services (one shared instance) registered against [`ExtensionPoint`]s
//! - **Plugins**: installers kept in a catalog and loaded by name, from code
//!   or with `--plugin NAME` on the command line
//! - **Nested commands**: every registered command becomes a child of the
//!   root; commands declare their own children (see [`appkit_dispatch`])
//! - **Application flags**: `-v`/`-q` adjust the log level, `-c FILE` loads
//!   settings into the [`Store`]
//! - **Logging**: a per-application `tracing` subscriber whose level is set
//!   on every run
//!
//! # Shared state
//!
//! Commands reach application state through `ctx.resources`:
//!
//! - [`SharedStore`]: the settings store
//! - [`SharedRegistry`]: the extension registry, e.g. to look up services
//! - anything added with [`ApplicationBuilder::resource`]
//!
//! # Exit codes
//!
//! [`Application::run`] returns the command's own exit code, `2` when a
//! command reports an [`ArgumentsError`] (after printing its usage), clap's
//! code for parse errors and `1` for anything else.

mod app;
mod error;
mod logging;
mod options;
mod registry;

pub use app::{Application, ApplicationBuilder, PluginInstaller, SharedRegistry, SharedStore};

pub use error::{AppError, Result};

pub use logging::{LogLevel, Logger};

pub use options::{scan_plugins, GlobalOptions, CONFIG_FILES, PLUGINS, QUIET, VERBOSE};

pub use registry::{
    Extension, ExtensionClass, ExtensionEntry, ExtensionPoint, ExtensionRegistry, InstanceStyle,
    RegistryError, ServiceHandle,
};

pub use appkit_dispatch::{
    ArgumentsError, Child, Command, CommandContext, CommandResult, Parameter, ParameterAction,
    ParameterMapping, Resources, RunResult, ARGUMENTS_ERROR_EXIT_CODE,
};
pub use appkit_store::{Store, StoreError, TypeValidator, Validator, ValueKind};
