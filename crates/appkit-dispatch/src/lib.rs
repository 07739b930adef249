//! Nested command trees and parameter routing for clap-based CLIs.
//!
//! `appkit-dispatch` lets every command of an application contribute to one
//! combined command line, with sub-commands nested as deep as needed.
//!
//! # Features
//!
//! - **Command tree**: commands declare their parameters and children; the
//!   [`CommandTree`] arena instantiates them and tracks parent links
//! - **One parser**: the tree builds a single `clap::Command` with every
//!   node's arguments and a nested subcommand per child
//! - **Flat mapping**: a parse becomes one [`ParameterMapping`], with the chosen
//!   child at each level recorded under a `_subcommand…` discriminator key
//! - **Routing by key shifting**: each step down the tree rescopes the
//!   discriminators with [`ParameterMapping::shift`]
//! - **Hooks**: pre/post dispatch
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use appkit_dispatch::{
//!     Child, Command, CommandContext, CommandResult, CommandTree, Parameter,
//!     ParameterMapping, Resources,
//! };
//!
//! #[derive(Default)]
//! struct Get;
//!
//! impl Command for Get {
//!     fn parameters(&self) -> Vec<Parameter> {
//!         vec![Parameter::new("key").positional().required(true)]
//!     }
//!
//!     fn main(&mut self, _ctx: &CommandContext, params: ParameterMapping) -> CommandResult {
//!         assert_eq!(params.get_str("key"), Some("db.host"));
//!         Ok(0)
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Root;
//!
//! impl Command for Root {
//!     fn children(&self) -> Vec<Child> {
//!         vec![Child::of::<Get>("get")]
//!     }
//!
//!     fn main(&mut self, _ctx: &CommandContext, _params: ParameterMapping) -> CommandResult {
//!         Ok(1)
//!     }
//! }
//!
//! let resources = Rc::new(Resources::new());
//! let mut tree = CommandTree::new("app", Box::new(Root), &resources)?;
//!
//! let matches = tree.parser().try_get_matches_from(["app", "get", "db.host"])?;
//! let params = tree.collect(&matches);
//! let result = tree.execute(params, &resources)?;
//!
//! assert_eq!(result.exit_code(), 0);
//! assert_eq!(result.path(), ["get"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod command;
mod dispatch;
mod error;
mod hooks;
mod mapping;
mod parameter;
mod resources;
mod tree;

pub use command::{ArgumentsError, Child, Command, CommandContext, CommandResult};

pub use dispatch::{extract_command_path, path_to_string, RunResult, ARGUMENTS_ERROR_EXIT_CODE};

pub use error::{DispatchError, Result};

pub use hooks::{HookError, HookPhase, Hooks, PostDispatchFn, PreDispatchFn};

pub use mapping::{discriminator_key, ParameterMapping, SUBCOMMAND_KEY};

pub use parameter::{Parameter, ParameterAction, ParameterError};

pub use resources::Resources;

pub use tree::{CommandNode, CommandTree, NodeId, MAX_DEPTH};
