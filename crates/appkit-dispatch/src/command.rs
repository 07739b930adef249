//! The command trait and what commands receive.
//!
//! A command declares its help text, its parameters and its children, and
//! implements `main`. Children are declared as named factories so that the
//! tree can build them fresh for every invocation:
//!
//! ```rust
//! use appkit_dispatch::{Child, Command, CommandContext, CommandResult, ParameterMapping};
//!
//! #[derive(Default)]
//! struct Get;
//!
//! impl Command for Get {
//!     fn main(&mut self, _ctx: &CommandContext, _params: ParameterMapping) -> CommandResult {
//!         println!("config get");
//!         Ok(0)
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Config;
//!
//! impl Command for Config {
//!     fn help(&self) -> &str {
//!         "Inspect settings"
//!     }
//!
//!     fn children(&self) -> Vec<Child> {
//!         vec![Child::of::<Get>("get")]
//!     }
//!
//!     fn main(&mut self, _ctx: &CommandContext, _params: ParameterMapping) -> CommandResult {
//!         Ok(0)
//!     }
//! }
//! ```

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::mapping::ParameterMapping;
use crate::parameter::Parameter;
use crate::resources::Resources;

/// What `main` returns: an exit code, or an error.
///
/// Return an [`ArgumentsError`] (directly or through `?`/`.into()`) to report
/// bad input; the dispatcher turns it into usage output instead of a failure.
pub type CommandResult = anyhow::Result<i32>;

/// The user passed unacceptable arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ArgumentsError(pub String);

impl ArgumentsError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Context passed to [`Command::main`].
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Names from below the root down to the running command, e.g. `["config", "get"]`.
    /// Empty when the root itself runs.
    pub command_path: Vec<String>,

    /// Application-lifetime state shared by every command.
    pub resources: Rc<Resources>,
}

impl CommandContext {
    pub fn new(command_path: Vec<String>, resources: Rc<Resources>) -> Self {
        Self {
            command_path,
            resources,
        }
    }
}

impl Default for CommandContext {
    fn default() -> Self {
        Self {
            command_path: Vec::new(),
            resources: Rc::new(Resources::new()),
        }
    }
}

/// A node of the command tree.
pub trait Command {
    fn help(&self) -> &str {
        ""
    }

    fn parameters(&self) -> Vec<Parameter> {
        Vec::new()
    }

    /// Sub-commands, in display order. Called once when the node is added to a tree.
    fn children(&self) -> Vec<Child> {
        Vec::new()
    }

    /// Checks and normalizes the parameters before `main` runs.
    fn validate(&self, params: ParameterMapping) -> Result<ParameterMapping, ArgumentsError> {
        Ok(params)
    }

    fn main(&mut self, ctx: &CommandContext, params: ParameterMapping) -> CommandResult;
}

type ChildFactory = Rc<dyn Fn(&Resources) -> Box<dyn Command>>;

/// A named child declaration: the sub-command name plus a factory for it.
#[derive(Clone)]
pub struct Child {
    name: String,
    factory: ChildFactory,
}

impl Child {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Resources) -> Box<dyn Command> + 'static,
    {
        Self {
            name: name.into(),
            factory: Rc::new(factory),
        }
    }

    /// A child built with `C::default()`.
    pub fn of<C>(name: impl Into<String>) -> Self
    where
        C: Command + Default + 'static,
    {
        Self::new(name, |_| Box::new(C::default()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn build(&self, resources: &Resources) -> Box<dyn Command> {
        (self.factory)(resources)
    }
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Child")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
