//! Routing a parameter mapping down the command tree.
//!
//! At each node:
//!
//! - a node without children runs; a discriminator reaching it means the
//!   mapping was not produced for this tree and is reported as an error.
//! - a node with children reads `_subcommand`. Absent or `null` runs the
//!   node itself. A child name shifts the mapping one level and descends.
//!   Any other name fails hard with [`DispatchError::UnknownSubcommand`].
//!
//! Running a node calls [`Command::validate`](crate::Command::validate) and then
//! [`Command::main`](crate::Command::main). An [`ArgumentsError`] from either
//! becomes [`RunResult::ArgumentsError`] with the node's usage text. Any other
//! error is logged at critical severity and returned.

use std::rc::Rc;

use clap::ArgMatches;
use serde_json::Value;

use crate::command::{ArgumentsError, CommandContext};
use crate::error::{DispatchError, Result};
use crate::mapping::{ParameterMapping, SUBCOMMAND_KEY};
use crate::resources::Resources;
use crate::tree::{CommandTree, NodeId};

/// Exit code reported for [`RunResult::ArgumentsError`].
pub const ARGUMENTS_ERROR_EXIT_CODE: i32 = 2;

/// Outcome of a dispatch that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    /// The command ran and returned an exit code.
    Completed { path: Vec<String>, code: i32 },
    /// The command rejected its arguments.
    ArgumentsError {
        path: Vec<String>,
        message: String,
        usage: String,
    },
}

impl RunResult {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunResult::Completed { code, .. } => *code,
            RunResult::ArgumentsError { .. } => ARGUMENTS_ERROR_EXIT_CODE,
        }
    }

    /// Path of the command that ran.
    pub fn path(&self) -> &[String] {
        match self {
            RunResult::Completed { path, .. } | RunResult::ArgumentsError { path, .. } => path,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunResult::Completed { .. })
    }
}

impl CommandTree {
    /// Routes `params` from the root and runs the selected command.
    pub fn execute(
        &mut self,
        params: ParameterMapping,
        resources: &Rc<Resources>,
    ) -> Result<RunResult> {
        let root = self.root();
        self.execute_node(root, params, resources)
    }

    fn execute_node(
        &mut self,
        id: NodeId,
        mut params: ParameterMapping,
        resources: &Rc<Resources>,
    ) -> Result<RunResult> {
        if self.node(id).is_leaf() {
            if let Some(value) = params.remove(SUBCOMMAND_KEY) {
                return Err(DispatchError::UnexpectedSubcommand {
                    path: path_to_string(&self.path(id)),
                    value,
                });
            }
            return self.run_node(id, params, resources);
        }

        match params.get(SUBCOMMAND_KEY) {
            None | Some(Value::Null) => {
                params.remove(SUBCOMMAND_KEY);
                self.run_node(id, params, resources)
            }
            Some(Value::String(name)) => {
                let child = self.child(id, name).ok_or_else(|| {
                    DispatchError::UnknownSubcommand {
                        path: path_to_string(&self.path(id)),
                        name: name.clone(),
                    }
                })?;
                tracing::debug!(from = %self.node(id).name(), to = %name, "routing to subcommand");
                params.shift();
                self.execute_node(child, params, resources)
            }
            Some(other) => Err(DispatchError::InvalidDiscriminator {
                path: path_to_string(&self.path(id)),
                value: other.clone(),
            }),
        }
    }

    fn run_node(
        &mut self,
        id: NodeId,
        params: ParameterMapping,
        resources: &Rc<Resources>,
    ) -> Result<RunResult> {
        let path = self.path(id);
        let ctx = CommandContext::new(path.clone(), Rc::clone(resources));
        tracing::debug!(command = %path_to_string(&path), "running command");

        let command = &mut self.node_mut(id).command;
        let outcome = command
            .validate(params)
            .map_err(anyhow::Error::from)
            .and_then(|params| command.main(&ctx, params));

        match outcome {
            Ok(code) => Ok(RunResult::Completed { path, code }),
            Err(err) => match err.downcast_ref::<ArgumentsError>() {
                Some(args) => Ok(RunResult::ArgumentsError {
                    message: args.to_string(),
                    usage: self.usage(id),
                    path,
                }),
                None => {
                    let path = path_to_string(&path);
                    tracing::error!(
                        severity = "critical",
                        command = %path,
                        error = %format!("{:#}", err),
                        error_type = ?err.root_cause(),
                        "unhandled error from command"
                    );
                    Err(DispatchError::Command { path, source: err })
                }
            },
        }
    }
}

/// Extracts the command path from ArgMatches by following the subcommand chain.
///
/// For example, `myapp config ops get` produces `["config", "ops", "get"]`.
pub fn extract_command_path(matches: &ArgMatches) -> Vec<String> {
    let mut path = Vec::new();
    let mut current = matches;

    while let Some((name, sub)) = current.subcommand() {
        path.push(name.to_string());
        current = sub;
    }

    path
}

/// Converts a command path to the form users type it, e.g. `"config ops get"`.
pub fn path_to_string(path: &[String]) -> String {
    path.join(" ")
}
