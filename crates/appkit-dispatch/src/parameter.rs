//! Command-line parameter declarations.
//!
//! A [`Parameter`] is what a command declares about one of its arguments:
//! its name, optional one-letter abbreviation, help text and how values are
//! collected. The tree turns each declaration into a [`clap::Arg`] when the
//! parser is built and reads the parsed value back into the flat
//! [`ParameterMapping`](crate::ParameterMapping) under [`Parameter::name`].

use clap::{Arg, ArgAction, ArgMatches};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::mapping::SUBCOMMAND_KEY;

/// Key of the help argument clap adds to every command.
const HELP: &str = "help";

/// Flags clap claims on every command.
pub(crate) const HELP_FLAGS: [&str; 2] = ["-h", "--help"];

static NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z0-9_-]+$").expect("parameter name pattern is valid"));

/// Errors in a parameter declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("invalid parameter name '{0}'")]
    InvalidName(String),

    #[error("invalid abbreviation '{abbr}' for parameter '{name}': abbr must be a single letter")]
    InvalidAbbreviation { name: String, abbr: String },

    #[error("parameter name '{0}' is reserved")]
    Reserved(String),

    #[error("parameter '{name}' already declared on command '{command}'")]
    Duplicate { command: String, name: String },

    #[error("flag '{flag}' already used on command '{command}'")]
    FlagInUse { command: String, flag: String },
}

/// How a parameter collects values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterAction {
    /// Takes one value (`--dir /tmp`). Missing reads as `null`.
    #[default]
    Set,
    /// Repeatable value (`-c a.json -c b.json`). Reads as an array.
    Append,
    /// Boolean switch (`--force`). Reads as `true`/`false`.
    Flag,
    /// Repeatable counter (`-vvv`). Reads as a number.
    Count,
}

/// A single command-line argument declaration.
///
/// ```rust
/// use appkit_dispatch::{Parameter, ParameterAction};
///
/// let p = Parameter::new("dry-run").abbr("n").action(ParameterAction::Flag);
/// p.validate()?;
///
/// assert_eq!(p.name(), "dry_run");
/// assert_eq!(p.short_flag().as_deref(), Some("-n"));
/// assert_eq!(p.long_flag(), "--dry-run");
/// # Ok::<(), appkit_dispatch::ParameterError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    raw_name: String,
    abbr: Option<String>,
    long: Option<String>,
    help: Option<String>,
    action: ParameterAction,
    required: bool,
    default: Option<String>,
    value_name: Option<String>,
    positional: bool,
}

impl Parameter {
    /// Declares a parameter. The name is checked by [`validate`](Self::validate),
    /// which the command tree calls when the command is added.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            raw_name: name.into(),
            abbr: None,
            long: None,
            help: None,
            action: ParameterAction::Set,
            required: false,
            default: None,
            value_name: None,
            positional: false,
        }
    }

    /// One-letter short flag, rendered as `-<c>`.
    pub fn abbr(mut self, abbr: impl Into<String>) -> Self {
        self.abbr = Some(abbr.into());
        self
    }

    /// Overrides the long flag. By default it is derived from the name.
    pub fn long(mut self, long: impl Into<String>) -> Self {
        self.long = Some(long.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn action(mut self, action: ParameterAction) -> Self {
        self.action = action;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn value_name(mut self, value_name: impl Into<String>) -> Self {
        self.value_name = Some(value_name.into());
        self
    }

    /// Takes the value by position instead of by flag. With
    /// [`ParameterAction::Append`] it swallows one or more values.
    pub fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    /// Checks the name, the long flag override and the abbreviation.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if !NAME.is_match(&self.raw_name) {
            return Err(ParameterError::InvalidName(self.raw_name.clone()));
        }
        if self.name().starts_with(SUBCOMMAND_KEY) || self.name() == HELP {
            return Err(ParameterError::Reserved(self.raw_name.clone()));
        }
        if let Some(long) = &self.long {
            if !NAME.is_match(long) {
                return Err(ParameterError::InvalidName(long.clone()));
            }
        }
        if let Some(abbr) = &self.abbr {
            if abbr.chars().count() != 1 {
                return Err(ParameterError::InvalidAbbreviation {
                    name: self.raw_name.clone(),
                    abbr: abbr.clone(),
                });
            }
        }
        Ok(())
    }

    /// The mapping key: the declared name with `-` turned into `_`.
    pub fn name(&self) -> String {
        self.raw_name.replace('-', "_")
    }

    pub fn short_flag(&self) -> Option<String> {
        self.abbr.as_ref().map(|abbr| format!("-{}", abbr))
    }

    pub fn long_flag(&self) -> String {
        format!("--{}", self.long_name())
    }

    fn long_name(&self) -> String {
        self.long
            .clone()
            .unwrap_or_else(|| self.name())
            .replace('_', "-")
    }

    /// The short and long flags this parameter takes on the command line.
    /// Positional parameters take none.
    pub(crate) fn flags(&self) -> Vec<String> {
        if self.positional {
            return Vec::new();
        }
        self.short_flag()
            .into_iter()
            .chain(std::iter::once(self.long_flag()))
            .collect()
    }

    pub fn get_help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn get_action(&self) -> ParameterAction {
        self.action
    }

    pub fn is_positional(&self) -> bool {
        self.positional
    }

    /// Builds the clap argument for this declaration.
    pub fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.name());

        if !self.positional {
            arg = arg.long(self.long_name());
            if let Some(c) = self.abbr.as_ref().and_then(|a| a.chars().next()) {
                arg = arg.short(c);
            }
        }

        arg = match self.action {
            ParameterAction::Set => arg.action(ArgAction::Set),
            ParameterAction::Append => arg.action(ArgAction::Append),
            ParameterAction::Flag => arg.action(ArgAction::SetTrue),
            ParameterAction::Count => arg.action(ArgAction::Count),
        };

        if self.positional && self.action == ParameterAction::Append {
            arg = arg.num_args(1..);
        }
        if let Some(help) = &self.help {
            arg = arg.help(help.clone());
        }
        if self.required {
            arg = arg.required(true);
        }
        if let Some(default) = &self.default {
            arg = arg.default_value(default.clone());
        }
        if let Some(value_name) = &self.value_name {
            arg = arg.value_name(value_name.clone());
        }

        arg
    }

    /// Reads this parameter's value out of the matches it was parsed into.
    pub fn read(&self, matches: &ArgMatches) -> Value {
        let id = self.name();
        match self.action {
            ParameterAction::Flag => Value::Bool(matches.get_flag(&id)),
            ParameterAction::Count => Value::from(matches.get_count(&id)),
            ParameterAction::Set => matches
                .get_one::<String>(&id)
                .map(|v| Value::String(v.clone()))
                .unwrap_or(Value::Null),
            ParameterAction::Append => Value::Array(
                matches
                    .get_many::<String>(&id)
                    .map(|vals| vals.map(|v| Value::String(v.clone())).collect())
                    .unwrap_or_default(),
            ),
        }
    }
}
