//! The `config` plugin: read and change settings from the command line.
//!
//! ```text
//! config
//! ├── ops
//! │   ├── get KEY
//! │   └── set KEY VALUE [--write FILE]
//! └── reset --yes
//! ```

use appkit::{
    Application, ArgumentsError, Child, Command, CommandContext, CommandResult, Parameter,
    ParameterAction, ParameterMapping, Result, SharedStore,
};
use serde_json::Value;

#[derive(Default)]
pub struct ConfigCommand;

impl Command for ConfigCommand {
    fn help(&self) -> &str {
        "Optional command"
    }

    fn children(&self) -> Vec<Child> {
        vec![Child::of::<ConfigOps>("ops"), Child::of::<ConfigReset>("reset")]
    }

    fn main(&mut self, _ctx: &CommandContext, _params: ParameterMapping) -> CommandResult {
        Err(ArgumentsError::new("a subcommand is required").into())
    }
}

#[derive(Default)]
pub struct ConfigOps;

impl Command for ConfigOps {
    fn help(&self) -> &str {
        "Read or write one setting"
    }

    fn children(&self) -> Vec<Child> {
        vec![Child::of::<ConfigGet>("get"), Child::of::<ConfigSet>("set")]
    }

    fn main(&mut self, _ctx: &CommandContext, _params: ParameterMapping) -> CommandResult {
        Err(ArgumentsError::new("an operation is required").into())
    }
}

#[derive(Default)]
pub struct ConfigGet;

impl Command for ConfigGet {
    fn help(&self) -> &str {
        "Print a setting as JSON"
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::new("key").positional().required(true)]
    }

    fn main(&mut self, ctx: &CommandContext, params: ParameterMapping) -> CommandResult {
        let store = ctx.resources.get_required::<SharedStore>()?;
        let key = params.get_str("key").unwrap_or_default();
        let value = store.borrow().get(key)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(0)
    }
}

#[derive(Default)]
pub struct ConfigSet;

impl Command for ConfigSet {
    fn help(&self) -> &str {
        "Change a setting"
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new("key").positional().required(true),
            Parameter::new("value")
                .positional()
                .required(true)
                .help("JSON value; anything else is stored as a string"),
            Parameter::new("write")
                .abbr("w")
                .value_name("FILE")
                .help("Save all settings to FILE afterwards"),
        ]
    }

    fn main(&mut self, ctx: &CommandContext, params: ParameterMapping) -> CommandResult {
        let store = ctx.resources.get_required::<SharedStore>()?;
        let key = params.get_str("key").unwrap_or_default();
        let value = parse_value(params.get_str("value").unwrap_or_default());

        store.borrow_mut().set(key, value)?;
        if let Some(path) = params.get_str("write") {
            store.borrow().dump_file(path)?;
            tracing::info!(path = %path, "settings saved");
        }
        Ok(0)
    }
}

/// `5432` and `{"a": 1}` are JSON; `localhost` is a string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[derive(Default)]
pub struct ConfigReset;

impl Command for ConfigReset {
    fn help(&self) -> &str {
        "Forget every setting"
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::new("yes")
            .abbr("y")
            .action(ParameterAction::Flag)
            .help("Confirm the reset")]
    }

    fn validate(&self, params: ParameterMapping) -> std::result::Result<ParameterMapping, ArgumentsError> {
        if params.get_flag("yes") {
            Ok(params)
        } else {
            Err(ArgumentsError::new("refusing to reset without --yes"))
        }
    }

    fn main(&mut self, ctx: &CommandContext, _params: ParameterMapping) -> CommandResult {
        ctx.resources.get_required::<SharedStore>()?.borrow_mut().clear();
        Ok(0)
    }
}

pub fn install(app: &mut Application) -> Result<()> {
    app.register_command("config", |_| Box::new(ConfigCommand))
}
