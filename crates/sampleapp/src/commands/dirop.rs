//! The `dirop` plugin: the `dir-op` command and the `counter` service it uses.

use appkit::{
    Application, ArgumentsError, Command, CommandContext, CommandResult, Parameter,
    ParameterMapping, Result, SharedRegistry,
};

/// Counts how many times `dir-op` ran in this process.
#[derive(Debug, Default)]
pub struct Counter {
    pub count: u64,
}

#[derive(Default)]
pub struct DirOp;

impl Command for DirOp {
    fn help(&self) -> &str {
        "Change desktop background"
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::new("directory")
            .abbr("d")
            .value_name("DIR")
            .help("Choose random background from directory")
            .required(true)]
    }

    fn validate(&self, params: ParameterMapping) -> std::result::Result<ParameterMapping, ArgumentsError> {
        match params.get("directory") {
            Some(serde_json::Value::String(dir)) if !dir.is_empty() => Ok(params),
            Some(other) => Err(ArgumentsError::new(format!("Invalid directory: {}", other))),
            None => Err(ArgumentsError::new("Invalid directory: null")),
        }
    }

    fn main(&mut self, ctx: &CommandContext, params: ParameterMapping) -> CommandResult {
        let registry = ctx.resources.get_required::<SharedRegistry>()?;
        let counter = registry.borrow().get_service::<Counter>("counter")?;
        counter.borrow_mut().count += 1;
        tracing::debug!(count = counter.borrow().count, "dir-op invoked");

        println!(
            "Got directory: {}",
            params.get_str("directory").unwrap_or_default()
        );
        Ok(0)
    }
}

pub fn install(app: &mut Application) -> Result<()> {
    app.register_service("counter", |_| Counter::default())?;
    app.register_command("dir-op", |_| Box::new(DirOp))
}
