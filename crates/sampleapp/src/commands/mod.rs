//! Commands of the sample application.

pub mod config;
pub mod dirop;

use appkit::{Command, CommandContext, CommandResult, Parameter, ParameterAction, ParameterMapping};

/// The root command: runs when no subcommand is given.
#[derive(Default)]
pub struct SampleRoot;

impl Command for SampleRoot {
    fn help(&self) -> &str {
        "Sample application"
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::new("magic")
            .action(ParameterAction::Flag)
            .help("Do magic")]
    }

    fn main(&mut self, _ctx: &CommandContext, params: ParameterMapping) -> CommandResult {
        for line in report(params) {
            println!("{}", line);
        }
        Ok(0)
    }
}

/// The root's output: the magic banner, then any remaining parameters.
pub fn report(mut params: ParameterMapping) -> Vec<String> {
    let magic = params.remove("magic").and_then(|v| v.as_bool()).unwrap_or(false);
    let banner = if magic {
        "=> with magic :-D"
    } else {
        "=> without magic :-("
    };

    std::iter::once(banner.to_string())
        .chain(params.iter().map(|(k, v)| format!("{}={}", k, v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report() {
        let mut params = ParameterMapping::new();
        params.insert("magic", true);
        params.insert("extra", "x");
        assert_eq!(report(params), vec!["=> with magic :-D", "extra=\"x\""]);

        assert_eq!(report(ParameterMapping::new()), vec!["=> without magic :-("]);
    }
}
