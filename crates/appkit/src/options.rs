//! Application-wide command-line flags.
//!
//! Every application accepts these on its root command:
//!
//! | flag | key | effect |
//! |------|-----|--------|
//! | `-v`, `--verbose` | `verbose` | one level more verbose per use |
//! | `-q`, `--quiet` | `quiet` | one level less verbose per use |
//! | `-c`, `--config-file FILE` | `config_files` | load FILE into the settings store |
//! | `--plugin NAME` | `plugins` | load a plugin from the catalog |
//!
//! The application removes them from the mapping before routing, so commands
//! never see them.

use std::path::PathBuf;

use appkit_dispatch::{Parameter, ParameterAction, ParameterMapping};

use crate::logging::LogLevel;

pub const VERBOSE: &str = "verbose";
pub const QUIET: &str = "quiet";
pub const CONFIG_FILES: &str = "config_files";
pub const PLUGINS: &str = "plugins";

/// The application flags of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    pub verbose: u64,
    pub quiet: u64,
    pub config_files: Vec<PathBuf>,
    pub plugins: Vec<String>,
}

impl GlobalOptions {
    /// The flag declarations added to the root command.
    pub fn parameters() -> Vec<Parameter> {
        vec![
            Parameter::new(VERBOSE)
                .abbr("v")
                .action(ParameterAction::Count)
                .help("More verbose output (repeatable)"),
            Parameter::new(QUIET)
                .abbr("q")
                .action(ParameterAction::Count)
                .help("Less verbose output (repeatable)"),
            Parameter::new(CONFIG_FILES)
                .abbr("c")
                .long("config-file")
                .action(ParameterAction::Append)
                .value_name("FILE")
                .help("Load settings from a JSON file (repeatable)"),
            Parameter::new(PLUGINS)
                .long("plugin")
                .action(ParameterAction::Append)
                .value_name("NAME")
                .help("Load a plugin (repeatable)"),
        ]
    }

    /// Removes the application flags from `params`.
    pub fn consume(params: &mut ParameterMapping) -> Self {
        let options = Self {
            verbose: params.get_count(VERBOSE),
            quiet: params.get_count(QUIET),
            config_files: params
                .get_strings(CONFIG_FILES)
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            plugins: params.get_strings(PLUGINS),
        };
        for key in [VERBOSE, QUIET, CONFIG_FILES, PLUGINS] {
            params.remove(key);
        }
        options
    }

    pub fn log_level(&self, base: LogLevel) -> LogLevel {
        base.adjust(self.verbose, self.quiet)
    }
}

/// Finds `--plugin NAME` and `--plugin=NAME` in raw arguments.
///
/// Plugins can add commands, so they are loaded before the parser is built.
/// Scanning stops at `--`.
pub fn scan_plugins<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    let mut plugins = Vec::new();
    let mut iter = args.iter().map(AsRef::as_ref);

    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }
        if arg == "--plugin" {
            if let Some(name) = iter.next() {
                plugins.push(name.to_string());
            }
        } else if let Some(name) = arg.strip_prefix("--plugin=") {
            plugins.push(name.to_string());
        }
    }

    plugins
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_consume_removes_globals() {
        let mut params: ParameterMapping = serde_json::from_value(json!({
            "verbose": 2,
            "quiet": 1,
            "config_files": ["a.json", "b.json"],
            "plugins": ["dirop"],
            "_subcommand": "dir-op",
            "directory": "/tmp",
        }))
        .unwrap();

        let options = GlobalOptions::consume(&mut params);
        assert_eq!(
            options,
            GlobalOptions {
                verbose: 2,
                quiet: 1,
                config_files: vec![PathBuf::from("a.json"), PathBuf::from("b.json")],
                plugins: vec!["dirop".into()],
            }
        );
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({"_subcommand": "dir-op", "directory": "/tmp"})
        );
        assert_eq!(options.log_level(LogLevel::Warning), LogLevel::Info);
    }

    #[test]
    fn test_consume_missing_is_default() {
        let mut params = ParameterMapping::new();
        assert_eq!(GlobalOptions::consume(&mut params), GlobalOptions::default());
    }

    #[test]
    fn test_parameters_are_valid() {
        for p in GlobalOptions::parameters() {
            p.validate().unwrap();
        }
        let flags: Vec<_> = GlobalOptions::parameters()
            .iter()
            .map(Parameter::long_flag)
            .collect();
        assert_eq!(
            flags,
            vec!["--verbose", "--quiet", "--config-file", "--plugin"]
        );
    }

    #[test]
    fn test_scan_plugins() {
        let args = ["app", "--plugin", "a", "-v", "--plugin=b", "cmd", "--", "--plugin", "c"];
        assert_eq!(scan_plugins(&args), vec!["a", "b"]);
        assert!(scan_plugins(&["app", "--plugin"]).is_empty());
    }
}
