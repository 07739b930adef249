//! End-to-end routing: argv → clap → flat mapping → tree execution.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use appkit_dispatch::{
    ArgumentsError, Child, Command, CommandContext, CommandResult, CommandTree, DispatchError,
    Parameter, ParameterAction, ParameterMapping, Resources, RunResult,
};

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Default)]
struct Calls(RefCell<Vec<String>>);

fn record(ctx: &CommandContext, entry: String) -> anyhow::Result<()> {
    ctx.resources.get_required::<Calls>()?.0.borrow_mut().push(entry);
    Ok(())
}

#[derive(Default)]
struct Get;

impl Command for Get {
    fn help(&self) -> &str {
        "Print a setting"
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::new("key").positional().required(true)]
    }

    fn main(&mut self, ctx: &CommandContext, params: ParameterMapping) -> CommandResult {
        let key = params.get_str("key").unwrap_or_default().to_string();
        record(ctx, format!("{} {}", ctx.command_path.join("/"), key))?;
        Ok(0)
    }
}

#[derive(Default)]
struct Set;

impl Command for Set {
    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new("key").positional().required(true),
            Parameter::new("value").positional().required(true),
        ]
    }

    fn main(&mut self, ctx: &CommandContext, params: ParameterMapping) -> CommandResult {
        if params.get_str("value") == Some("explode") {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot store explosives",
            )
            .into());
        }
        record(ctx, ctx.command_path.join("/"))?;
        Ok(0)
    }
}

#[derive(Default)]
struct Ops;

impl Command for Ops {
    fn children(&self) -> Vec<Child> {
        vec![Child::of::<Get>("get"), Child::of::<Set>("set")]
    }

    fn main(&mut self, _ctx: &CommandContext, _params: ParameterMapping) -> CommandResult {
        Err(ArgumentsError::new("choose an operation").into())
    }
}

#[derive(Default)]
struct Reset;

impl Command for Reset {
    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::new("yes").abbr("y").action(ParameterAction::Flag)]
    }

    fn main(&mut self, ctx: &CommandContext, params: ParameterMapping) -> CommandResult {
        record(ctx, format!("reset yes={}", params.get_flag("yes")))?;
        Ok(3)
    }
}

#[derive(Default)]
struct Config;

impl Command for Config {
    fn help(&self) -> &str {
        "Manage settings"
    }

    fn children(&self) -> Vec<Child> {
        vec![Child::of::<Ops>("ops"), Child::of::<Reset>("reset")]
    }

    fn main(&mut self, ctx: &CommandContext, _params: ParameterMapping) -> CommandResult {
        record(ctx, "config".into())?;
        Ok(0)
    }
}

#[derive(Default)]
struct Root;

impl Command for Root {
    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::new("magic").action(ParameterAction::Flag)]
    }

    fn main(&mut self, ctx: &CommandContext, params: ParameterMapping) -> CommandResult {
        record(ctx, format!("root magic={}", params.get_flag("magic")))?;
        Ok(0)
    }
}

fn setup() -> (CommandTree, Rc<Resources>) {
    let mut resources = Resources::new();
    resources.insert(Calls::default());
    let resources = Rc::new(resources);

    let mut tree = CommandTree::new("app", Box::new(Root), &resources).unwrap();
    let root = tree.root();
    tree.add_child(root, "config", Box::new(Config), &resources)
        .unwrap();
    (tree, resources)
}

fn run(args: &[&str]) -> (Result<RunResult, DispatchError>, Vec<String>) {
    let (mut tree, resources) = setup();
    let argv = std::iter::once("app").chain(args.iter().copied());
    let matches = tree.parser().try_get_matches_from(argv).unwrap();
    let params = tree.collect(&matches);
    let result = tree.execute(params, &resources);
    let calls = resources.get::<Calls>().unwrap().0.borrow().clone();
    (result, calls)
}

// =============================================================================
// Routing
// =============================================================================

#[test]
fn three_levels_reach_leaf() {
    let (result, calls) = run(&["config", "ops", "get", "db.host"]);
    assert_eq!(result.unwrap().exit_code(), 0);
    assert_eq!(calls, vec!["config/ops/get db.host"]);
}

#[test]
fn sibling_branch_is_routed_independently() {
    let (result, calls) = run(&["config", "reset", "-y"]);
    let result = result.unwrap();
    assert_eq!(result.exit_code(), 3);
    assert_eq!(result.path(), ["config", "reset"]);
    assert_eq!(calls, vec!["reset yes=true"]);
}

#[test]
fn intermediate_node_runs_its_own_main() {
    let (result, calls) = run(&["config"]);
    assert_eq!(result.unwrap().path(), ["config"]);
    assert_eq!(calls, vec!["config"]);
}

#[test]
fn root_runs_without_subcommand() {
    let (result, calls) = run(&["--magic"]);
    assert!(result.unwrap().path().is_empty());
    assert_eq!(calls, vec!["root magic=true"]);
}

#[test]
fn intermediate_arguments_error_shows_its_usage() {
    let (result, calls) = run(&["config", "ops"]);
    match result.unwrap() {
        RunResult::ArgumentsError {
            path,
            message,
            usage,
        } => {
            assert_eq!(path, vec!["config", "ops"]);
            assert_eq!(message, "choose an operation");
            assert!(usage.contains("app config ops"), "{usage}");
            assert!(usage.contains("get"), "{usage}");
            assert!(usage.contains("Print a setting"), "{usage}");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(calls.is_empty());
}

#[test]
fn clap_rejects_unknown_subcommand_before_routing() {
    let (tree, _resources) = setup();
    let err = tree
        .parser()
        .try_get_matches_from(["app", "config", "drop"])
        .unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
}

// =============================================================================
// Failure logging
// =============================================================================

#[derive(Clone, Default)]
struct Buffer(Arc<Mutex<Vec<u8>>>);

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn generic_failure_is_logged_as_critical() {
    let buffer = Buffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();

    let (result, calls) = tracing::subscriber::with_default(subscriber, || {
        run(&["config", "ops", "set", "k", "explode"])
    });

    match result.unwrap_err() {
        DispatchError::Command { path, source } => {
            assert_eq!(path, "config ops set");
            assert_eq!(source.to_string(), "cannot store explosives");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(calls.is_empty());

    let logged = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    assert!(logged.contains("ERROR"), "{logged}");
    assert!(logged.contains("severity=\"critical\""), "{logged}");
    assert!(logged.contains("cannot store explosives"), "{logged}");
    assert!(
        logged.contains("error_type=Custom { kind: PermissionDenied"),
        "{logged}"
    );
}
