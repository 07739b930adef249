//! The application: registry, settings store, logger and command dispatch.
//!
//! # Example
//!
//! ```rust
//! use appkit::Application;
//! use appkit_dispatch::{Command, CommandContext, CommandResult, Parameter, ParameterMapping};
//!
//! #[derive(Default)]
//! struct Hello;
//!
//! impl Command for Hello {
//!     fn parameters(&self) -> Vec<Parameter> {
//!         vec![Parameter::new("name").abbr("n").default_value("world")]
//!     }
//!
//!     fn main(&mut self, _ctx: &CommandContext, params: ParameterMapping) -> CommandResult {
//!         println!("hello {}", params.get_str("name").unwrap_or_default());
//!         Ok(0)
//!     }
//! }
//!
//! let mut app = Application::builder("greeter")
//!     .command_of::<Hello>("hello")
//!     .build()?;
//!
//! let result = app.dispatch_from(["greeter", "-v", "hello", "-n", "you"])?;
//! assert_eq!(result.exit_code(), 0);
//! assert_eq!(app.options().verbose, 1);
//! # Ok::<(), appkit::AppError>(())
//! ```

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use appkit_dispatch::{
    extract_command_path, ArgumentsError, Command, CommandContext, CommandResult, CommandTree,
    HookError, Hooks, ParameterMapping, Resources, RunResult,
};
use appkit_store::{Store, StoreBuilder, Validator};
use serde_json::{Map, Value};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::{AppError, Result};
use crate::logging::{LogLevel, Logger};
use crate::options::{scan_plugins, GlobalOptions};
use crate::registry::{ExtensionClass, ExtensionPoint, ExtensionRegistry};

/// The settings store as commands see it through [`Resources`].
pub type SharedStore = Rc<RefCell<Store>>;

/// The extension registry as commands see it through [`Resources`].
pub type SharedRegistry = Rc<RefCell<ExtensionRegistry>>;

/// Installs a plugin into an application.
pub type PluginInstaller = fn(&mut Application) -> Result<()>;

type RootFactory = Rc<dyn Fn(&Resources) -> Box<dyn Command>>;

/// Root command used when the application declares none: running without a
/// subcommand is an arguments error.
struct RequireSubcommand;

fn require_subcommand(_resources: &Resources) -> Box<dyn Command> {
    Box::new(RequireSubcommand)
}

impl Command for RequireSubcommand {
    fn main(&mut self, _ctx: &CommandContext, _params: ParameterMapping) -> CommandResult {
        Err(ArgumentsError::new("a command is required").into())
    }
}

/// A command-line application.
pub struct Application {
    name: String,
    base_level: LogLevel,
    logger: Logger,
    registry: SharedRegistry,
    store: SharedStore,
    resources: Rc<Resources>,
    root: RootFactory,
    catalog: BTreeMap<String, PluginInstaller>,
    loaded: BTreeSet<String>,
    hooks: Hooks,
    options: GlobalOptions,
}

impl Application {
    pub fn builder(name: impl Into<String>) -> ApplicationBuilder {
        ApplicationBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// The level set by the builder, before `-v`/`-q`.
    pub fn base_level(&self) -> LogLevel {
        self.base_level
    }

    pub fn registry(&self) -> Ref<'_, ExtensionRegistry> {
        self.registry.borrow()
    }

    pub fn store(&self) -> Ref<'_, Store> {
        self.store.borrow()
    }

    pub fn store_mut(&self) -> RefMut<'_, Store> {
        self.store.borrow_mut()
    }

    pub fn resources(&self) -> &Rc<Resources> {
        &self.resources
    }

    /// The application flags of the last dispatch.
    pub fn options(&self) -> &GlobalOptions {
        &self.options
    }

    /// Plugins loaded so far, sorted.
    pub fn loaded_plugins(&self) -> impl Iterator<Item = &str> {
        self.loaded.iter().map(String::as_str)
    }

    pub fn register_extension_class(&mut self, class: ExtensionClass) -> Result<()> {
        self.registry
            .borrow_mut()
            .register_extension_class(class, &self.resources)?;
        Ok(())
    }

    pub fn register_command<F>(&mut self, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn(&Resources) -> Box<dyn Command> + 'static,
    {
        self.register_extension_class(ExtensionClass::command(name, factory))
    }

    pub fn register_service<S, F>(&mut self, name: impl Into<String>, factory: F) -> Result<()>
    where
        S: 'static,
        F: FnOnce(&Resources) -> S + 'static,
    {
        self.register_extension_class(ExtensionClass::service(name, factory))
    }

    pub fn add_hooks(&mut self, hooks: Hooks) {
        self.hooks.extend(hooks);
    }

    /// Runs the catalog installer for `name`. Loading a plugin twice is a no-op.
    pub fn load_plugin(&mut self, name: &str) -> Result<()> {
        if self.loaded.contains(name) {
            tracing::debug!(plugin = %name, "plugin already loaded");
            return Ok(());
        }
        let install = *self
            .catalog
            .get(name)
            .ok_or_else(|| AppError::PluginNotFound(name.to_string()))?;

        install(self).map_err(|source| AppError::Plugin {
            name: name.to_string(),
            source: Box::new(source),
        })?;
        self.loaded.insert(name.to_string());
        tracing::info!(plugin = %name, "plugin loaded");
        Ok(())
    }

    /// Builds the command tree: the root command, the application flags and
    /// every registered command as a first-level child. The flags are
    /// declared before any child, so no command can reuse their keys.
    pub fn command_tree(&self) -> Result<CommandTree> {
        let resources: &Resources = &self.resources;
        let mut tree = CommandTree::with_parameters(
            self.name.clone(),
            (self.root)(resources),
            GlobalOptions::parameters(),
            resources,
        )?;
        let root = tree.root();

        let registry = self.registry.borrow();
        for (name, _) in registry.get_extensions_for(ExtensionPoint::Command)? {
            let command = registry.get_command(name, resources)?;
            tree.add_child(root, name, command, resources)?;
        }
        Ok(tree)
    }

    /// Parses `args` (program name first) and dispatches to the selected command.
    ///
    /// Arguments errors reported by a command come back as
    /// [`RunResult::ArgumentsError`]; everything else that goes wrong is an `Err`.
    pub fn dispatch_from<I, T>(&mut self, args: I) -> Result<RunResult>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.into().to_string_lossy().into_owned())
            .collect();

        let dispatch = self.logger.dispatch().clone();
        tracing::dispatcher::with_default(&dispatch, || self.dispatch_args(&args))
    }

    fn dispatch_args(&mut self, args: &[String]) -> Result<RunResult> {
        let _span = tracing::error_span!("app", name = %self.name).entered();

        for plugin in scan_plugins(args.get(1..).unwrap_or_default()) {
            self.load_plugin(&plugin)?;
        }

        let mut tree = self.command_tree()?;
        let matches = tree.parser().try_get_matches_from(args)?;
        let mut params = tree.collect(&matches);

        let options = GlobalOptions::consume(&mut params);
        self.logger.set_level(options.log_level(self.base_level))?;
        for path in &options.config_files {
            tracing::debug!(path = %path.display(), "loading config file");
            self.store.borrow_mut().load_file(path)?;
        }
        self.options = options;

        tracing::debug!(command = ?extract_command_path(&matches), "dispatching");
        self.hooks.run_pre_dispatch(&mut params, &self.resources)?;
        let result = tree.execute(params, &self.resources)?;
        self.hooks.run_post_dispatch(&result, &self.resources)?;
        Ok(result)
    }

    /// Runs the application and returns the process exit code.
    ///
    /// Usage and error messages are printed; clap parse errors (including
    /// `--help`) are printed the way clap prints them.
    pub fn run<I, T>(&mut self, args: I) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        match self.dispatch_from(args) {
            Ok(RunResult::ArgumentsError { message, usage, .. }) => {
                println!("{}", usage);
                eprintln!("\nError message: {}", message);
                appkit_dispatch::ARGUMENTS_ERROR_EXIT_CODE
            }
            Ok(result) => result.exit_code(),
            Err(AppError::Parse(err)) => {
                let _ = err.print();
                err.exit_code()
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                1
            }
        }
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.name)
            .field("logger", &self.logger)
            .field("registry", &self.registry)
            .field("loaded", &self.loaded)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Application`].
pub struct ApplicationBuilder {
    name: String,
    base_level: LogLevel,
    log_writer: Option<BoxMakeWriter>,
    root: Option<RootFactory>,
    classes: Vec<ExtensionClass>,
    catalog: BTreeMap<String, PluginInstaller>,
    autoload: Vec<String>,
    hooks: Hooks,
    resources: Resources,
    store: StoreBuilder,
}

impl ApplicationBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_level: LogLevel::default(),
            log_writer: None,
            root: None,
            classes: Vec::new(),
            catalog: BTreeMap::new(),
            autoload: Vec::new(),
            hooks: Hooks::new(),
            resources: Resources::new(),
            store: Store::builder(),
        }
    }

    /// Base log level, adjusted per run by `-v`/`-q`. Defaults to `Warning`.
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.base_level = level;
        self
    }

    /// Sends log output to `writer` instead of stderr.
    pub fn log_writer<W>(mut self, writer: W) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        self.log_writer = Some(BoxMakeWriter::new(writer));
        self
    }

    /// The command that runs when no subcommand is given. Its parameters are
    /// the application's own flags.
    pub fn root<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Resources) -> Box<dyn Command> + 'static,
    {
        self.root = Some(Rc::new(factory));
        self
    }

    pub fn root_command<C>(self) -> Self
    where
        C: Command + Default + 'static,
    {
        self.root(|_| Box::new(C::default()))
    }

    pub fn command<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Resources) -> Box<dyn Command> + 'static,
    {
        self.classes.push(ExtensionClass::command(name, factory));
        self
    }

    pub fn command_of<C>(mut self, name: impl Into<String>) -> Self
    where
        C: Command + Default + 'static,
    {
        self.classes.push(ExtensionClass::command_of::<C>(name));
        self
    }

    pub fn service<S, F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        S: 'static,
        F: FnOnce(&Resources) -> S + 'static,
    {
        self.classes.push(ExtensionClass::service(name, factory));
        self
    }

    pub fn extension(mut self, class: ExtensionClass) -> Self {
        self.classes.push(class);
        self
    }

    /// Adds a plugin to the catalog. It is loaded on `--plugin NAME` or
    /// through [`load_plugin`](Self::load_plugin).
    pub fn plugin(mut self, name: impl Into<String>, install: PluginInstaller) -> Self {
        self.catalog.insert(name.into(), install);
        self
    }

    /// Loads a catalog plugin when the application is built.
    pub fn load_plugin(mut self, name: impl Into<String>) -> Self {
        self.autoload.push(name.into());
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks.extend(hooks);
        self
    }

    pub fn pre_dispatch<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ParameterMapping, &Resources) -> std::result::Result<(), HookError> + 'static,
    {
        self.hooks = self.hooks.pre_dispatch(f);
        self
    }

    pub fn post_dispatch<F>(mut self, f: F) -> Self
    where
        F: Fn(&RunResult, &Resources) -> std::result::Result<(), HookError> + 'static,
    {
        self.hooks = self.hooks.post_dispatch(f);
        self
    }

    /// Shared state for commands, retrieved with `ctx.resources.get::<T>()`.
    pub fn resource<T: 'static>(mut self, value: T) -> Self {
        self.resources.insert(value);
        self
    }

    pub fn store_separator(mut self, separator: impl Into<String>) -> Self {
        self.store = self.store.separator(separator);
        self
    }

    pub fn store_validator<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.store = self.store.validator(validator);
        self
    }

    /// Initial settings, as a nested object.
    pub fn store_defaults(mut self, defaults: Map<String, Value>) -> Self {
        self.store = self.store.items(defaults);
        self
    }

    pub fn build(self) -> Result<Application> {
        let logger = match self.log_writer {
            Some(writer) => Logger::with_writer(self.name.clone(), self.base_level, writer),
            None => Logger::new(self.name.clone(), self.base_level),
        };

        let store: SharedStore = Rc::new(RefCell::new(self.store.build()?));

        let mut registry = ExtensionRegistry::new();
        registry.register_extension_point(ExtensionPoint::Command)?;
        registry.register_extension_point(ExtensionPoint::Service)?;
        let registry: SharedRegistry = Rc::new(RefCell::new(registry));

        let root: RootFactory = match self.root {
            Some(root) => root,
            None => Rc::new(require_subcommand),
        };

        let mut resources = self.resources;
        resources.insert(Rc::clone(&store));
        resources.insert(Rc::clone(&registry));

        let mut app = Application {
            name: self.name,
            base_level: self.base_level,
            logger,
            registry,
            store,
            resources: Rc::new(resources),
            root,
            catalog: self.catalog,
            loaded: BTreeSet::new(),
            hooks: self.hooks,
            options: GlobalOptions::default(),
        };

        let dispatch = app.logger.dispatch().clone();
        tracing::dispatcher::with_default(&dispatch, || -> Result<Application> {
            for class in self.classes {
                app.register_extension_class(class)?;
            }
            for name in &self.autoload {
                app.load_plugin(name)?;
            }
            Ok(app)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appkit_dispatch::Parameter;

    #[derive(Default)]
    struct Noop;

    impl Command for Noop {
        fn parameters(&self) -> Vec<Parameter> {
            vec![Parameter::new("flag").action(appkit_dispatch::ParameterAction::Flag)]
        }

        fn main(&mut self, _ctx: &CommandContext, params: ParameterMapping) -> CommandResult {
            Ok(if params.get_flag("flag") { 1 } else { 0 })
        }
    }

    fn install_noop(app: &mut Application) -> Result<()> {
        app.register_command("noop", |_| Box::new(Noop))
    }

    #[test]
    fn test_default_root_requires_subcommand() {
        let mut app = Application::builder("t").build().unwrap();
        let result = app.dispatch_from(["t"]).unwrap();
        match result {
            RunResult::ArgumentsError { message, usage, .. } => {
                assert_eq!(message, "a command is required");
                assert!(usage.contains("--verbose"), "{usage}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_resources_hold_store_and_registry() {
        let app = Application::builder("t").build().unwrap();
        assert!(app.resources().contains::<SharedStore>());
        assert!(app.resources().contains::<SharedRegistry>());

        app.store_mut().set("a.b", 1).unwrap();
        let shared = app.resources().get::<SharedStore>().unwrap();
        assert_eq!(shared.borrow().get("a.b").unwrap(), 1);
    }

    #[test]
    fn test_plugin_loaded_once() {
        let mut app = Application::builder("t")
            .plugin("noop", install_noop)
            .load_plugin("noop")
            .build()
            .unwrap();

        app.load_plugin("noop").unwrap();
        assert_eq!(app.loaded_plugins().collect::<Vec<_>>(), vec!["noop"]);
        assert_eq!(app.dispatch_from(["t", "noop", "--flag"]).unwrap().exit_code(), 1);
    }

    #[test]
    fn test_unknown_plugin() {
        let mut app = Application::builder("t").build().unwrap();
        let err = app.load_plugin("ghost").unwrap_err();
        assert!(matches!(err, AppError::PluginNotFound(name) if name == "ghost"));
    }

    #[test]
    fn test_plugin_from_command_line_adds_commands() {
        let mut app = Application::builder("t")
            .plugin("noop", install_noop)
            .build()
            .unwrap();

        assert!(app.dispatch_from(["t", "noop"]).is_err());

        let result = app.dispatch_from(["t", "--plugin", "noop", "noop"]).unwrap();
        assert_eq!(result.path(), ["noop"]);
        assert_eq!(app.options().plugins, vec!["noop"]);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let mut app = Application::builder("t").command_of::<Noop>("noop").build().unwrap();
        let err = app.dispatch_from(["t", "noop", "--nope"]).unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }
}
