//! The command tree.
//!
//! Nodes live in an arena owned by [`CommandTree`] and refer to each other by
//! [`NodeId`]. Each node knows its parent, so the path of any node can be
//! recovered by walking up to the root. Children are instantiated from the
//! command's [`Command::children`] declaration when the node is added.

use std::collections::{HashMap, HashSet};
use std::fmt;

use clap::ArgMatches;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::command::Command;
use crate::error::{DispatchError, Result};
use crate::mapping::{discriminator_key, ParameterMapping};
use crate::parameter::{Parameter, ParameterError, HELP_FLAGS};
use crate::resources::Resources;

/// Maximum nesting below the root. A command that declares itself as a
/// child would otherwise recurse forever.
pub const MAX_DEPTH: usize = 32;

static COMMAND_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z0-9-]+$").expect("command name pattern is valid"));

/// Index of a node in a [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// One node: a command plus its declared surface and tree links.
pub struct CommandNode {
    name: String,
    help: String,
    parameters: Vec<Parameter>,
    pub(crate) command: Box<dyn Command>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl CommandNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("name", &self.name)
            .field("parameters", &self.parameters.len())
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

/// Arena of command nodes rooted at the application's root command.
#[derive(Debug)]
pub struct CommandTree {
    nodes: Vec<CommandNode>,
}

impl CommandTree {
    /// Creates a tree whose root is `command`, named after the program.
    ///
    /// The root command's own children are added right away.
    pub fn new(
        name: impl Into<String>,
        command: Box<dyn Command>,
        resources: &Resources,
    ) -> Result<Self> {
        Self::with_parameters(name, command, Vec::new(), resources)
    }

    /// Like [`new`](Self::new), with extra root parameters declared before
    /// any child is added, so children cannot reuse their keys.
    pub fn with_parameters(
        name: impl Into<String>,
        command: Box<dyn Command>,
        parameters: impl IntoIterator<Item = Parameter>,
        resources: &Resources,
    ) -> Result<Self> {
        let mut tree = Self { nodes: Vec::new() };
        let extra = parameters.into_iter().collect();
        tree.push_node(name.into(), command, extra, None, resources)?;
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &CommandNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut CommandNode {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds `command` as a child named `name` under `parent`, together with
    /// everything it declares below itself.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        command: Box<dyn Command>,
        resources: &Resources,
    ) -> Result<NodeId> {
        let name = name.into();
        if !COMMAND_NAME.is_match(&name) {
            return Err(DispatchError::InvalidCommandName(name));
        }
        if self.child(parent, &name).is_some() {
            return Err(DispatchError::DuplicateCommand {
                parent: self.node(parent).name.clone(),
                name,
            });
        }
        if self.depth(parent) + 1 > MAX_DEPTH {
            return Err(DispatchError::TooDeep(MAX_DEPTH));
        }

        self.push_node(name, command, Vec::new(), Some(parent), resources)
    }

    fn push_node(
        &mut self,
        name: String,
        command: Box<dyn Command>,
        extra: Vec<Parameter>,
        parent: Option<NodeId>,
        resources: &Resources,
    ) -> Result<NodeId> {
        let id = NodeId(self.nodes.len());
        let help = command.help().to_string();
        let declared = command.children();

        self.nodes.push(CommandNode {
            name,
            help,
            parameters: Vec::new(),
            command,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }

        let parameters = self.nodes[id.0].command.parameters();
        let filled = self
            .add_parameters(id, parameters)
            .and_then(|()| self.add_parameters(id, extra))
            .and_then(|()| {
                declared.into_iter().try_for_each(|child| {
                    let command = child.build(resources);
                    self.add_child(id, child.name(), command, resources).map(|_| ())
                })
            });
        if let Err(err) = filled {
            // Everything after `id` in the arena is its subtree.
            self.nodes.truncate(id.0);
            if let Some(parent) = parent {
                self.nodes[parent.0].children.pop();
            }
            return Err(err);
        }

        tracing::trace!(command = %self.node(id).name, depth = self.depth(id), "command node added");
        Ok(id)
    }

    /// Appends parameters to a node.
    ///
    /// All levels of one command line share a single mapping, so a key may
    /// appear only once along any root-to-leaf path: a parameter clashing
    /// with one on an ancestor, on the node itself or below it is rejected.
    /// Flags must be unique per node, and `-h`/`--help` belong to clap.
    /// Nothing is added when any parameter is rejected.
    pub fn add_parameters(
        &mut self,
        id: NodeId,
        parameters: impl IntoIterator<Item = Parameter>,
    ) -> Result<()> {
        let mut keys: HashMap<String, NodeId> = HashMap::new();
        for owner in self.sharing_mapping(id) {
            for parameter in &self.node(owner).parameters {
                keys.insert(parameter.name(), owner);
            }
        }
        let mut flags: HashSet<String> = HELP_FLAGS.iter().map(|f| f.to_string()).collect();
        flags.extend(self.node(id).parameters.iter().flat_map(Parameter::flags));

        let mut accepted = Vec::new();
        for parameter in parameters {
            parameter.validate()?;
            let name = parameter.name();
            if let Some(owner) = keys.get(&name) {
                return Err(ParameterError::Duplicate {
                    command: self.display_path(*owner),
                    name,
                }
                .into());
            }
            for flag in parameter.flags() {
                if !flags.insert(flag.clone()) {
                    return Err(ParameterError::FlagInUse {
                        command: self.display_path(id),
                        flag,
                    }
                    .into());
                }
            }
            keys.insert(name, id);
            accepted.push(parameter);
        }

        self.nodes[id.0].parameters.extend(accepted);
        Ok(())
    }

    /// `id`, its ancestors and its descendants.
    fn sharing_mapping(&self, id: NodeId) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            ids.push(parent);
            current = self.node(parent).parent;
        }
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            ids.push(next);
            pending.extend(self.node(next).children.iter().copied());
        }
        ids
    }

    /// The program name followed by the path, as typed on the command line.
    fn display_path(&self, id: NodeId) -> String {
        std::iter::once(self.node(self.root()).name.clone())
            .chain(self.path(id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The child of `id` called `name`, if any.
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .find(|child| self.node(*child).name == name)
    }

    /// Names from below the root down to `id`. The root's path is empty.
    pub fn path(&self, id: NodeId) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            path.push(self.node(current).name.clone());
            current = parent;
        }
        path.reverse();
        path
    }

    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Follows `path` down from the root.
    pub fn find(&self, path: &[&str]) -> Option<NodeId> {
        path.iter()
            .try_fold(self.root(), |id, name| self.child(id, name))
    }

    /// Builds the full clap command for the tree.
    pub fn parser(&self) -> clap::Command {
        self.clap_command(self.root())
    }

    fn clap_command(&self, id: NodeId) -> clap::Command {
        let node = self.node(id);
        let mut cmd = clap::Command::new(node.name.clone());
        if !node.help.is_empty() {
            cmd = cmd.about(node.help.clone());
        }
        for parameter in &node.parameters {
            cmd = cmd.arg(parameter.to_arg());
        }
        for child in &node.children {
            cmd = cmd.subcommand(self.clap_command(*child));
        }
        cmd
    }

    /// Help text for the node, with the usage line naming the full path.
    pub fn usage(&self, id: NodeId) -> String {
        let mut cmd = self.clap_command(id).bin_name(self.display_path(id));
        cmd.render_help().to_string()
    }

    /// Turns a parse of [`parser`](Self::parser) into the flat mapping.
    ///
    /// Each level's parameters are read from that level's matches. Every
    /// level with children writes its discriminator: the chosen child's
    /// name, or `null` when none was given.
    pub fn collect(&self, matches: &ArgMatches) -> ParameterMapping {
        let mut mapping = ParameterMapping::new();
        let mut id = self.root();
        let mut matches = matches;
        let mut path: Vec<String> = Vec::new();

        loop {
            let node = self.node(id);
            for parameter in &node.parameters {
                mapping.insert(parameter.name(), parameter.read(matches));
            }
            if node.is_leaf() {
                break;
            }

            let key = discriminator_key(&path);
            match matches.subcommand() {
                Some((name, sub)) => {
                    mapping.insert(key, Value::String(name.to_string()));
                    match self.child(id, name) {
                        Some(child) => {
                            path.push(name.to_string());
                            id = child;
                            matches = sub;
                        }
                        None => break,
                    }
                }
                None => {
                    mapping.insert(key, Value::Null);
                    break;
                }
            }
        }

        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Child, CommandContext, CommandResult};
    use crate::parameter::ParameterAction;
    use serde_json::json;

    #[derive(Default)]
    struct Leaf;

    impl Command for Leaf {
        fn parameters(&self) -> Vec<Parameter> {
            vec![Parameter::new("key").positional()]
        }

        fn main(&mut self, _ctx: &CommandContext, _params: ParameterMapping) -> CommandResult {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct Ops;

    impl Command for Ops {
        fn children(&self) -> Vec<Child> {
            vec![Child::of::<Leaf>("get"), Child::of::<Leaf>("set")]
        }

        fn main(&mut self, _ctx: &CommandContext, _params: ParameterMapping) -> CommandResult {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct Config;

    impl Command for Config {
        fn help(&self) -> &str {
            "Manage settings"
        }

        fn parameters(&self) -> Vec<Parameter> {
            vec![Parameter::new("force").action(ParameterAction::Flag)]
        }

        fn children(&self) -> Vec<Child> {
            vec![Child::of::<Ops>("ops"), Child::of::<Leaf>("reset")]
        }

        fn main(&mut self, _ctx: &CommandContext, _params: ParameterMapping) -> CommandResult {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct Root;

    impl Command for Root {
        fn parameters(&self) -> Vec<Parameter> {
            vec![Parameter::new("magic").action(ParameterAction::Flag)]
        }

        fn main(&mut self, _ctx: &CommandContext, _params: ParameterMapping) -> CommandResult {
            Ok(0)
        }
    }

    fn tree() -> CommandTree {
        let resources = Resources::new();
        let mut tree = CommandTree::new("app", Box::new(Root), &resources).unwrap();
        let root = tree.root();
        tree.add_child(root, "config", Box::new(Config), &resources)
            .unwrap();
        tree
    }

    #[test]
    fn test_structure_and_paths() {
        let tree = tree();
        assert_eq!(tree.len(), 6);

        let get = tree.find(&["config", "ops", "get"]).unwrap();
        assert_eq!(tree.path(get), vec!["config", "ops", "get"]);
        assert_eq!(tree.depth(get), 3);
        assert!(tree.node(get).is_leaf());

        let ops = tree.node(get).parent().unwrap();
        assert_eq!(tree.node(ops).name(), "ops");
        assert_eq!(tree.path(tree.root()), Vec::<String>::new());
        assert!(tree.find(&["config", "nope"]).is_none());
    }

    #[test]
    fn test_duplicate_child_rejected() {
        let resources = Resources::new();
        let mut tree = tree();
        let root = tree.root();
        let err = tree
            .add_child(root, "config", Box::new(Leaf), &resources)
            .unwrap_err();
        assert!(matches!(err, DispatchError::DuplicateCommand { .. }));
    }

    #[test]
    fn test_invalid_child_name_rejected() {
        let resources = Resources::new();
        let mut tree = tree();
        let root = tree.root();
        for name in ["", "with_underscore", "sp ace"] {
            let err = tree
                .add_child(root, name, Box::new(Leaf), &resources)
                .unwrap_err();
            assert!(matches!(err, DispatchError::InvalidCommandName(_)));
        }
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let mut tree = tree();
        let root = tree.root();
        let err = tree
            .add_parameters(root, [Parameter::new("magic")])
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Parameter(ParameterError::Duplicate { .. })
        ));
    }

    struct Declares(Vec<Parameter>);

    impl Command for Declares {
        fn parameters(&self) -> Vec<Parameter> {
            self.0.clone()
        }

        fn main(&mut self, _ctx: &CommandContext, _params: ParameterMapping) -> CommandResult {
            Ok(0)
        }
    }

    fn declares(parameters: impl IntoIterator<Item = Parameter>) -> Box<dyn Command> {
        Box::new(Declares(parameters.into_iter().collect()))
    }

    #[test]
    fn test_child_cannot_shadow_ancestor_key() {
        let resources = Resources::new();
        let mut tree = tree();
        let ops = tree.find(&["config", "ops"]).unwrap();

        let err = tree
            .add_child(ops, "loud", declares([Parameter::new("magic")]), &resources)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            ParameterError::Duplicate {
                command: "app".into(),
                name: "magic".into()
            }
            .to_string()
        );

        let err = tree
            .add_child(ops, "forced", declares([Parameter::new("force")]), &resources)
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Parameter(ParameterError::Duplicate { ref command, .. })
                if command == "app config"
        ));

        assert_eq!(tree.len(), 6);
        assert!(tree.find(&["config", "ops", "loud"]).is_none());
        tree.add_child(ops, "loud", Box::new(Leaf), &resources)
            .unwrap();
    }

    #[test]
    fn test_late_parameter_cannot_shadow_descendant_key() {
        let mut tree = tree();
        let root = tree.root();
        let err = tree
            .add_parameters(root, [Parameter::new("force")])
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Parameter(ParameterError::Duplicate { ref command, ref name })
                if command == "app config" && name == "force"
        ));
    }

    #[test]
    fn test_sibling_and_nested_flags_may_repeat() {
        let resources = Resources::new();
        let mut tree = tree();
        let root = tree.root();
        tree.add_parameters(root, [Parameter::new("mode").abbr("m")])
            .unwrap();
        tree.add_child(
            root,
            "mute",
            declares([Parameter::new("mute-all").abbr("m").action(ParameterAction::Flag)]),
            &resources,
        )
        .unwrap();

        let matches = tree
            .parser()
            .try_get_matches_from(["app", "-m", "fast", "mute", "-m"])
            .unwrap();
        let mapping = tree.collect(&matches);
        assert_eq!(mapping.get("mode"), Some(&json!("fast")));
        assert_eq!(mapping.get("mute_all"), Some(&json!(true)));
    }

    #[test]
    fn test_flags_unique_per_node() {
        let mut tree = tree();
        let root = tree.root();

        let err = tree
            .add_parameters(
                root,
                [Parameter::new("one").abbr("x"), Parameter::new("two").abbr("x")],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Parameter(ParameterError::FlagInUse { ref command, ref flag })
                if command == "app" && flag == "-x"
        ));

        let err = tree
            .add_parameters(root, [Parameter::new("other").long("magic")])
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Parameter(ParameterError::FlagInUse { ref flag, .. }) if flag == "--magic"
        ));

        assert_eq!(tree.node(root).parameters().len(), 1);
    }

    #[test]
    fn test_help_flags_are_taken() {
        let mut tree = tree();
        let root = tree.root();

        let err = tree
            .add_parameters(root, [Parameter::new("help")])
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Parameter(ParameterError::Reserved(_))
        ));

        for parameter in [
            Parameter::new("hint").abbr("h"),
            Parameter::new("assist").long("help"),
        ] {
            let err = tree.add_parameters(root, [parameter]).unwrap_err();
            assert!(matches!(
                err,
                DispatchError::Parameter(ParameterError::FlagInUse { .. })
            ));
        }
    }

    #[test]
    fn test_root_parameters_precede_children() {
        let resources = Resources::new();
        let verbose = Parameter::new("verbose")
            .abbr("v")
            .action(ParameterAction::Count);
        let mut tree =
            CommandTree::with_parameters("app", Box::new(Config), [verbose], &resources).unwrap();
        assert_eq!(tree.len(), 5);

        let root = tree.root();
        let err = tree
            .add_child(root, "loud", declares([Parameter::new("verbose")]), &resources)
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Parameter(ParameterError::Duplicate { ref command, .. }) if command == "app"
        ));

        let err = CommandTree::with_parameters(
            "app",
            Box::new(Config),
            [Parameter::new("force").abbr("f")],
            &resources,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Parameter(ParameterError::Duplicate { .. })
        ));
    }

    #[derive(Default)]
    struct Recursive;

    impl Command for Recursive {
        fn children(&self) -> Vec<Child> {
            vec![Child::of::<Recursive>("again")]
        }

        fn main(&mut self, _ctx: &CommandContext, _params: ParameterMapping) -> CommandResult {
            Ok(0)
        }
    }

    #[test]
    fn test_self_nesting_is_bounded() {
        let resources = Resources::new();
        let err = CommandTree::new("app", Box::new(Recursive), &resources).unwrap_err();
        assert!(matches!(err, DispatchError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn test_collect_deep_path() {
        let tree = tree();
        let matches = tree
            .parser()
            .try_get_matches_from(["app", "--magic", "config", "ops", "get", "db.host"])
            .unwrap();

        let mapping = tree.collect(&matches);
        assert_eq!(
            serde_json::to_value(&mapping).unwrap(),
            json!({
                "magic": true,
                "_subcommand": "config",
                "force": false,
                "_subcommand_config": "ops",
                "_subcommand_config_ops": "get",
                "key": "db.host",
            })
        );
    }

    #[test]
    fn test_collect_stops_at_intermediate_node() {
        let tree = tree();
        let matches = tree
            .parser()
            .try_get_matches_from(["app", "config", "--force"])
            .unwrap();

        let mapping = tree.collect(&matches);
        assert_eq!(
            serde_json::to_value(&mapping).unwrap(),
            json!({
                "magic": false,
                "_subcommand": "config",
                "force": true,
                "_subcommand_config": null,
            })
        );
    }

    #[test]
    fn test_collect_root_only() {
        let tree = tree();
        let matches = tree.parser().try_get_matches_from(["app"]).unwrap();
        let mapping = tree.collect(&matches);
        assert_eq!(
            serde_json::to_value(&mapping).unwrap(),
            json!({"magic": false, "_subcommand": null})
        );
    }

    #[test]
    fn test_usage_names_full_path() {
        let tree = tree();
        let config = tree.find(&["config"]).unwrap();
        let usage = tree.usage(config);
        assert!(usage.contains("app config"), "{usage}");
        assert!(usage.contains("--force"), "{usage}");
        assert!(usage.contains("Manage settings"), "{usage}");
    }
}
