//! Extension points and the registry that resolves them.
//!
//! An application exposes a fixed set of [`ExtensionPoint`]s. Plugins and the
//! application itself register named [`ExtensionClass`]es against them, and
//! the registry resolves `(point, name)` to an instance according to the
//! point's [`InstanceStyle`]:
//!
//! | point | style | resolution |
//! |-------|-------|------------|
//! | [`ExtensionPoint::Command`] | per call | a fresh command from the factory |
//! | [`ExtensionPoint::Service`] | singleton | the instance built at registration |
//!
//! ```rust
//! use appkit::{ExtensionClass, ExtensionPoint, ExtensionRegistry};
//! use appkit_dispatch::Resources;
//!
//! #[derive(Default)]
//! struct Counter { hits: u32 }
//!
//! let resources = Resources::new();
//! let mut registry = ExtensionRegistry::new();
//! registry.register_extension_point(ExtensionPoint::Service)?;
//! registry.register_extension_class(
//!     ExtensionClass::service("counter", |_| Counter::default()),
//!     &resources,
//! )?;
//!
//! registry.get_service::<Counter>("counter")?.borrow_mut().hits += 1;
//! assert_eq!(registry.get_service::<Counter>("counter")?.borrow().hits, 1);
//! # Ok::<(), appkit::RegistryError>(())
//! ```

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use appkit_dispatch::{Command, Resources};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static EXTENSION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z0-9-]+$").expect("extension name pattern is valid"));

/// The places an application can be extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExtensionPoint {
    Command,
    Service,
}

impl ExtensionPoint {
    pub fn style(self) -> InstanceStyle {
        match self {
            ExtensionPoint::Command => InstanceStyle::PerCall,
            ExtensionPoint::Service => InstanceStyle::Singleton,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExtensionPoint::Command => "command",
            ExtensionPoint::Service => "service",
        }
    }
}

impl fmt::Display for ExtensionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How instances of an extension point are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStyle {
    /// Every resolution builds a new instance.
    PerCall,
    /// One shared instance, built when the class is registered.
    Singleton,
}

/// Errors raised by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("extension point '{0}' is already registered")]
    ExtensionPointAlreadyRegistered(ExtensionPoint),

    #[error("extension point '{0}' is not registered")]
    ExtensionPointNotRegistered(ExtensionPoint),

    #[error("{point} '{name}' is already registered")]
    ExtensionNameCollision { point: ExtensionPoint, name: String },

    #[error("no {point} named '{name}'")]
    ExtensionNotFound { point: ExtensionPoint, name: String },

    #[error("invalid extension name '{0}'")]
    InvalidName(String),

    #[error("service '{name}' is not a {expected}")]
    ServiceTypeMismatch {
        name: String,
        expected: &'static str,
    },
}

type CommandFactory = Rc<dyn Fn(&Resources) -> Box<dyn Command>>;
type ServiceFactory = Box<dyn FnOnce(&Resources) -> ServiceHandle>;

/// A shared, type-erased service instance.
///
/// Services are stored as `Rc<RefCell<S>>`; [`downcast`](Self::downcast)
/// recovers the typed handle.
#[derive(Clone)]
pub struct ServiceHandle {
    instance: Rc<dyn Any>,
    type_name: &'static str,
}

impl ServiceHandle {
    pub fn new<S: 'static>(service: S) -> Self {
        Self {
            instance: Rc::new(RefCell::new(service)),
            type_name: type_name::<S>(),
        }
    }

    pub fn downcast<S: 'static>(&self) -> Option<Rc<RefCell<S>>> {
        Rc::clone(&self.instance).downcast::<RefCell<S>>().ok()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// True when both handles point at the same instance.
    pub fn ptr_eq(&self, other: &ServiceHandle) -> bool {
        Rc::ptr_eq(&self.instance, &other.instance)
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

enum ClassKind {
    Command(CommandFactory),
    Service(ServiceFactory),
}

/// A named extension, ready to be registered against its point.
pub struct ExtensionClass {
    name: String,
    kind: ClassKind,
}

impl ExtensionClass {
    /// A command. The factory runs on every resolution.
    pub fn command<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Resources) -> Box<dyn Command> + 'static,
    {
        Self {
            name: name.into(),
            kind: ClassKind::Command(Rc::new(factory)),
        }
    }

    /// A command built with `C::default()`.
    pub fn command_of<C>(name: impl Into<String>) -> Self
    where
        C: Command + Default + 'static,
    {
        Self::command(name, |_| Box::new(C::default()))
    }

    /// A service. The factory runs once, when the class is registered.
    pub fn service<S, F>(name: impl Into<String>, factory: F) -> Self
    where
        S: 'static,
        F: FnOnce(&Resources) -> S + 'static,
    {
        Self {
            name: name.into(),
            kind: ClassKind::Service(Box::new(move |resources: &Resources| {
                ServiceHandle::new(factory(resources))
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn point(&self) -> ExtensionPoint {
        match self.kind {
            ClassKind::Command(_) => ExtensionPoint::Command,
            ClassKind::Service(_) => ExtensionPoint::Service,
        }
    }
}

impl fmt::Debug for ExtensionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionClass")
            .field("name", &self.name)
            .field("point", &self.point())
            .finish()
    }
}

/// A registered extension.
#[derive(Clone)]
pub enum ExtensionEntry {
    Command(CommandFactory),
    Service(ServiceHandle),
}

impl ExtensionEntry {
    pub fn point(&self) -> ExtensionPoint {
        match self {
            ExtensionEntry::Command(_) => ExtensionPoint::Command,
            ExtensionEntry::Service(_) => ExtensionPoint::Service,
        }
    }

    /// Resolves the entry to an instance according to its point's style.
    pub fn instantiate(&self, resources: &Resources) -> Extension {
        match self {
            ExtensionEntry::Command(factory) => Extension::Command(factory(resources)),
            ExtensionEntry::Service(handle) => Extension::Service(handle.clone()),
        }
    }
}

impl fmt::Debug for ExtensionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionEntry::Command(_) => f.write_str("ExtensionEntry::Command"),
            ExtensionEntry::Service(handle) => {
                f.debug_tuple("ExtensionEntry::Service").field(handle).finish()
            }
        }
    }
}

/// A resolved extension.
pub enum Extension {
    Command(Box<dyn Command>),
    Service(ServiceHandle),
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extension::Command(_) => f.write_str("Extension::Command"),
            Extension::Service(handle) => f.debug_tuple("Extension::Service").field(handle).finish(),
        }
    }
}

/// Extension points and the classes registered against them.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    points: BTreeMap<ExtensionPoint, BTreeMap<String, ExtensionEntry>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_extension_point(&mut self, point: ExtensionPoint) -> Result<(), RegistryError> {
        if self.points.contains_key(&point) {
            return Err(RegistryError::ExtensionPointAlreadyRegistered(point));
        }
        self.points.insert(point, BTreeMap::new());
        tracing::debug!(%point, "extension point registered");
        Ok(())
    }

    pub fn has_extension_point(&self, point: ExtensionPoint) -> bool {
        self.points.contains_key(&point)
    }

    /// Registers `class` under its point. Service classes are instantiated
    /// here, with `resources`.
    pub fn register_extension_class(
        &mut self,
        class: ExtensionClass,
        resources: &Resources,
    ) -> Result<(), RegistryError> {
        let point = class.point();
        self.check_free(point, &class.name)?;

        let entry = match class.kind {
            ClassKind::Command(factory) => ExtensionEntry::Command(factory),
            ClassKind::Service(factory) => ExtensionEntry::Service(factory(resources)),
        };
        self.insert(point, class.name, entry);
        Ok(())
    }

    /// Registers an already-built service instance.
    pub fn register_service_instance<S: 'static>(
        &mut self,
        name: impl Into<String>,
        service: S,
    ) -> Result<ServiceHandle, RegistryError> {
        let name = name.into();
        self.check_free(ExtensionPoint::Service, &name)?;

        let handle = ServiceHandle::new(service);
        self.insert(
            ExtensionPoint::Service,
            name,
            ExtensionEntry::Service(handle.clone()),
        );
        Ok(handle)
    }

    fn check_free(&self, point: ExtensionPoint, name: &str) -> Result<(), RegistryError> {
        if !EXTENSION_NAME.is_match(name) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        let classes = self
            .points
            .get(&point)
            .ok_or(RegistryError::ExtensionPointNotRegistered(point))?;
        if classes.contains_key(name) {
            return Err(RegistryError::ExtensionNameCollision {
                point,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn insert(&mut self, point: ExtensionPoint, name: String, entry: ExtensionEntry) {
        tracing::debug!(%point, %name, "extension registered");
        if let Some(classes) = self.points.get_mut(&point) {
            classes.insert(name, entry);
        }
    }

    fn entry(&self, point: ExtensionPoint, name: &str) -> Result<&ExtensionEntry, RegistryError> {
        self.points
            .get(&point)
            .ok_or(RegistryError::ExtensionPointNotRegistered(point))?
            .get(name)
            .ok_or_else(|| RegistryError::ExtensionNotFound {
                point,
                name: name.to_string(),
            })
    }

    /// Resolves `(point, name)`: the shared instance for services, a new
    /// instance for commands.
    pub fn get_extension(
        &self,
        point: ExtensionPoint,
        name: &str,
        resources: &Resources,
    ) -> Result<Extension, RegistryError> {
        Ok(self.entry(point, name)?.instantiate(resources))
    }

    pub fn get_command(
        &self,
        name: &str,
        resources: &Resources,
    ) -> Result<Box<dyn Command>, RegistryError> {
        match self.entry(ExtensionPoint::Command, name)? {
            ExtensionEntry::Command(factory) => Ok(factory(resources)),
            ExtensionEntry::Service(_) => unreachable!("command point only holds commands"),
        }
    }

    pub fn get_service<S: 'static>(&self, name: &str) -> Result<Rc<RefCell<S>>, RegistryError> {
        let handle = match self.entry(ExtensionPoint::Service, name)? {
            ExtensionEntry::Service(handle) => handle,
            ExtensionEntry::Command(_) => unreachable!("service point only holds services"),
        };
        handle
            .downcast::<S>()
            .ok_or_else(|| RegistryError::ServiceTypeMismatch {
                name: name.to_string(),
                expected: type_name::<S>(),
            })
    }

    /// Everything registered under `point`, sorted by name.
    pub fn get_extensions_for(
        &self,
        point: ExtensionPoint,
    ) -> Result<impl Iterator<Item = (&str, &ExtensionEntry)> + Clone + '_, RegistryError> {
        let classes = self
            .points
            .get(&point)
            .ok_or(RegistryError::ExtensionPointNotRegistered(point))?;
        Ok(classes.iter().map(|(name, entry)| (name.as_str(), entry)))
    }
}
