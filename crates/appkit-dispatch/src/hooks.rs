//! Hooks around command dispatch.
//!
//! ```text
//! parsed CLI args → flat mapping → globals consumed
//!   → PRE-DISPATCH HOOKS ← (inspect or edit the mapping, abort)
//!   → routing and the command's main
//!   → POST-DISPATCH HOOKS ← (see the executed path and exit code)
//! ```
//!
//! Pre-dispatch hooks run in registration order and may change the mapping
//! the command receives. Returning an error aborts the run before any
//! command executes.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::dispatch::RunResult;
use crate::mapping::ParameterMapping;
use crate::resources::Resources;

/// The phase at which a hook error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    PreDispatch,
    PostDispatch,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::PreDispatch => write!(f, "pre-dispatch"),
            HookPhase::PostDispatch => write!(f, "post-dispatch"),
        }
    }
}

/// Error returned by a hook.
#[derive(Debug, Error)]
#[error("hook error ({phase}): {message}")]
pub struct HookError {
    pub message: String,
    pub phase: HookPhase,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl HookError {
    pub fn pre_dispatch(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            phase: HookPhase::PreDispatch,
            source: None,
        }
    }

    pub fn post_dispatch(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            phase: HookPhase::PostDispatch,
            source: None,
        }
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        self.source = Some(source.into());
        self
    }
}

pub type PreDispatchFn = Rc<dyn Fn(&mut ParameterMapping, &Resources) -> Result<(), HookError>>;

pub type PostDispatchFn = Rc<dyn Fn(&RunResult, &Resources) -> Result<(), HookError>>;

/// Ordered hook lists.
#[derive(Clone, Default)]
pub struct Hooks {
    pre_dispatch: Vec<PreDispatchFn>,
    post_dispatch: Vec<PostDispatchFn>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pre_dispatch.is_empty() && self.post_dispatch.is_empty()
    }

    /// Adds a pre-dispatch hook.
    ///
    /// ```rust
    /// use appkit_dispatch::{HookError, Hooks};
    ///
    /// let hooks = Hooks::new().pre_dispatch(|params, _resources| {
    ///     if params.get_flag("dry_run") {
    ///         return Err(HookError::pre_dispatch("dry run requested"));
    ///     }
    ///     params.insert("started_by", "hook");
    ///     Ok(())
    /// });
    /// # assert!(!hooks.is_empty());
    /// ```
    pub fn pre_dispatch<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ParameterMapping, &Resources) -> Result<(), HookError> + 'static,
    {
        self.pre_dispatch.push(Rc::new(f));
        self
    }

    pub fn post_dispatch<F>(mut self, f: F) -> Self
    where
        F: Fn(&RunResult, &Resources) -> Result<(), HookError> + 'static,
    {
        self.post_dispatch.push(Rc::new(f));
        self
    }

    /// Appends the hooks of `other` after these.
    pub fn extend(&mut self, other: Hooks) {
        self.pre_dispatch.extend(other.pre_dispatch);
        self.post_dispatch.extend(other.post_dispatch);
    }

    pub fn run_pre_dispatch(
        &self,
        params: &mut ParameterMapping,
        resources: &Resources,
    ) -> Result<(), HookError> {
        for hook in &self.pre_dispatch {
            hook(params, resources)?;
        }
        Ok(())
    }

    pub fn run_post_dispatch(
        &self,
        result: &RunResult,
        resources: &Resources,
    ) -> Result<(), HookError> {
        for hook in &self.post_dispatch {
            hook(result, resources)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("pre_dispatch_count", &self.pre_dispatch.len())
            .field("post_dispatch_count", &self.post_dispatch.len())
            .finish()
    }
}
