//! Contributed command-line parameters.
//!
//! Plugins declare extra command-line options in KDL manifests (see
//! [`manifest`]). Each declaration names a handler identifier which is
//! resolved through a [`HandlerTable`] registered at startup, so the set of
//! handlers stays late-bound without any reflection.
//!
//! The resulting [`ContributedParameters`] registry is built once during
//! bootstrap and passed by reference to the schema builder and to the
//! dispatchers.

pub mod handlers;
pub mod manifest;

use crate::Result;
use crate::cli::{CommandLine, OptionSpec};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use manifest::{load_manifest_dir, parse_manifest};

/// Handler for a contributed parameter.
///
/// Invoked once per supplied value for parameters with an argument, or once
/// with `None` for flags.
pub trait ParameterHandler: Send + Sync {
    fn handle(&self, command_line: &CommandLine, param: &str, value: Option<&str>) -> Result<()>;
}

impl<F> ParameterHandler for F
where
    F: Fn(&CommandLine, &str, Option<&str>) -> Result<()> + Send + Sync,
{
    fn handle(&self, command_line: &CommandLine, param: &str, value: Option<&str>) -> Result<()> {
        self(command_line, param, value)
    }
}

/// Factory producing a handler instance.
pub type HandlerFactory = Box<dyn Fn() -> Arc<dyn ParameterHandler> + Send + Sync>;

/// Startup-time registration table mapping handler identifiers to factories.
#[derive(Default)]
pub struct HandlerTable {
    factories: HashMap<String, HandlerFactory>,
}

impl HandlerTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding the stock handlers (`echo`, `noop`).
    pub fn with_stock_handlers() -> Self {
        let mut table = Self::new();
        handlers::register_stock_handlers(&mut table);
        table
    }

    /// Register a factory under `id`, replacing any previous registration.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn ParameterHandler> + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Box::new(factory));
    }

    /// Instantiate the handler registered under `id`.
    pub fn instantiate(&self, id: &str) -> Option<Arc<dyn ParameterHandler>> {
        self.factories.get(id).map(|factory| factory())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.factories.keys().collect();
        ids.sort();
        f.debug_struct("HandlerTable").field("ids", &ids).finish()
    }
}

/// A parameter contributed by a plugin.
#[derive(Clone)]
pub struct ParameterDescriptor {
    pub name: String,
    pub long_name: Option<String>,
    pub description: String,
    pub has_arg: bool,
    pub exit_after_execute: bool,
    pub exclusive_mode: bool,
    pub force_new_instance: bool,
    /// Contributing plugin (manifest file stem)
    pub contributor: String,
    pub handler: Arc<dyn ParameterHandler>,
}

impl ParameterDescriptor {
    /// Create a flag descriptor with all behavior flags cleared.
    pub fn new(name: impl Into<String>, handler: Arc<dyn ParameterHandler>) -> Self {
        Self {
            name: name.into(),
            long_name: None,
            description: String::new(),
            has_arg: false,
            exit_after_execute: false,
            exclusive_mode: false,
            force_new_instance: false,
            contributor: String::new(),
            handler,
        }
    }

    /// The option this descriptor adds to the schema.
    pub fn option_spec(&self) -> OptionSpec {
        OptionSpec::new(
            self.name.clone(),
            self.long_name.clone(),
            self.has_arg,
            self.description.clone(),
        )
    }

    /// True if the option is present on the command line, by short or long name.
    pub fn is_present(&self, command_line: &CommandLine) -> bool {
        command_line.has_option(&self.name)
            || self
                .long_name
                .as_deref()
                .is_some_and(|long| command_line.has_option(long))
    }
}

impl fmt::Debug for ParameterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterDescriptor")
            .field("name", &self.name)
            .field("long_name", &self.long_name)
            .field("has_arg", &self.has_arg)
            .field("exit_after_execute", &self.exit_after_execute)
            .field("exclusive_mode", &self.exclusive_mode)
            .field("force_new_instance", &self.force_new_instance)
            .field("contributor", &self.contributor)
            .finish_non_exhaustive()
    }
}

/// Insertion-ordered registry of contributed parameters keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ContributedParameters {
    params: Vec<ParameterDescriptor>,
}

impl ContributedParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor.
    ///
    /// A descriptor sharing the name or long name of a registered one
    /// replaces it in place; the collision is logged. Any other entry the
    /// new descriptor shadows is dropped, so the registry and the option
    /// schema agree on which descriptor owns a name.
    pub fn register(&mut self, descriptor: ParameterDescriptor) {
        let name = descriptor.name.clone();
        let long_name = descriptor.long_name.clone();
        let shadows = |p: &ParameterDescriptor| {
            p.name == name || (long_name.is_some() && p.long_name == long_name)
        };

        let Some(index) = self.params.iter().position(&shadows) else {
            self.params.push(descriptor);
            return;
        };

        tracing::warn!(
            "Contributed parameter '{}' from '{}' replaces '{}' from '{}'",
            descriptor.name,
            descriptor.contributor,
            self.params[index].name,
            self.params[index].contributor
        );
        self.params[index] = descriptor;

        let mut position = 0;
        self.params.retain(|p| {
            let keep = position == index || !shadows(p);
            if !keep {
                tracing::warn!(
                    "Contributed parameter '{}' from '{}' is shadowed and dropped",
                    p.name,
                    p.contributor
                );
            }
            position += 1;
            keep
        });
    }

    /// Look up a descriptor by name.
    pub fn get(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Look up a descriptor by name, falling back to its long name.
    pub fn resolve(&self, name: &str, long_name: Option<&str>) -> Option<&ParameterDescriptor> {
        self.get(name).or_else(|| long_name.and_then(|long| self.get(long)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
