//! Command-line option schema for the Lodestar launcher.
//!
//! The schema starts from a fixed table of built-in options and is extended
//! once at startup with options contributed by plugins (see
//! [`crate::plugins::ContributedParameters`]). After that it is read-only.
//!
//! Options follow the classic single-dash style: every option has a short
//! name (which may be several characters long, e.g. `-closeTabs`) and an
//! optional long name (`--thread-dump`).

mod help;
mod parser;

pub use help::render_help;
pub use parser::{CommandLine, KEYRING_FLAG, ParseError, ParsedOption, parse, strip_keyring};

use crate::plugins::ContributedParameters;

pub const PARAM_HELP: &str = "help";
pub const PARAM_FILE: &str = "f";
pub const PARAM_CONFIG: &str = "vars";
pub const PARAM_STOP: &str = "stop";
pub const PARAM_THREAD_DUMP: &str = "dump";
pub const PARAM_CONNECT: &str = "con";
pub const PARAM_DB_LIST: &str = "databaseList";
pub const PARAM_CLOSE_TABS: &str = "closeTabs";
pub const PARAM_DISCONNECT_ALL: &str = "disconnectAll";
pub const PARAM_REUSE_WORKSPACE: &str = "reuseWorkspace";
pub const PARAM_NEW_INSTANCE: &str = "newInstance";
pub const PARAM_BRING_TO_FRONT: &str = "bringToFront";
pub const PARAM_QUIET: &str = "q";
pub const PARAM_VERSION: &str = "version";
pub const PARAM_DATA: &str = "data";

/// A row of the fixed built-in option table.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinOption {
    pub name: &'static str,
    pub long_name: Option<&'static str>,
    pub has_arg: bool,
    pub description: &'static str,
}

const fn opt(
    name: &'static str,
    long_name: Option<&'static str>,
    has_arg: bool,
    description: &'static str,
) -> BuiltinOption {
    BuiltinOption {
        name,
        long_name,
        has_arg,
        description,
    }
}

/// Built-in options, in help-output order.
///
/// The trailing group is passed through from the platform launcher and is
/// accepted so that parsing does not fail on it.
pub const BUILTIN_OPTIONS: &[BuiltinOption] = &[
    opt(PARAM_HELP, Some(PARAM_HELP), false, "Help"),
    opt(
        PARAM_CONFIG,
        Some("variablesFile"),
        true,
        "Uses a specified configuration file for variable resolving",
    ),
    opt(
        PARAM_DB_LIST,
        Some("database-driver-list"),
        true,
        "Show list of supported database drivers in json format",
    ),
    opt(PARAM_FILE, Some("file"), true, "Open a file"),
    opt(PARAM_STOP, Some("quit"), false, "Stop Lodestar running instance"),
    opt(
        PARAM_THREAD_DUMP,
        Some("thread-dump"),
        false,
        "Print instance thread dump",
    ),
    opt(
        PARAM_CONNECT,
        Some("connect"),
        true,
        "Connects to a specified database",
    ),
    opt(
        PARAM_DISCONNECT_ALL,
        Some(PARAM_DISCONNECT_ALL),
        false,
        "Disconnect from all databases",
    ),
    opt(
        PARAM_CLOSE_TABS,
        Some(PARAM_CLOSE_TABS),
        false,
        "Close all open editors",
    ),
    opt(
        PARAM_REUSE_WORKSPACE,
        Some(PARAM_REUSE_WORKSPACE),
        false,
        "Force workspace reuse (do not show warnings)",
    ),
    opt(
        PARAM_NEW_INSTANCE,
        Some(PARAM_NEW_INSTANCE),
        false,
        "Force creating new application instance (do not try to activate already running)",
    ),
    opt(
        PARAM_BRING_TO_FRONT,
        Some(PARAM_BRING_TO_FRONT),
        false,
        "Bring Lodestar window on top of other applications",
    ),
    opt(
        PARAM_QUIET,
        Some(PARAM_QUIET),
        false,
        "Run quietly (do not print logs)",
    ),
    opt(
        PARAM_VERSION,
        Some(PARAM_VERSION),
        false,
        "Displays the app name, edition, and version in Major.Minor.Micro.Timestamp format",
    ),
    // Platform launcher options
    opt("product", None, true, "Product id"),
    opt("nl", None, true, "National locale"),
    opt(PARAM_DATA, None, true, "Data directory"),
    opt("nosplash", None, false, "No splash screen"),
    opt("showlocation", None, false, "Show location"),
    opt("registryMultiLanguage", None, false, "Multi-language mode"),
];

/// A single option known to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    /// Short name, used after a single dash (`-closeTabs`)
    pub name: String,
    /// Long name, used after a double dash (`--thread-dump`)
    pub long_name: Option<String>,
    /// Whether each occurrence takes exactly one value
    pub has_arg: bool,
    /// Help text
    pub description: String,
}

impl OptionSpec {
    pub fn new(
        name: impl Into<String>,
        long_name: Option<String>,
        has_arg: bool,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            long_name,
            has_arg,
            description: description.into(),
        }
    }

    /// True if `name` is either the short or the long name of this option.
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name || self.long_name.as_deref() == Some(name)
    }
}

impl From<&BuiltinOption> for OptionSpec {
    fn from(builtin: &BuiltinOption) -> Self {
        Self {
            name: builtin.name.to_string(),
            long_name: builtin.long_name.map(str::to_string),
            has_arg: builtin.has_arg,
            description: builtin.description.to_string(),
        }
    }
}

/// Check that an option name fits the option grammar.
///
/// Names may contain ASCII alphanumerics, `_`, `-` and `?`, and may not start
/// with `-`.
pub fn is_valid_option_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '?'))
}

/// The merged option schema: built-in options plus contributed ones.
#[derive(Debug, Clone, Default)]
pub struct OptionSchema {
    options: Vec<OptionSpec>,
}

impl OptionSchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a schema holding only the built-in option table.
    pub fn builtin() -> Self {
        Self {
            options: BUILTIN_OPTIONS.iter().map(OptionSpec::from).collect(),
        }
    }

    /// Create the full schema: built-ins followed by every contributed parameter.
    pub fn with_contributed(contributed: &ContributedParameters) -> Self {
        let mut schema = Self::builtin();
        for param in contributed.iter() {
            schema.add(param.option_spec());
        }
        schema
    }

    /// Add an option to the schema.
    ///
    /// An existing option sharing the short or long name is replaced in place
    /// and returned; the collision is logged.
    pub fn add(&mut self, spec: OptionSpec) -> Option<OptionSpec> {
        let collides = |existing: &OptionSpec| {
            existing.name == spec.name
                || (existing.long_name.is_some() && existing.long_name == spec.long_name)
        };

        let Some(index) = self.options.iter().position(collides) else {
            self.options.push(spec);
            return None;
        };

        tracing::warn!(
            "Option '{}' overrides previously registered option '{}'",
            spec.name,
            self.options[index].name
        );
        let replaced = std::mem::replace(&mut self.options[index], spec);
        // A second collision (short with one entry, long with another) leaves a stale duplicate
        let current = self.options[index].clone();
        let mut position = 0;
        self.options.retain(|existing| {
            let keep = position == index
                || !(existing.name == current.name
                    || (existing.long_name.is_some() && existing.long_name == current.long_name));
            position += 1;
            keep
        });
        Some(replaced)
    }

    /// Look up an option by short name.
    pub fn by_name(&self, name: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|o| o.name == name)
    }

    /// Look up an option by long name.
    pub fn by_long_name(&self, long_name: &str) -> Option<&OptionSpec> {
        self.options
            .iter()
            .find(|o| o.long_name.as_deref() == Some(long_name))
    }

    /// Look up an option by short name, falling back to long name.
    pub fn get(&self, name: &str) -> Option<&OptionSpec> {
        self.by_name(name).or_else(|| self.by_long_name(name))
    }

    /// Options whose long name starts with `prefix`.
    pub fn long_prefix_matches(&self, prefix: &str) -> Vec<&OptionSpec> {
        self.options
            .iter()
            .filter(|o| o.long_name.as_deref().is_some_and(|l| l.starts_with(prefix)))
            .collect()
    }

    /// Iterate over all options in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &OptionSpec> {
        self.options.iter()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}
