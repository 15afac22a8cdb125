//! Launcher configuration.
//!
//! Two unrelated concerns live here:
//!
//! - [`resolver`]: where the launcher looks for its workspace and plugins,
//!   and how long it waits on a running instance, with source tracking.
//! - [`variables`]: the optional `-vars` file whose key/value pairs feed the
//!   process-wide [`VariableResolver`].

pub mod resolver;
pub mod variables;

pub use resolver::{
    CALL_TIMEOUT_ENV, CONNECT_TIMEOUT_ENV, DATA_DIR_ENV, LaunchSettings, PLUGIN_DIR_ENV, Resolved,
    ValueSource, resolve_launch_settings, resolve_launch_settings_with,
};
pub use variables::{VariableResolver, parse_properties};
