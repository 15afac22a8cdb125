//! Bootstrap command dispatch.
//!
//! There are two modes of command processing:
//!
//! 1. On launch, [`Dispatcher::handle_command_line`] looks for an instance
//!    already running against the same workspace and asks it to execute the
//!    requested commands. If it executes at least one, the launcher exits
//!    instead of starting a second workbench.
//! 2. Inside a running workbench, [`execute_commands`] is called with the
//!    UI already activated and an in-process controller.
//!
//! Nothing in here is allowed to abort the launch: every failure degrades to
//! "start locally" or "this command was not executed".

pub mod custom;

pub use custom::handle_custom_parameters;

use crate::cli::{
    CommandLine, OptionSchema, PARAM_BRING_TO_FRONT, PARAM_CLOSE_TABS, PARAM_CONFIG,
    PARAM_CONNECT, PARAM_DISCONNECT_ALL, PARAM_FILE, PARAM_HELP, PARAM_NEW_INSTANCE,
    PARAM_REUSE_WORKSPACE, PARAM_STOP, PARAM_THREAD_DUMP, PARAM_VERSION, render_help,
};
use crate::config::VariableResolver;
use crate::instance::{InstanceController, InstanceLocator, InstanceLookup, RemoteCallError};
use crate::plugins::ContributedParameters;
use crate::product;
use crate::Error;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Workbench command that closes every open database connection.
pub const CMD_DISCONNECT_ALL: &str = "workbench.connection.disconnectAll";

/// Process-wide flags written during dispatch and read by the rest of bootstrap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessFlags {
    /// Reuse the workspace without warning about it being in use
    pub reuse_workspace: bool,
    /// Restrict the new instance to exclusive workspace behavior
    pub exclusive_mode: bool,
}

/// Decision returned to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The requested work is done (or help/version was printed); exit.
    ExitNow,
    /// Start the workbench locally with these flags.
    ContinueLocal(ProcessFlags),
    /// Command processing was aborted for this call; nothing was forwarded.
    ProcessingError(String),
}

impl DispatchOutcome {
    /// True only for [`DispatchOutcome::ExitNow`].
    pub fn should_exit(&self) -> bool {
        matches!(self, DispatchOutcome::ExitNow)
    }
}

/// State written during dispatch and handed to the rest of bootstrap.
#[derive(Debug, Clone, Default)]
pub struct LaunchState {
    pub flags: ProcessFlags,
    pub variables: VariableResolver,
}

impl LaunchState {
    pub fn new() -> Self {
        Self::default()
    }

    fn continue_local(&self) -> DispatchOutcome {
        DispatchOutcome::ContinueLocal(self.flags)
    }
}

/// Launch-time dispatcher over a fixed schema, registry and locator.
pub struct Dispatcher<'a> {
    schema: &'a OptionSchema,
    contributed: &'a ContributedParameters,
    locator: &'a dyn InstanceLocator,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        schema: &'a OptionSchema,
        contributed: &'a ContributedParameters,
        locator: &'a dyn InstanceLocator,
    ) -> Self {
        Self {
            schema,
            contributed,
            locator,
        }
    }

    /// Decide whether this launch should exit or start a workbench.
    ///
    /// `command_line` is `None` when parsing failed; that launch starts
    /// locally with nothing forwarded. Help and version output is written
    /// to `out`.
    pub fn handle_command_line(
        &self,
        command_line: Option<&CommandLine>,
        location: &Path,
        state: &mut LaunchState,
        out: &mut dyn Write,
    ) -> DispatchOutcome {
        let Some(command_line) = command_line else {
            return state.continue_local();
        };
        if command_line.is_empty() {
            return state.continue_local();
        }

        if command_line.has_option(PARAM_HELP) {
            let help = render_help(
                product::PROGRAM_NAME,
                &product::product_title(),
                self.schema,
                product::COPYRIGHT,
            );
            emit(out, help.trim_end());
            return DispatchOutcome::ExitNow;
        }

        if command_line.has_option(PARAM_VERSION) {
            emit(out, &product::long_product_title());
            return DispatchOutcome::ExitNow;
        }

        // Only the first present exclusive parameter, in registry order, counts
        if let Some(param) = self
            .contributed
            .iter()
            .find(|p| p.exclusive_mode && p.is_present(command_line))
        {
            state.flags.exclusive_mode = true;
            if param.force_new_instance {
                tracing::debug!("Parameter '{}' forces a new instance", param.name);
                return state.continue_local();
            }
        }

        if command_line.has_option(PARAM_NEW_INSTANCE) {
            // Do not try to execute commands in a running instance
            return state.continue_local();
        }

        let controller = match self.locator.locate(location) {
            InstanceLookup::Connected(controller) => Some(controller),
            InstanceLookup::NotRunning => {
                tracing::debug!("No running instance for {}", location.display());
                None
            }
            InstanceLookup::ConnectError(detail) => {
                tracing::error!("{}", Error::RemoteConnect(detail));
                None
            }
        };

        execute_commands(command_line, controller.as_deref(), false, state, out)
    }
}

/// Execute command-line commands through a controller.
///
/// The workspace-reuse flag and the variables file are applied even when no
/// controller is available. Connection specs are expanded through the loaded
/// variables before they are forwarded. Stop and thread-dump are only honored
/// before the UI has activated.
///
/// # Returns
/// [`DispatchOutcome::ExitNow`] if at least one command was executed by the
/// controller.
pub fn execute_commands(
    command_line: &CommandLine,
    controller: Option<&dyn InstanceController>,
    ui_activated: bool,
    state: &mut LaunchState,
    out: &mut dyn Write,
) -> DispatchOutcome {
    if command_line.is_empty() {
        return state.continue_local();
    }

    if command_line.has_option(PARAM_REUSE_WORKSPACE) {
        state.flags.reuse_workspace = true;
    }

    if let Some(file) = command_line
        .option_value(PARAM_CONFIG)
        .filter(|f| !f.is_empty())
    {
        if let Err(e) = state.variables.load_file(Path::new(file)) {
            tracing::error!("Error parsing command line: {}", e);
            return DispatchOutcome::ProcessingError(e.to_string());
        }
    }

    let Some(controller) = controller else {
        tracing::debug!("Can't process commands because no running instance is present");
        return state.continue_local();
    };

    if !ui_activated {
        // These commands can't be executed locally
        if command_line.has_option(PARAM_STOP) && executed(controller.quit()) {
            return DispatchOutcome::ExitNow;
        }
        if command_line.has_option(PARAM_THREAD_DUMP) {
            match controller.thread_dump() {
                Ok(dump) => {
                    emit(out, &dump);
                    return DispatchOutcome::ExitNow;
                }
                Err(e) => log_remote_failure(&e),
            }
        }
    }

    let mut exit_after_execute = false;

    let files: Vec<String> = command_line
        .option_values(PARAM_FILE)
        .into_iter()
        .map(str::to_string)
        .chain(command_line.args().iter().cloned())
        .collect();
    if !files.is_empty() && executed(controller.open_external_files(&files)) {
        exit_after_execute = true;
    }

    let mut connected = false;
    for spec in command_line.option_values(PARAM_CONNECT) {
        let spec = state.variables.resolve(spec);
        connected |= executed(controller.open_database_connection(&spec));
    }
    exit_after_execute |= connected;

    if command_line.has_option(PARAM_CLOSE_TABS) && executed(controller.close_all_editors()) {
        exit_after_execute = true;
    }
    if command_line.has_option(PARAM_DISCONNECT_ALL)
        && executed(controller.execute_workbench_command(CMD_DISCONNECT_ALL))
    {
        exit_after_execute = true;
    }
    if command_line.has_option(PARAM_BRING_TO_FRONT) && executed(controller.bring_to_front()) {
        exit_after_execute = true;
    }

    if exit_after_execute {
        DispatchOutcome::ExitNow
    } else {
        state.continue_local()
    }
}

/// Log a failed remote call and report whether the command was executed.
fn executed(result: Result<(), RemoteCallError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            log_remote_failure(&e);
            false
        }
    }
}

fn log_remote_failure(e: &RemoteCallError) {
    tracing::error!("{}", e);
}

fn emit(out: &mut dyn Write, text: &str) {
    if let Err(e) = writeln!(out, "{}", text) {
        tracing::warn!("Failed to write output: {}", e);
    }
}
