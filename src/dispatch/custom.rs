//! Invocation of plugin handlers for contributed parameters.
//!
//! Runs twice per launch: once before the workbench activates (so that a
//! handler can ask the launcher to exit) and once after activation, in the
//! new instance's own process.

use crate::cli::CommandLine;
use crate::plugins::{ContributedParameters, ParameterDescriptor};
use crate::{Error, Result};

/// Run handlers for every contributed parameter present on the command line.
///
/// Only options actually present are visited, in order of first occurrence.
/// Options without a contributed descriptor are skipped silently. Handler
/// failures (including panics) are logged per invocation and never stop the
/// remaining invocations.
///
/// # Returns
/// `true` if any visited descriptor is flagged `exit_after_execute`.
pub fn handle_custom_parameters(
    command_line: Option<&CommandLine>,
    contributed: &ContributedParameters,
) -> bool {
    let Some(command_line) = command_line else {
        return false;
    };

    let mut exit = false;
    for option in command_line.options() {
        let Some(param) = contributed.resolve(&option.name, option.long_name.as_deref()) else {
            continue;
        };

        if param.has_arg {
            for value in command_line.option_values(&option.name) {
                invoke(param, command_line, Some(value));
            }
        } else {
            invoke(param, command_line, None);
        }

        if param.exit_after_execute {
            exit = true;
        }
    }

    exit
}

fn invoke(param: &ParameterDescriptor, command_line: &CommandLine, value: Option<&str>) {
    if let Err(e) = guarded_handle(param, command_line, value) {
        tracing::error!("{}", e);
    }
}

fn guarded_handle(
    param: &ParameterDescriptor,
    command_line: &CommandLine,
    value: Option<&str>,
) -> Result<()> {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        param.handler.handle(command_line, &param.name, value)
    }));

    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(Error::Handler {
            param: param.name.clone(),
            detail: e.to_string(),
        }),
        Err(payload) => Err(Error::Handler {
            param: param.name.clone(),
            detail: format!("handler panicked: {}", panic_message(payload)),
        }),
    }
}

/// Extract a human-readable message from a panic payload.
fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}
