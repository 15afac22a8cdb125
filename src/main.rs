//! Lodestar launcher - forwards commands to a running workbench or reports a local start.

use lodestar::cli::{self, OptionSchema, PARAM_DATA};
use lodestar::config::{LaunchSettings, VariableResolver, resolve_launch_settings};
use lodestar::dispatch::{
    DispatchOutcome, Dispatcher, LaunchState, handle_custom_parameters,
};
use lodestar::instance::PidFileLocator;
use lodestar::logging;
use lodestar::plugins::{self, HandlerTable};
use lodestar::product;
use serde::Serialize;
use std::collections::BTreeMap;
use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::process;

/// Printed on stdout when the launcher decides to start locally.
#[derive(Debug, Serialize)]
struct LaunchReport<'a> {
    outcome: &'static str,
    workspace: &'a Path,
    reuse_workspace: bool,
    exclusive_mode: bool,
    /// Variables loaded from `-vars`, for the workbench's variable resolver
    variables: BTreeMap<&'a str, &'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

fn main() {
    let args = cli::strip_keyring(&env::args().skip(1).collect::<Vec<_>>());
    logging::init_tracing(logging::quiet_requested(&args));

    let settings = resolve_launch_settings(data_flag(&args));
    log_settings(&settings);

    let handlers = HandlerTable::with_stock_handlers();
    let contributed = plugins::load_manifest_dir(&settings.plugin_dir.value, &handlers);
    let schema = OptionSchema::with_contributed(&contributed);

    let command_line = match cli::parse(&schema, &args) {
        Ok(command_line) => Some(command_line),
        Err(e) => {
            tracing::warn!("Error parsing command line: {}", e);
            None
        }
    };

    let locator = PidFileLocator::new(settings.timeouts());
    let dispatcher = Dispatcher::new(&schema, &contributed, &locator);
    let mut state = LaunchState::new();
    let outcome = {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        dispatcher.handle_command_line(
            command_line.as_ref(),
            &settings.workspace.value,
            &mut state,
            &mut out,
        )
    };

    if outcome.should_exit() {
        return;
    }

    if handle_custom_parameters(command_line.as_ref(), &contributed) {
        tracing::debug!("Contributed parameter requested exit");
        return;
    }

    if let Err(e) = print_report(&outcome, &state, &settings) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Locate the `-data` value before plugins are loaded.
///
/// The workspace must be known before the schema can be assembled, so this
/// scan only understands the `-data <dir>` form the platform launcher emits.
/// Find the `-data` value before the full parse, accepting the same
/// spellings as the parser: `-data dir`, `--data dir` and `-data=dir`.
fn data_flag(args: &[String]) -> Option<&str> {
    let mut iter = args.iter().take_while(|arg| arg.as_str() != "--");
    while let Some(arg) = iter.next() {
        let Some(body) = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')) else {
            continue;
        };
        let Some(rest) = body.strip_prefix(PARAM_DATA) else {
            continue;
        };
        if rest.is_empty() {
            return iter.next().map(String::as_str);
        }
        if let Some(value) = rest.strip_prefix('=') {
            return Some(value);
        }
    }
    None
}

fn log_settings(settings: &LaunchSettings) {
    tracing::debug!(
        "{} {} ({})",
        product::PRODUCT_NAME,
        product::full_version(),
        product::GIT_COMMIT
    );
    tracing::debug!(
        "workspace={} ({}), plugins={} ({}), connect={:?} ({}), call={:?} ({})",
        settings.workspace.value.display(),
        settings.workspace.source,
        settings.plugin_dir.value.display(),
        settings.plugin_dir.source,
        settings.connect_timeout.value,
        settings.connect_timeout.source,
        settings.call_timeout.value,
        settings.call_timeout.source,
    );
}

fn print_report(
    outcome: &DispatchOutcome,
    state: &LaunchState,
    settings: &LaunchSettings,
) -> lodestar::Result<()> {
    let (name, error) = match outcome {
        DispatchOutcome::ContinueLocal(_) => ("continue_local", None),
        DispatchOutcome::ProcessingError(detail) => ("processing_error", Some(detail.as_str())),
        DispatchOutcome::ExitNow => return Ok(()),
    };
    let report = LaunchReport {
        outcome: name,
        workspace: &settings.workspace.value,
        reuse_workspace: state.flags.reuse_workspace,
        exclusive_mode: state.flags.exclusive_mode,
        variables: sorted_variables(&state.variables),
        error,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{}", serde_json::to_string(&report)?)?;
    Ok(())
}

fn sorted_variables(variables: &VariableResolver) -> BTreeMap<&str, &str> {
    variables
        .configuration()
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}
