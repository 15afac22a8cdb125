//! Tracing setup for the launcher.
//!
//! Logs go to stderr so that stdout stays reserved for help, version and
//! thread-dump output. The level defaults to WARN and can be changed with
//! `LODESTAR_LOG` (an `EnvFilter` directive such as `debug` or
//! `lodestar=trace`). Quiet mode turns logging off entirely.

use crate::cli::PARAM_QUIET;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "LODESTAR_LOG";

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing(quiet: bool) {
    let env_filter = if quiet {
        EnvFilter::new("off")
    } else {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .with_env_var(LOG_ENV)
            .from_env_lossy()
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

/// True if the raw arguments ask for quiet mode.
///
/// Checked before parsing so that parse errors are silenced too.
pub fn quiet_requested(args: &[String]) -> bool {
    args.iter()
        .take_while(|a| a.as_str() != "--")
        .filter_map(|a| a.strip_prefix("--").or_else(|| a.strip_prefix('-')))
        .any(|name| name == PARAM_QUIET)
}
