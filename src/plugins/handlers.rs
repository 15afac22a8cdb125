//! Stock parameter handlers available to every plugin manifest.

use super::{HandlerTable, ParameterHandler};
use crate::Result;
use crate::cli::CommandLine;
use std::io::Write;
use std::sync::Arc;

/// Prints `param=value` (or just `param` for flags) to stdout.
#[derive(Debug, Default)]
pub struct EchoHandler;

impl ParameterHandler for EchoHandler {
    fn handle(&self, _command_line: &CommandLine, param: &str, value: Option<&str>) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        match value {
            Some(value) => writeln!(stdout, "{}={}", param, value)?,
            None => writeln!(stdout, "{}", param)?,
        }
        Ok(())
    }
}

/// Accepts the parameter and does nothing.
///
/// Useful for options that only exist to toggle exclusive mode or a fresh
/// instance.
#[derive(Debug, Default)]
pub struct NoopHandler;

impl ParameterHandler for NoopHandler {
    fn handle(&self, _command_line: &CommandLine, param: &str, _value: Option<&str>) -> Result<()> {
        tracing::debug!("Parameter '{}' handled by noop handler", param);
        Ok(())
    }
}

/// Register the stock handlers under their manifest identifiers.
pub fn register_stock_handlers(table: &mut HandlerTable) {
    table.register("echo", || Arc::new(EchoHandler) as Arc<dyn ParameterHandler>);
    table.register("noop", || Arc::new(NoopHandler) as Arc<dyn ParameterHandler>);
}
