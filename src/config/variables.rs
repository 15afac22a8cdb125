//! Variables file loading and `${name}` resolution.
//!
//! The variables file uses the Java properties syntax:
//!
//! ```text
//! # comment
//! ! also a comment
//! db.host = localhost
//! db.port: 5432
//! greeting = hello \
//!            world
//! path = C:\\data\\dumps
//! ```

use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// Process-wide variable lookup used when executing commands.
///
/// Values come from the loaded variables file first, then from the process
/// environment.
#[derive(Debug, Clone, Default)]
pub struct VariableResolver {
    configuration: HashMap<String, String>,
}

impl VariableResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configured variables.
    pub fn set_configuration(&mut self, configuration: HashMap<String, String>) {
        self.configuration = configuration;
    }

    /// Load a variables file, replacing the current configuration.
    ///
    /// On failure the current configuration is left untouched.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigFile(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let configuration = parse_properties(&content)
            .map_err(|e| Error::ConfigFile(format!("{}: {}", path.display(), e)))?;
        self.set_configuration(configuration);
        Ok(())
    }

    /// Variables loaded from the file.
    pub fn configuration(&self) -> &HashMap<String, String> {
        &self.configuration
    }

    /// Look up a variable: file configuration, then environment.
    pub fn get(&self, name: &str) -> Option<String> {
        self.configuration
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
    }

    /// Expand `${name}` references. Unknown names are left verbatim.
    pub fn resolve(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let name = &after[..end];
                    match self.get(name) {
                        Some(value) => out.push_str(&value),
                        None => out.push_str(&rest[start..start + 2 + end + 1]),
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Parse properties text into key/value pairs. Later keys win.
pub fn parse_properties(content: &str) -> std::result::Result<HashMap<String, String>, String> {
    let mut properties = HashMap::new();
    let mut lines = content.lines().enumerate();

    while let Some((index, line)) = lines.next() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        // Join continuation lines
        let mut logical = trimmed.to_string();
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_key_value(&logical);
        let key = unescape(key).map_err(|e| format!("line {}: {}", index + 1, e))?;
        let value = unescape(value).map_err(|e| format!("line {}: {}", index + 1, e))?;
        properties.insert(key, value);
    }

    Ok(properties)
}

/// True if the line ends with an odd number of backslashes.
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Split a logical line at the first unescaped `=`, `:` or whitespace.
fn split_key_value(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..i], line[i + 1..].trim_start()),
            c if c.is_whitespace() => {
                let rest = line[i..].trim_start();
                let rest = rest
                    .strip_prefix('=')
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                return (&line[..i], rest.trim_start());
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(text: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("malformed \\uxxxx encoding: \\u{}", hex))?;
                out.push(code);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}
