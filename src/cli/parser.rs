//! Argument vector parsing against an [`OptionSchema`].

use super::{OptionSchema, OptionSpec};
use thiserror::Error;

/// Launcher flag whose name does not fit the option grammar.
///
/// The native launcher consumes it; it is removed (with its value) before
/// parsing.
pub const KEYRING_FLAG: &str = "-launcher.keyring";

/// Errors produced while parsing the argument vector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unrecognized option: {0}")]
    UnrecognizedOption(String),

    #[error("Ambiguous option: '{token}' could be {}", candidates.join(", "))]
    AmbiguousOption {
        token: String,
        candidates: Vec<String>,
    },

    #[error("Missing argument for option: {0}")]
    MissingArgument(String),

    #[error("Option '{0}' does not take an argument")]
    UnexpectedArgument(String),
}

/// One occurrence of an option on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOption {
    /// Short name of the matched option
    pub name: String,
    /// Long name of the matched option, if it has one
    pub long_name: Option<String>,
    /// Value supplied with this occurrence
    pub value: Option<String>,
}

impl ParsedOption {
    fn matches(&self, name: &str) -> bool {
        self.name == name || self.long_name.as_deref() == Some(name)
    }
}

/// A parsed command line: option occurrences plus leftover positional arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    occurrences: Vec<ParsedOption>,
    args: Vec<String>,
}

impl CommandLine {
    /// True if neither options nor positional arguments were supplied.
    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty() && self.args.is_empty()
    }

    /// True if the option is present, looked up by short or long name.
    pub fn has_option(&self, name: &str) -> bool {
        self.occurrences.iter().any(|o| o.matches(name))
    }

    /// All values supplied for an option, in supplied order.
    pub fn option_values(&self, name: &str) -> Vec<&str> {
        self.occurrences
            .iter()
            .filter(|o| o.matches(name))
            .filter_map(|o| o.value.as_deref())
            .collect()
    }

    /// First value supplied for an option.
    pub fn option_value(&self, name: &str) -> Option<&str> {
        self.option_values(name).into_iter().next()
    }

    /// Every option occurrence, in supplied order.
    pub fn occurrences(&self) -> &[ParsedOption] {
        &self.occurrences
    }

    /// Distinct options present, in order of first occurrence.
    pub fn options(&self) -> Vec<&ParsedOption> {
        let mut seen: Vec<&ParsedOption> = Vec::new();
        for occurrence in &self.occurrences {
            if !seen.iter().any(|s| s.name == occurrence.name) {
                seen.push(occurrence);
            }
        }
        seen
    }

    /// Positional arguments, in supplied order.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Remove the keyring flag and the value following it.
///
/// Only the first occurrence is removed. A trailing flag without a value is
/// removed on its own.
pub fn strip_keyring(args: &[String]) -> Vec<String> {
    let mut stripped = args.to_vec();
    if let Some(index) = stripped.iter().position(|a| a == KEYRING_FLAG) {
        stripped.remove(index);
        if index < stripped.len() {
            stripped.remove(index);
        }
    }
    stripped
}

/// Parse an argument vector against the schema.
///
/// Options and positional arguments may be interleaved. Everything after a
/// bare `--` is positional.
pub fn parse(schema: &OptionSchema, args: &[String]) -> Result<CommandLine, ParseError> {
    let args = strip_keyring(args);
    let mut command_line = CommandLine::default();
    let mut tokens = args.iter().peekable();

    while let Some(token) = tokens.next() {
        if token == "--" {
            command_line.args.extend(tokens.by_ref().cloned());
            break;
        }

        if !token.starts_with('-') || token == "-" || is_negative_number(token) {
            command_line.args.push(token.clone());
            continue;
        }

        let (spec, inline_value) = resolve_token(schema, token)?
            .ok_or_else(|| ParseError::UnrecognizedOption(token.clone()))?;

        let value = if spec.has_arg {
            match inline_value {
                Some(value) => Some(value),
                None => match tokens.peek() {
                    Some(next) if is_value_token(schema, next) => tokens.next().cloned(),
                    _ => return Err(ParseError::MissingArgument(spec.name.clone())),
                },
            }
        } else {
            if inline_value.is_some() {
                return Err(ParseError::UnexpectedArgument(spec.name.clone()));
            }
            None
        };

        command_line.occurrences.push(ParsedOption {
            name: spec.name.clone(),
            long_name: spec.long_name.clone(),
            value,
        });
    }

    Ok(command_line)
}

/// Resolve an option token to its spec and any inline value.
///
/// Returns `Ok(None)` if the token names no known option.
fn resolve_token<'a>(
    schema: &'a OptionSchema,
    token: &str,
) -> Result<Option<(&'a OptionSpec, Option<String>)>, ParseError> {
    let (body, double_dash) = match token.strip_prefix("--") {
        Some(body) => (body, true),
        None => (&token[1..], false),
    };
    let (name, inline_value) = match body.split_once('=') {
        Some((name, value)) => (name, Some(value.to_string())),
        None => (body, None),
    };

    let exact = if double_dash {
        schema.by_long_name(name).or_else(|| schema.by_name(name))
    } else {
        schema.by_name(name).or_else(|| schema.by_long_name(name))
    };
    if let Some(spec) = exact {
        return Ok(Some((spec, inline_value)));
    }

    let candidates = schema.long_prefix_matches(name);
    match candidates.as_slice() {
        [spec] => return Ok(Some((*spec, inline_value))),
        [] => {}
        _ => {
            return Err(ParseError::AmbiguousOption {
                token: token.to_string(),
                candidates: candidates
                    .iter()
                    .filter_map(|c| c.long_name.clone())
                    .collect(),
            });
        }
    }

    // `-fvalue`: value attached to a single-character short option
    if !double_dash && inline_value.is_none() {
        if let Some(first) = name.chars().next() {
            let short = &name[..first.len_utf8()];
            if let Some(spec) = schema.by_name(short).filter(|s| s.has_arg) {
                return Ok(Some((spec, Some(name[short.len()..].to_string()))));
            }
        }
    }

    Ok(None)
}

/// True if a token may be consumed as an option value.
fn is_value_token(schema: &OptionSchema, token: &str) -> bool {
    if !token.starts_with('-') || token == "-" || is_negative_number(token) {
        return true;
    }
    token != "--" && !matches!(resolve_token(schema, token), Ok(Some(_)) | Err(_))
}

fn is_negative_number(token: &str) -> bool {
    token
        .strip_prefix('-')
        .is_some_and(|rest| {
            rest.starts_with(|c: char| c.is_ascii_digit() || c == '.')
                && rest.parse::<f64>().is_ok()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn parse_builtin(items: &[&str]) -> Result<CommandLine, ParseError> {
        parse(&OptionSchema::builtin(), &args(items))
    }

    #[test]
    fn test_empty_args() {
        let cl = parse_builtin(&[]).unwrap();
        assert!(cl.is_empty());
    }

    #[test]
    fn test_short_and_long_flags() {
        let cl = parse_builtin(&["-closeTabs", "--quit"]).unwrap();
        assert!(cl.has_option("closeTabs"));
        assert!(cl.has_option("stop"));
        assert!(cl.has_option("quit"));
        assert!(!cl.has_option("dump"));
    }

    #[test]
    fn test_repeated_values_keep_order() {
        let cl = parse_builtin(&["-f", "a.sql", "-file", "b.sql", "--file=c.sql"]).unwrap();
        assert_eq!(cl.option_values("f"), vec!["a.sql", "b.sql", "c.sql"]);
        assert_eq!(cl.option_value("file"), Some("a.sql"));
        assert_eq!(cl.options().len(), 1);
        assert_eq!(cl.occurrences().len(), 3);
    }

    #[test]
    fn test_interleaved_positionals() {
        let cl = parse_builtin(&["x.sql", "-closeTabs", "y.sql", "-con", "host1", "z.sql"])
            .unwrap();
        assert_eq!(cl.args(), &args(&["x.sql", "y.sql", "z.sql"])[..]);
        assert_eq!(cl.option_values("con"), vec!["host1"]);
    }

    #[test]
    fn test_double_dash_ends_options() {
        let cl = parse_builtin(&["-closeTabs", "--", "-stop", "file"]).unwrap();
        assert!(!cl.has_option("stop"));
        assert_eq!(cl.args(), &args(&["-stop", "file"])[..]);
    }

    #[test]
    fn test_attached_short_value() {
        let cl = parse_builtin(&["-fquery.sql"]).unwrap();
        assert_eq!(cl.option_values("f"), vec!["query.sql"]);
    }

    #[test]
    fn test_unique_long_prefix() {
        let cl = parse_builtin(&["--thread"]).unwrap();
        assert!(cl.has_option("dump"));
    }

    #[test]
    fn test_ambiguous_long_prefix_fails() {
        let err = parse_builtin(&["--d"]).unwrap_err();
        assert!(matches!(err, ParseError::AmbiguousOption { .. }));
    }

    #[test]
    fn test_unrecognized_option_fails() {
        let err = parse_builtin(&["-bogus"]).unwrap_err();
        assert_eq!(err, ParseError::UnrecognizedOption("-bogus".to_string()));
    }

    #[test]
    fn test_missing_argument_fails() {
        let err = parse_builtin(&["-con"]).unwrap_err();
        assert_eq!(err, ParseError::MissingArgument("con".to_string()));

        let err = parse_builtin(&["-con", "-closeTabs"]).unwrap_err();
        assert_eq!(err, ParseError::MissingArgument("con".to_string()));
    }

    #[test]
    fn test_value_may_look_like_unknown_option() {
        let cl = parse_builtin(&["-con", "-weird", "-nl", "-1"]).unwrap();
        assert_eq!(cl.option_value("con"), Some("-weird"));
        assert_eq!(cl.option_value("nl"), Some("-1"));
    }

    #[test]
    fn test_flag_with_inline_value_fails() {
        let err = parse_builtin(&["-closeTabs=yes"]).unwrap_err();
        assert_eq!(err, ParseError::UnexpectedArgument("closeTabs".to_string()));
    }

    #[test]
    fn test_negative_number_is_positional() {
        let cl = parse_builtin(&["-42"]).unwrap();
        assert_eq!(cl.args(), &args(&["-42"])[..]);
    }

    #[test]
    fn test_keyring_stripped_with_value() {
        let cl = parse_builtin(&["-launcher.keyring", "/tmp/keyring", "-closeTabs"]).unwrap();
        assert!(cl.has_option("closeTabs"));
        assert!(cl.args().is_empty());
    }

    #[test]
    fn test_strip_keyring_absent_or_trailing() {
        assert_eq!(strip_keyring(&args(&["a", "b"])), args(&["a", "b"]));
        assert_eq!(strip_keyring(&args(&["a", KEYRING_FLAG])), args(&["a"]));
        assert!(strip_keyring(&[]).is_empty());
    }

    #[test]
    fn test_options_dedup_in_first_occurrence_order() {
        let cl = parse_builtin(&["-con", "a", "-closeTabs", "--connect", "b"]).unwrap();
        let names: Vec<_> = cl.options().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["con", "closeTabs"]);
    }
}
