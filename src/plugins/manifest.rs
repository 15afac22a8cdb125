//! KDL manifests declaring contributed parameters.
//!
//! # KDL Schema
//!
//! ```kdl
//! parameter "exportConfig" {
//!     long-name "export-config"
//!     description "Export workspace configuration and exit"
//!     handler "echo"
//!     has-arg #true
//!     exit-after-execute #true
//!     exclusive-mode #false
//!     force-new-instance #false
//! }
//! ```
//!
//! A plugin directory holds any number of `*.kdl` manifests. Manifests are
//! read in file-name order and the file stem names the contributing plugin.
//! Bad declarations are logged and skipped; they never stop the scan.

use super::{ContributedParameters, HandlerTable, ParameterDescriptor};
use crate::cli::is_valid_option_name;
use crate::{Error, Result};
use kdl::{KdlDocument, KdlNode};
use std::path::Path;

/// Parse every `parameter` node of a manifest.
///
/// Each node yields its own result so that one bad declaration does not
/// hide the others.
pub fn parse_manifest(
    doc: &KdlDocument,
    contributor: &str,
    handlers: &HandlerTable,
) -> Vec<Result<ParameterDescriptor>> {
    doc.nodes()
        .iter()
        .filter(|node| node.name().value() == "parameter")
        .map(|node| parse_parameter_node(node, contributor, handlers))
        .collect()
}

/// Parse a single `parameter` node.
fn parse_parameter_node(
    node: &KdlNode,
    contributor: &str,
    handlers: &HandlerTable,
) -> Result<ParameterDescriptor> {
    let name = node
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| Error::SchemaLoad("parameter node must have a name argument".to_string()))?
        .to_string();

    if !is_valid_option_name(&name) {
        return Err(Error::SchemaLoad(format!(
            "invalid parameter name '{}'",
            name
        )));
    }

    let mut long_name = None;
    let mut description = String::new();
    let mut handler_id = None;
    let mut has_arg = false;
    let mut exit_after_execute = false;
    let mut exclusive_mode = false;
    let mut force_new_instance = false;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "long-name" => long_name = get_string_arg(child),
                "description" => description = get_string_arg(child).unwrap_or_default(),
                "handler" => handler_id = get_string_arg(child),
                "has-arg" => has_arg = get_bool_arg(child),
                "exit-after-execute" => exit_after_execute = get_bool_arg(child),
                "exclusive-mode" => exclusive_mode = get_bool_arg(child),
                "force-new-instance" => force_new_instance = get_bool_arg(child),
                _ => {
                    // Ignore unknown fields for forward compatibility
                }
            }
        }
    }

    if let Some(long) = &long_name {
        if !is_valid_option_name(long) {
            return Err(Error::SchemaLoad(format!(
                "invalid long name '{}' for parameter '{}'",
                long, name
            )));
        }
    }

    let handler_id = handler_id.ok_or_else(|| {
        Error::SchemaLoad(format!("parameter '{}' has no handler", name))
    })?;
    let handler = handlers.instantiate(&handler_id).ok_or_else(|| {
        Error::SchemaLoad(format!(
            "parameter '{}' references unknown handler '{}'",
            name, handler_id
        ))
    })?;

    Ok(ParameterDescriptor {
        name,
        long_name,
        description,
        has_arg,
        exit_after_execute,
        exclusive_mode,
        force_new_instance,
        contributor: contributor.to_string(),
        handler,
    })
}

/// Get a string argument from a node's first entry.
fn get_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// Get a boolean argument from a node's first entry. A bare node means `#true`.
fn get_bool_arg(node: &KdlNode) -> bool {
    match node.entries().first() {
        Some(entry) => entry.value().as_bool().unwrap_or(false),
        None => true,
    }
}

/// Scan a plugin directory and build the contributed parameter registry.
///
/// A missing directory yields an empty registry. Unreadable manifests and
/// malformed declarations are logged and skipped.
pub fn load_manifest_dir(dir: &Path, handlers: &HandlerTable) -> ContributedParameters {
    let mut registry = ContributedParameters::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No plugin directory at {}", dir.display());
            return registry;
        }
        Err(e) => {
            tracing::error!("Can't read plugin directory {}: {}", dir.display(), e);
            return registry;
        }
    };

    let mut manifests: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "kdl"))
        .collect();
    manifests.sort();

    for path in manifests {
        let contributor = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let doc = match load_manifest(&path) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!("Can't load plugin manifest: {}", e);
                continue;
            }
        };

        for result in parse_manifest(&doc, &contributor, handlers) {
            match result {
                Ok(descriptor) => registry.register(descriptor),
                Err(e) => tracing::error!("Can't load contributed parameter from '{}': {}", contributor, e),
            }
        }
    }

    registry
}

fn load_manifest(path: &Path) -> Result<KdlDocument> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::SchemaLoad(format!("Failed to read {}: {}", path.display(), e)))?;

    content
        .parse()
        .map_err(|e| Error::SchemaLoad(format!("Failed to parse KDL in {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(kdl: &str) -> Vec<Result<ParameterDescriptor>> {
        let doc: KdlDocument = kdl.parse().unwrap();
        parse_manifest(&doc, "test-plugin", &HandlerTable::with_stock_handlers())
    }

    #[test]
    fn test_parse_full_parameter() {
        let results = parse(
            r#"
            parameter "exportConfig" {
                long-name "export-config"
                description "Export configuration"
                handler "echo"
                has-arg #true
                exit-after-execute #true
                exclusive-mode #true
                force-new-instance #false
            }
            "#,
        );

        assert_eq!(results.len(), 1);
        let param = results[0].as_ref().unwrap();
        assert_eq!(param.name, "exportConfig");
        assert_eq!(param.long_name.as_deref(), Some("export-config"));
        assert_eq!(param.description, "Export configuration");
        assert!(param.has_arg);
        assert!(param.exit_after_execute);
        assert!(param.exclusive_mode);
        assert!(!param.force_new_instance);
        assert_eq!(param.contributor, "test-plugin");
    }

    #[test]
    fn test_flags_default_to_false() {
        let results = parse(r#"parameter "x" { handler "noop"; }"#);
        let param = results[0].as_ref().unwrap();
        assert!(!param.has_arg);
        assert!(!param.exit_after_execute);
        assert!(!param.exclusive_mode);
        assert!(!param.force_new_instance);
        assert!(param.long_name.is_none());
    }

    #[test]
    fn test_bare_flag_node_means_true() {
        let results = parse(r#"parameter "x" { handler "noop"; has-arg; }"#);
        assert!(results[0].as_ref().unwrap().has_arg);
    }

    #[test]
    fn test_bad_declarations_do_not_hide_good_ones() {
        let results = parse(
            r#"
            parameter { handler "noop"; }
            parameter "noHandler" { description "missing handler"; }
            parameter "unknownHandler" { handler "com.example.Missing"; }
            parameter "bad.name" { handler "noop"; }
            parameter "good" { handler "noop"; }
            other "ignored"
            "#,
        );

        assert_eq!(results.len(), 5);
        assert!(results[..4].iter().all(|r| matches!(r, Err(Error::SchemaLoad(_)))));
        assert_eq!(results[4].as_ref().unwrap().name, "good");
    }

    #[test]
    fn test_load_manifest_dir_skips_bad_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("a-export.kdl"),
            r#"parameter "export" { handler "echo"; has-arg #true; }"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("b-broken.kdl"), "parameter \"x\" {").unwrap();
        std::fs::write(
            dir.path().join("c-override.kdl"),
            r#"
            parameter "export" { handler "noop"; }
            parameter "solo" { handler "noop"; exclusive-mode #true; }
            "#,
        )
        .unwrap();
        std::fs::write(dir.path().join("readme.txt"), "not a manifest").unwrap();

        let registry = load_manifest_dir(dir.path(), &HandlerTable::with_stock_handlers());

        let names: Vec<_> = registry.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["export", "solo"]);
        let export = registry.get("export").unwrap();
        assert_eq!(export.contributor, "c-override");
        assert!(!export.has_arg);
    }

    #[test]
    fn test_load_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let registry = load_manifest_dir(
            &dir.path().join("nope"),
            &HandlerTable::with_stock_handlers(),
        );
        assert!(registry.is_empty());
    }
}
