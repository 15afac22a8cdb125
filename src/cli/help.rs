//! Help text rendering for the merged option schema.

use super::OptionSchema;

/// Total line width of rendered help.
pub const HELP_WIDTH: usize = 120;

/// Render usage help for every option in the schema, in registration order.
pub fn render_help(program: &str, header: &str, schema: &OptionSchema, footer: &str) -> String {
    let rows: Vec<(String, &str)> = schema
        .iter()
        .map(|spec| {
            let mut left = format!(" -{}", spec.name);
            if let Some(long) = &spec.long_name {
                left.push_str(&format!(",--{}", long));
            }
            if spec.has_arg {
                left.push_str(" <arg>");
            }
            (left, spec.description.as_str())
        })
        .collect();

    let left_width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0) + 3;
    let desc_width = HELP_WIDTH.saturating_sub(left_width).max(20);

    let mut out = format!("usage: {} [options] [files...]\n", program);
    if !header.is_empty() {
        out.push_str(header);
        out.push('\n');
    }
    for (left, description) in rows {
        let lines = wrap(description, desc_width);
        let mut lines = lines.iter();
        out.push_str(&format!(
            "{:<width$}{}\n",
            left,
            lines.next().map(String::as_str).unwrap_or(""),
            width = left_width
        ));
        for line in lines {
            out.push_str(&format!("{:<width$}{}\n", "", line, width = left_width));
        }
    }
    if !footer.is_empty() {
        out.push_str(footer);
        out.push('\n');
    }
    out
}

/// Greedy word wrap.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
