//! Default help summary: one aligned row per option spec.

use crate::spec::OptionSpec;
use std::sync::Arc;

/// Renders compiled specs for display; replaces [`summarize`] when configured.
pub type SummaryFn = Arc<dyn Fn(&[OptionSpec]) -> String + Send + Sync>;

fn format_switches(spec: &OptionSpec) -> String {
    let mut out = match (spec.short_opt(), spec.long_opt()) {
        (Some(short), Some(long)) => format!("{short}, {long}"),
        (None, Some(long)) => format!("    {long}"),
        (Some(short), None) => short.to_string(),
        (None, None) => String::new(),
    };
    if let Some(required) = spec.required() {
        out.push(' ');
        out.push_str(required);
    }
    out
}

fn format_default(spec: &OptionSpec) -> String {
    if spec.required().is_none() {
        return String::new();
    }
    if let Some(desc) = spec.default_desc() {
        return desc.to_string();
    }
    if let Some(default) = spec.default() {
        return default.to_string();
    }
    if spec.has_default_fn() {
        return "<computed>".to_string();
    }
    String::new()
}

/// Cells of one summary row: switches, optionally the default, description.
pub fn summary_part(spec: &OptionSpec, show_defaults: bool) -> Vec<String> {
    let desc = spec.desc().unwrap_or_default().to_string();
    if show_defaults {
        vec![format_switches(spec), format_default(spec), desc]
    } else {
        vec![format_switches(spec), desc]
    }
}

/// Left-align each column to `widths`, two spaces apart, indented by two spaces.
pub fn format_lines(widths: &[usize], parts: &[Vec<String>]) -> Vec<String> {
    parts
        .iter()
        .map(|row| {
            let cells: Vec<String> = row
                .iter()
                .zip(widths)
                .map(|(cell, &width)| format!("{cell:width$}"))
                .collect();
            format!("  {}", cells.join("  ")).trim_end().to_string()
        })
        .collect()
}

/// Render the default summary table.
///
/// The default column only appears when at least one argument-taking option
/// has a default or a default function.
pub fn summarize(specs: &[OptionSpec]) -> String {
    let show_defaults = specs.iter().any(|spec| {
        spec.required().is_some() && (spec.default().is_some() || spec.has_default_fn())
    });
    let parts: Vec<Vec<String>> = specs
        .iter()
        .map(|spec| summary_part(spec, show_defaults))
        .collect();

    let columns = parts.first().map(Vec::len).unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|col| {
            parts
                .iter()
                .map(|row| row[col].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    format_lines(&widths, &parts).join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::spec::Decl;
    use crate::value::Value;

    #[test]
    fn renders_aligned_table_with_defaults() {
        let specs = compile([
            Decl::new("-p", "--port PORT", "Port number").default(80),
            Decl::new("", "--host HOST", "Remote host").default_desc("localhost"),
            Decl::new("-v", "", "Verbosity level").id("verbosity"),
            Decl::new("", "--[no-]daemon", "Run in background"),
        ])
        .unwrap();

        let expected = [
            "  -p, --port PORT    80         Port number",
            "      --host HOST    localhost  Remote host",
            "  -v                            Verbosity level",
            "      --[no-]daemon             Run in background",
        ]
        .join("\n");
        assert_eq!(summarize(&specs), expected);
    }

    #[test]
    fn default_column_hidden_without_argument_defaults() {
        let specs = compile([
            Decl::new("-v", "--verbose", "Verbose").default(false),
            Decl::new("-o", "--output FILE", "Output file"),
        ])
        .unwrap();
        let expected = [
            "  -v, --verbose      Verbose",
            "  -o, --output FILE  Output file",
        ]
        .join("\n");
        assert_eq!(summarize(&specs), expected);
    }

    #[test]
    fn computed_defaults_are_marked() {
        let specs = compile([Decl::new("", "--jobs N", "").default_fn(|_| Value::Int(4))]).unwrap();
        assert_eq!(summary_part(&specs[0], true), vec!["    --jobs N", "<computed>", ""]);
        assert_eq!(summarize(&specs), "      --jobs N  <computed>");
    }

    #[test]
    fn lines_have_no_trailing_whitespace() {
        let lines = format_lines(
            &[4, 3],
            &[
                vec!["-a".to_string(), String::new()],
                vec!["-bcd".to_string(), "x".to_string()],
            ],
        );
        assert_eq!(lines, vec!["  -a", "  -bcd  x"]);
    }

    #[test]
    fn empty_specs_render_empty_summary() {
        assert_eq!(summarize(&[]), "");
    }
}
