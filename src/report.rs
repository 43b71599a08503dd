//! Output formatting for function registries.
//!
//! Supports four output formats:
//! - Text: Markdown-style report for reading
//! - JSON and YAML: the registry structure as-is
//! - CSV: one row per function
//!
//! A short colored summary for the terminal lives here as well.

use colored::*;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::config::OutputFormat;
use crate::error::{FuncregError, Result};
use crate::registry::{Function, Registry};

/// CSV column names, in order.
pub const CSV_HEADER: &[&str] = &[
    "Name",
    "File",
    "Line",
    "Visibility",
    "ReturnType",
    "Parameters",
    "Language",
    "CallCount",
    "Size",
    "IsTest",
    "IsMain",
    "Comments",
    "Signature",
];

/// Encode a registry in the requested format.
pub fn render(registry: &Registry, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(registry)),
        OutputFormat::Json => render_json(registry),
        OutputFormat::Yaml => render_yaml(registry),
        OutputFormat::Csv => render_csv(registry),
    }
}

/// Render and write to `output`, or print to stdout when it is `None`.
pub fn write_output(registry: &Registry, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let rendered = render(registry, format)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent)
                        .map_err(|e| FuncregError::Output(format!("{}: {}", parent.display(), e)))?;
                }
            }
            fs::write(path, rendered)
                .map_err(|e| FuncregError::Output(format!("{}: {}", path.display(), e)))
        }
        None => {
            print!("{}", rendered);
            Ok(())
        }
    }
}

pub fn render_json(registry: &Registry) -> Result<String> {
    let mut json =
        serde_json::to_string_pretty(registry).map_err(|e| FuncregError::Output(e.to_string()))?;
    json.push('\n');
    Ok(json)
}

pub fn render_yaml(registry: &Registry) -> Result<String> {
    serde_yaml::to_string(registry).map_err(|e| FuncregError::Output(e.to_string()))
}

pub fn render_csv(registry: &Registry) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_err = |e: csv::Error| FuncregError::Output(e.to_string());

    writer.write_record(CSV_HEADER).map_err(csv_err)?;
    for f in &registry.functions {
        writer
            .write_record([
                f.name.clone(),
                f.file.clone(),
                f.line.to_string(),
                f.visibility.to_string(),
                f.return_type.clone(),
                f.parameters.join(";"),
                f.language.clone(),
                f.call_count.to_string(),
                f.size.to_string(),
                f.is_test.to_string(),
                f.is_main.to_string(),
                f.comments.replace('\n', " "),
                f.signature.replace('\n', " "),
            ])
            .map_err(csv_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| FuncregError::Output(e.error().to_string()))?;
    String::from_utf8(bytes).map_err(|e| FuncregError::Output(e.to_string()))
}

/// Markdown-style report: summary first, then one block per function.
pub fn render_text(registry: &Registry) -> String {
    let mut out = String::new();
    let s = &registry.summary;

    out.push_str("# Function Registry\n\n");
    out.push_str("## Summary\n");
    let _ = writeln!(out, "- Total Functions: {}", s.total_functions);
    let _ = writeln!(out, "- Total Files: {}", s.total_files);
    let _ = writeln!(out, "- Public Functions: {}", s.public_functions);
    let _ = writeln!(out, "- Private Functions: {}", s.private_functions);
    let _ = writeln!(out, "- Dead Functions: {}", s.dead_functions);
    let _ = writeln!(out, "- Test Functions: {}", s.test_functions);
    if !registry.relations {
        out.push_str("\n_Call relations were not analyzed; every function counts as dead._\n");
    }
    out.push('\n');

    match &registry.scripts {
        Some(scripts) => {
            for (file, functions) in scripts {
                let _ = writeln!(out, "## {}\n", file);
                for f in functions {
                    write_function(&mut out, f);
                }
                out.push('\n');
            }
        }
        None => {
            out.push_str("## Functions\n\n");
            for f in &registry.functions {
                write_function(&mut out, f);
            }
        }
    }

    out
}

fn write_function(out: &mut String, f: &Function) {
    let _ = writeln!(out, "### {}", f.name);
    let _ = writeln!(out, "- **File**: {}:{}", f.file, f.line);
    let _ = writeln!(out, "- **Visibility**: {}", f.visibility);
    let _ = writeln!(out, "- **Return Type**: {}", f.return_type);
    let _ = writeln!(out, "- **Parameters**: {}", f.parameters.join(", "));
    let _ = writeln!(out, "- **Language**: {}", f.language);
    let _ = writeln!(out, "- **Call Count**: {}", f.call_count);
    let _ = writeln!(out, "- **Size**: {} lines", f.size);

    if f.is_test {
        out.push_str("- **Type**: Test Function\n");
    }
    if f.is_main {
        out.push_str("- **Type**: Main Function\n");
    }
    if let Some(c) = f.complexity {
        let _ = writeln!(out, "- **Complexity**: {}", c);
    }
    if !f.called_by.is_empty() {
        let _ = writeln!(out, "- **Called By**: {}", f.called_by.join(", "));
    }
    if !f.calls.is_empty() {
        let _ = writeln!(out, "- **Calls**: {}", f.calls.join(", "));
    }
    if !f.comments.is_empty() {
        let _ = writeln!(out, "- **Comments**: {}", f.comments);
    }
    let _ = writeln!(out, "- **Signature**: `{}`", f.signature);
    out.push('\n');
}

/// Print a one-line colored status to stderr.
pub fn write_status(registry: &Registry, output: Option<&Path>) {
    let s = &registry.summary;
    let mut line = format!(
        "{} {} functions in {} files",
        "✓".green(),
        s.total_functions.to_string().bold(),
        s.total_files
    );
    let _ = write!(
        line,
        " ({} public, {} private, {} tests",
        s.public_functions, s.private_functions, s.test_functions
    );
    if registry.relations {
        let dead = if s.dead_functions > 0 {
            s.dead_functions.to_string().yellow()
        } else {
            s.dead_functions.to_string().green()
        };
        let _ = write!(line, ", {} dead", dead);
    }
    line.push(')');
    if let Some(path) = output {
        let _ = write!(line, " -> {}", path.display().to_string().blue());
    }
    eprintln!("{}", line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Aggregator, Visibility};

    fn sample() -> Registry {
        let mut add = Function::new("add", "src/lib.rs", 3, "rust");
        add.parameters = vec!["a".to_string(), "b".to_string()];
        add.return_type = "i32".to_string();
        add.signature = "pub fn add(a: i32, b: i32) -> i32 {".to_string();
        add.comments = "Adds two\nnumbers, fast.".to_string();
        add.complexity = Some(1);
        add.call_count = 2;
        add.called_by = vec!["main".to_string()];

        let mut main = Function::new("main", "src/main.rs", 1, "rust");
        main.visibility = Visibility::Private;
        main.is_main = true;
        main.calls = vec!["add".to_string()];
        main.signature = "fn main() {".to_string();

        Aggregator::new().finish(vec![main, add], 2, true)
    }

    #[test]
    fn test_text_report() {
        let text = render_text(&sample());
        assert!(text.starts_with("# Function Registry\n\n## Summary\n"));
        assert!(text.contains("- Total Functions: 2\n"));
        assert!(text.contains("- Dead Functions: 1\n"));
        assert!(text.contains("## Functions\n"));
        assert!(text.contains("### add\n- **File**: src/lib.rs:3\n"));
        assert!(text.contains("- **Parameters**: a, b\n"));
        assert!(text.contains("- **Called By**: main\n"));
        assert!(text.contains("- **Type**: Main Function\n"));
        assert!(text.contains("- **Signature**: `fn main() {`\n"));
        assert!(text.find("### add").unwrap() < text.find("### main").unwrap());
    }

    #[test]
    fn test_text_report_by_script() {
        let registry = Aggregator::new()
            .by_script(true)
            .finish(sample().functions, 2, false);
        let text = render_text(&registry);
        assert!(text.contains("## src/lib.rs\n"));
        assert!(text.contains("## src/main.rs\n"));
        assert!(!text.contains("## Functions\n"));
        assert!(text.contains("not analyzed"));
    }

    #[test]
    fn test_json_and_yaml_parse_back() {
        let registry = sample();
        let json = render_json(&registry).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["total_functions"], 2);
        assert_eq!(value["functions"][0]["name"], "add");
        assert_eq!(value["functions"][0]["visibility"], "public");
        assert!(value["functions"][1].get("called_by").is_none());

        let yaml = render_yaml(&registry).unwrap();
        let parsed: Registry = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.functions, registry.functions);
    }

    #[test]
    fn test_csv_rows() {
        let csv_text = render_csv(&sample()).unwrap();
        let mut lines = csv_text.lines();
        assert_eq!(lines.next().unwrap(), CSV_HEADER.join(","));

        let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "add");
        assert_eq!(&rows[0][5], "a;b");
        assert_eq!(&rows[0][11], "Adds two numbers, fast.");
        assert_eq!(&rows[1][10], "true");
    }

    #[test]
    fn test_write_output_to_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("out/registry.json");
        write_output(&sample(), OutputFormat::Json, Some(&path)).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"total_functions\": 2"));
    }

    #[test]
    fn test_write_output_failure_is_reported() {
        let temp = tempfile::TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let err = write_output(&sample(), OutputFormat::Text, Some(&blocker.join("r.md"))).unwrap_err();
        assert!(matches!(err, FuncregError::Output(_)));
    }
}
