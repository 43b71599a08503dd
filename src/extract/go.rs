//! Go extractor.
//!
//! Top-level `func` declarations only: plain functions, methods with value
//! or pointer receivers, and type-parameterised functions. Exported
//! (capitalised) names are public.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use super::scan::{
    body_size, complexity, leading_comments, matching_close, split_lines, split_top_level,
    BlockComments, CommentStyle,
};
use super::{Language, LanguageExtractor};
use crate::registry::{Function, Visibility};

const MAX_SIGNATURE_LINES: usize = 32;

lazy_static! {
    static ref FUNC_RE: Regex =
        Regex::new(r"^func\s*(?:\(([^)]*)\)\s*)?(\w+)\s*(\[[^\]]*\])?\s*\(").unwrap();
    static ref CALL_RE: Regex = Regex::new(r"\b([A-Za-z_]\w*)\s*\(").unwrap();
    static ref BRANCH_RE: Regex =
        Regex::new(r"\b(?:if|for|switch|select|case)\b|&&|\|\|").unwrap();

    static ref BUILTINS: HashSet<&'static str> = [
        "append", "cap", "close", "complex", "copy", "delete", "imag", "len",
        "make", "new", "panic", "print", "println", "real", "recover", "min", "max", "clear",
        "bool", "byte", "complex64", "complex128", "error", "float32", "float64",
        "int", "int8", "int16", "int32", "int64", "rune", "string",
        "uint", "uint8", "uint16", "uint32", "uint64", "uintptr",
        "true", "false", "iota", "nil",
    ]
    .into_iter()
    .collect();

    static ref KEYWORDS: HashSet<&'static str> = [
        "func", "if", "for", "switch", "select", "case", "return", "go", "defer", "range",
        "type", "struct", "interface", "map", "chan", "import", "var", "const", "else",
    ]
    .into_iter()
    .collect();
}

fn is_test_name(name: &str) -> bool {
    ["Test", "Benchmark", "Example", "Fuzz"]
        .iter()
        .any(|p| name.starts_with(p))
}

/// Parameter names, honouring Go's grouped form (`a, b int`). Unnamed
/// parameter lists (`func(int, string)`) yield their types.
fn go_param_names(params: &str) -> Vec<String> {
    let parts = split_top_level(params);
    let named = parts.iter().any(|p| p.split_whitespace().count() > 1);
    parts
        .iter()
        .filter_map(|p| {
            if named {
                p.split_whitespace().next()
            } else {
                Some(*p)
            }
        })
        .map(|s| s.to_string())
        .collect()
}

/// Offset of the `{` opening the body, skipping `interface{}`/`struct{...}`
/// braces that belong to the result type.
fn body_brace(tail: &str) -> Option<usize> {
    let bytes = tail.as_bytes();
    let mut depth = 0i32;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth -= 1,
            b'{' if depth <= 0 => {
                let before = tail[..i].trim_end();
                if before.ends_with("interface") || before.ends_with("struct") {
                    i = matching_close(tail, i, b'{', b'}')?;
                } else {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Receiver type without pointer and type arguments, plus the raw form.
fn receiver_type(receiver: &str) -> Option<(String, String)> {
    let raw = receiver.split_whitespace().last()?;
    let bare = raw.trim_start_matches('*');
    let bare = bare.split('[').next().unwrap_or(bare);
    if bare.is_empty() {
        None
    } else {
        Some((bare.to_string(), raw.to_string()))
    }
}

/// Extractor for `.go` files.
#[derive(Debug, Default)]
pub struct GoExtractor;

impl GoExtractor {
    pub fn new() -> Self {
        Self
    }

    fn build_function(
        &self,
        file: &str,
        lines: &[&str],
        idx: usize,
        caps: &regex::Captures<'_>,
    ) -> Option<Function> {
        let name = caps.get(2)?.as_str();
        let open = caps.get(0)?.end() - 1;
        let end = (idx + MAX_SIGNATURE_LINES).min(lines.len());
        let text = lines[idx..end].join("\n");
        let close = matching_close(&text, open, b'(', b')')?;

        let tail = text[close + 1..].lines().next().unwrap_or("").trim();
        let (return_type, definition) = match body_brace(tail) {
            Some(pos) => (tail[..pos].trim(), true),
            None => (tail, false),
        };

        let receiver = caps.get(1).and_then(|m| receiver_type(m.as_str()));
        let full_name = match &receiver {
            Some((bare, _)) => format!("{}.{}", bare, name),
            None => name.to_string(),
        };

        let mut f = Function::new(full_name, file, idx + 1, Language::Go.as_str());
        f.visibility = if name.starts_with(|c: char| c.is_uppercase()) {
            Visibility::Public
        } else {
            Visibility::Private
        };
        f.return_type = return_type.to_string();
        f.parameters = go_param_names(&text[open + 1..close]);
        f.signature = lines[idx].trim().to_string();
        f.is_test = is_test_name(name);
        f.is_main = name == "main" && receiver.is_none();
        f.comments = leading_comments(lines, idx, CommentStyle::Slashes);

        if definition {
            f.size = body_size(lines, idx);
            f.complexity = Some(complexity(lines, idx, f.size, &BRANCH_RE));
            f.flag("definition");
        } else {
            f.flag("declaration");
        }
        if let Some((_, raw)) = receiver {
            if raw.starts_with('*') {
                f.flag("pointer_receiver");
            }
            f.metadata.insert("receiver".to_string(), raw);
            f.flag("method");
        }
        if caps.get(3).is_some() {
            f.flag("generic");
        }

        Some(f)
    }
}

impl LanguageExtractor for GoExtractor {
    fn language(&self) -> Language {
        Language::Go
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn extract_functions(&self, file: &str, source: &str) -> Vec<Function> {
        let lines = split_lines(source);
        let mut comments = BlockComments::new();
        let mut functions = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            if comments.consume(line) {
                continue;
            }
            if let Some(caps) = FUNC_RE.captures(line) {
                if let Some(f) = self.build_function(file, &lines, idx, &caps) {
                    functions.push(f);
                }
            }
        }

        functions
    }

    fn call_pattern(&self) -> &Regex {
        &CALL_RE
    }

    fn is_excluded_call(&self, name: &str) -> bool {
        BUILTINS.contains(name) || KEYWORDS.contains(name)
    }

    fn declaration_head(&self, line: &str) -> Option<usize> {
        FUNC_RE.find(line).map(|m| m.end() - 1)
    }
}
