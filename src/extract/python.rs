//! Python extractor.
//!
//! Bodies are delimited by indentation instead of braces. Enclosing classes
//! and functions are tracked on an indentation stack, so methods read
//! `Class.method` and nested functions `Class.method.inner`. Triple-quoted
//! strings are skipped so their contents never look like code.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use super::scan::{
    indent_width, leading_comments, matching_close, split_lines, split_top_level, CommentStyle,
};
use super::{Language, LanguageExtractor};
use crate::registry::{Function, Visibility};

const MAX_SIGNATURE_LINES: usize = 32;
const DOCSTRING_LOOKAHEAD: usize = 3;

lazy_static! {
    static ref DEF_RE: Regex = Regex::new(r"^(\s*)(async\s+)?def\s+(\w+)\s*\(").unwrap();
    static ref CLASS_RE: Regex = Regex::new(r"^(\s*)class\s+(\w+)").unwrap();
    static ref DECORATOR_RE: Regex = Regex::new(r"^\s*@([\w.]+)").unwrap();
    static ref CALL_RE: Regex = Regex::new(r"\b([A-Za-z_]\w*)\s*\(").unwrap();

    static ref BUILTINS: HashSet<&'static str> = [
        "print", "len", "range", "str", "int", "float", "bool", "list", "dict", "tuple", "set",
        "open", "type", "isinstance", "hasattr", "getattr", "setattr", "delattr",
        "min", "max", "sum", "abs", "round", "sorted", "reversed", "enumerate", "zip",
        "map", "filter", "any", "all", "next", "iter", "super", "property", "staticmethod",
        "classmethod", "repr", "format", "hash", "id", "bytes", "object", "frozenset",
    ]
    .into_iter()
    .collect();

    static ref KEYWORDS: HashSet<&'static str> = [
        "if", "elif", "while", "for", "return", "and", "or", "not", "in", "is", "def",
        "class", "lambda", "with", "assert", "yield", "except", "raise", "del", "global",
        "nonlocal", "import", "from", "async", "await", "print",
    ]
    .into_iter()
    .collect();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Class,
    Function,
}

#[derive(Debug)]
struct Block {
    indent: usize,
    name: String,
    kind: BlockKind,
}

/// Tracks whether scanning is inside a triple-quoted string.
#[derive(Debug, Default)]
struct TripleQuotes {
    open: Option<&'static str>,
}

impl TripleQuotes {
    fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Update the state with a line's quote delimiters.
    fn feed(&mut self, line: &str) {
        match self.open {
            Some(q) => {
                if line.matches(q).count() % 2 == 1 {
                    self.open = None;
                }
            }
            None => {
                for q in ["\"\"\"", "'''"] {
                    if line.matches(q).count() % 2 == 1 {
                        self.open = Some(q);
                        break;
                    }
                }
            }
        }
    }
}

#[derive(Debug)]
struct PySignature {
    params: Vec<String>,
    return_type: String,
    /// Line index holding the `:` that ends the signature.
    end_line: usize,
}

fn parse_signature(lines: &[&str], idx: usize, open: usize) -> Option<PySignature> {
    let end = (idx + MAX_SIGNATURE_LINES).min(lines.len());
    let text = lines[idx..end].join("\n");
    let close = matching_close(&text, open, b'(', b')')?;
    let tail = &text[close + 1..];

    let mut depth = 0i32;
    let colon = tail.char_indices().find_map(|(i, c)| {
        match c {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth -= 1,
            ':' if depth <= 0 => return Some(i),
            _ => {}
        }
        None
    })?;

    let head = &tail[..colon];
    let return_type = match head.find("->") {
        Some(pos) => head[pos + 2..].split_whitespace().collect::<Vec<_>>().join(" "),
        None => String::new(),
    };
    let return_type = if return_type.is_empty() {
        "None".to_string()
    } else {
        return_type
    };

    let end_line = idx + text[..close + 1 + colon].matches('\n').count();
    Some(PySignature {
        params: split_top_level(&text[open + 1..close])
            .into_iter()
            .filter_map(py_param_name)
            .collect(),
        return_type,
        end_line,
    })
}

fn py_param_name(part: &str) -> Option<String> {
    let name = part.split([':', '=']).next().unwrap_or(part).trim();
    let name = name.trim_start_matches('*').trim();
    if name.is_empty() || name == "/" {
        None
    } else {
        Some(name.to_string())
    }
}

/// Lines from `decl` through the last line indented deeper than `base`.
fn block_size(lines: &[&str], decl: usize, sig_end: usize, base: usize) -> usize {
    let mut last = sig_end;
    let mut quotes = TripleQuotes::default();

    for (j, line) in lines.iter().enumerate().skip(sig_end + 1) {
        if quotes.is_open() {
            last = j;
            quotes.feed(line);
            continue;
        }
        let t = line.trim();
        if t.is_empty() || t.starts_with('#') {
            continue;
        }
        if indent_width(line) <= base {
            break;
        }
        last = j;
        quotes.feed(line);
    }

    last - decl + 1
}

/// Text of the docstring opening the body, if there is one.
fn docstring(lines: &[&str], sig_end: usize) -> Option<String> {
    let first = lines
        .iter()
        .enumerate()
        .skip(sig_end + 1)
        .take(DOCSTRING_LOOKAHEAD)
        .find(|(_, l)| !l.trim().is_empty())?;
    let (start, line) = first;
    let trimmed = line.trim().trim_start_matches(['r', 'u', 'R', 'U']);
    let quote = ["\"\"\"", "'''"].into_iter().find(|q| trimmed.starts_with(q))?;

    let rest = &trimmed[quote.len()..];
    if let Some(end) = rest.find(quote) {
        return Some(rest[..end].trim().to_string());
    }

    let mut parts = vec![rest.trim().to_string()];
    for l in &lines[start + 1..] {
        match l.find(quote) {
            Some(end) => {
                parts.push(l[..end].trim().to_string());
                break;
            }
            None => parts.push(l.trim().to_string()),
        }
    }
    parts.retain(|p| !p.is_empty());
    Some(parts.join(" "))
}

fn is_test(name: &str, decorators: &[String]) -> bool {
    name.starts_with("test_")
        || name.ends_with("_test")
        || decorators.iter().any(|d| d.contains("test"))
}

/// Extractor for `.py` files.
#[derive(Debug, Default)]
pub struct PythonExtractor;

impl PythonExtractor {
    pub fn new() -> Self {
        Self
    }

    fn build_function(
        &self,
        file: &str,
        lines: &[&str],
        idx: usize,
        caps: &regex::Captures<'_>,
        stack: &[Block],
        decorators: &[String],
    ) -> Option<(Function, usize)> {
        let indent = indent_width(caps.get(1)?.as_str());
        let name = caps.get(3)?.as_str();
        let open = caps.get(0)?.end() - 1;
        let sig = parse_signature(lines, idx, open)?;

        let mut path: Vec<&str> = stack.iter().map(|b| b.name.as_str()).collect();
        path.push(name);

        let mut f = Function::new(path.join("."), file, idx + 1, Language::Python.as_str());
        let magic = name.len() > 4 && name.starts_with("__") && name.ends_with("__");
        f.visibility = if name.starts_with('_') {
            Visibility::Private
        } else {
            Visibility::Public
        };
        if magic {
            f.flag("magic");
        }
        f.return_type = sig.return_type;
        f.parameters = sig.params;
        f.signature = lines[idx].trim().to_string();
        f.is_test = is_test(name, decorators);
        f.is_main = name == "main" && stack.is_empty();
        f.size = block_size(lines, idx, sig.end_line, indent);
        f.comments = docstring(lines, sig.end_line)
            .unwrap_or_else(|| leading_comments(lines, idx, CommentStyle::Hash));

        if caps.get(2).is_some() {
            f.flag("async");
        }
        if !decorators.is_empty() {
            f.metadata.insert("decorators".to_string(), decorators.join(","));
        }
        if let Some(class) = stack.iter().rev().find(|b| b.kind == BlockKind::Class) {
            f.metadata.insert("class".to_string(), class.name.clone());
        }
        if let Some(parent) = stack.last().filter(|b| b.kind == BlockKind::Function) {
            f.metadata.insert("nested_in".to_string(), parent.name.clone());
        }
        Some((f, sig.end_line))
    }
}

impl LanguageExtractor for PythonExtractor {
    fn language(&self) -> Language {
        Language::Python
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn extract_functions(&self, file: &str, source: &str) -> Vec<Function> {
        let lines = split_lines(source);
        let mut functions = Vec::new();
        let mut stack: Vec<Block> = Vec::new();
        let mut decorators: Vec<String> = Vec::new();
        let mut quotes = TripleQuotes::default();
        let mut signature_end = 0usize;

        for (idx, line) in lines.iter().enumerate() {
            if idx < signature_end {
                continue;
            }
            if quotes.is_open() {
                quotes.feed(line);
                continue;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let indent = indent_width(line);
            while stack.last().map(|b| b.indent >= indent).unwrap_or(false) {
                stack.pop();
            }

            if let Some(caps) = DECORATOR_RE.captures(line) {
                decorators.push(caps[1].to_string());
            } else if let Some(caps) = CLASS_RE.captures(line) {
                stack.push(Block {
                    indent,
                    name: caps[2].to_string(),
                    kind: BlockKind::Class,
                });
                decorators.clear();
            } else if let Some(caps) = DEF_RE.captures(line) {
                if let Some((f, end)) =
                    self.build_function(file, &lines, idx, &caps, &stack, &decorators)
                {
                    functions.push(f);
                    signature_end = end + 1;
                }
                stack.push(Block {
                    indent,
                    name: caps[3].to_string(),
                    kind: BlockKind::Function,
                });
                decorators.clear();
            } else {
                decorators.clear();
            }

            quotes.feed(line);
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
        if let Some(m) = DEF_RE.find(line) {
            return Some(m.end() - 1);
        }
        let caps = CLASS_RE.captures(line)?;
        caps.get(0).map(|m| m.end())
    }

    fn line_comment(&self) -> &'static str {
        "#"
    }
}
