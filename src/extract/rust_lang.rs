//! Rust extractor.
//!
//! Handles attributes, doc comments, `impl` and `trait` blocks, qualifier
//! keywords (`pub`, `pub(crate)`, `const`, `async`, `unsafe`, `extern "C"`),
//! generics, signatures that span several lines and `where` clauses.
//! Functions default to private unless marked `pub`; trait items inherit the
//! trait's visibility.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use super::scan::{
    body_size, complexity, leading_comments, matching_close, split_lines, split_top_level,
    BlockComments, CommentStyle, ContextTracker,
};
use super::{Language, LanguageExtractor};
use crate::registry::{Function, Visibility};

/// How far below the `fn` line a signature may continue.
const MAX_SIGNATURE_LINES: usize = 32;

lazy_static! {
    static ref FN_RE: Regex = Regex::new(
        r#"^\s*((?:pub(?:\s*\([^)]*\))?|public)\s+)?((?:(?:const|async|unsafe|default)\s+|extern\s+(?:"[^"]*"\s+)?)*)fn\s+(\w+)"#
    )
    .unwrap();
    static ref IMPL_RE: Regex = Regex::new(
        r"^\s*(?:unsafe\s+)?impl(?:\s*<.*?>)?\s+(?:!?(?:dyn\s+)?([\w:]+)(?:<.*?>)?\s+for\s+)?&?(?:mut\s+)?(?:dyn\s+)?([\w:]+)"
    )
    .unwrap();
    static ref TRAIT_RE: Regex =
        Regex::new(r"^\s*(pub(?:\s*\([^)]*\))?\s+)?(?:unsafe\s+)?trait\s+(\w+)").unwrap();
    static ref ATTR_RE: Regex = Regex::new(r"^\s*#\[(.*)\]\s*$").unwrap();
    static ref WHERE_RE: Regex = Regex::new(r"\bwhere\b").unwrap();
    static ref CALL_RE: Regex = Regex::new(r"\b([A-Za-z_]\w*)!?\s*\(").unwrap();
    static ref BRANCH_RE: Regex =
        Regex::new(r"\b(?:if|match|for|while|loop)\b|&&|\|\||\?").unwrap();

    static ref BUILTINS: HashSet<&'static str> = [
        "println", "print", "eprintln", "eprint", "panic", "assert", "assert_eq", "assert_ne",
        "debug_assert", "debug_assert_eq", "debug_assert_ne", "matches", "todo",
        "unimplemented", "unreachable", "dbg", "format_args", "include_str", "include_bytes",
        "concat", "env", "cfg",
        "format", "write", "writeln", "vec", "Some", "None", "Ok", "Err", "Box", "Rc", "Arc",
        "clone", "copy", "drop", "len", "is_empty", "push", "pop", "insert", "remove",
        "iter", "into_iter", "collect", "map", "filter", "fold", "reduce", "find",
        "unwrap", "expect", "unwrap_or", "unwrap_or_else", "is_some", "is_none", "is_ok", "is_err",
        "Fn", "FnMut", "FnOnce",
    ]
    .into_iter()
    .collect();

    static ref KEYWORDS: HashSet<&'static str> = [
        "if", "else", "while", "for", "loop", "match", "return", "fn", "in", "as", "let",
        "mut", "ref", "move", "impl", "where", "use", "mod", "struct", "enum", "trait",
        "type", "Self", "self", "super", "crate", "unsafe", "async", "await", "dyn", "pub",
        "const", "static", "extern",
    ]
    .into_iter()
    .collect();
}

/// What kind of block the current context is.
#[derive(Debug, Clone)]
enum Scope {
    Impl { trait_name: Option<String> },
    Trait { public: bool },
}

#[derive(Debug)]
struct Signature {
    generic: bool,
    params: Vec<String>,
    return_type: String,
    /// Ends in `;` rather than opening a body.
    declaration: bool,
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Index of the `>` closing the generic list at `open`; `->` arrows are
/// not counted.
fn generic_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'<' => depth += 1,
            b'>' if i > 0 && bytes[i - 1] == b'-' => {}
            b'>' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Offset of the `(` opening the parameter list, and whether generics
/// precede it.
fn params_open(text: &str, name_end: usize) -> Option<(usize, bool)> {
    let skip_ws = |from: usize| from + (text[from..].len() - text[from..].trim_start().len());

    let mut cursor = skip_ws(name_end);
    let mut generic = false;
    if text[cursor..].starts_with('<') {
        cursor = skip_ws(generic_close(text, cursor)? + 1);
        generic = true;
    }
    if text[cursor..].starts_with('(') {
        Some((cursor, generic))
    } else {
        None
    }
}

/// First `{` or `;` outside brackets, so `-> [u8; 4]` is not a terminator.
fn find_terminator(tail: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, b) in tail.bytes().enumerate() {
        match b {
            b'[' | b'(' => depth += 1,
            b']' | b')' => depth -= 1,
            b'{' | b';' if depth <= 0 => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_signature(text: &str, name_end: usize) -> Option<Signature> {
    let (open, generic) = params_open(text, name_end)?;
    let close = matching_close(text, open, b'(', b')')?;
    let tail = &text[close + 1..];
    let term = find_terminator(tail)?;
    let head = &tail[..term];

    let return_type = head
        .find("->")
        .map(|pos| {
            let ret = &head[pos + 2..];
            let ret = match WHERE_RE.find(ret) {
                Some(m) => &ret[..m.start()],
                None => ret,
            };
            ret.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "()".to_string());

    Some(Signature {
        generic,
        params: split_top_level(&text[open + 1..close])
            .into_iter()
            .filter_map(rust_param_name)
            .collect(),
        return_type,
        declaration: tail.as_bytes()[term] == b';',
    })
}

/// Binding name of one parameter; every receiver form becomes `self`.
fn rust_param_name(part: &str) -> Option<String> {
    let pattern = part.split(':').next().unwrap_or(part).replace('&', " ");
    let words: Vec<&str> = pattern
        .split_whitespace()
        .filter(|w| *w != "mut" && !w.starts_with('\''))
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

/// Extractor for `.rs` files.
#[derive(Debug, Default)]
pub struct RustExtractor;

impl RustExtractor {
    pub fn new() -> Self {
        Self
    }

    fn build_function(
        &self,
        file: &str,
        lines: &[&str],
        idx: usize,
        caps: &regex::Captures<'_>,
        context: Option<(&str, &Scope)>,
        attributes: &[String],
    ) -> Option<Function> {
        let name_match = caps.get(3)?;
        let end = (idx + MAX_SIGNATURE_LINES).min(lines.len());
        let text = lines[idx..end].join("\n");
        let sig = parse_signature(&text, name_match.end())?;

        let name = name_match.as_str();
        let full_name = match context {
            Some((ctx, _)) => format!("{}::{}", ctx, name),
            None => name.to_string(),
        };

        let mut f = Function::new(full_name, file, idx + 1, Language::Rust.as_str());
        let explicit_pub = caps.get(1).is_some();
        f.visibility = match context {
            _ if explicit_pub => Visibility::Public,
            Some((_, Scope::Trait { public: true })) => Visibility::Public,
            _ => Visibility::Private,
        };
        f.return_type = sig.return_type;
        f.parameters = sig.params;
        f.signature = lines[idx].trim().to_string();
        f.is_test = attributes.iter().any(|a| a.contains("test"));
        f.is_main = name == "main" && context.is_none();
        f.comments = leading_comments(lines, idx, CommentStyle::RustDoc);

        if sig.declaration {
            f.flag("declaration");
        } else {
            f.size = body_size(lines, idx);
            f.complexity = Some(complexity(lines, idx, f.size, &BRANCH_RE));
            f.flag("definition");
        }

        let modifiers = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        for keyword in ["const", "async", "unsafe", "extern", "default"] {
            if modifiers.split_whitespace().any(|w| w == keyword) {
                f.flag(keyword);
            }
        }
        if sig.generic {
            f.flag("generic");
        }
        if !attributes.is_empty() {
            f.metadata.insert("attributes".to_string(), attributes.join(","));
        }
        match context {
            Some((ctx, Scope::Impl { trait_name })) => {
                f.metadata.insert("impl".to_string(), ctx.to_string());
                if let Some(t) = trait_name {
                    f.metadata.insert("trait_impl".to_string(), t.clone());
                }
            }
            Some((ctx, Scope::Trait { .. })) => {
                f.metadata.insert("trait".to_string(), ctx.to_string());
            }
            None => {}
        }

        Some(f)
    }
}

impl LanguageExtractor for RustExtractor {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn extract_functions(&self, file: &str, source: &str) -> Vec<Function> {
        let lines = split_lines(source);
        let mut functions = Vec::new();
        let mut comments = BlockComments::new();
        let mut context = ContextTracker::new();
        let mut scope: Option<Scope> = None;
        let mut attributes: Vec<String> = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            if comments.consume(line) {
                continue;
            }
            let trimmed = line.trim();

            if let Some(caps) = ATTR_RE.captures(line) {
                attributes.push(caps[1].trim().to_string());
            } else if trimmed.starts_with("#!") {
                // inner attribute
            } else if let Some(caps) = IMPL_RE.captures(line) {
                context.open(last_segment(&caps[2]));
                scope = Some(Scope::Impl {
                    trait_name: caps.get(1).map(|m| last_segment(m.as_str()).to_string()),
                });
                attributes.clear();
            } else if let Some(caps) = TRAIT_RE.captures(line) {
                context.open(&caps[2]);
                scope = Some(Scope::Trait {
                    public: caps.get(1).is_some(),
                });
                attributes.clear();
            } else if let Some(caps) = FN_RE.captures(line) {
                let ctx = context.current().zip(scope.as_ref());
                if let Some(f) = self.build_function(file, &lines, idx, &caps, ctx, &attributes) {
                    functions.push(f);
                }
                attributes.clear();
            } else if !trimmed.is_empty() {
                attributes.clear();
            }

            context.advance(line);
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
        let name_end = FN_RE.captures(line)?.get(3)?.end();
        Some(params_open(line, name_end).map(|(open, _)| open).unwrap_or(name_end))
    }
}
