//! C++ extractor.
//!
//! Extends the C-style declaration shape with namespaces, class/struct
//! blocks and their access sections, templates, out-of-class definitions
//! (`Type::method`), constructors and destructors. Lines inside a recorded
//! function body are never treated as declarations, which keeps local
//! variables with constructor syntax (`std::string s("x");`) out.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

use super::scan::{
    body_size, c_param_name, complexity, leading_comments, matching_close, split_lines,
    split_top_level, strip_line_comment, BlockComments, CommentStyle, ContextTracker,
};
use super::{Language, LanguageExtractor};
use crate::registry::{base_name, Function, Visibility};

lazy_static! {
    static ref DECL_RE: Regex = Regex::new(concat!(
        r"^\s*((?:[A-Za-z_][\w:]*(?:\s*<[^;(){}]*>)?[\s\*&]+)*)",
        r"((?:[A-Za-z_]\w*::)*(?:~?[A-Za-z_]\w*|operator\s*(?:\(\)|[^\s\w(]+)))\s*\(",
    ))
    .unwrap();
    static ref CLASS_RE: Regex = Regex::new(
        r"^\s*(?:template\s*<[^>]*>\s*)?(class|struct)\s+(?:\w+\s+)?(\w+)\s*(?:final\s*)?(?::[^;{]*)?\{?\s*$"
    )
    .unwrap();
    static ref NAMESPACE_RE: Regex = Regex::new(r"^\s*namespace\s+([\w:]+)\s*\{?\s*$").unwrap();
    static ref ACCESS_RE: Regex = Regex::new(r"^\s*(public|private|protected)\s*:(?:[^:]|$)").unwrap();
    static ref TEMPLATE_RE: Regex = Regex::new(r"^\s*template\s*<").unwrap();
    static ref PREPROCESSOR_RE: Regex = Regex::new(r"^\s*#\s*\w+").unwrap();
    static ref CALL_RE: Regex = Regex::new(r"\b([A-Za-z_]\w*)\s*\(").unwrap();
    static ref BRANCH_RE: Regex =
        Regex::new(r"\b(?:if|for|while|case|catch)\b|&&|\|\|").unwrap();

    static ref BUILTINS: HashSet<&'static str> = [
        "cout", "cin", "cerr", "clog", "endl", "flush",
        "string", "vector", "list", "map", "set", "unordered_map", "unordered_set",
        "shared_ptr", "unique_ptr", "weak_ptr", "make_shared", "make_unique",
        "thread", "mutex", "lock_guard", "unique_lock", "move", "forward",
        "begin", "end", "size", "empty", "clear", "push_back", "pop_back", "emplace_back",
        "insert", "erase", "find", "count", "at", "front", "back",
        "printf", "scanf", "malloc", "free", "strlen", "strcpy", "strcmp",
        "memcpy", "memset", "assert",
    ]
    .into_iter()
    .collect();

    static ref KEYWORDS: HashSet<&'static str> = [
        "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor",
        "bool", "break", "case", "catch", "char", "char16_t", "char32_t", "class",
        "compl", "concept", "const", "constexpr", "const_cast", "continue",
        "decltype", "default", "delete", "do", "double", "dynamic_cast",
        "else", "enum", "explicit", "export", "extern", "false", "float",
        "for", "friend", "goto", "if", "inline", "int", "long", "mutable",
        "namespace", "new", "noexcept", "not", "not_eq", "nullptr", "operator",
        "or", "or_eq", "private", "protected", "public", "register", "reinterpret_cast",
        "requires", "return", "short", "signed", "sizeof", "static", "static_assert",
        "static_cast", "struct", "switch", "template", "this", "thread_local",
        "throw", "true", "try", "typedef", "typeid", "typename", "union",
        "unsigned", "using", "virtual", "void", "volatile", "wchar_t", "while",
        "xor", "xor_eq", "override", "final",
    ]
    .into_iter()
    .collect();
}

const MODIFIERS: &[&str] = &[
    "virtual", "static", "inline", "explicit", "constexpr", "friend", "extern",
];

const QUALIFIERS: &[&str] = &["const", "override", "final", "noexcept"];

const STATEMENT_WORDS: &[&str] = &[
    "return", "else", "if", "while", "for", "do", "switch", "case", "goto", "sizeof",
    "typedef", "new", "delete", "throw", "using", "co_return", "co_await", "co_yield",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclKind {
    Definition,
    Declaration,
    /// Nothing after the parameter list; the body may open below.
    Open,
}

#[derive(Debug)]
struct CppDecl<'a> {
    modifiers: Vec<&'a str>,
    return_type: String,
    /// Name as written, possibly qualified (`Widget::draw`).
    name: &'a str,
    params: &'a str,
    open: usize,
    qualifiers: Vec<&'a str>,
    kind: DeclKind,
    pure: bool,
    template: bool,
}

impl CppDecl<'_> {
    /// `Owner` in `Owner::name`, if the name is qualified.
    fn owner(&self) -> Option<&str> {
        let (prefix, _) = self.name.rsplit_once("::")?;
        Some(prefix.rsplit("::").next().unwrap_or(prefix))
    }

    fn is_constructor_of(&self, class: Option<&str>) -> bool {
        let owner = self.owner().or(class);
        owner.is_some() && owner == Some(base_name(self.name))
    }

    fn is_destructor_of(&self, class: Option<&str>) -> bool {
        let owner = self.owner().or(class);
        match base_name(self.name).strip_prefix('~') {
            Some(rest) => owner == Some(rest),
            None => false,
        }
    }

    /// Return-type-less candidates are only accepted as constructors or
    /// destructors.
    fn is_plausible(&self, class: Option<&str>) -> bool {
        !self.return_type.is_empty() || self.is_constructor_of(class) || self.is_destructor_of(class)
    }
}

/// Byte offset just past a leading `template <...>` clause, if any.
fn skip_template(line: &str) -> Option<usize> {
    let m = TEMPLATE_RE.find(line)?;
    let close = matching_close(line, m.end() - 1, b'<', b'>')?;
    Some(close + 1)
}

fn parse_declaration(line: &str) -> Option<CppDecl<'_>> {
    let template_end = skip_template(line);
    let start = template_end.unwrap_or(0);
    let caps = DECL_RE.captures(&line[start..])?;
    let head = caps.get(1)?.as_str();
    let name = caps.get(2)?.as_str();

    if KEYWORDS.contains(base_name(name)) {
        return None;
    }
    let words: Vec<&str> = head.split_whitespace().collect();
    if words.iter().any(|w| STATEMENT_WORDS.contains(w)) {
        return None;
    }

    let open = start + caps.get(0)?.end() - 1;
    let close = matching_close(line, open, b'(', b')')?;
    let tail = strip_line_comment(&line[close + 1..], "//").trim();

    let qualifiers: Vec<&str> = tail
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| QUALIFIERS.contains(w))
        .collect();
    let (kind, pure) = if tail.contains('{') {
        (DeclKind::Definition, false)
    } else if tail.ends_with(';') {
        let compact: String = tail.chars().filter(|c| !c.is_whitespace()).collect();
        (DeclKind::Declaration, compact.contains("=0;"))
    } else if tail.is_empty()
        || tail.starts_with(':')
        || tail.split_whitespace().all(|w| QUALIFIERS.contains(&w))
    {
        (DeclKind::Open, false)
    } else {
        return None;
    };

    let modifiers: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| MODIFIERS.contains(w))
        .collect();
    let return_type = words
        .iter()
        .copied()
        .filter(|w| !MODIFIERS.contains(w))
        .collect::<Vec<_>>()
        .join(" ");

    Some(CppDecl {
        modifiers,
        return_type,
        name,
        params: &line[open + 1..close],
        open,
        qualifiers,
        kind,
        pure,
        template: template_end.is_some(),
    })
}

fn is_test_name(name: &str, full_name: &str) -> bool {
    ["test", "Test", "TEST"]
        .iter()
        .any(|p| name.contains(p) || full_name.contains(p))
}

/// Whether the next non-blank line opens a body or an initializer list.
fn body_opens_below(lines: &[&str], idx: usize) -> bool {
    lines[idx + 1..]
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .map(|l| l.starts_with('{') || l.starts_with(':'))
        .unwrap_or(false)
}

/// Per-file scanning state.
struct CppScan {
    namespaces: ContextTracker,
    classes: ContextTracker,
    access: &'static str,
    pending_template: bool,
}

/// Extractor for C++ sources and headers.
#[derive(Debug, Default)]
pub struct CppExtractor;

impl CppExtractor {
    pub fn new() -> Self {
        Self
    }

    fn build_function(
        &self,
        file: &str,
        lines: &[&str],
        idx: usize,
        decl: &CppDecl<'_>,
        state: &CppScan,
    ) -> Function {
        let class = if decl.owner().is_none() {
            state.classes.current()
        } else {
            None
        };

        let mut parts: Vec<&str> = Vec::new();
        if let Some(ns) = state.namespaces.current() {
            parts.push(ns);
        }
        if let Some(class) = class {
            parts.push(class);
        }
        parts.push(decl.name);
        let full_name = parts.join("::");
        let base = base_name(decl.name);

        let mut f = Function::new(full_name.as_str(), file, idx + 1, Language::Cpp.as_str());
        f.visibility = match class {
            Some(_) if state.access == "public" => Visibility::Public,
            Some(_) => Visibility::Private,
            None if decl.owner().is_none() && decl.modifiers.contains(&"static") => {
                Visibility::Private
            }
            None => Visibility::Public,
        };
        f.parameters = split_top_level(decl.params)
            .into_iter()
            .filter_map(c_param_name)
            .collect();
        f.signature = lines[idx].trim().to_string();
        f.is_test = is_test_name(base, &full_name);
        f.is_main = base == "main" && class.is_none() && decl.owner().is_none();
        f.comments = leading_comments(lines, idx, CommentStyle::CLike);

        let context = decl.owner().or(class);
        if decl.is_constructor_of(context) {
            f.flag("constructor");
        } else if decl.is_destructor_of(context) {
            f.flag("destructor");
        } else {
            f.return_type = decl.return_type.clone();
        }

        if decl.kind == DeclKind::Declaration {
            f.flag("declaration");
        } else {
            f.size = body_size(lines, idx);
            f.complexity = Some(complexity(lines, idx, f.size, &BRANCH_RE));
            f.flag("definition");
        }

        for m in &decl.modifiers {
            f.flag(m);
        }
        for q in &decl.qualifiers {
            f.flag(q);
        }
        if decl.pure {
            f.flag("pure_virtual");
        }
        if decl.template || state.pending_template {
            f.flag("template");
        }
        if let Some(class) = class {
            f.metadata.insert("class".to_string(), class.to_string());
            f.metadata.insert("access".to_string(), state.access.to_string());
        }
        if let Some(ns) = state.namespaces.current() {
            f.metadata.insert("namespace".to_string(), ns.to_string());
        }
        f
    }
}

impl LanguageExtractor for CppExtractor {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["cpp", "cxx", "cc", "hpp", "hxx", "hh", "h++", "c++"]
    }

    fn is_header_file(&self, path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("hpp" | "hxx" | "hh" | "h++" | "h")
        )
    }

    fn extract_functions(&self, file: &str, source: &str) -> Vec<Function> {
        let lines = split_lines(source);
        let mut functions = Vec::new();
        let mut comments = BlockComments::new();
        let mut state = CppScan {
            namespaces: ContextTracker::new(),
            classes: ContextTracker::new(),
            access: "private",
            pending_template: false,
        };
        let mut body_end = 0usize;

        for (idx, line) in lines.iter().enumerate() {
            if comments.consume(line) || PREPROCESSOR_RE.is_match(line) {
                continue;
            }

            if idx >= body_end {
                if let Some(caps) = NAMESPACE_RE.captures(line) {
                    state.namespaces.open(&caps[1]);
                    state.pending_template = false;
                } else if let Some(caps) = CLASS_RE.captures(line) {
                    state.classes.open(&caps[2]);
                    state.access = if &caps[1] == "struct" { "public" } else { "private" };
                    state.pending_template = false;
                } else if let Some(caps) = ACCESS_RE.captures(line) {
                    state.access = match &caps[1] {
                        "public" => "public",
                        "protected" => "protected",
                        _ => "private",
                    };
                } else if skip_template(line).map(|end| line[end..].trim().is_empty()) == Some(true)
                {
                    state.pending_template = true;
                } else if let Some(decl) = parse_declaration(line) {
                    let class = state.classes.current();
                    let accepted = decl.is_plausible(class)
                        && (decl.kind != DeclKind::Open || body_opens_below(&lines, idx));
                    if accepted {
                        let f = self.build_function(file, &lines, idx, &decl, &state);
                        if f.has_flag("definition") {
                            body_end = idx + f.size;
                        }
                        functions.push(f);
                    }
                    state.pending_template = false;
                } else if !line.trim().is_empty() {
                    state.pending_template = false;
                }
            }

            state.namespaces.advance(line);
            state.classes.advance(line);
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
        if PREPROCESSOR_RE.is_match(line) {
            return None;
        }
        parse_declaration(line)
            .filter(|d| d.is_plausible(None))
            .map(|d| d.open)
    }
}
