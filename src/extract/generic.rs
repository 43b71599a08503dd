//! Best-effort extractor for unknown or mixed-language trees.
//!
//! A short ordered list of declaration shapes (Python `def`, Rust `fn`, Go
//! `func`, JavaScript `function`, C-family `type name(...)`) is tried on
//! every line; the first match wins. Bodies are measured by braces, or by
//! indentation for `def`.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

use super::scan::{
    body_size, c_param_name, complexity, indent_width, leading_comments, matching_close,
    split_lines, split_top_level, BlockComments, CommentStyle,
};
use super::{Language, LanguageExtractor};
use crate::registry::{Function, Visibility};

/// Which declaration shape matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Def,
    Fn,
    Func,
    Function,
    CLike,
}

impl Shape {
    fn uses_indentation(self) -> bool {
        self == Shape::Def
    }

    /// `name: type` parameter lists rather than `type name`.
    fn names_first(self) -> bool {
        matches!(self, Shape::Def | Shape::Fn | Shape::Func | Shape::Function)
    }
}

lazy_static! {
    static ref SHAPES: Vec<(Shape, Regex)> = vec![
        (Shape::Def, Regex::new(r"^\s*(?:async\s+)?def\s+(\w+)\s*\(").unwrap()),
        (
            Shape::Fn,
            Regex::new(r"^\s*(?:(?:pub(?:\([^)]*\))?|public)\s+)?(?:(?:const|async|unsafe)\s+)*fn\s+(\w+)\s*(?:<[^(]*>)?\s*\(").unwrap(),
        ),
        (
            Shape::Func,
            Regex::new(r"^\s*func\s*(?:\([^)]*\)\s*)?(\w+)\s*(?:\[[^\]]*\])?\s*\(").unwrap(),
        ),
        (
            Shape::Function,
            Regex::new(r"^\s*(?:export\s+)?(?:async\s+)?function\s*\*?\s*(\w+)\s*\(").unwrap(),
        ),
        (
            Shape::CLike,
            Regex::new(r"^\s*(?:[A-Za-z_][\w:<>\[\]]*[\s\*&]+)+([A-Za-z_]\w*)\s*\(").unwrap(),
        ),
    ];
    static ref CALL_RE: Regex = Regex::new(r"\b([A-Za-z_]\w*)\s*\(").unwrap();
    static ref BRANCH_RE: Regex =
        Regex::new(r"\b(?:if|for|while|case|catch)\b|&&|\|\|").unwrap();
    static ref PRIVATE_RE: Regex = Regex::new(r"\b(?:private|protected)\b").unwrap();

    static ref BUILTINS: HashSet<&'static str> = [
        "print", "printf", "println", "len", "size", "count", "max", "min",
        "sort", "map", "filter", "reduce", "sum", "abs", "round",
        "open", "close", "read", "write", "file", "input", "output",
        "assert", "expect", "panic", "error", "throw", "catch",
        "new", "delete", "malloc", "free", "alloc",
        "true", "false", "null", "nil", "undefined",
    ]
    .into_iter()
    .collect();

    static ref KEYWORDS: HashSet<&'static str> = [
        "if", "else", "elif", "while", "for", "do", "switch", "case", "default",
        "break", "continue", "return", "goto", "try", "catch", "finally",
        "class", "struct", "enum", "interface", "trait", "impl", "type",
        "var", "let", "const", "static", "extern", "inline", "virtual",
        "public", "private", "protected", "internal",
        "import", "export", "include", "use", "from", "namespace", "package",
        "int", "float", "double", "char", "string", "bool", "void",
        "this", "self", "super", "base", "function", "def", "fn", "func",
        "sizeof", "typeof", "await", "yield", "throws", "new",
        "throw", "raise", "echo", "co_return", "co_yield", "co_await",
    ]
    .into_iter()
    .collect();
}

const HEADER_EXTENSIONS: &[&str] = &["h", "hpp", "hxx", "hh"];

/// Keywords allowed in front of a C-family declaration name. Type keywords
/// (`int`, `void`, ...) are in here as well.
const MODIFIERS: &[&str] = &[
    "static", "inline", "virtual", "const", "extern", "public", "private", "protected",
    "internal", "int", "float", "double", "char", "string", "bool", "void", "struct", "enum",
];

struct Candidate<'a> {
    shape: Shape,
    name: &'a str,
    params: &'a str,
    open: usize,
    /// Text after the parameter list.
    tail: &'a str,
}

fn match_line(line: &str) -> Option<Candidate<'_>> {
    for (shape, re) in SHAPES.iter() {
        let Some(caps) = re.captures(line) else {
            continue;
        };
        let Some(name_match) = caps.get(1) else {
            continue;
        };
        let name = name_match.as_str();
        if KEYWORDS.contains(name) {
            continue;
        }
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let open = whole.end() - 1;
        let Some(close) = matching_close(line, open, b'(', b')') else {
            continue;
        };
        let tail = line[close + 1..].trim();

        if *shape == Shape::CLike {
            let head = &line[..name_match.start()];
            let statement = head
                .split_whitespace()
                .any(|w| KEYWORDS.contains(w) && !MODIFIERS.contains(&w));
            let terminated = tail.ends_with('{') || tail.ends_with(';') || tail.ends_with('}');
            if statement || !terminated || (line.contains('=') && !line.contains('{')) {
                continue;
            }
        }

        return Some(Candidate {
            shape: *shape,
            name,
            params: &line[open + 1..close],
            open,
            tail,
        });
    }
    None
}

fn generic_param_name(part: &str, names_first: bool) -> Option<String> {
    if !names_first {
        return c_param_name(part);
    }
    let name = part.split([':', '=']).next().unwrap_or(part);
    let name = name
        .split_whitespace()
        .rfind(|w| *w != "mut")?
        .trim_start_matches(['*', '&']);
    if name.is_empty() || name == "/" {
        None
    } else {
        Some(name.to_string())
    }
}

fn indented_size(lines: &[&str], idx: usize) -> usize {
    let base = indent_width(lines[idx]);
    let mut last = idx;
    for (j, line) in lines.iter().enumerate().skip(idx + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indent_width(line) <= base {
            break;
        }
        last = j;
    }
    last - idx + 1
}

/// Text after `->` up to the body, `;` or a `where` clause.
fn arrow_return_type(tail: &str) -> String {
    let Some(rest) = tail.trim_start().strip_prefix("->") else {
        return String::new();
    };
    let end = rest
        .find('{')
        .or_else(|| rest.rfind(';'))
        .unwrap_or(rest.len());
    let rest = &rest[..end];
    let rest = rest.split(" where ").next().unwrap_or(rest);
    rest.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_test_name(name: &str) -> bool {
    ["test_", "_test", "Test", "TEST"]
        .iter()
        .any(|p| name.contains(p))
}

/// Extractor used when no dedicated variant exists.
#[derive(Debug, Default)]
pub struct GenericExtractor;

impl GenericExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl LanguageExtractor for GenericExtractor {
    fn language(&self) -> Language {
        Language::Generic
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &[
            "py", "rs", "go", "c", "cpp", "cxx", "cc", "h", "hpp", "hxx", "hh", "java", "js",
            "ts", "cs",
        ]
    }

    fn is_header_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| HEADER_EXTENSIONS.contains(&ext))
            .unwrap_or(false)
    }

    fn extract_functions(&self, file: &str, source: &str) -> Vec<Function> {
        let detected = Path::new(file)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Language::from_extension)
            .map(|l| l.as_str())
            .unwrap_or("unknown");

        let lines = split_lines(source);
        let mut functions = Vec::new();
        let mut comments = BlockComments::new();

        for (idx, line) in lines.iter().enumerate() {
            if comments.consume(line) {
                continue;
            }
            let Some(cand) = match_line(line) else {
                continue;
            };

            let mut f = Function::new(cand.name, file, idx + 1, Language::Generic.as_str());
            f.visibility = if cand.name.starts_with('_') || PRIVATE_RE.is_match(line) {
                Visibility::Private
            } else {
                Visibility::Public
            };
            f.parameters = split_top_level(cand.params)
                .into_iter()
                .filter_map(|p| generic_param_name(p, cand.shape.names_first()))
                .collect();
            if cand.shape == Shape::Fn {
                f.return_type = arrow_return_type(cand.tail);
            }
            f.signature = line.trim().to_string();
            f.is_test = is_test_name(cand.name);
            f.is_main = cand.name == "main" || cand.name == "__main__";
            f.metadata
                .insert("detected_language".to_string(), detected.to_string());

            if cand.shape.uses_indentation() {
                f.size = indented_size(&lines, idx);
                f.comments = leading_comments(&lines, idx, CommentStyle::Hash);
                f.flag("definition");
            } else if cand.tail.ends_with(';') && !cand.tail.contains('{') {
                f.comments = leading_comments(&lines, idx, CommentStyle::CLike);
                f.flag("declaration");
            } else {
                f.size = body_size(&lines, idx);
                f.complexity = Some(complexity(&lines, idx, f.size, &BRANCH_RE));
                f.comments = leading_comments(&lines, idx, CommentStyle::CLike);
                f.flag("definition");
            }

            functions.push(f);
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
        match_line(line).map(|c| c.open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(file: &str, source: &str) -> Vec<Function> {
        GenericExtractor::new().extract_functions(file, source)
    }

    #[test]
    fn test_java_like_methods() {
        let source = "public class Calc {\n    public int add(int a, int b) {\n        return a + b;\n    }\n\n    private void reset() {\n    }\n}\n";
        let funcs = extract("Calc.java", source);
        let names: Vec<&str> = funcs.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["add", "reset"]);
        assert_eq!(funcs[0].parameters, vec!["a", "b"]);
        assert_eq!(funcs[0].size, 3);
        assert_eq!(funcs[0].visibility, Visibility::Public);
        assert_eq!(funcs[1].visibility, Visibility::Private);
        assert_eq!(funcs[0].language, "generic");
        assert_eq!(
            funcs[0].metadata.get("detected_language").map(String::as_str),
            Some("unknown")
        );
    }

    #[test]
    fn test_mixed_shapes() {
        let py = extract("x.py", "def _helper(a, b=2):\n    return a\n\nx = 1\n");
        assert_eq!(py[0].name, "_helper");
        assert_eq!(py[0].visibility, Visibility::Private);
        assert_eq!(py[0].parameters, vec!["a", "b"]);
        assert_eq!(py[0].size, 2);
        assert_eq!(py[0].metadata.get("detected_language").map(String::as_str), Some("python"));

        let js = extract("app.js", "export async function loadAll(url, opts) {\n  return fetchAll(url);\n}\n");
        assert_eq!(js[0].name, "loadAll");
        assert_eq!(js[0].parameters, vec!["url", "opts"]);
        assert_eq!(js[0].size, 3);

        let rs = extract("lib.rs", "pub fn parse(mut input: &str) -> bool {\n    true\n}\n");
        assert_eq!(rs[0].name, "parse");
        assert_eq!(rs[0].parameters, vec!["input"]);
    }

    #[test]
    fn test_statements_are_not_declarations() {
        let source = "void run() {\n    return compute(x);\n    int y = make(2);\n}\n";
        let funcs = extract("a.c", source);
        assert_eq!(funcs.len(), 1);
        assert_eq!(funcs[0].name, "run");
    }

    #[test]
    fn test_throw_is_not_a_declaration() {
        let source = "function check(x) {\n  if (!x) {\n    throw Error(\"bad\");\n  }\n  return x;\n}\n";
        let funcs = extract("check.js", source);
        let names: Vec<&str> = funcs.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["check"]);
        assert_eq!(funcs[0].size, 6);

        let cpp = extract("w.cpp", "void fail() {\n    throw std::runtime_error(\"x\");\n}\n");
        assert_eq!(cpp.len(), 1);
    }

    #[test]
    fn test_fn_shape_with_public_and_return_type() {
        let funcs = extract("add.rs", "public fn add(a: i32, b: i32) -> i32 { a + b }\n");
        assert_eq!(funcs.len(), 1);
        let f = &funcs[0];
        assert_eq!(f.name, "add");
        assert_eq!(f.visibility, Visibility::Public);
        assert_eq!(f.parameters, vec!["a", "b"]);
        assert_eq!(f.return_type, "i32");
        assert_eq!(f.size, 1);

        let funcs = extract("lib.rs", "pub(crate) fn open<P>(p: P) -> Result<File, Error>\nwhere\n    P: AsRef<Path>;\nfn noop() {}\n");
        assert_eq!(funcs[0].return_type, "Result<File, Error>");
        assert_eq!(funcs[1].return_type, "");
    }

    #[test]
    fn test_prototype_and_test_names() {
        let funcs = extract("t.h", "int test_parser(void);\n");
        assert_eq!(funcs.len(), 1);
        assert!(funcs[0].is_test);
        assert!(funcs[0].has_flag("declaration"));
        assert_eq!(funcs[0].size, 1);
        assert!(GenericExtractor::new().is_header_file(Path::new("t.h")));
    }

    #[test]
    fn test_call_sites() {
        let source = "function main() {\n  setup();\n  print(run(1));\n  if (ok) { run(2); }\n}\n";
        let calls = GenericExtractor::new().find_call_sites(source);
        let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["setup", "run"]);
        assert_eq!(calls[1].lines, vec![3, 4]);
    }
}
