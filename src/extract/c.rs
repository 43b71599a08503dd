//! C extractor.
//!
//! Recognises prototypes and definitions (K&R and Allman brace placement),
//! skips preprocessor lines and comment blocks, and tracks `struct` blocks
//! as enclosing context.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

use super::scan::{
    body_size, c_param_name, complexity, leading_comments, matching_close, split_lines,
    split_top_level, BlockComments, CommentStyle, ContextTracker,
};
use super::{Language, LanguageExtractor};
use crate::registry::{Function, Visibility};

lazy_static! {
    /// Type words (with pointer stars) followed by a name and `(`.
    static ref DECL_HEAD: Regex =
        Regex::new(r"^\s*((?:[A-Za-z_]\w*[\s\*]+)+)([A-Za-z_]\w*)\s*\(").unwrap();
    static ref STRUCT_RE: Regex =
        Regex::new(r"^\s*(?:typedef\s+)?struct\s+(\w+)\s*\{?\s*$").unwrap();
    static ref PREPROCESSOR_RE: Regex = Regex::new(r"^\s*#\s*\w+").unwrap();
    static ref CALL_RE: Regex = Regex::new(r"\b([A-Za-z_]\w*)\s*\(").unwrap();
    static ref BRANCH_RE: Regex = Regex::new(r"\b(?:if|for|while|case)\b|&&|\|\|").unwrap();

    static ref BUILTINS: HashSet<&'static str> = [
        "printf", "scanf", "fprintf", "fscanf", "sprintf", "snprintf", "sscanf",
        "malloc", "calloc", "realloc", "free",
        "strlen", "strcpy", "strncpy", "strcat", "strncat", "strcmp", "strncmp",
        "memcpy", "memmove", "memset", "memcmp",
        "fopen", "fclose", "fread", "fwrite", "fseek", "ftell", "rewind",
        "getchar", "putchar", "gets", "puts", "fgets", "fputs",
        "atoi", "atof", "atol", "strtol", "strtof", "strtod",
        "abs", "labs", "fabs", "ceil", "floor", "sqrt", "pow", "sin", "cos", "tan",
        "exit", "abort", "atexit", "system", "getenv",
        "assert", "defined",
    ]
    .into_iter()
    .collect();

    static ref KEYWORDS: HashSet<&'static str> = [
        "if", "else", "while", "for", "do", "switch", "case", "default",
        "break", "continue", "return", "goto",
        "sizeof", "typedef", "struct", "union", "enum",
        "static", "extern", "register", "auto", "volatile", "const",
        "signed", "unsigned", "short", "long",
        "int", "char", "float", "double", "void",
    ]
    .into_iter()
    .collect();
}

/// Words that can never start a declaration head.
const STATEMENT_WORDS: &[&str] = &[
    "return", "else", "if", "while", "for", "do", "switch", "case", "goto", "sizeof",
    "typedef", "default",
];

const MODIFIERS: &[&str] = &["static", "extern", "inline", "__inline", "__inline__"];

/// How the declaration line ends after its parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    /// `{` on the same line.
    Body,
    /// `;`: prototype only.
    Semicolon,
    /// Nothing: the body may open on the next line.
    Open,
}

#[derive(Debug)]
struct CDecl<'a> {
    modifiers: Vec<&'a str>,
    return_type: String,
    name: &'a str,
    params: &'a str,
    /// Byte offset of the `(` opening the parameter list.
    open: usize,
    terminator: Terminator,
}

/// Match a single line against the C declaration shape.
fn parse_declaration(line: &str) -> Option<CDecl<'_>> {
    if line.contains('=') && !line.contains('{') {
        return None;
    }

    let caps = DECL_HEAD.captures(line)?;
    let head = caps.get(1)?.as_str();
    let name = caps.get(2)?.as_str();
    if KEYWORDS.contains(name) {
        return None;
    }

    let words: Vec<&str> = head
        .split(|c: char| c.is_whitespace() || c == '*')
        .filter(|w| !w.is_empty())
        .collect();
    if words.iter().any(|w| STATEMENT_WORDS.contains(w)) {
        return None;
    }

    let open = caps.get(0)?.end() - 1;
    let close = matching_close(line, open, b'(', b')')?;
    let tail = line[close + 1..].trim();
    let tail = tail.split("//").next().unwrap_or("").trim();
    let terminator = if tail.starts_with('{') {
        Terminator::Body
    } else if tail.starts_with(';') {
        Terminator::Semicolon
    } else if tail.is_empty() {
        Terminator::Open
    } else {
        return None;
    };

    let modifiers: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| MODIFIERS.contains(w))
        .collect();
    let return_type = head
        .split_whitespace()
        .filter(|w| !MODIFIERS.contains(w))
        .collect::<Vec<_>>()
        .join(" ");

    Some(CDecl {
        modifiers,
        return_type,
        name,
        params: &line[open + 1..close],
        open,
        terminator,
    })
}

fn is_test_name(name: &str) -> bool {
    name.starts_with("test_") || name.ends_with("_test") || name.contains("Test")
}

/// Whether the next non-blank line after `idx` opens a body.
fn body_opens_below(lines: &[&str], idx: usize) -> bool {
    lines[idx + 1..]
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .map(|l| l.starts_with('{'))
        .unwrap_or(false)
}

/// Extractor for `.c` and `.h` files.
#[derive(Debug, Default)]
pub struct CExtractor;

impl CExtractor {
    pub fn new() -> Self {
        Self
    }

    fn build_function(
        &self,
        file: &str,
        lines: &[&str],
        idx: usize,
        decl: CDecl<'_>,
        context: Option<&str>,
    ) -> Function {
        let mut f = Function::new(decl.name, file, idx + 1, Language::C.as_str());
        f.visibility = if decl.modifiers.contains(&"static") {
            Visibility::Private
        } else {
            Visibility::Public
        };
        f.return_type = decl.return_type;
        f.parameters = split_top_level(decl.params)
            .into_iter()
            .filter_map(c_param_name)
            .collect();
        f.signature = lines[idx].trim().to_string();
        f.is_test = is_test_name(decl.name);
        f.is_main = decl.name == "main";
        f.comments = leading_comments(lines, idx, CommentStyle::CLike);

        if decl.terminator == Terminator::Semicolon {
            f.flag("declaration");
        } else {
            f.size = body_size(lines, idx);
            f.complexity = Some(complexity(lines, idx, f.size, &BRANCH_RE));
            f.flag("definition");
        }
        if decl.modifiers.contains(&"extern") {
            f.flag("extern");
        }
        if decl.modifiers.iter().any(|m| m.contains("inline")) {
            f.flag("inline");
        }
        if let Some(ctx) = context {
            f.metadata.insert("struct_context".to_string(), ctx.to_string());
        }
        f
    }
}

impl LanguageExtractor for CExtractor {
    fn language(&self) -> Language {
        Language::C
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["c", "h"]
    }

    fn is_header_file(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some("h")
    }

    fn extract_functions(&self, file: &str, source: &str) -> Vec<Function> {
        let lines = split_lines(source);
        let mut functions = Vec::new();
        let mut comments = BlockComments::new();
        let mut context = ContextTracker::new();

        for (idx, line) in lines.iter().enumerate() {
            if comments.consume(line) || PREPROCESSOR_RE.is_match(line) {
                continue;
            }

            if let Some(caps) = STRUCT_RE.captures(line) {
                context.open(&caps[1]);
            } else if let Some(decl) = parse_declaration(line) {
                if decl.terminator != Terminator::Open || body_opens_below(&lines, idx) {
                    let f = self.build_function(file, &lines, idx, decl, context.current());
                    functions.push(f);
                }
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
        if PREPROCESSOR_RE.is_match(line) {
            return None;
        }
        parse_declaration(line).map(|d| d.open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> Vec<Function> {
        CExtractor::new().extract_functions("test.c", source)
    }

    #[test]
    fn test_simple_definition() {
        let funcs = extract("int helper(void) {\n  return 1;\n}\n");
        assert_eq!(funcs.len(), 1);
        let f = &funcs[0];
        assert_eq!(f.name, "helper");
        assert_eq!(f.visibility, Visibility::Public);
        assert!(f.parameters.is_empty());
        assert_eq!(f.size, 3);
        assert_eq!(f.return_type, "int");
        assert_eq!(f.language, "c");
        assert!(f.has_flag("definition"));
    }

    #[test]
    fn test_static_is_private() {
        let funcs = extract("static inline int clamp(int v, int lo, int hi) {\n  return v;\n}\n");
        assert_eq!(funcs.len(), 1);
        assert_eq!(funcs[0].visibility, Visibility::Private);
        assert_eq!(funcs[0].parameters, vec!["v", "lo", "hi"]);
        assert_eq!(funcs[0].return_type, "int");
        assert!(funcs[0].has_flag("inline"));
    }

    #[test]
    fn test_prototype_is_declaration() {
        let funcs = extract("extern const char *lookup(const char *key, size_t len);\n");
        assert_eq!(funcs.len(), 1);
        let f = &funcs[0];
        assert_eq!(f.name, "lookup");
        assert_eq!(f.size, 1);
        assert_eq!(f.return_type, "const char *");
        assert_eq!(f.parameters, vec!["key", "len"]);
        assert_eq!(f.metadata.get("declaration").map(String::as_str), Some("true"));
        assert!(f.has_flag("extern"));
        assert_eq!(f.complexity, None);
    }

    #[test]
    fn test_allman_braces() {
        let source = "int\nmain(int argc, char **argv)\n{\n  return 0;\n}\n";
        // the return type sits on its own line, so only the name line is a candidate
        assert!(extract(source).is_empty());

        let source = "int main(int argc, char **argv)\n{\n  if (argc > 1) {\n    return 1;\n  }\n  return 0;\n}\n";
        let funcs = extract(source);
        assert_eq!(funcs.len(), 1);
        assert!(funcs[0].is_main);
        assert_eq!(funcs[0].size, 7);
        assert_eq!(funcs[0].parameters, vec!["argc", "argv"]);
        assert_eq!(funcs[0].complexity, Some(2));
    }

    #[test]
    fn test_skips_assignments_and_statements() {
        let source = "void run(void) {\n  int x = compute(1);\n  return finish(x);\n  else_branch(x);\n}\n";
        let funcs = extract(source);
        assert_eq!(funcs.len(), 1);
        assert_eq!(funcs[0].name, "run");
    }

    #[test]
    fn test_preprocessor_only_file() {
        assert!(extract("#include <stdio.h>\n").is_empty());
        assert!(extract("").is_empty());
    }

    #[test]
    fn test_commented_out_code_is_ignored() {
        let source = "/*\nint hidden(void) {\n}\n*/\nint shown(void) {\n}\n";
        let funcs = extract(source);
        assert_eq!(funcs.len(), 1);
        assert_eq!(funcs[0].name, "shown");
        assert_eq!(funcs[0].line, 5);
    }

    #[test]
    fn test_doc_comments() {
        let source = "/* Computes a checksum. */\n// Fast path only.\nunsigned long checksum(const void *buf, int n) {\n  return 0;\n}\n";
        let funcs = extract(source);
        assert_eq!(funcs[0].comments, "Computes a checksum. Fast path only.");
        assert_eq!(funcs[0].return_type, "unsigned long");
    }

    #[test]
    fn test_struct_return_type_and_context() {
        let source = "struct point {\n  int x;\n};\n\nstruct point *make_point(int x, int y) {\n  return 0;\n}\n";
        let funcs = extract(source);
        assert_eq!(funcs.len(), 1);
        assert_eq!(funcs[0].name, "make_point");
        assert_eq!(funcs[0].return_type, "struct point *");
        assert!(!funcs[0].metadata.contains_key("struct_context"));
    }

    #[test]
    fn test_test_and_header_detection() {
        let funcs = extract("void test_parse(void) {}\nvoid parse_test(void) {}\nvoid RunTests(void) {}\nvoid parse(void) {}\n");
        let flags: Vec<bool> = funcs.iter().map(|f| f.is_test).collect();
        assert_eq!(flags, vec![true, true, true, false]);

        let c = CExtractor::new();
        assert!(c.is_header_file(Path::new("include/api.h")));
        assert!(!c.is_header_file(Path::new("src/api.c")));
    }

    #[test]
    fn test_call_sites() {
        let source = "int bar(int x);\nint foo(void) {\n  printf(\"%d\", bar(1));\n  if (bar(2)) { return baz(); }\n  return bar(3); // bar(4)\n}\n";
        let calls = CExtractor::new().find_call_sites(source);
        let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["bar", "baz"]);
        assert_eq!(calls[0].lines, vec![3, 4, 5]);
    }

    #[test]
    fn test_unbalanced_body_stops_at_eof() {
        let funcs = extract("void broken(void) {\n  if (x) {\n  call();\n");
        assert_eq!(funcs.len(), 1);
        assert_eq!(funcs[0].size, 3);
    }
}
