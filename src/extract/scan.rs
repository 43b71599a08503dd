//! Line-scanning helpers shared by the extractor variants.

use std::collections::HashMap;

use regex::Regex;

use super::LanguageExtractor;
use crate::registry::CallSite;

/// Comment conventions recognised when walking back from a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommentStyle {
    /// `//`, `///`, `/* ... */` and `/** ... */`.
    CLike,
    /// `///` doc comments only; `#[...]` attribute lines are skipped over.
    RustDoc,
    /// `//` line comments only.
    Slashes,
    /// `#` line comments.
    Hash,
}

/// Split source text into lines without trailing `\r`.
pub(crate) fn split_lines(source: &str) -> Vec<&str> {
    source.lines().map(|l| l.trim_end_matches('\r')).collect()
}

/// Net `{` minus `}` on a line, ignoring braces inside string literals,
/// `'{'`-style character literals and trailing `//` comments.
pub(crate) fn brace_delta(line: &str) -> (i64, bool) {
    let bytes = line.as_bytes();
    let mut delta = 0i64;
    let mut opened = false;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'/' if bytes.get(i + 1) == Some(&b'/') => break,
            b'\'' if bytes.get(i + 2) == Some(&b'\'') => {
                i += 3;
                continue;
            }
            b'{' => {
                delta += 1;
                opened = true;
            }
            b'}' => delta -= 1,
            _ => {}
        }
        i += 1;
    }

    (delta, opened)
}

/// Number of lines from `start` to the line that closes the body opened on
/// or after it, inclusive.
///
/// The body ends on the first line where the running brace count returns to
/// zero after having gone positive. If it never balances the scan stops at
/// end of input and reports the lines seen so far.
pub(crate) fn body_size(lines: &[&str], start: usize) -> usize {
    if start >= lines.len() {
        return 1;
    }

    let mut depth = 0i64;
    let mut opened = false;

    for (offset, line) in lines[start..].iter().enumerate() {
        let (delta, has_open) = brace_delta(line);
        opened |= has_open;
        depth += delta;
        if opened && depth <= 0 {
            return offset + 1;
        }
    }

    lines.len() - start
}

/// Walk backward from `decl` collecting comment text, most distant first.
///
/// Blank lines are skipped; the walk stops at the first line that is
/// neither blank nor a comment of the given style.
pub(crate) fn leading_comments(lines: &[&str], decl: usize, style: CommentStyle) -> String {
    let mut collected: Vec<String> = Vec::new();
    let mut i = decl;

    while i > 0 {
        i -= 1;
        let t = lines[i].trim();
        if t.is_empty() {
            continue;
        }

        match style {
            CommentStyle::RustDoc => {
                if let Some(rest) = t.strip_prefix("///") {
                    collected.push(rest.trim().to_string());
                } else if t.starts_with("#[") {
                    continue;
                } else {
                    break;
                }
            }
            CommentStyle::Slashes => {
                if let Some(rest) = t.strip_prefix("//") {
                    collected.push(rest.trim_start_matches('/').trim().to_string());
                } else {
                    break;
                }
            }
            CommentStyle::Hash => {
                if let Some(rest) = t.strip_prefix('#') {
                    collected.push(rest.trim().to_string());
                } else {
                    break;
                }
            }
            CommentStyle::CLike => {
                if let Some(rest) = t.strip_prefix("//") {
                    collected.push(rest.trim_start_matches('/').trim().to_string());
                } else if t.ends_with("*/") {
                    let mut block = Vec::new();
                    let mut j = i;
                    loop {
                        let cleaned = clean_block_line(lines[j]);
                        if !cleaned.is_empty() {
                            block.push(cleaned);
                        }
                        if lines[j].contains("/*") || j == 0 {
                            break;
                        }
                        j -= 1;
                    }
                    // block is bottom-up already, matching `collected`
                    collected.extend(block);
                    i = j;
                } else {
                    break;
                }
            }
        }
    }

    collected.reverse();
    collected.retain(|c| !c.is_empty());
    collected.join(" ")
}

fn clean_block_line(line: &str) -> String {
    let mut t = line.trim();
    if let Some(pos) = t.find("/*") {
        t = &t[pos + 2..];
    }
    if let Some(pos) = t.find("*/") {
        t = &t[..pos];
    }
    t.trim().trim_start_matches('*').trim().to_string()
}

/// Byte index of the bracket closing the one at `open`, if balanced.
pub(crate) fn matching_close(text: &str, open: usize, open_ch: u8, close_ch: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&open_ch) {
        return None;
    }
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if b == open_ch {
            depth += 1;
        } else if b == close_ch {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split a parameter list on commas that are not nested inside brackets.
pub(crate) fn split_top_level(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, ch) in params.char_indices() {
        match ch {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth = (depth - 1).max(0),
            ',' if depth == 0 => {
                parts.push(params[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(params[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Name of a C-like parameter: last word, pointer/reference and array
/// decorations removed. Function-pointer parameters yield the name inside
/// `(*name)`.
pub(crate) fn c_param_name(part: &str) -> Option<String> {
    let part = match part.find('=') {
        Some(eq) => part[..eq].trim(),
        None => part.trim(),
    };
    if part.is_empty() || part == "void" {
        return None;
    }
    if part == "..." {
        return Some("...".to_string());
    }

    if let Some(open) = part.find("(*").or_else(|| part.find("(&")) {
        let inner = &part[open + 2..];
        let name: String = inner
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        return if name.is_empty() { None } else { Some(name) };
    }

    let last = part.split_whitespace().last()?;
    let mut name = last.trim_start_matches(['*', '&']);
    if let Some(bracket) = name.find('[') {
        name = &name[..bracket];
    }
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Remove a trailing line comment, leaving markers inside string literals.
pub(crate) fn strip_line_comment<'a>(line: &'a str, marker: &str) -> &'a str {
    let mut search_from = 0;
    while let Some(rel) = line[search_from..].find(marker) {
        let pos = search_from + rel;
        if !is_inside_string_literal(line, pos) {
            return &line[..pos];
        }
        search_from = pos + marker.len();
    }
    line
}

/// Check if a byte position in a line falls within a string literal.
/// Supports double-quoted, single-quoted, and backtick strings with escapes.
pub(crate) fn is_inside_string_literal(line: &str, pos: usize) -> bool {
    let mut in_string = false;
    let mut string_char = None;
    let mut escaped = false;

    for (i, ch) in line.char_indices() {
        if i >= pos {
            return in_string;
        }

        if escaped {
            escaped = false;
            continue;
        }

        if ch == '\\' && in_string {
            escaped = true;
            continue;
        }

        if ch == '"' || ch == '\'' || ch == '`' {
            if !in_string {
                in_string = true;
                string_char = Some(ch);
            } else if Some(ch) == string_char {
                in_string = false;
                string_char = None;
            }
        }
    }

    in_string
}

/// Scan every line for call-like tokens using the extractor's pattern.
///
/// Declaration heads are skipped so that a definition does not count as a
/// call of itself. Names are de-duplicated in first-seen order; each keeps
/// the line of every occurrence.
pub(crate) fn collect_call_sites<E>(source: &str, extractor: &E) -> Vec<CallSite>
where
    E: LanguageExtractor + ?Sized,
{
    let pattern = extractor.call_pattern();
    let marker = extractor.line_comment();
    let mut order: Vec<String> = Vec::new();
    let mut seen: HashMap<String, Vec<usize>> = HashMap::new();

    for (idx, raw) in split_lines(source).into_iter().enumerate() {
        let line = strip_line_comment(raw, marker);
        let body = match extractor.declaration_head(line) {
            Some(offset) if offset <= line.len() => &line[offset..],
            _ => line,
        };

        for name in call_names(pattern, body) {
            if extractor.is_excluded_call(name) {
                continue;
            }
            match seen.get_mut(name) {
                Some(lines) => lines.push(idx + 1),
                None => {
                    order.push(name.to_string());
                    seen.insert(name.to_string(), vec![idx + 1]);
                }
            }
        }
    }

    order
        .into_iter()
        .map(|name| {
            let lines = seen.remove(&name).unwrap_or_default();
            CallSite { name, lines }
        })
        .collect()
}

fn call_names<'a>(pattern: &Regex, text: &'a str) -> Vec<&'a str> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Heuristic cyclomatic score: 1 plus every branching token in the body.
pub(crate) fn complexity(lines: &[&str], start: usize, size: usize, tokens: &Regex) -> usize {
    let end = (start + size).min(lines.len());
    1 + lines[start.min(end)..end]
        .iter()
        .map(|line| tokens.find_iter(line).count())
        .sum::<usize>()
}

/// Indentation width, tabs counting as four columns.
pub(crate) fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for ch in line.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width += 4,
            _ => break,
        }
    }
    width
}

/// Tracks whether scanning is inside a `/* ... */` block.
#[derive(Debug, Default)]
pub(crate) struct BlockComments {
    open: bool,
}

impl BlockComments {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Whether the line is comment-only: inside a block, or starting one.
    pub(crate) fn consume(&mut self, line: &str) -> bool {
        let t = line.trim();
        if self.open {
            if t.contains("*/") {
                self.open = false;
            }
            return true;
        }
        if t.starts_with("/*") {
            self.open = !t.contains("*/");
            return true;
        }
        t.starts_with("//")
    }
}

/// Tracks the enclosing type/impl/trait block by brace depth.
///
/// The context opens on a recognised line and closes once the running
/// depth falls back to where it was before that line, or when another
/// context-opening line replaces it. A context whose block never opens
/// (`struct Foo;`) is dropped at the `;`.
#[derive(Debug, Default)]
pub(crate) struct ContextTracker {
    depth: i64,
    current: Option<OpenContext>,
}

#[derive(Debug)]
struct OpenContext {
    name: String,
    base_depth: i64,
    entered: bool,
}

impl ContextTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The active context name, if any.
    pub(crate) fn current(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.name.as_str())
    }

    /// Replace the context with one opened on the current line.
    pub(crate) fn open(&mut self, name: impl Into<String>) {
        self.current = Some(OpenContext {
            name: name.into(),
            base_depth: self.depth,
            entered: false,
        });
    }

    /// Account for a processed line's braces and close the context once its
    /// block has been left.
    ///
    /// Until its `{` shows up the context stays pending, so headers may run
    /// over several lines (`where` clauses, base lists). A `;` or `}` before
    /// the block opens drops it.
    pub(crate) fn advance(&mut self, line: &str) {
        let (delta, _) = brace_delta(line);
        self.depth += delta;
        if let Some(ctx) = &mut self.current {
            if self.depth > ctx.base_depth {
                ctx.entered = true;
            } else if ctx.entered || ends_before_block(line) {
                self.current = None;
            }
        }
    }
}

fn ends_before_block(line: &str) -> bool {
    let code = strip_line_comment(line, "//").trim();
    code.contains('}') || code.ends_with(';')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brace_delta_ignores_strings_and_comments() {
        assert_eq!(brace_delta("fn f() {"), (1, true));
        assert_eq!(brace_delta(r#"let s = "{{{"; }"#), (-1, false));
        assert_eq!(brace_delta("let c = '{';"), (0, false));
        assert_eq!(brace_delta("x(); // }"), (0, false));
    }

    #[test]
    fn test_body_size_balanced() {
        let lines = vec!["int helper(void) {", "  return 1;", "}"];
        assert_eq!(body_size(&lines, 0), 3);
    }

    #[test]
    fn test_body_size_single_line() {
        let lines = vec!["fn add(a: i32, b: i32) -> i32 { a + b }", ""];
        assert_eq!(body_size(&lines, 0), 1);
    }

    #[test]
    fn test_body_size_allman_brace() {
        let lines = vec!["int main(void)", "{", "  return 0;", "}", "int x;"];
        assert_eq!(body_size(&lines, 0), 4);
    }

    #[test]
    fn test_body_size_unbalanced_stops_at_eof() {
        let lines = vec!["void f() {", "  if (x) {", "  more();"];
        assert_eq!(body_size(&lines, 0), 3);
        assert_eq!(body_size(&lines, 7), 1);
    }

    #[test]
    fn test_leading_comments_c_block() {
        let lines = vec![
            "/**",
            " * Adds numbers.",
            " * Returns the sum.",
            " */",
            "",
            "int add(int a, int b) {",
        ];
        assert_eq!(
            leading_comments(&lines, 5, CommentStyle::CLike),
            "Adds numbers. Returns the sum."
        );
    }

    #[test]
    fn test_leading_comments_order_and_stop() {
        let lines = vec![
            "int x = 1;",
            "// first",
            "// second",
            "void f(void);",
        ];
        assert_eq!(leading_comments(&lines, 3, CommentStyle::CLike), "first second");
    }

    #[test]
    fn test_leading_comments_rust_skips_attributes() {
        let lines = vec!["/// Docs here.", "#[inline]", "pub fn f() {}"];
        assert_eq!(leading_comments(&lines, 2, CommentStyle::RustDoc), "Docs here.");
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level("a: HashMap<String, u32>, f: fn(i32, i32) -> i32"),
            vec!["a: HashMap<String, u32>", "f: fn(i32, i32) -> i32"]
        );
        assert!(split_top_level("   ").is_empty());
    }

    #[test]
    fn test_c_param_name() {
        assert_eq!(c_param_name("const char *name"), Some("name".to_string()));
        assert_eq!(c_param_name("int values[10]"), Some("values".to_string()));
        assert_eq!(c_param_name("void (*cb)(int)"), Some("cb".to_string()));
        assert_eq!(c_param_name("const std::string& s"), Some("s".to_string()));
        assert_eq!(c_param_name("int n = 5"), Some("n".to_string()));
        assert_eq!(c_param_name("void"), None);
    }

    #[test]
    fn test_strip_line_comment_respects_strings() {
        assert_eq!(strip_line_comment("foo(); // bar()", "//"), "foo(); ");
        assert_eq!(
            strip_line_comment(r#"open("http://x"); // c"#, "//"),
            r#"open("http://x"); "#
        );
    }

    #[test]
    fn test_is_inside_string_literal() {
        assert!(!is_inside_string_literal("hello world", 0));
        assert!(is_inside_string_literal(r#""hello world""#, 3));
        assert!(!is_inside_string_literal(r#""hello" world"#, 9));
        assert!(is_inside_string_literal(r#""hello \" world""#, 10));
    }

    #[test]
    fn test_context_tracker_closes_at_depth() {
        let mut ctx = ContextTracker::new();
        ctx.open("Foo");
        ctx.advance("impl Foo {");
        ctx.advance("    fn a() {");
        ctx.advance("    }");
        assert_eq!(ctx.current(), Some("Foo"));
        ctx.advance("}");
        assert_eq!(ctx.current(), None);
    }

    #[test]
    fn test_context_tracker_one_line_block() {
        let mut ctx = ContextTracker::new();
        ctx.open("Empty");
        ctx.advance("struct Empty {}");
        assert_eq!(ctx.current(), None);
    }

    #[test]
    fn test_context_tracker_brace_on_next_line() {
        let mut ctx = ContextTracker::new();
        ctx.open("Point");
        ctx.advance("struct Point");
        ctx.advance("{");
        assert_eq!(ctx.current(), Some("Point"));

        let mut ctx = ContextTracker::new();
        ctx.open("Unit");
        ctx.advance("struct Unit;");
        ctx.advance("fn after() {");
        assert_eq!(ctx.current(), None);
    }

    #[test]
    fn test_context_tracker_multi_line_header() {
        let mut ctx = ContextTracker::new();
        ctx.open("Stack");
        ctx.advance("impl<T> Stack<T>");
        ctx.advance("where");
        ctx.advance("    T: Clone, // bound");
        ctx.advance("");
        assert_eq!(ctx.current(), Some("Stack"));
        ctx.advance("{");
        ctx.advance("    fn push(&mut self) {}");
        assert_eq!(ctx.current(), Some("Stack"));
        ctx.advance("}");
        assert_eq!(ctx.current(), None);

        let mut ctx = ContextTracker::new();
        ctx.open("Widget");
        ctx.advance("class Widget");
        ctx.advance("    : public Base");
        ctx.advance("    , public Other;");
        assert_eq!(ctx.current(), None);
    }

    #[test]
    fn test_block_comments() {
        let mut bc = BlockComments::new();
        assert!(bc.consume("/* start"));
        assert!(bc.consume("int hidden(void) {"));
        assert!(bc.consume("end */"));
        assert!(!bc.consume("int visible(void) {"));
        assert!(bc.consume("// note"));
        assert!(bc.consume("/* one line */"));
        assert!(!bc.consume("x();"));
    }

    #[test]
    fn test_indent_width() {
        assert_eq!(indent_width("    x"), 4);
        assert_eq!(indent_width("\tx"), 4);
        assert_eq!(indent_width("x"), 0);
    }
}
