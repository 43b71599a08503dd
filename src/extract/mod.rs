//! Heuristic, line-oriented function extraction.
//!
//! Each language variant implements [`LanguageExtractor`]: ordered regular
//! expressions recognise declaration lines, brace-depth tracking finds body
//! boundaries, and a per-language call pattern yields call sites. Nothing
//! here builds a syntax tree, so a real parser can replace any variant
//! without touching the dispatcher or the aggregator.
//!
//! # Adding a New Language
//!
//! 1. Create a module next to `c.rs` and implement `LanguageExtractor`
//! 2. Add a `Language` variant and map its tags in `Language::resolve`
//! 3. Register a static instance in `extractor_for`

mod c;
mod cpp;
mod generic;
mod go;
mod python;
mod rust_lang;
pub(crate) mod scan;

pub use c::CExtractor;
pub use cpp::CppExtractor;
pub use generic::GenericExtractor;
pub use go::GoExtractor;
pub use python::PythonExtractor;
pub use rust_lang::RustExtractor;

use once_cell::sync::OnceCell;
use regex::Regex;
use std::path::Path;

use crate::error::{FuncregError, Result};
use crate::registry::{CallSite, FileExtraction, Function};

/// Extractor variant tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    C,
    Cpp,
    Rust,
    Go,
    Python,
    Generic,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Python => "python",
            Language::Generic => "generic",
        }
    }

    /// Resolve a user-supplied language tag.
    ///
    /// Known tags select a dedicated variant. Other well-formed tags fall back
    /// to the generic variant. Empty or malformed tags are rejected.
    pub fn resolve(tag: &str) -> Result<Self> {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty()
            || !tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '_' | '-'))
        {
            return Err(FuncregError::UnsupportedLanguage(tag));
        }

        let language = match tag.as_str() {
            "c" => Language::C,
            "cpp" | "c++" | "cxx" => Language::Cpp,
            "rust" | "rs" => Language::Rust,
            "go" | "golang" => Language::Go,
            "python" | "py" => Language::Python,
            "generic" | "auto" => Language::Generic,
            other => {
                tracing::warn!(language = %other, "no dedicated extractor, using generic fallback");
                Language::Generic
            }
        };
        Ok(language)
    }

    /// Map a file extension (without dot) to the language it is written in.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "c" | "h" => Some(Language::C),
            "cpp" | "cxx" | "cc" | "hpp" | "hxx" | "hh" | "h++" | "c++" => Some(Language::Cpp),
            "rs" => Some(Language::Rust),
            "go" => Some(Language::Go),
            "py" => Some(Language::Python),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Language-specific extraction contract.
///
/// Implementations are stateless and shared across worker threads; all
/// per-file state lives on the stack of `extract_functions`.
pub trait LanguageExtractor: Send + Sync {
    /// The variant tag recorded on every produced `Function`.
    fn language(&self) -> Language;

    /// File extensions this extractor accepts (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Whether the file is header-like (used by `only_header_files`).
    fn is_header_file(&self, _path: &Path) -> bool {
        false
    }

    /// Parse one file's text into function records.
    fn extract_functions(&self, file: &str, source: &str) -> Vec<Function>;

    /// Pattern whose first capture group is a called identifier.
    fn call_pattern(&self) -> &Regex;

    /// Builtins and keywords that never count as call sites.
    fn is_excluded_call(&self, name: &str) -> bool;

    /// For a declaration line, the byte offset where its parameter list
    /// starts. Text before it is the declaration head and is not scanned
    /// for call sites.
    fn declaration_head(&self, line: &str) -> Option<usize>;

    /// Line comment marker; call sites after it are ignored.
    fn line_comment(&self) -> &'static str {
        "//"
    }

    /// Whether this extractor handles the given file.
    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.file_extensions().contains(&ext))
            .unwrap_or(false)
    }

    /// Collect call-like identifiers, de-duplicated by name, with the line
    /// of every occurrence.
    fn find_call_sites(&self, source: &str) -> Vec<CallSite> {
        scan::collect_call_sites(source, self)
    }

    /// Run both passes over one file.
    fn extract(&self, file: &str, source: &str) -> FileExtraction {
        FileExtraction {
            functions: self.extract_functions(file, source),
            call_sites: self.find_call_sites(source),
        }
    }
}

static C_EXTRACTOR: OnceCell<CExtractor> = OnceCell::new();
static CPP_EXTRACTOR: OnceCell<CppExtractor> = OnceCell::new();
static RUST_EXTRACTOR: OnceCell<RustExtractor> = OnceCell::new();
static GO_EXTRACTOR: OnceCell<GoExtractor> = OnceCell::new();
static PYTHON_EXTRACTOR: OnceCell<PythonExtractor> = OnceCell::new();
static GENERIC_EXTRACTOR: OnceCell<GenericExtractor> = OnceCell::new();

/// Get the shared extractor for a language.
pub fn extractor_for(language: Language) -> &'static dyn LanguageExtractor {
    match language {
        Language::C => C_EXTRACTOR.get_or_init(CExtractor::new),
        Language::Cpp => CPP_EXTRACTOR.get_or_init(CppExtractor::new),
        Language::Rust => RUST_EXTRACTOR.get_or_init(RustExtractor::new),
        Language::Go => GO_EXTRACTOR.get_or_init(GoExtractor::new),
        Language::Python => PYTHON_EXTRACTOR.get_or_init(PythonExtractor::new),
        Language::Generic => GENERIC_EXTRACTOR.get_or_init(GenericExtractor::new),
    }
}

/// Resolve a tag and return its extractor in one step.
pub fn extractor_for_tag(tag: &str) -> Result<&'static dyn LanguageExtractor> {
    Language::resolve(tag).map(extractor_for)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_tags() {
        assert_eq!(Language::resolve("rust").unwrap(), Language::Rust);
        assert_eq!(Language::resolve("C++").unwrap(), Language::Cpp);
        assert_eq!(Language::resolve(" py ").unwrap(), Language::Python);
        assert_eq!(Language::resolve("golang").unwrap(), Language::Go);
        assert_eq!(Language::resolve("auto").unwrap(), Language::Generic);
    }

    #[test]
    fn test_unknown_tag_falls_back_to_generic() {
        assert_eq!(Language::resolve("java").unwrap(), Language::Generic);
        assert_eq!(Language::resolve("c#").unwrap(), Language::Generic);
    }

    #[test]
    fn test_malformed_tag_is_rejected() {
        assert!(matches!(
            Language::resolve(""),
            Err(FuncregError::UnsupportedLanguage(_))
        ));
        assert!(Language::resolve("rust; rm -rf").is_err());
        assert!(Language::resolve("../c").is_err());
    }

    #[test]
    fn test_extractor_registry() {
        for lang in [
            Language::C,
            Language::Cpp,
            Language::Rust,
            Language::Go,
            Language::Python,
            Language::Generic,
        ] {
            assert_eq!(extractor_for(lang).language(), lang);
        }
    }

    #[test]
    fn test_accepts_by_extension() {
        let c = extractor_for(Language::C);
        assert!(c.accepts(Path::new("src/main.c")));
        assert!(c.accepts(Path::new("include/api.h")));
        assert!(!c.accepts(Path::new("main.rs")));
        assert!(!c.accepts(Path::new("Makefile")));
    }
}
