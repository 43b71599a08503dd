//! Funcreg - heuristic function registry for multi-language source trees.
//!
//! Funcreg walks a source tree, extracts every function-like declaration
//! with line-oriented regular expressions and brace-depth tracking, and
//! optionally builds a name-based call graph to surface functions that are
//! never called.
//!
//! # Architecture
//!
//! - `extract`: `LanguageExtractor` trait and the C, C++, Rust, Go, Python
//!   and generic variants
//! - `files`: source file selection
//! - `registry`: data model, parallel dispatch, aggregation, call graph and
//!   the `Runner` that ties them together
//! - `config`: run configuration and YAML config files
//! - `report`: output formatting (text, JSON, YAML, CSV)
//! - `logging`: `tracing` subscriber setup
//!
//! # Adding a New Language
//!
//! See `src/extract/mod.rs`. Implement `LanguageExtractor` and register it
//! in `extractor_for`.

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod files;
pub mod logging;
pub mod registry;
pub mod report;

pub use config::{Config, OutputFormat};
pub use error::{FuncregError, Result};
pub use extract::{extractor_for, extractor_for_tag, Language, LanguageExtractor};
pub use files::FileSelector;
pub use registry::{CallSite, Function, Registry, Runner, Summary, Visibility};
