//! Core types for the function registry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Visibility of a discovered function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            _ => Err(format!("unknown visibility: {}", s)),
        }
    }
}

/// One discovered function-like declaration.
///
/// Records are created once by an extractor and afterwards only mutated by
/// the call-graph builder (`call_count`, `calls`, `called_by`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Name qualified with its enclosing context (`Type::method`, `Recv.method`).
    pub name: String,
    pub file: String,
    /// 1-based line of the declaring statement.
    pub line: usize,
    pub visibility: Visibility,
    pub return_type: String,
    /// Parameter names only; types are dropped.
    pub parameters: Vec<String>,
    pub language: String,
    /// Number of call sites resolved to this function by name.
    pub call_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub called_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comments: String,
    /// The matched declaration line, trimmed.
    pub signature: String,
    pub is_test: bool,
    pub is_main: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<usize>,
    /// Lines spanned by the body, declaration line included. Always >= 1.
    pub size: usize,
    /// Variant-specific flags (`async`, `unsafe`, `declaration`, context names, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Function {
    /// Create a function record with neutral defaults.
    pub fn new(
        name: impl Into<String>,
        file: impl Into<String>,
        line: usize,
        language: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            line: line.max(1),
            visibility: Visibility::Public,
            return_type: String::new(),
            parameters: Vec::new(),
            language: language.into(),
            call_count: 0,
            called_by: Vec::new(),
            calls: Vec::new(),
            comments: String::new(),
            signature: String::new(),
            is_test: false,
            is_main: false,
            complexity: None,
            size: 1,
            metadata: BTreeMap::new(),
        }
    }

    /// The unqualified name: the last `::` or `.` separated segment.
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }

    /// Last line (inclusive) covered by this function.
    pub fn end_line(&self) -> usize {
        self.line + self.size.max(1) - 1
    }

    /// Whether `line` falls inside this function's span.
    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.line && line <= self.end_line()
    }

    /// Set a metadata flag to `"true"`.
    pub fn flag(&mut self, key: &str) {
        self.metadata.insert(key.to_string(), "true".to_string());
    }

    /// Check whether a metadata flag is set to `"true"`.
    pub fn has_flag(&self, key: &str) -> bool {
        self.metadata.get(key).map(|v| v == "true").unwrap_or(false)
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    /// A function nobody calls. Only meaningful after relations were built.
    pub fn is_dead(&self) -> bool {
        self.call_count == 0
    }
}

/// Strip context qualifiers from a name (`ns::Foo::bar` -> `bar`, `T.m` -> `m`).
pub fn base_name(name: &str) -> &str {
    let after_colons = name.rsplit("::").next().unwrap_or(name);
    after_colons.rsplit('.').next().unwrap_or(after_colons)
}

/// A call-like identifier found in one file, with every line it occurs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub name: String,
    /// 1-based lines, one entry per occurrence, in source order.
    pub lines: Vec<usize>,
}

/// Everything an extractor produces for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileExtraction {
    pub functions: Vec<Function>,
    pub call_sites: Vec<CallSite>,
}

/// Aggregate counters over the emitted functions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_functions: usize,
    pub total_files: usize,
    pub public_functions: usize,
    pub private_functions: usize,
    /// Functions with `call_count == 0`. Every function reads as dead when
    /// relations were not built.
    pub dead_functions: usize,
    pub test_functions: usize,
}

impl Summary {
    /// Compute the summary in a single pass.
    pub fn from_functions(functions: &[Function], total_files: usize) -> Self {
        let mut summary = Summary {
            total_functions: functions.len(),
            total_files,
            ..Default::default()
        };

        for f in functions {
            match f.visibility {
                Visibility::Public => summary.public_functions += 1,
                Visibility::Private => summary.private_functions += 1,
            }
            if f.is_dead() {
                summary.dead_functions += 1;
            }
            if f.is_test {
                summary.test_functions += 1;
            }
        }

        summary
    }
}

/// The result of one registry run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    /// Functions in file-then-line order.
    pub functions: Vec<Function>,
    /// Functions grouped by file (only when grouping was requested).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<BTreeMap<String, Vec<Function>>>,
    pub summary: Summary,
    /// Whether the call-graph phase ran; dead counts are meaningless otherwise.
    #[serde(default)]
    pub relations: bool,
}

impl Registry {
    /// Look up functions by exact (qualified) name.
    pub fn find(&self, name: &str) -> Vec<&Function> {
        self.functions.iter().filter(|f| f.name == name).collect()
    }
}
