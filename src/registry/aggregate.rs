//! Merging per-file results into a registry.

use std::collections::BTreeMap;

use super::types::{CallSite, FileExtraction, Function, Registry, Summary};

/// Per-file call sites keyed by the file label used on `Function::file`.
pub type FileCallSites = Vec<(String, Vec<CallSite>)>;

/// Collects extraction slots and shapes the final registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct Aggregator {
    by_script: bool,
    only_dead_code: bool,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also group functions by file.
    pub fn by_script(mut self, by_script: bool) -> Self {
        self.by_script = by_script;
        self
    }

    /// Drop every function that has at least one resolved call.
    pub fn only_dead_code(mut self, only: bool) -> Self {
        self.only_dead_code = only;
        self
    }

    /// Flatten position-stable slots into one function list in file-then-line
    /// order, plus the call sites of every file that produced a result.
    ///
    /// Empty slots (unreadable files) contribute nothing.
    pub fn merge(
        &self,
        labels: &[String],
        slots: Vec<Option<FileExtraction>>,
    ) -> (Vec<Function>, FileCallSites) {
        let mut functions = Vec::new();
        let mut sites = Vec::new();

        for (label, slot) in labels.iter().zip(slots) {
            let Some(extraction) = slot else {
                continue;
            };
            functions.extend(extraction.functions);
            if !extraction.call_sites.is_empty() {
                sites.push((label.clone(), extraction.call_sites));
            }
        }

        sort_functions(&mut functions);
        (functions, sites)
    }

    /// Apply the dead-code filter, group if requested, and compute the
    /// summary over what remains.
    pub fn finish(&self, mut functions: Vec<Function>, total_files: usize, relations: bool) -> Registry {
        if self.only_dead_code {
            functions.retain(Function::is_dead);
        }
        sort_functions(&mut functions);

        let scripts = if self.by_script {
            let mut grouped: BTreeMap<String, Vec<Function>> = BTreeMap::new();
            for f in &functions {
                grouped.entry(f.file.clone()).or_default().push(f.clone());
            }
            Some(grouped)
        } else {
            None
        };

        let summary = Summary::from_functions(&functions, total_files);

        Registry {
            functions,
            scripts,
            summary,
            relations,
        }
    }
}

/// Stable sort by file, then line; same-line records keep extraction order.
pub fn sort_functions(functions: &mut [Function]) {
    functions.sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));
}
