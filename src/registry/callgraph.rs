//! Name-based call graph.
//!
//! Call sites are resolved by unqualified name only, with no notion of scope
//! or type. Every function sharing a base name receives each increment, so
//! overloaded or same-named methods over-count.

use std::collections::{BTreeSet, HashMap};

use super::types::{base_name, CallSite, Function};

/// Index from base name and from file to positions in a function list.
pub struct CallGraph {
    by_name: HashMap<String, Vec<usize>>,
    /// Per file, function positions ordered by start line.
    by_file: HashMap<String, Vec<usize>>,
}

impl CallGraph {
    /// Build the lookup index once for the whole registry.
    pub fn new(functions: &[Function]) -> Self {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_file: HashMap<String, Vec<usize>> = HashMap::new();

        for (i, f) in functions.iter().enumerate() {
            by_name.entry(f.base_name().to_string()).or_default().push(i);
            by_file.entry(f.file.clone()).or_default().push(i);
        }
        for positions in by_file.values_mut() {
            positions.sort_by_key(|&i| functions[i].line);
        }

        Self { by_name, by_file }
    }

    /// Functions a call of `name` resolves to.
    pub fn resolve(&self, name: &str) -> &[usize] {
        self.by_name
            .get(base_name(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The innermost function in `file` whose span covers `line`.
    pub fn enclosing(&self, functions: &[Function], file: &str, line: usize) -> Option<usize> {
        self.by_file.get(file)?.iter().copied().fold(None, |best, i| {
            let f = &functions[i];
            if !f.contains_line(line) {
                return best;
            }
            match best {
                Some(b) if functions[b].size <= f.size => Some(b),
                _ => Some(i),
            }
        })
    }

    /// Apply every file's call sites to `functions`.
    ///
    /// `call_count` grows by one per occurrence. `calls` and `called_by` get
    /// the qualified names of both ends whenever the occurrence lies inside
    /// a known function; both lists end up sorted and unique.
    pub fn apply(&self, functions: &mut [Function], sites: &[(String, Vec<CallSite>)]) {
        let mut counts = vec![0usize; functions.len()];
        let mut calls: Vec<BTreeSet<String>> = vec![BTreeSet::new(); functions.len()];
        let mut callers: Vec<BTreeSet<String>> = vec![BTreeSet::new(); functions.len()];

        for (file, file_sites) in sites {
            for site in file_sites {
                let targets = self.resolve(&site.name);
                if targets.is_empty() {
                    continue;
                }
                for &line in &site.lines {
                    let caller = self.enclosing(functions, file, line);
                    for &target in targets {
                        counts[target] += 1;
                        if let Some(c) = caller {
                            calls[c].insert(functions[target].name.clone());
                            callers[target].insert(functions[c].name.clone());
                        }
                    }
                }
            }
        }

        for (i, f) in functions.iter_mut().enumerate() {
            f.call_count += counts[i];
            calls[i].extend(f.calls.drain(..));
            callers[i].extend(f.called_by.drain(..));
            f.calls = std::mem::take(&mut calls[i]).into_iter().collect();
            f.called_by = std::mem::take(&mut callers[i]).into_iter().collect();
        }

        tracing::debug!(
            resolved = counts.iter().sum::<usize>(),
            "call graph applied"
        );
    }
}
