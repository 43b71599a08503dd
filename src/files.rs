//! Source file selection.
//!
//! Walks each root, prunes well-known build and dependency directories, and
//! keeps files the active extractor accepts.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::Config;
use crate::error::{FuncregError, Result};
use crate::extract::LanguageExtractor;

/// Directories never descended into.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".pytest_cache",
    "target",
    "build",
    "dist",
    "vendor",
];

fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| FuncregError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.kind().to_string(),
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|e| FuncregError::InvalidPattern {
            pattern: patterns.join(", "),
            message: e.to_string(),
        })
}

/// Selects candidate files for one extractor.
pub struct FileSelector<'a> {
    extractor: &'a dyn LanguageExtractor,
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
    recursive: bool,
    depth: usize,
    only_header_files: bool,
}

impl<'a> FileSelector<'a> {
    /// Create a selector with no filters beyond the extractor's extensions.
    pub fn new(extractor: &'a dyn LanguageExtractor) -> Self {
        Self {
            extractor,
            include: None,
            exclude: None,
            recursive: true,
            depth: 0,
            only_header_files: false,
        }
    }

    /// Create a selector from the selection fields of a config.
    pub fn from_config(config: &Config, extractor: &'a dyn LanguageExtractor) -> Result<Self> {
        Ok(Self::new(extractor)
            .include(&config.include)?
            .exclude(&config.exclude)?
            .recursive(config.recursive)
            .depth(config.depth)
            .only_header_files(config.only_header_files))
    }

    pub fn include(mut self, patterns: &[String]) -> Result<Self> {
        self.include = build_globset(patterns)?;
        Ok(self)
    }

    pub fn exclude(mut self, patterns: &[String]) -> Result<Self> {
        self.exclude = build_globset(patterns)?;
        Ok(self)
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Directory levels to descend below each root; 0 is unlimited.
    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn only_header_files(mut self, only: bool) -> Self {
        self.only_header_files = only;
        self
    }

    fn max_depth(&self) -> usize {
        if !self.recursive {
            1
        } else if self.depth > 0 {
            self.depth + 1
        } else {
            usize::MAX
        }
    }

    fn excluded(&self, rel: &Path, name: &str) -> bool {
        match &self.exclude {
            Some(set) => set.is_match(rel) || set.is_match(name),
            None => false,
        }
    }

    fn keep_dir(&self, root: &Path, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        if DEFAULT_EXCLUDED_DIRS.contains(&name.as_ref()) {
            return false;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        !self.excluded(rel, &name)
    }

    /// Whether a single file passes every filter. `root` anchors the
    /// relative path globs are matched against.
    pub fn accepts(&self, root: &Path, path: &Path) -> bool {
        if !self.extractor.accepts(path) {
            return false;
        }
        if self.only_header_files && !self.extractor.is_header_file(path) {
            return false;
        }

        let rel = path.strip_prefix(root).unwrap_or(path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Some(include) = &self.include {
            if !include.is_match(rel) && !include.is_match(path) {
                return false;
            }
        }
        !self.excluded(rel, &name)
    }

    /// Collect matching files under all roots, sorted and de-duplicated.
    ///
    /// Unreadable directory entries are logged and skipped.
    pub fn select(&self, roots: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for root in roots {
            if root.is_file() {
                let anchor = root.parent().unwrap_or(Path::new(""));
                if self.accepts(anchor, root) {
                    files.push(root.clone());
                }
                continue;
            }

            let walker = WalkDir::new(root)
                .follow_links(true)
                .max_depth(self.max_depth())
                .into_iter()
                .filter_entry(|e| self.keep_dir(root, e));

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping unreadable entry");
                        continue;
                    }
                };
                if entry.file_type().is_file() && self.accepts(root, entry.path()) {
                    files.push(entry.into_path());
                }
            }
        }

        files.sort();
        files.dedup();
        files
    }
}
