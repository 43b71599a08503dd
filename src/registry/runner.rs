//! Registry runner that orchestrates one run.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{FuncregError, Result};
use crate::extract::{extractor_for, LanguageExtractor};
use crate::files::FileSelector;

use super::aggregate::Aggregator;
use super::callgraph::CallGraph;
use super::dispatch::{dispatch, Progress};
use super::types::{FileExtraction, Registry};

/// A selected file and the label recorded on its functions.
struct SourceFile {
    path: PathBuf,
    label: String,
}

impl SourceFile {
    fn new(path: &Path) -> Self {
        let label = path
            .strip_prefix(".")
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();
        Self {
            path: path.to_path_buf(),
            label,
        }
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Executes selection, extraction, aggregation and the optional call graph.
pub struct Runner {
    config: Config,
    show_progress: bool,
}

impl Runner {
    /// Create a runner for a config. Nothing is validated until `run`.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            show_progress: false,
        }
    }

    /// Draw a progress bar while files are extracted.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validate the config, select files and build the registry.
    ///
    /// Configuration problems fail before any file is read. Unreadable
    /// files are logged and skipped.
    pub fn run(&self) -> Result<Registry> {
        let language = self.config.validate()?;
        let extractor = extractor_for(language);
        tracing::info!(language = %language, "starting function registry generation");

        let files = FileSelector::from_config(&self.config, extractor)?.select(&self.config.roots());
        if files.is_empty() {
            tracing::warn!("no files found matching criteria");
            return Ok(Aggregator::new().finish(Vec::new(), 0, self.config.add_relations));
        }
        tracing::info!(files = files.len(), "found files to analyze");

        self.run_files(extractor, &files)
    }

    /// Build the registry from an already selected file list.
    pub fn run_files(
        &self,
        extractor: &dyn LanguageExtractor,
        files: &[PathBuf],
    ) -> Result<Registry> {
        let sources: Vec<SourceFile> = files.iter().map(|p| SourceFile::new(p)).collect();
        let with_calls = self.config.add_relations;

        let progress = if self.show_progress {
            Progress::with_bar(sources.len(), "Analyzing functions")
        } else {
            Progress::hidden()
        };

        let slots = dispatch(&sources, self.config.jobs, &progress, |source| {
            let bytes = fs::read(&source.path).map_err(|e| FuncregError::io(&source.path, e))?;
            let text = String::from_utf8_lossy(&bytes);
            Ok::<_, FuncregError>(if with_calls {
                extractor.extract(&source.label, &text)
            } else {
                FileExtraction {
                    functions: extractor.extract_functions(&source.label, &text),
                    call_sites: Vec::new(),
                }
            })
        })?;
        progress.finish();

        let skipped = slots.iter().filter(|s| s.is_none()).count();
        if skipped > 0 {
            tracing::warn!(skipped, "some files could not be read");
        }

        let aggregator = Aggregator::new()
            .by_script(self.config.by_script)
            .only_dead_code(self.config.only_dead_code);

        let labels: Vec<String> = sources.into_iter().map(|s| s.label).collect();
        let (mut functions, sites) = aggregator.merge(&labels, slots);
        tracing::debug!(functions = functions.len(), "extraction finished");

        if with_calls {
            tracing::info!("analyzing function call relationships");
            CallGraph::new(&functions).apply(&mut functions, &sites);
        }

        Ok(aggregator.finish(functions, files.len(), with_calls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_for(root: &Path, language: &str) -> Config {
        Config {
            language: language.to_string(),
            paths: vec![root.to_path_buf()],
            jobs: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_runner_basic() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("lib.rs"),
            "pub fn add(a: i32, b: i32) -> i32 { a + b }\nfn helper() {}\n",
        )
        .unwrap();

        let registry = Runner::new(config_for(temp.path(), "rust")).run().unwrap();
        assert_eq!(registry.functions.len(), 2);
        assert_eq!(registry.summary.public_functions, 1);
        assert_eq!(registry.summary.private_functions, 1);
        assert_eq!(registry.summary.total_files, 1);
        assert!(!registry.relations);
    }

    #[test]
    fn test_runner_with_relations() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.c"), "int bar(void) {\n  return 1;\n}\n").unwrap();
        std::fs::write(
            temp.path().join("b.c"),
            "int main(void) {\n  bar();\n  bar();\n  return bar();\n}\n",
        )
        .unwrap();

        let mut config = config_for(temp.path(), "c");
        config.add_relations = true;
        let registry = Runner::new(config).run().unwrap();

        let bar = registry.functions.iter().find(|f| f.name == "bar").unwrap();
        assert_eq!(bar.call_count, 3);
        assert_eq!(bar.called_by, vec!["main"]);
        assert_eq!(registry.summary.dead_functions, 1);
    }

    #[test]
    fn test_unreadable_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good.go");
        std::fs::write(&good, "package x\n\nfunc Good() {}\n").unwrap();
        let missing = temp.path().join("missing.go");

        let runner = Runner::new(config_for(temp.path(), "go"));
        let registry = runner
            .run_files(extractor_for(crate::extract::Language::Go), &[good, missing])
            .unwrap();
        assert_eq!(registry.functions.len(), 1);
        assert_eq!(registry.summary.total_files, 2);
    }

    #[test]
    fn test_bad_language_fails_before_scanning() {
        let temp = TempDir::new().unwrap();
        let err = Runner::new(config_for(temp.path(), "")).run().unwrap_err();
        assert!(matches!(err, FuncregError::UnsupportedLanguage(_)));
    }

    #[test]
    fn test_empty_tree() {
        let temp = TempDir::new().unwrap();
        let registry = Runner::new(config_for(temp.path(), "python")).run().unwrap();
        assert!(registry.functions.is_empty());
        assert_eq!(registry.summary, Default::default());
    }
}
