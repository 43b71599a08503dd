//! Run configuration.
//!
//! A config is assembled from an optional YAML file and then overridden by
//! command-line flags. Validation happens once, before any file is touched.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FuncregError, Result};
use crate::extract::Language;

/// Config file names searched for in the working directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["funcreg.yaml", ".funcreg.yaml"];

/// Output encoding for the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
    Csv,
}

impl OutputFormat {
    /// Infer the format from an output file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => OutputFormat::Json,
            Some("yaml") | Some("yml") => OutputFormat::Yaml,
            Some("csv") => OutputFormat::Csv,
            _ => OutputFormat::Text,
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = FuncregError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "md" | "markdown" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(FuncregError::InvalidConfig(format!(
                "unknown format {:?}, must be one of text, json, yaml, csv",
                other
            ))),
        }
    }
}

fn default_language() -> String {
    "auto".to_string()
}

fn default_true() -> bool {
    true
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Everything one registry run needs to know.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Language tag selecting the extractor variant.
    #[serde(default = "default_language")]
    pub language: String,
    /// Roots to scan; the working directory when empty.
    pub paths: Vec<PathBuf>,
    /// Glob patterns a file must match (any of) to be selected.
    pub include: Vec<String>,
    /// Glob patterns excluding files and directories.
    pub exclude: Vec<String>,
    #[serde(default = "default_true")]
    pub recursive: bool,
    /// Directory levels below each root to descend into. 0 means unlimited.
    pub depth: usize,
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    pub verbose: bool,
    pub output_file: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub by_script: bool,
    pub only_header_files: bool,
    pub add_relations: bool,
    pub only_dead_code: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: default_language(),
            paths: Vec::new(),
            include: Vec::new(),
            exclude: Vec::new(),
            recursive: true,
            depth: 0,
            jobs: default_jobs(),
            verbose: false,
            output_file: None,
            format: None,
            by_script: false,
            only_header_files: false,
            add_relations: false,
            only_dead_code: false,
        }
    }
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path.display(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("parsing config {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Look for a default config file in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.is_file())
    }

    /// The roots to scan, defaulting to the current directory.
    pub fn roots(&self) -> Vec<PathBuf> {
        if self.paths.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.paths.clone()
        }
    }

    /// The explicit format, or the one implied by the output file.
    pub fn output_format(&self) -> OutputFormat {
        match (self.format, &self.output_file) {
            (Some(format), _) => format,
            (None, Some(path)) => OutputFormat::from_path(path),
            (None, None) => OutputFormat::Text,
        }
    }

    /// Check everything that can be checked before scanning starts.
    pub fn validate(&self) -> Result<Language> {
        if self.jobs == 0 {
            return Err(FuncregError::InvalidConfig(
                "jobs must be at least 1".to_string(),
            ));
        }

        let language = Language::resolve(&self.language)?;

        for pattern in self.include.iter().chain(&self.exclude) {
            globset::Glob::new(pattern).map_err(|e| FuncregError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.kind().to_string(),
            })?;
        }

        if self.only_dead_code && !self.add_relations {
            tracing::warn!("only_dead_code without add_relations keeps every function");
        }

        Ok(language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
language: rust
include:
  - "src/**/*.rs"
jobs: 3
add_relations: true
format: json
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.language, "rust");
        assert_eq!(config.include, vec!["src/**/*.rs"]);
        assert_eq!(config.jobs, 3);
        assert!(config.add_relations);
        assert!(config.recursive);
        assert_eq!(config.output_format(), OutputFormat::Json);
        assert_eq!(config.validate().unwrap(), Language::Rust);
    }

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.language, "auto");
        assert!(config.jobs >= 1);
        assert_eq!(config.depth, 0);
        assert_eq!(config.roots(), vec![PathBuf::from(".")]);
        assert_eq!(config.output_format(), OutputFormat::Text);
    }

    #[test]
    fn test_format_from_output_file() {
        let config = Config {
            output_file: Some(PathBuf::from("out/registry.yml")),
            ..Default::default()
        };
        assert_eq!(config.output_format(), OutputFormat::Yaml);
        assert_eq!(OutputFormat::from_path(Path::new("r.csv")), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_path(Path::new("r.md")), OutputFormat::Text);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_jobs = Config {
            jobs: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero_jobs.validate(),
            Err(FuncregError::InvalidConfig(_))
        ));

        let bad_language = Config {
            language: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            bad_language.validate(),
            Err(FuncregError::UnsupportedLanguage(_))
        ));

        let bad_glob = Config {
            exclude: vec!["src/[".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            bad_glob.validate(),
            Err(FuncregError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_discover() {
        let temp = TempDir::new().unwrap();
        assert!(Config::discover(temp.path()).is_none());
        fs::write(temp.path().join(".funcreg.yaml"), "language: go\n").unwrap();
        let found = Config::discover(temp.path()).unwrap();
        assert_eq!(Config::load(found).unwrap().language, "go");
    }
}
