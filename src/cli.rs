//! Command-line interface for funcreg.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::config::{Config, OutputFormat, DEFAULT_CONFIG_NAMES};
use crate::logging::{self, LogFormat};
use crate::registry::Runner;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 2;

const CONFIG_TEMPLATE: &str = r#"# funcreg configuration
#
# Command-line flags override every value below.

# c, cpp, rust, go, python, or auto for the generic extractor
language: auto

# Roots to scan (default: current directory)
paths: []

# Glob patterns; a file must match one include pattern when any are given
include: []
exclude: []

recursive: true
# Directory levels to descend below each root, 0 = unlimited
depth: 0

# Worker threads (default: number of cores)
# jobs: 4

# text, json, yaml or csv; inferred from output_file when omitted
# format: json
# output_file: registry.md

verbose: false
by_script: false
only_header_files: false
add_relations: false
only_dead_code: false
"#;

/// Build a registry of every function in a source tree.
///
/// Functions are found with fast line-oriented heuristics, not a full
/// parser, for C, C++, Rust, Go and Python, with a generic fallback for
/// everything else. Optionally counts calls between them to spot dead code.
#[derive(Parser)]
#[command(name = "funcreg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log format for diagnostics on stderr
    #[arg(long, value_enum, global = true, default_value = "text")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract functions and write the registry
    #[command(visible_alias = "function-registry")]
    Scan(ScanArgs),
    /// Write a default config file
    Init(InitArgs),
}

/// Arguments for the scan command.
#[derive(Parser, Default)]
pub struct ScanArgs {
    /// Files or directories to scan (default: current directory)
    pub paths: Vec<PathBuf>,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Programming language (c, cpp, rust, go, python, auto)
    #[arg(short, long)]
    pub language: Option<String>,

    /// Include glob pattern (repeatable)
    #[arg(short, long)]
    pub include: Vec<String>,

    /// Exclude glob pattern for files and directories (repeatable)
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// Only scan the top level of each root
    #[arg(long)]
    pub no_recursive: bool,

    /// Maximum directory depth below each root (0 = unlimited)
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Number of worker threads
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Output file (.md, .txt, .yaml, .json or .csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format: text, json, yaml or csv
    #[arg(short, long)]
    pub format: Option<String>,

    /// Group functions by file
    #[arg(long)]
    pub by_script: bool,

    /// For C/C++: only analyze header files
    #[arg(long)]
    pub only_header_files: bool,

    /// Analyze function call relationships
    #[arg(long)]
    pub add_relations: bool,

    /// Show only functions nobody calls (implies --add-relations)
    #[arg(long)]
    pub only_dead_code: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "funcreg.yaml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Assemble the effective config: file (explicit or discovered), then flags.
pub fn build_config(args: &ScanArgs) -> anyhow::Result<Config> {
    let config_path = match &args.config {
        Some(p) => Some(p.clone()),
        None => Config::discover(Path::new(".")),
    };

    let mut config = match &config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if !args.paths.is_empty() {
        config.paths = args.paths.clone();
    }
    if let Some(language) = &args.language {
        config.language = language.clone();
    }
    if !args.include.is_empty() {
        config.include = args.include.clone();
    }
    if !args.exclude.is_empty() {
        config.exclude.extend(args.exclude.iter().cloned());
    }
    if args.no_recursive {
        config.recursive = false;
    }
    if let Some(depth) = args.depth {
        config.depth = depth;
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    if let Some(output) = &args.output {
        config.output_file = Some(output.clone());
    }
    if let Some(format) = &args.format {
        config.format = Some(format.parse::<OutputFormat>()?);
    }
    config.verbose |= args.verbose;
    config.by_script |= args.by_script;
    config.only_header_files |= args.only_header_files;
    config.only_dead_code |= args.only_dead_code;
    config.add_relations |= args.add_relations || config.only_dead_code;

    Ok(config)
}

/// Run the scan command. Logging is installed here, after the config file
/// is merged, so `verbose: true` in the file takes effect.
pub fn run_scan(args: &ScanArgs, log_format: LogFormat) -> anyhow::Result<i32> {
    let config = match build_config(args) {
        Ok(c) => c,
        Err(e) => {
            logging::init(args.verbose, log_format);
            eprintln!("{} {:#}", "Error:".red(), e);
            return Ok(EXIT_ERROR);
        }
    };
    logging::init(config.verbose, log_format);
    tracing::debug!(
        language = %config.language,
        jobs = config.jobs,
        relations = config.add_relations,
        "effective config"
    );

    let format = config.output_format();
    let output = config.output_file.clone();
    let show_progress = !args.no_progress && std::io::stderr().is_terminal();

    let registry = match Runner::new(config).show_progress(show_progress).run() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            return Ok(EXIT_ERROR);
        }
    };

    if registry.summary.total_files == 0 {
        eprintln!("{} no files found matching criteria", "Warning:".yellow());
        return Ok(EXIT_SUCCESS);
    }

    if let Err(e) = report::write_output(&registry, format, output.as_deref()) {
        eprintln!("{} {}", "Error:".red(), e);
        return Ok(EXIT_ERROR);
    }

    report::write_status(&registry, output.as_deref());
    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() && !args.force {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Use --force to overwrite it");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    std::fs::write(&args.output, CONFIG_TEMPLATE)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to match your project", args.output.display());
    if DEFAULT_CONFIG_NAMES.iter().any(|n| args.output == Path::new(n)) {
        println!("  2. Run: funcreg scan");
    } else {
        println!("  2. Run: funcreg scan --config {}", args.output.display());
    }

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_config_file() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("cfg.yaml");
        std::fs::write(
            &config_path,
            "language: go\njobs: 8\nexclude: [\"gen\"]\nformat: yaml\n",
        )
        .unwrap();

        let args = ScanArgs {
            config: Some(config_path),
            language: Some("rust".to_string()),
            exclude: vec!["tmp".to_string()],
            jobs: Some(2),
            only_dead_code: true,
            ..Default::default()
        };
        let config = build_config(&args).unwrap();
        assert_eq!(config.language, "rust");
        assert_eq!(config.jobs, 2);
        assert_eq!(config.exclude, vec!["gen", "tmp"]);
        assert_eq!(config.output_format(), OutputFormat::Yaml);
        assert!(config.add_relations);
    }

    #[test]
    fn test_verbose_from_config_file() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("cfg.yaml");
        std::fs::write(&config_path, "verbose: true\n").unwrap();

        let args = ScanArgs {
            config: Some(config_path),
            ..Default::default()
        };
        assert!(!args.verbose);
        assert!(build_config(&args).unwrap().verbose);
    }

    #[test]
    fn test_scan_writes_report_with_file_verbosity() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.c"), "int one(void) {\n  return 1;\n}\n").unwrap();
        let config_path = temp.path().join("cfg.yaml");
        std::fs::write(&config_path, "verbose: true\nlanguage: c\n").unwrap();
        let output = temp.path().join("out.json");

        let args = ScanArgs {
            paths: vec![temp.path().to_path_buf()],
            config: Some(config_path),
            output: Some(output.clone()),
            no_progress: true,
            ..Default::default()
        };
        assert_eq!(run_scan(&args, LogFormat::Text).unwrap(), EXIT_SUCCESS);
        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.contains("\"one\""));
    }

    #[test]
    fn test_bad_format_flag() {
        let args = ScanArgs {
            config: Some(PathBuf::from("/nonexistent/funcreg.yaml")),
            ..Default::default()
        };
        assert!(build_config(&args).is_err());

        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("cfg.yaml");
        std::fs::write(&config_path, "{}\n").unwrap();
        let args = ScanArgs {
            config: Some(config_path),
            format: Some("xml".to_string()),
            ..Default::default()
        };
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("conf/funcreg.yaml");
        let args = InitArgs {
            output: output.clone(),
            force: false,
        };
        assert_eq!(run_init(&args).unwrap(), EXIT_SUCCESS);
        let config = Config::load(&output).unwrap();
        assert_eq!(config.language, "auto");
        assert!(config.validate().is_ok());

        assert_eq!(run_init(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "funcreg",
            "scan",
            "src",
            "-l",
            "c",
            "--add-relations",
            "-o",
            "out.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.paths, vec![PathBuf::from("src")]);
                assert_eq!(args.language.as_deref(), Some("c"));
                assert!(args.add_relations);
            }
            Commands::Init(_) => panic!("expected scan"),
        }
    }
}
