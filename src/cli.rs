use std::path::{Path, PathBuf};

use clap::Parser;

use crate::error::{BlueprintError, Result};
use crate::output::OutputMode;

pub const DEFAULT_SPEC_PATH: &str = "./.blueprint";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Blueprint file to run, defaults to ./.blueprint
    pub paths: Vec<String>,

    /// Only run these task IDs, in file order (comma separated)
    #[arg(long = "tasks", value_delimiter = ',')]
    pub tasks: Vec<String>,

    /// Start running from this task ID
    #[arg(long = "from")]
    pub from: Option<String>,

    /// Stop running after this task ID
    #[arg(long = "to")]
    pub to: Option<String>,

    /// Override the blueprint's default timeout (e.g., "5m", "30s", "1h30m")
    #[arg(short = 't', long = "timeout")]
    pub timeout: Option<String>,

    /// Show what would be executed without running tasks
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Print the loaded tasks and exit
    #[arg(long = "list")]
    pub list: bool,

    /// How to display task output in the terminal
    #[arg(long = "output", value_enum, default_value_t = OutputMode::Stream)]
    pub output: OutputMode,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    /// Explicit task ids with empty entries (`--tasks ""`, `a,,b`) dropped.
    pub fn explicit_tasks(&self) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|id| !id.trim().is_empty())
            .cloned()
            .collect()
    }
}

/// Picks the blueprint to load from the positional paths.
pub fn resolve_spec_path(paths: &[String]) -> Result<PathBuf> {
    if paths.len() > 1 {
        return Err(BlueprintError::TooManyPaths {
            paths: paths.to_vec(),
        });
    }

    let path = paths.first().map_or(DEFAULT_SPEC_PATH, String::as_str);

    if !Path::new(path).exists() {
        return Err(BlueprintError::NoTaskSpec {
            path: path.to_string(),
        });
    }

    Ok(PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_more_than_one_path() {
        let paths = vec!["a".to_string(), "b".to_string()];
        match resolve_spec_path(&paths) {
            Err(BlueprintError::TooManyPaths { paths: given }) => assert_eq!(given, paths),
            other => panic!("expected too many paths, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_spec() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.blueprint").display().to_string();

        match resolve_spec_path(&[missing.clone()]) {
            Err(BlueprintError::NoTaskSpec { path }) => assert_eq!(path, missing),
            other => panic!("expected missing spec, got {other:?}"),
        }
    }

    #[test]
    fn accepts_an_existing_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().display().to_string();

        assert_eq!(resolve_spec_path(&[path]).unwrap(), file.path());
    }

    #[test]
    fn parses_constraints() {
        let cli = Cli::parse_from([
            "blueprint",
            "build.blueprint",
            "--tasks",
            "a,b",
            "--tasks",
            "c",
            "--from",
            "x",
            "--to",
            "y",
        ]);

        assert_eq!(cli.paths, vec!["build.blueprint".to_string()]);
        assert_eq!(cli.tasks, vec!["a", "b", "c"]);
        assert_eq!(cli.from.as_deref(), Some("x"));
        assert_eq!(cli.to.as_deref(), Some("y"));
        assert_eq!(cli.output, OutputMode::Stream);
    }

    #[test]
    fn no_arguments_means_no_constraints() {
        let cli = Cli::parse_from(["blueprint"]);

        assert!(cli.paths.is_empty());
        assert!(cli.tasks.is_empty());
        assert!(cli.from.is_none() && cli.to.is_none());
    }

    #[test]
    fn empty_task_entries_are_dropped() {
        let cli = Cli::parse_from(["blueprint", "--tasks", ""]);
        assert!(cli.explicit_tasks().is_empty());

        let cli = Cli::parse_from(["blueprint", "--tasks", "a,,b,"]);
        assert_eq!(cli.explicit_tasks(), vec!["a", "b"]);
    }
}
