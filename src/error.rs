use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlueprintError {
    #[error(
        "Too many task specification paths were specified! Multiple paths {} were given. Please pass only one.",
        .paths.join(",")
    )]
    TooManyPaths { paths: Vec<String> },

    #[error("Task specification was not found! {path} does not exist.")]
    NoTaskSpec { path: String },

    #[error(
        "Blueprint configuration was malformed, at line {line} column {column} ({path}): {message}."
    )]
    Validation {
        line: usize,
        column: usize,
        path: String,
        message: String,
    },

    #[error("Task ID is invalid! {id} was not found in given blueprint.")]
    InvalidTask { id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BlueprintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_paths_lists_every_path() {
        let err = BlueprintError::TooManyPaths {
            paths: vec!["a.yml".to_string(), "b.yml".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Too many task specification paths were specified! Multiple paths a.yml,b.yml were given. Please pass only one."
        );
    }

    #[test]
    fn validation_error_reports_position() {
        let err = BlueprintError::Validation {
            line: 4,
            column: 7,
            path: "tasks[1]".to_string(),
            message: "missing field `command`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Blueprint configuration was malformed, at line 4 column 7 (tasks[1]): missing field `command`."
        );
    }

    #[test]
    fn invalid_task_names_the_id() {
        let err = BlueprintError::InvalidTask {
            id: "task9".to_string(),
        };
        assert!(err.to_string().contains("task9 was not found"));
    }
}
