use std::{fs, path::Path};

use tracing::debug;

use super::{
    DEFAULT_COLOR, ErrorKind, ErrorPolicy, Task, TaskList,
    schema::{self, RawTask, SpecDocument},
};
use crate::{error::Result, util::normalize_line_endings};

pub fn load_task_list(spec_path: &Path) -> Result<TaskList> {
    let contents = fs::read_to_string(spec_path)?;
    debug!(path = %spec_path.display(), bytes = contents.len(), "read blueprint");
    parse_task_list(&contents)
}

pub fn parse_task_list(contents: &str) -> Result<TaskList> {
    let text = normalize_line_endings(contents);
    let document = schema::validate(&text)?;
    Ok(process_document(document))
}

fn process_document(document: SpecDocument) -> TaskList {
    let tasks = document.tasks.into_iter().map(build_task).collect();
    TaskList::new(document.name.unwrap_or_default(), tasks, document.timeout)
}

fn build_task(raw: RawTask) -> Task {
    let error_policy = raw.error.and_then(|kind| match kind {
        ErrorKind::Exit => Some(ErrorPolicy::Exit),
        ErrorKind::Ignore => Some(ErrorPolicy::Ignore),
        ErrorKind::Command => raw.error_command.clone().map(ErrorPolicy::Command),
        ErrorKind::Task => raw.error_task.clone().map(ErrorPolicy::Task),
    });

    Task {
        name: raw.name.unwrap_or_else(|| raw.command.clone()),
        description: raw.description.unwrap_or_default(),
        color: raw.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        id: raw.id,
        command: raw.command,
        error_policy,
        timeout: raw.timeout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BlueprintError;

    const VALID: &str = "\
name: Valid
tasks:
  - id: task1
    command: null1
    name: Task1Name
    description: Task1Description
    color: green
    error: ignore
  - id: task2
    command: null2
";

    #[test]
    fn loads_spec_metadata() {
        let list = parse_task_list(VALID).unwrap();
        assert_eq!(list.name, "Valid");
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn loads_fully_specified_tasks() {
        let list = parse_task_list(VALID).unwrap();
        let task = &list.tasks()[0];

        assert_eq!(task.id, "task1");
        assert_eq!(task.command, "null1");
        assert_eq!(task.name, "Task1Name");
        assert_eq!(task.description, "Task1Description");
        assert_eq!(task.color, "green");
        assert_eq!(task.error_policy, Some(ErrorPolicy::Ignore));
    }

    #[test]
    fn assigns_defaults_to_partially_specified_tasks() {
        let list = parse_task_list(VALID).unwrap();
        assert_eq!(list.tasks()[1], Task::new("task2", "null2"));
    }

    #[test]
    fn null_name_and_color_fall_back_to_defaults() {
        let list = parse_task_list("name:\ntasks:\n  - id: a\n    command: make\n    name:\n    color: ~\n")
            .unwrap();

        assert_eq!(list.name, "");
        assert_eq!(list.tasks()[0].name, "make");
        assert_eq!(list.tasks()[0].color, "blue");
    }

    #[test]
    fn maps_fallback_policies_and_timeouts() {
        let text = "\
timeout: 5m
tasks:
  - id: build
    command: make
    error: command
    error_command: make clean
    timeout: 30s
  - id: deploy
    command: ./deploy.sh
    error: task
    error_task: build
  - id: lint
    command: cargo clippy
    error: exit
";
        let list = parse_task_list(text).unwrap();

        assert_eq!(list.default_timeout.as_deref(), Some("5m"));
        assert_eq!(
            list.tasks()[0].error_policy,
            Some(ErrorPolicy::Command("make clean".to_string()))
        );
        assert_eq!(list.tasks()[0].timeout.as_deref(), Some("30s"));
        assert_eq!(
            list.tasks()[1].error_policy,
            Some(ErrorPolicy::Task("build".to_string()))
        );
        assert_eq!(list.tasks()[2].error_policy, Some(ErrorPolicy::Exit));
    }

    #[test]
    fn crlf_documents_report_the_same_lines_as_lf() {
        let lf = "tasks:\n  - id: a\n    command: x\n  - id: a\n    command: y\n";
        let crlf = lf.replace('\n', "\r\n");
        let cr = lf.replace('\n', "\r");

        let position = |text: &str| match parse_task_list(text) {
            Err(BlueprintError::Validation { line, column, .. }) => (line, column),
            other => panic!("expected validation error, got {other:?}"),
        };

        assert_eq!(position(lf), (4, 5));
        assert_eq!(position(&crlf), (4, 5));
        assert_eq!(position(&cr), (4, 5));
    }

    #[test]
    fn malformed_documents_build_nothing() {
        let err = parse_task_list("tasks:\n  - id: a\n").unwrap_err();
        assert!(matches!(err, BlueprintError::Validation { .. }));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".blueprint");
        fs::write(&path, VALID.replace('\n', "\r\n")).unwrap();

        let list = load_task_list(&path).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.tasks()[1].command, "null2");
    }
}
