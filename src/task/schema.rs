//! Structural validation of blueprint documents.
//!
//! Documents are checked in two passes. The first deserializes into the raw
//! schema types below, which rejects bad YAML, unknown keys, missing required
//! keys and wrong value types with the parser's own position. The second pass
//! checks what serde cannot express (non-empty values, unique ids, error policy
//! targets) and locates the offending key in the text. Only the first problem
//! is ever reported.

use std::collections::HashMap;

use regex::Regex;
use serde::Deserialize;

use super::ErrorKind;
use crate::error::{BlueprintError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub timeout: Option<String>,
    pub tasks: Vec<RawTask>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTask {
    pub id: String,
    pub command: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub error: Option<ErrorKind>,
    #[serde(default)]
    pub error_command: Option<String>,
    #[serde(default)]
    pub error_task: Option<String>,
    #[serde(default)]
    pub timeout: Option<String>,
}

/// Validates normalized blueprint text and returns the raw document.
pub fn validate(text: &str) -> Result<SpecDocument> {
    let document: SpecDocument = serde_yaml::from_str(text).map_err(structural_error)?;
    check_tasks(text, &document.tasks)?;
    Ok(document)
}

fn structural_error(err: serde_yaml::Error) -> BlueprintError {
    let (line, column) = err
        .location()
        .map(|location| (location.line(), location.column()))
        .unwrap_or((1, 1));

    let rendered = err.to_string();
    let suffix = format!(" at line {} column {}", line, column);
    let head = match rendered.find(&suffix) {
        Some(end) => &rendered[..end],
        None => rendered.as_str(),
    };

    let (path, message) = split_path(head);
    BlueprintError::Validation {
        line,
        column,
        path: path.to_string(),
        message: message.to_string(),
    }
}

/// serde_yaml prefixes messages with the document path, e.g. `tasks[1]: ...`.
fn split_path(head: &str) -> (&str, &str) {
    match head.split_once(": ") {
        Some((path, message)) if !path.is_empty() && !path.contains(char::is_whitespace) => {
            (path, message)
        }
        _ => (".", head),
    }
}

fn check_tasks(text: &str, tasks: &[RawTask]) -> Result<()> {
    let items = TaskItems::scan(text);
    let mut seen: HashMap<&str, usize> = HashMap::new();

    for (index, task) in tasks.iter().enumerate() {
        let fail = |key: &str, message: &str| items.error(index, key, message);

        if task.id.trim().is_empty() {
            return Err(fail("id", "task id must not be empty"));
        }

        if task.command.trim().is_empty() {
            return Err(fail(
                "command",
                &format!("task '{}' has an empty command", task.id),
            ));
        }

        if let Some(first) = seen.insert(task.id.as_str(), index) {
            return Err(fail(
                "id",
                &format!("duplicate task id '{}', first declared at tasks[{}]", task.id, first),
            ));
        }

        if let Some(message) = task.error.and_then(|kind| error_target_problem(tasks, task, kind)) {
            return Err(fail("error", &message));
        }
    }

    Ok(())
}

fn error_target_problem(tasks: &[RawTask], task: &RawTask, kind: ErrorKind) -> Option<String> {
    match kind {
        ErrorKind::Command if is_blank(task.error_command.as_deref()) => Some(format!(
            "task '{}' uses error policy 'command' but has no error_command",
            task.id
        )),
        ErrorKind::Task => match task.error_task.as_deref() {
            None | Some("") => Some(format!(
                "task '{}' uses error policy 'task' but has no error_task",
                task.id
            )),
            Some(target) if target == task.id => {
                Some(format!("task '{}' cannot fall back to itself", task.id))
            }
            Some(target) if !tasks.iter().any(|t| t.id == target) => Some(format!(
                "task '{}' falls back to unknown task '{}'",
                task.id, target
            )),
            Some(_) => None,
        },
        _ => None,
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

const KEY_PATTERN: &str = r"^([A-Za-z_][A-Za-z0-9_]*)[ \t]*:(?:[ \t]|$)";

/// One block-style entry of the top-level `tasks` sequence.
#[derive(Debug, PartialEq, Eq)]
struct TaskItem {
    /// 0-based line of the item's `-`.
    dash_line: usize,
    dash_column: usize,
    /// Column the item's mapping keys start at, if the item is a block mapping.
    key_indent: Option<usize>,
    /// First line past the item.
    end: usize,
}

/// Source positions of the task items, used to point semantic errors at the
/// task they belong to. Keys are only matched at the item's own mapping
/// indent, so text inside values is never mistaken for a key.
struct TaskItems<'a> {
    lines: Vec<&'a str>,
    items: Vec<TaskItem>,
}

impl<'a> TaskItems<'a> {
    fn scan(text: &'a str) -> Self {
        let lines: Vec<&str> = text.split('\n').collect();
        let items = scan_items(&lines);
        Self { lines, items }
    }

    fn error(&self, index: usize, key: &str, message: &str) -> BlueprintError {
        let (line, column) = self.locate(index, key).unwrap_or((1, 1));
        BlueprintError::Validation {
            line,
            column,
            path: format!("tasks[{}].{}", index, key),
            message: message.to_string(),
        }
    }

    /// 1-based line and column of `key` in the `index`-th task, falling back
    /// to the item's `-` when the key cannot be found.
    fn locate(&self, index: usize, key: &str) -> Option<(usize, usize)> {
        let item = self.items.get(index)?;
        let fallback = (item.dash_line + 1, item.dash_column + 1);

        let Some(indent) = item.key_indent else {
            return Some(fallback);
        };
        let Ok(key_re) = Regex::new(KEY_PATTERN) else {
            return Some(fallback);
        };

        for n in item.dash_line..item.end {
            let line = self.lines[n];
            if n != item.dash_line && (!is_content(line) || indent_of(line) != indent) {
                continue;
            }
            let Some(rest) = line.get(indent..) else {
                continue;
            };
            if key_re
                .captures(rest)
                .and_then(|caps| caps.get(1))
                .is_some_and(|found| found.as_str() == key)
            {
                return Some((n + 1, indent + 1));
            }
        }

        Some(fallback)
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_content(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

fn is_item(rest: &str) -> bool {
    rest == "-" || rest.starts_with("- ")
}

fn scan_items(lines: &[&str]) -> Vec<TaskItem> {
    let Some(tasks_line) = lines
        .iter()
        .position(|line| line.starts_with("tasks:") || line.starts_with("tasks :"))
    else {
        return Vec::new();
    };

    let mut items: Vec<TaskItem> = Vec::new();
    let mut seq_indent = None;
    let mut stop = lines.len();

    for (n, line) in lines.iter().enumerate().skip(tasks_line + 1) {
        if !is_content(line) {
            continue;
        }

        let indent = indent_of(line);
        let rest = &line[indent..];
        let item = is_item(rest);

        match seq_indent {
            None if item => seq_indent = Some(indent),
            None => {
                stop = n;
                break;
            }
            Some(seq) if indent < seq || (indent == seq && !item) => {
                stop = n;
                break;
            }
            Some(_) => {}
        }

        if item && seq_indent == Some(indent) {
            if let Some(last) = items.last_mut() {
                last.end = n;
            }
            let after = &rest[1..];
            let key_indent = if after.trim().is_empty() {
                None
            } else {
                Some(indent + 1 + indent_of(after))
            };
            items.push(TaskItem {
                dash_line: n,
                dash_column: indent,
                key_indent,
                end: lines.len(),
            });
        }
    }

    if let Some(last) = items.last_mut() {
        last.end = stop;
    }

    for item in &mut items {
        if item.key_indent.is_none() {
            item.key_indent = lines[item.dash_line + 1..item.end]
                .iter()
                .find(|line| is_content(line))
                .map(|line| indent_of(line));
        }
    }

    items
}
