pub mod config;
pub mod list;
pub mod schema;

pub use list::TaskList;

use std::fmt;

use serde::Deserialize;

pub const DEFAULT_COLOR: &str = "blue";

/// How a task's error policy is spelled in a blueprint file.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Exit,
    Ignore,
    Command,
    Task,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ErrorKind::Exit => "exit",
            ErrorKind::Ignore => "ignore",
            ErrorKind::Command => "command",
            ErrorKind::Task => "task",
        };
        f.write_str(kind)
    }
}

/// What the dispatcher does when a task's command fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop the run after recording the failure.
    Exit,
    /// Tolerate the failure and carry on.
    Ignore,
    /// Run a fallback shell command.
    Command(String),
    /// Run the command of another task in the same list.
    Task(String),
}

impl ErrorPolicy {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorPolicy::Exit => ErrorKind::Exit,
            ErrorPolicy::Ignore => ErrorKind::Ignore,
            ErrorPolicy::Command(_) => ErrorKind::Command,
            ErrorPolicy::Task(_) => ErrorKind::Task,
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            ErrorPolicy::Command(target) | ErrorPolicy::Task(target) => Some(target),
            ErrorPolicy::Exit | ErrorPolicy::Ignore => None,
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target() {
            Some(target) => write!(f, "{} ({})", self.kind(), target),
            None => write!(f, "{}", self.kind()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub command: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub error_policy: Option<ErrorPolicy>,
    pub timeout: Option<String>,
}

impl Task {
    /// A task with every optional field left at its default.
    pub fn new(id: impl Into<String>, command: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            id: id.into(),
            name: command.clone(),
            command,
            description: String::new(),
            color: DEFAULT_COLOR.to_string(),
            error_policy: None,
            timeout: None,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-------------------------")?;
        writeln!(f, "Task ID: {}", self.id)?;
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Description: {}", self.description)?;
        writeln!(f, "Command: {}", self.command)?;
        writeln!(f, "Color: {}", self.color)?;
        match &self.error_policy {
            Some(policy) => writeln!(f, "On Error: {}", policy),
            None => writeln!(f, "On Error: fail"),
        }
    }
}
