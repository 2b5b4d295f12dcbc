use std::{collections::HashMap, fmt, path::Path};

use super::{Task, config};
use crate::error::{BlueprintError, Result};

/// The ordered tasks of one blueprint, read-only once loaded.
#[derive(Debug)]
pub struct TaskList {
    pub name: String,
    pub default_timeout: Option<String>,
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

impl TaskList {
    pub fn new(name: String, tasks: Vec<Task>, default_timeout: Option<String>) -> Self {
        let index = tasks
            .iter()
            .enumerate()
            .map(|(position, task)| (task.id.clone(), position))
            .collect();

        Self {
            name,
            default_timeout,
            tasks,
            index,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        config::load_task_list(path)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        config::parse_task_list(contents)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.position(id).map(|position| &self.tasks[position])
    }

    /// Whether `id` names a task in this list. The empty string never does.
    pub fn is_known_id(&self, id: &str) -> bool {
        !id.is_empty() && self.index.contains_key(id)
    }

    /// Selects the tasks to run, always in file order.
    ///
    /// Constraints are applied by precedence:
    ///   1. `explicit_ids`, when non-empty, picks exactly those tasks and
    ///      `from`/`to` are ignored.
    ///   2. `from` and/or `to` pick an inclusive range. A missing `from` starts
    ///      at the first task and a missing `to` ends at the last. When `from`
    ///      comes after `to` the range is empty.
    ///   3. Otherwise every task is selected.
    ///
    /// The first unknown id found fails with [`BlueprintError::InvalidTask`].
    pub fn constrain(
        &self,
        explicit_ids: &[String],
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<&Task>> {
        if !explicit_ids.is_empty() {
            return self.extract_tasks(explicit_ids);
        }

        if from.is_some() || to.is_some() {
            return self.extract_task_range(from, to);
        }

        Ok(self.tasks.iter().collect())
    }

    fn extract_tasks(&self, ids: &[String]) -> Result<Vec<&Task>> {
        if let Some(invalid) = ids.iter().find(|id| !self.is_known_id(id)) {
            return Err(BlueprintError::InvalidTask {
                id: invalid.clone(),
            });
        }

        Ok(self
            .tasks
            .iter()
            .filter(|task| ids.contains(&task.id))
            .collect())
    }

    fn extract_task_range(&self, from: Option<&str>, to: Option<&str>) -> Result<Vec<&Task>> {
        let start = match from {
            Some(id) => self.require_position(id)?,
            None => 0,
        };
        let end = match to {
            Some(id) => self.require_position(id)? + 1,
            None => self.tasks.len(),
        };

        if start >= end {
            return Ok(Vec::new());
        }

        Ok(self.tasks[start..end].iter().collect())
    }

    fn require_position(&self, id: &str) -> Result<usize> {
        self.position(id)
            .ok_or_else(|| BlueprintError::InvalidTask { id: id.to_string() })
    }

    fn position(&self, id: &str) -> Option<usize> {
        if !self.is_known_id(id) {
            return None;
        }
        self.index.get(id).copied()
    }
}

impl fmt::Display for TaskList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Blueprint: {}", self.name)?;
        for task in &self.tasks {
            write!(f, "{}", task)?;
        }
        Ok(())
    }
}
