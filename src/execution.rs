use std::{sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    output::{ProgressSink, TaskStatus},
    task::{ErrorPolicy, Task, TaskList},
    util::{parse_timeout, run_command},
};

const TICK_INTERVAL: Duration = Duration::from_millis(80);

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Ids of failed tasks, in execution order.
    pub failures: Vec<String>,
    /// Tasks actually dispatched.
    pub task_count: usize,
    /// The task whose `exit` policy stopped the run.
    pub aborted_by: Option<String>,
}

impl RunOutcome {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Dispatcher<'a, S> {
    task_list: &'a TaskList,
    sink: Arc<Mutex<S>>,
    default_timeout: Option<String>,
}

impl<'a, S> Dispatcher<'a, S>
where
    S: ProgressSink + 'static,
{
    pub fn new(task_list: &'a TaskList, sink: Arc<Mutex<S>>, default_timeout: Option<String>) -> Self {
        Self {
            task_list,
            sink,
            default_timeout,
        }
    }

    /// Runs `plan` one task at a time, in order.
    pub async fn run(&self, plan: &[&Task]) -> RunOutcome {
        let mut outcome = RunOutcome::default();

        for task in plan {
            outcome.task_count += 1;

            let status = self.dispatch(task).await;
            debug!(task = %task.id, ?status, "task finished");

            if status.is_failure() {
                outcome.failures.push(task.id.clone());
            }

            if status == TaskStatus::Aborted {
                outcome.aborted_by = Some(task.id.clone());
                let remaining = plan.len() - outcome.task_count;
                if remaining > 0 {
                    warn!(
                        "Task '{}' failed with error policy 'exit', skipping {} remaining",
                        task.id, remaining
                    );
                }
                break;
            }
        }

        outcome
    }

    async fn dispatch(&self, task: &Task) -> TaskStatus {
        self.sink.lock().await.start(task);

        let status = if self.execute(task, &task.command).await {
            TaskStatus::Succeeded
        } else {
            self.handle_failure(task).await
        };

        self.sink.lock().await.finish(task, status);
        status
    }

    async fn handle_failure(&self, task: &Task) -> TaskStatus {
        match &task.error_policy {
            None => TaskStatus::Failed,
            Some(ErrorPolicy::Exit) => TaskStatus::Aborted,
            Some(ErrorPolicy::Ignore) => TaskStatus::Ignored,
            Some(ErrorPolicy::Command(fallback)) => {
                self.write_line(&format!("{} failed, running fallback: {}", task.id, fallback))
                    .await;
                recovered_if(self.execute(task, fallback).await)
            }
            Some(ErrorPolicy::Task(fallback_id)) => match self.task_list.get(fallback_id) {
                Some(fallback) => {
                    self.write_line(&format!(
                        "{} failed, running fallback task {}: {}",
                        task.id, fallback.id, fallback.command
                    ))
                    .await;
                    recovered_if(self.execute(fallback, &fallback.command).await)
                }
                None => {
                    self.write_line(&format!("fallback task '{}' not found", fallback_id))
                        .await;
                    TaskStatus::Failed
                }
            },
        }
    }

    /// Runs one command with `task`'s timeout, animating the sink meanwhile.
    async fn execute(&self, task: &Task, command: &str) -> bool {
        let timeout = parse_timeout(task.timeout.as_deref(), self.default_timeout.as_deref());

        let ticker = tokio::spawn(animate(Arc::clone(&self.sink)));

        let result = run_command(command, timeout, Arc::clone(&self.sink)).await;
        ticker.abort();

        match result {
            Ok(status) if status.success() => true,
            Ok(status) => {
                debug!(task = %task.id, %status, "command failed");
                false
            }
            Err(e) => {
                self.write_line(&e.to_string()).await;
                false
            }
        }
    }

    async fn write_line(&self, line: &str) {
        self.sink.lock().await.write_line(line);
    }
}

async fn animate<S: ProgressSink>(sink: Arc<Mutex<S>>) {
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    loop {
        interval.tick().await;
        sink.lock().await.tick();
    }
}

fn recovered_if(fallback_succeeded: bool) -> TaskStatus {
    if fallback_succeeded {
        TaskStatus::Recovered
    } else {
        TaskStatus::Failed
    }
}
