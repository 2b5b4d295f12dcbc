use std::io::{self, IsTerminal, Write};

use clap::ValueEnum;
use colored::{Color, ColoredString, Colorize};

use crate::task::Task;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Stream task output live.
    #[default]
    Stream,
    /// Print each task's output as a single block after it completes.
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded,
    Failed,
    /// Failed, but the task's policy says to carry on.
    Ignored,
    /// Failed, then its fallback succeeded.
    Recovered,
    /// Failed and stopped the run.
    Aborted,
}

impl TaskStatus {
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Succeeded => "(success)",
            TaskStatus::Failed => "(fail)",
            TaskStatus::Ignored => "(ignored)",
            TaskStatus::Recovered => "(recovered)",
            TaskStatus::Aborted => "(fail, aborting)",
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::Aborted)
    }
}

/// Where the dispatcher reports progress and task output.
///
/// The dispatcher shares one sink between the spinner ticker and the output
/// readers of the running task, each call holding the sink's lock, so a
/// `tick` can never land in the middle of a `write_line`.
pub trait ProgressSink: Send {
    fn start(&mut self, task: &Task);
    fn tick(&mut self);
    fn write_line(&mut self, line: &str);
    fn finish(&mut self, task: &Task, status: TaskStatus);
}

pub fn task_color(name: &str) -> Color {
    name.parse().unwrap_or(Color::Blue)
}

fn decorate(text: &str, color: &str) -> ColoredString {
    text.color(task_color(color))
}

pub struct TerminalSink {
    mode: OutputMode,
    interactive: bool,
    frame: usize,
    label: Option<ColoredString>,
    buffered: Vec<String>,
}

impl TerminalSink {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            interactive: io::stdout().is_terminal(),
            frame: 0,
            label: None,
            buffered: Vec::new(),
        }
    }

    fn draw_spinner(&self, out: &mut impl Write) {
        if !self.interactive {
            return;
        }
        if let Some(label) = &self.label {
            let _ = write!(out, "\r\x1b[2K[{}] {}", SPINNER_FRAMES[self.frame], label);
            let _ = out.flush();
        }
    }

    fn clear_line(&self, out: &mut impl Write) {
        if self.interactive {
            let _ = write!(out, "\r\x1b[2K");
        }
    }
}

impl ProgressSink for TerminalSink {
    fn start(&mut self, task: &Task) {
        let label = decorate(&task.name, &task.color);
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{}: {}", label, task.command);

        self.frame = 0;
        self.buffered.clear();
        self.label = Some(label);
        self.draw_spinner(&mut out);
    }

    fn tick(&mut self) {
        self.frame = (self.frame + 1) % SPINNER_FRAMES.len();
        self.draw_spinner(&mut io::stdout().lock());
    }

    fn write_line(&mut self, line: &str) {
        match self.mode {
            OutputMode::Group => self.buffered.push(line.to_string()),
            OutputMode::Stream => {
                let mut out = io::stdout().lock();
                self.clear_line(&mut out);
                let _ = writeln!(out, "{}", line);
                self.draw_spinner(&mut out);
            }
        }
    }

    fn finish(&mut self, task: &Task, status: TaskStatus) {
        let mut out = io::stdout().lock();
        self.clear_line(&mut out);

        for line in self.buffered.drain(..) {
            let _ = writeln!(out, "{}", line);
        }

        let (mark, outcome) = if status.is_failure() {
            ("✖".red(), status.label().red())
        } else {
            ("✔".green(), status.label().green())
        };
        let _ = writeln!(
            out,
            "[{}] {} {}",
            mark,
            decorate(&task.name, &task.color),
            outcome
        );
        let _ = out.flush();
        self.label = None;
    }
}
