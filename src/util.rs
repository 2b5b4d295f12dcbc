use std::{
    fmt,
    io::Error as IoError,
    process::{ExitStatus, Stdio},
    sync::Arc,
    time::Duration,
};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command as TokioCommand};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::output::ProgressSink;

#[derive(Debug)]
pub enum CommandError {
    Io(IoError),
    Timeout(Duration),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Io(e) => write!(f, "Command execution error: {}", e),
            CommandError::Timeout(after) => {
                write!(f, "Command timed out after {}", humantime::format_duration(*after))
            }
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Io(e) => Some(e),
            CommandError::Timeout(_) => None,
        }
    }
}

/// Turns `\r\n` and lone `\r` into `\n`.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

pub fn naive_pluralise(word: &str, count: usize) -> String {
    if count > 1 {
        format!("{}s", word)
    } else {
        word.to_string()
    }
}

pub fn parse_timeout(timeout_str: Option<&str>, default_timeout: Option<&str>) -> Option<Duration> {
    let timeout_to_parse = timeout_str.or(default_timeout)?;

    if timeout_to_parse == "0" || timeout_to_parse.is_empty() {
        return None;
    }

    match timeout_to_parse.parse::<humantime::Duration>() {
        Ok(duration) => Some(duration.into()),
        Err(e) => {
            warn!(
                "Invalid timeout format '{}': {}. Use duration format like '5m', '30s', '1h30m'",
                timeout_to_parse, e
            );
            None
        }
    }
}

/// Runs `command` through the platform shell, writing every stdout and stderr
/// line to `sink` as it arrives.
///
/// With a timeout the shell gets its own process group, so that on expiry the
/// whole group is killed and nothing it started can write to `sink` afterwards.
pub async fn run_command<S>(
    command: &str,
    timeout: Option<Duration>,
    sink: Arc<Mutex<S>>,
) -> Result<ExitStatus, CommandError>
where
    S: ProgressSink + 'static,
{
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = TokioCommand::new("cmd");
        c.args(["/C", command]);
        c
    } else {
        let mut c = TokioCommand::new("sh");
        c.args(["-c", command]);
        c
    };

    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null())
        .kill_on_drop(true);

    #[cfg(unix)]
    if timeout.is_some() {
        cmd.process_group(0);
    }

    let mut child = cmd.spawn().map_err(CommandError::Io)?;

    let stdout_handle = child
        .stdout
        .take()
        .map(|pipe| tokio::spawn(forward_lines(pipe, Arc::clone(&sink))));
    let stderr_handle = child
        .stderr
        .take()
        .map(|pipe| tokio::spawn(forward_lines(pipe, Arc::clone(&sink))));

    let status = match timeout {
        Some(duration) => {
            tokio::select! {
                result = child.wait() => result.map_err(CommandError::Io)?,
                _ = tokio::time::sleep(duration) => {
                    kill_process_group(&mut child).await;
                    stop_readers([stdout_handle, stderr_handle]).await;
                    return Err(CommandError::Timeout(duration));
                }
            }
        }
        None => child.wait().await.map_err(CommandError::Io)?,
    };

    for handle in [stdout_handle, stderr_handle].into_iter().flatten() {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(CommandError::Io(e)),
            Err(e) => return Err(CommandError::Io(IoError::other(e))),
        }
    }

    Ok(status)
}

async fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // A negative pid addresses the whole process group.
        unsafe {
            libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
        }
    }

    if let Err(kill_err) = child.kill().await {
        warn!("Failed to kill timed-out process: {}", kill_err);
    }
    let _ = child.wait().await;
}

/// Aborts the output readers and waits until they are gone, so no line from a
/// finished command reaches the sink later.
async fn stop_readers(handles: [Option<JoinHandle<std::io::Result<()>>>; 2]) {
    for handle in handles.into_iter().flatten() {
        handle.abort();
        let _ = handle.await;
    }
}

async fn forward_lines<R, S>(pipe: R, sink: Arc<Mutex<S>>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    S: ProgressSink,
{
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        sink.lock().await.write_line(line);
    }
}
