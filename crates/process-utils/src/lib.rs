//! Child process helpers shared across the workspace: console-free spawning on
//! Windows and output capture for external tools such as ffmpeg.

use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Apply the Windows `CREATE_NO_WINDOW` flag to child processes.
///
/// On non-Windows targets this is a no-op.
pub trait NoWindowExt {
    fn no_window(&mut self);
}

impl NoWindowExt for Command {
    fn no_window(&mut self) {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }
    }
}

/// Create a `tokio::process::Command` with `CREATE_NO_WINDOW` applied on Windows.
pub fn tokio_command(program: impl AsRef<OsStr>) -> Command {
    let mut cmd = Command::new(program);
    cmd.no_window();
    cmd
}

/// Exit status and captured output of a finished child process.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub duration: f64,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Captured stderr joined with newlines.
    pub fn stderr_text(&self) -> String {
        self.stderr.join("\n")
    }
}

async fn collect_lines<R>(reader: R, stream: &'static str) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut out = Vec::new();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.to_lowercase().contains("error") {
            warn!("{stream}: {line}");
        } else {
            debug!("{stream}: {line}");
        }
        out.push(line);
    }
    out
}

/// Spawn `command`, wait for it and capture stdout and stderr line by line.
///
/// stdin is closed so tools that prompt (ffmpeg without `-y`) cannot block.
pub async fn run_command_captured(command: &mut Command) -> std::io::Result<CommandOutput> {
    let start = Instant::now();

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn()?;

    let stdout = child
        .stdout
        .take()
        .map(|out| tokio::spawn(collect_lines(out, "stdout")));
    let stderr = child
        .stderr
        .take()
        .map(|err| tokio::spawn(collect_lines(err, "stderr")));

    let status = child.wait().await?;

    let stdout = match stdout {
        Some(handle) => handle.await.unwrap_or_default(),
        None => Vec::new(),
    };
    let stderr = match stderr {
        Some(handle) => handle.await.unwrap_or_default(),
        None => Vec::new(),
    };

    Ok(CommandOutput {
        status,
        duration: start.elapsed().as_secs_f64(),
        stdout,
        stderr,
    })
}
