// src/schedule/runner.rs

//! Production runner: a shell command inside the working directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::process::{
    execute, FanoutLogger, JsonLinesLogger, MessageLevel, NodeContext, ProcessLogger,
    StepFailure, TracingLogger,
};
use crate::schedule::directory_task::Runner;

/// Name of the event log written into every working directory.
pub const PROCESS_LOG: &str = "process.log";

/// Runs `cmd` through the platform shell as the main step of a one-node
/// process tree. Stdout lines are logged as `info` messages, stderr lines
/// as `warn`.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    cmd: String,
}

impl CommandRunner {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self { cmd: cmd.into() }
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }
}

impl Runner for CommandRunner {
    fn run<'a>(&'a self, task: &'a str, working_dir: &'a Path) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let file_log = JsonLinesLogger::append_to(&working_dir.join(PROCESS_LOG))?;
            let sinks: Vec<Arc<dyn ProcessLogger>> =
                vec![Arc::new(file_log), Arc::new(TracingLogger::new(task))];
            let logger: Arc<dyn ProcessLogger> = Arc::new(FanoutLogger::new(sinks));

            let cmd = self.cmd.clone();
            let dir = working_dir.to_path_buf();

            execute(logger, |root| {
                root.description(task)
                    .main(move |ctx| run_shell(ctx, cmd, dir));
                Ok(())
            })
            .await
            .map_err(|tree| anyhow!("task '{task}' failed:\n{tree}"))
        })
    }
}

fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

async fn run_shell(ctx: NodeContext, cmd: String, dir: PathBuf) -> Result<(), StepFailure> {
    info!(cmd = %cmd, dir = ?dir, "starting task process");

    let mut command = shell_command(&cmd);
    command
        .current_dir(&dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|e| StepFailure::new(format!("spawning `{cmd}`: {e}")))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (status, (), ()) = tokio::join!(
        child.wait(),
        forward_lines(stdout, &ctx, MessageLevel::Info),
        forward_lines(stderr, &ctx, MessageLevel::Warn),
    );
    let status = status.map_err(|e| StepFailure::new(format!("waiting for `{cmd}`: {e}")))?;

    let code = status.code().unwrap_or(-1);
    info!(cmd = %cmd, exit_code = code, success = status.success(), "task process exited");

    if status.success() {
        Ok(())
    } else {
        Err(StepFailure::new(format!("`{cmd}` exited with status {code}")))
    }
}

/// Log every line of `reader` at `level` until it closes.
async fn forward_lines<R>(reader: Option<R>, ctx: &NodeContext, level: MessageLevel)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };
    let mut lines = BufReader::new(reader).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => ctx.log(level, line),
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "stopped reading process output");
                break;
            }
        }
    }
}
