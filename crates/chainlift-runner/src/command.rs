use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};

use chainlift_core::{CommandOutput, CommandRunner, UpgradeError};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, command: &str, cwd: &Path, timeout: Duration) -> Result<CommandOutput> {
        let mut tokens = command.split_whitespace();
        let program = tokens
            .next()
            .ok_or_else(|| anyhow!("empty command string"))?;

        let mut child = Command::new(program)
            .args(tokens)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn command '{command}'"))?;

        let stdout_reader = drain_pipe(child.stdout.take());
        let stderr_reader = drain_pipe(child.stderr.take());

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait().context("failed polling child process")? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    kill_and_reap(&mut child);
                    let _ = stdout_reader.join();
                    let _ = stderr_reader.join();
                    return Err(UpgradeError::Timeout {
                        command: command.to_string(),
                        timeout_secs: timeout.as_secs(),
                    }
                    .into());
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            status_code: status.code(),
        })
    }
}

// Pipes must be drained while polling or a chatty child fills them and stalls.
fn drain_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer);
        }
        buffer
    })
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
