//! The stdio process runner (spec §4.7 "stdio proxy"): spawns a child
//! process and forwards bytes bidirectionally between it and this
//! process's own stdin/stdout, exactly as an MCP `stdio` transport
//! expects to connect to a tool server. Grounded on
//! `connector_proxy::libs::command::invoke_connector` for the spawn
//! shape and `connector_proxy::connector_runner::run_connector`'s
//! `tokio::join!` bidirectional-copy idiom for the forwarding loop; the
//! SIGTERM→SIGKILL escalation on shutdown is new (the source always ran
//! its child to natural exit, never needing to ask one to stop).

use std::process::Stdio;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::io::copy;
use tokio::process::{Child, Command};
use tokio::time::timeout;

use crate::error::ProxyError;

/// Grace period between SIGTERM and the SIGKILL escalation (spec §4.7).
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Spawns `entrypoint` with `args` and forwards this process's stdin to
/// the child's stdin, and the child's stdout to this process's stdout,
/// concurrently, until both streams reach EOF, then waits for the child
/// to exit.
pub async fn run(entrypoint: String, args: Vec<String>) -> Result<(), ProxyError> {
    if entrypoint.is_empty() {
        return Err(ProxyError::EmptyEntrypoint);
    }

    let mut child = spawn(&entrypoint, &args)?;
    let mut child_stdin = child.stdin.take().ok_or(ProxyError::MissingChildPipe("stdin"))?;
    let mut child_stdout = child.stdout.take().ok_or(ProxyError::MissingChildPipe("stdout"))?;

    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();

    let forward_in = async {
        let result = copy(&mut stdin, &mut child_stdin).await;
        drop(child_stdin);
        result
    };
    let forward_out = copy(&mut child_stdout, &mut stdout);

    let (a, b) = tokio::join!(forward_in, forward_out);
    a?;
    b?;

    let status = child.wait().await?;
    if !status.success() {
        tracing::warn!(?status, "child process exited with non-zero status");
    }
    Ok(())
}

/// Sends SIGTERM, waits up to [`SHUTDOWN_GRACE`] for the child to exit on
/// its own, and escalates to SIGKILL if it hasn't (spec §4.7 "orderly
/// shutdown").
pub async fn shutdown(child: &mut Child) -> Result<(), ProxyError> {
    let Some(pid) = child.id() else {
        // Already reaped.
        return Ok(());
    };
    let pid = Pid::from_raw(pid as i32);

    signal::kill(pid, Signal::SIGTERM)?;
    if timeout(SHUTDOWN_GRACE, child.wait()).await.is_ok() {
        return Ok(());
    }

    tracing::warn!(%pid, "child did not exit within grace period, sending SIGKILL");
    signal::kill(pid, Signal::SIGKILL)?;
    child.wait().await?;
    Ok(())
}

fn spawn(entrypoint: &str, args: &[String]) -> Result<Child, ProxyError> {
    tracing::info!(entrypoint, ?args, "spawning child process");
    Command::new(entrypoint)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(ProxyError::Spawn)
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn empty_entrypoint_is_rejected() {
        let result = run(String::new(), vec![]).await;
        assert!(matches!(result, Err(ProxyError::EmptyEntrypoint)));
    }

    #[tokio::test]
    async fn spawns_and_forwards_a_trivial_child() {
        let mut child = spawn("cat", &[]).expect("cat should be on PATH in test environments");
        child.stdin.take();
        let status = child.wait().await.unwrap();
        assert!(status.success() || status.code().is_some());
    }

    #[tokio::test]
    async fn shutdown_terminates_a_long_running_child() {
        let mut child = Command::new("sleep")
            .arg("30")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("sleep should be on PATH in test environments");

        shutdown(&mut child).await.unwrap();
        assert!(child.try_wait().unwrap().is_some());
    }
}
