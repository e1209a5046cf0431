//! Lifecycle of one engine subprocess.
//!
//! ```text
//! spawn ──▶ wait ≤ timeout ──▶ exited ──▶ SIGKILL leftover group members
//!                    │
//!                    └──▶ SIGTERM group ──▶ wait ≤ grace ──▶ SIGKILL group ──▶ wait ≤ grace
//! ```
//!
//! stdout is drained and discarded; stderr is drained with only the first
//! `limit` bytes kept. Both readers run as their own tasks so the child can
//! never block on a full pipe while we wait for it. Captured stderr lives in a
//! buffer shared with its reader, so aborting the reader keeps what it read.
//!
//! Dropping an [`EngineProcess`] that has not been reaped kills the whole
//! process group; `kill_on_drop` on the command covers the leader as well.

use std::io;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How the engine leader ended.
#[derive(Debug)]
pub(crate) enum Exit {
    /// Exited on its own before the deadline.
    Exited(ExitStatus),
    /// The deadline elapsed and the group was terminated.
    TimedOut,
}

/// Bytes captured by a reader task, readable after the task is aborted.
type Captured = Arc<Mutex<Vec<u8>>>;

#[derive(Debug, Clone, Copy)]
enum Signal {
    Term,
    Kill,
}

/// A spawned engine with its output readers.
pub(crate) struct EngineProcess {
    child: Child,
    /// Process-group id; equal to the leader's pid on Unix.
    pgid: Option<u32>,
    stdout: Option<JoinHandle<()>>,
    stderr: Option<JoinHandle<()>>,
    captured: Captured,
    /// Set once the group has been killed after the leader exited.
    settled: bool,
}

impl EngineProcess {
    /// Spawn `cmd`, keeping at most `stderr_limit` bytes of its stderr.
    pub(crate) fn spawn(mut cmd: Command, stderr_limit: usize) -> io::Result<Self> {
        let mut child = cmd.spawn()?;
        let pgid = child.id();
        let captured = Captured::default();
        let stdout = child
            .stdout
            .take()
            .map(|out| tokio::spawn(read_bounded(out, 0, Captured::default())));
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(read_bounded(err, stderr_limit, Arc::clone(&captured))));

        Ok(Self {
            child,
            pgid,
            stdout,
            stderr,
            captured,
            settled: false,
        })
    }

    pub(crate) fn pid(&self) -> Option<u32> {
        self.pgid
    }

    /// Wait for the leader, terminating the group once `timeout` elapses.
    ///
    /// Returns within `timeout + 2 × grace` in every case.
    pub(crate) async fn wait_with_deadline(
        &mut self,
        timeout: Duration,
        grace: Duration,
    ) -> io::Result<Exit> {
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.settle();
                Ok(Exit::Exited(status))
            }
            Ok(Err(e)) => {
                self.terminate(grace).await;
                Err(e)
            }
            Err(_) => {
                self.terminate(grace).await;
                Ok(Exit::TimedOut)
            }
        }
    }

    /// Captured stderr, waiting at most `wait` for the reader to finish.
    ///
    /// A helper that escaped the process group can keep the pipe open; in
    /// that case the reader is abandoned and whatever it had read so far is
    /// returned.
    pub(crate) async fn collect_stderr(&mut self, wait: Duration) -> Vec<u8> {
        for handle in [self.stdout.take(), self.stderr.take()].into_iter().flatten() {
            finish_reader(handle, wait).await;
        }
        std::mem::take(&mut *lock(&self.captured))
    }

    /// SIGTERM the group, give it `grace` to exit, then SIGKILL.
    async fn terminate(&mut self, grace: Duration) {
        self.signal(Signal::Term);
        if let Ok(Ok(status)) = tokio::time::timeout(grace, self.child.wait()).await {
            debug!("engine {:?} exited after SIGTERM: {}", self.pgid, status);
        } else {
            warn!(
                "engine {:?} ignored SIGTERM for {:?}, escalating to SIGKILL",
                self.pgid, grace
            );
            self.signal(Signal::Kill);
            if let Err(e) = self.child.start_kill() {
                debug!("start_kill on engine {:?}: {}", self.pgid, e);
            }
            if tokio::time::timeout(grace, self.child.wait()).await.is_err() {
                warn!("engine {:?} still not reaped after SIGKILL", self.pgid);
            }
        }
        self.settle();
        self.abort_readers();
    }

    /// Kill whatever is left of the group once the leader is gone.
    ///
    /// If the group is already empty its id is free and could in principle be
    /// taken by an unrelated new group before this signal lands. The window
    /// is the few instructions between reaping the leader and this call and
    /// is accepted.
    fn settle(&mut self) {
        if !self.settled {
            self.signal(Signal::Kill);
            self.settled = true;
        }
    }

    fn abort_readers(&mut self) {
        for handle in [self.stdout.take(), self.stderr.take()].into_iter().flatten() {
            handle.abort();
        }
    }

    #[cfg(unix)]
    fn signal(&mut self, signal: Signal) {
        let Some(pgid) = self.pgid.and_then(|id| libc::pid_t::try_from(id).ok()) else {
            return;
        };
        let signo = match signal {
            Signal::Term => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        };
        // SAFETY: killpg takes plain integers and touches no memory we own.
        // The group was created for this child via process_group(0).
        let rc = unsafe { libc::killpg(pgid, signo) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                debug!("killpg({}, {:?}) failed: {}", pgid, signal, err);
            }
        }
    }

    #[cfg(not(unix))]
    fn signal(&mut self, _signal: Signal) {
        if let Err(e) = self.child.start_kill() {
            debug!("start_kill on engine {:?}: {}", self.pgid, e);
        }
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        self.settle();
        self.abort_readers();
    }
}

/// Spawn-error text shared by the executor and the prober.
pub(crate) fn spawn_failure_reason(err: &io::Error) -> &'static str {
    match err.kind() {
        io::ErrorKind::NotFound => "binary not found",
        io::ErrorKind::PermissionDenied => "binary not executable",
        _ => "binary failed to start",
    }
}

async fn finish_reader(mut handle: JoinHandle<()>, wait: Duration) {
    match tokio::time::timeout(wait, &mut handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("output reader failed: {}", e),
        Err(_) => {
            debug!("output pipe still open after {:?}, abandoning reader", wait);
            handle.abort();
        }
    }
}

fn lock(captured: &Captured) -> std::sync::MutexGuard<'_, Vec<u8>> {
    captured.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Read `reader` to EOF, keeping the first `limit` bytes in `kept`.
async fn read_bounded<R>(mut reader: R, limit: usize, kept: Captured)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let mut kept = lock(&kept);
                let room = limit.saturating_sub(kept.len());
                kept.extend_from_slice(&buf[..n.min(room)]);
            }
        }
    }
}
