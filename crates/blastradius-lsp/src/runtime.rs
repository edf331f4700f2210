//! Dedicated cooperative event loop on a background OS thread, with a
//! synchronous `run(task, timeout)` bridge (§4.C, §9).
//!
//! Outer code (the parser orchestrator, the call-graph builder) is
//! synchronous; language servers are easiest to drive asynchronously. This
//! runtime owns a single-threaded tokio runtime on one dedicated thread and
//! lets arbitrary caller threads submit futures to it and block for the
//! result with a deadline.

use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

use blastradius_core::{BlastradiusError, Result};
use tokio::runtime::{Handle, Runtime};

pub struct LspRuntime {
    handle: OnceLock<Handle>,
    started: std::sync::Once,
}

impl Default for LspRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl LspRuntime {
    pub fn new() -> Self {
        Self {
            handle: OnceLock::new(),
            started: std::sync::Once::new(),
        }
    }

    /// Start the background thread if it isn't already running. Idempotent.
    pub fn ensure_started(&self) {
        self.started.call_once(|| {
            let (ready_tx, ready_rx) = std_mpsc::channel::<Handle>();
            thread::Builder::new()
                .name("blastradius-lsp".to_string())
                .spawn(move || {
                    let rt = Runtime::new().expect("failed to build LSP runtime");
                    let _ = ready_tx.send(rt.handle().clone());
                    // Keep the loop alive forever; tasks are spawned onto it
                    // from other threads via the Handle.
                    rt.block_on(futures_pending());
                })
                .expect("failed to spawn blastradius-lsp thread");

            if let Ok(handle) = ready_rx.recv_timeout(Duration::from_secs(5)) {
                let _ = self.handle.set(handle);
            }
        });
    }

    /// Submit `fut` to the background loop and block the calling thread for
    /// its result, up to `timeout`. Returns `BlastradiusError::Timeout` if
    /// the deadline elapses; the task keeps running to completion on the
    /// loop regardless (callers that need cancellation use a
    /// `CancellationToken` inside `fut`).
    pub fn run<F>(&self, fut: F, timeout: Duration) -> Result<F::Output>
    where
        F: std::future::Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.ensure_started();
        let handle = self
            .handle
            .get()
            .ok_or_else(|| BlastradiusError::Lsp("LSP runtime failed to start".to_string()))?;

        let (tx, rx) = std_mpsc::channel();
        handle.spawn(async move {
            let out = fut.await;
            let _ = tx.send(out);
        });

        rx.recv_timeout(timeout).map_err(|_| BlastradiusError::Timeout(timeout))
    }

    /// The runtime's handle, for spawning long-lived background tasks
    /// (reader/writer loops) that outlive a single `run` call.
    pub fn handle(&self) -> Handle {
        self.ensure_started();
        self.handle.get().expect("runtime not started").clone()
    }
}

async fn futures_pending() {
    std::future::pending::<()>().await
}

static GLOBAL_RUNTIME: OnceLock<LspRuntime> = OnceLock::new();

/// The process-wide LSP runtime. One dedicated thread serves every Session
/// (§5: "one dedicated cooperative event loop").
pub fn global_runtime() -> &'static LspRuntime {
    GLOBAL_RUNTIME.get_or_init(LspRuntime::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_returns_the_future_output() {
        let rt = LspRuntime::new();
        let out = rt.run(async { 1 + 1 }, Duration::from_secs(1)).unwrap();
        assert_eq!(out, 2);
    }

    #[test]
    fn run_times_out_on_a_future_that_never_resolves() {
        let rt = LspRuntime::new();
        let result = rt.run(futures_pending(), Duration::from_millis(50));
        assert!(matches!(result, Err(BlastradiusError::Timeout(_))));
    }
}
