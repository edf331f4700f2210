//! JSON-RPC-over-stdio LSP client (§4.C).
//!
//! One child process per client. Two cooperative tasks are permanently
//! attached: a reader that parses `Content-Length`-framed frames and routes
//! responses to pending request futures by id, and a stderr drainer that
//! prevents pipe backpressure from stalling the server. A send lock
//! serializes writes onto the child's stdin.

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use blastradius_core::{BlastradiusError, LspConfig, Result};
use dashmap::DashMap;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};

use crate::protocol::{encode_message, read_message};

type PendingMap = Arc<DashMap<i64, oneshot::Sender<Result<Value>>>>;

/// A live JSON-RPC client talking to one language-server child process.
pub struct LspClient {
    child: Mutex<Child>,
    stdin: Mutex<tokio::process::ChildStdin>,
    pending: PendingMap,
    next_id: AtomicI64,
    cfg: LspConfig,
}

impl LspClient {
    /// Spawn `cmd` (already probed to exist on `PATH`), wire up the
    /// reader/stderr tasks, and send `initialize`/`initialized`.
    pub async fn start(cmd: &[String], workspace_root: &Path, cfg: LspConfig) -> Result<Arc<Self>> {
        let Some((program, args)) = cmd.split_first() else {
            return Err(BlastradiusError::Lsp("empty server command".to_string()));
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BlastradiusError::Lsp(format!("failed to spawn {program}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BlastradiusError::Lsp("missing child stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BlastradiusError::Lsp("missing child stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BlastradiusError::Lsp("missing child stderr".to_string()))?;

        let pending: PendingMap = Arc::new(DashMap::new());
        let reader_pending = pending.clone();

        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            loop {
                match read_message(&mut reader).await {
                    Ok(Some(body)) if !body.is_empty() => {
                        let Ok(value) = serde_json::from_str::<Value>(&body) else {
                            continue;
                        };
                        if let Some(id) = value.get("id").and_then(Value::as_i64) {
                            if let Some((_, tx)) = reader_pending.remove(&id) {
                                if let Some(err) = value.get("error") {
                                    let _ = tx.send(Err(BlastradiusError::Lsp(err.to_string())));
                                } else {
                                    let result = value.get("result").cloned().unwrap_or(Value::Null);
                                    let _ = tx.send(Ok(result));
                                }
                            }
                        }
                        // Server-initiated notifications/requests are ignored;
                        // this client only consumes documentSymbol/definition.
                    }
                    Ok(Some(_)) | Err(_) => continue,
                    Ok(None) => break,
                }
            }
        });

        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => tracing::debug!(target: "blastradius_lsp::stderr", "{}", line.trim_end()),
                }
            }
        });

        let client = Arc::new(Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            pending,
            next_id: AtomicI64::new(1),
            cfg,
        });

        let root_uri = url::Url::from_directory_path(workspace_root)
            .map(|u| u.to_string())
            .unwrap_or_default();
        let init_params = json!({
            "processId": std::process::id(),
            "rootUri": root_uri,
            "capabilities": {
                "textDocument": {
                    "documentSymbol": { "hierarchicalDocumentSymbolSupport": true },
                    "definition": {}
                },
                "workspace": {}
            }
        });
        client.request("initialize", init_params).await?;
        client.notify("initialized", json!({})).await?;
        Ok(client)
    }

    /// `true` if the child process has exited; the session restarts on the
    /// next operation when this is observed (§4.C Session health).
    pub async fn has_exited(&self) -> bool {
        self.child
            .lock()
            .await
            .try_wait()
            .map(|status| status.is_some())
            .unwrap_or(true)
    }

    async fn write_frame(&self, value: &Value) -> Result<()> {
        let body = serde_json::to_string(value)?;
        let framed = encode_message(&body);
        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(&framed)
            .await
            .map_err(BlastradiusError::Io)?;
        stdin.flush().await.map_err(BlastradiusError::Io)
    }

    /// Send a request, retrying on protocol errors up to
    /// `cfg.request_retries` times with `cfg.retry_backoff` between
    /// attempts. On timeout, best-effort `$/cancelRequest` is sent for the
    /// outstanding id (§4.C).
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let mut last_err = None;
        for attempt in 0..=self.cfg.request_retries {
            match self.request_once(method, params.clone()).await {
                Ok(v) => return Ok(v),
                Err(e @ BlastradiusError::Timeout(_)) => return Err(e),
                Err(e) => {
                    last_err = Some(e);
                    if attempt < self.cfg.request_retries {
                        tokio::time::sleep(self.cfg.retry_backoff).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| BlastradiusError::Lsp(format!("{method} failed with no attempts"))))
    }

    async fn request_once(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        let msg = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        if let Err(e) = self.write_frame(&msg).await {
            self.pending.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.cfg.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(BlastradiusError::Lsp(format!("{method}: response channel closed"))),
            Err(_) => {
                self.pending.remove(&id);
                let _ = self
                    .notify("$/cancelRequest", json!({ "id": id }))
                    .await;
                Err(BlastradiusError::Timeout(self.cfg.request_timeout))
            }
        }
    }

    pub async fn notify(&self, method: &str, params: Value) -> Result<()> {
        let msg = json!({ "jsonrpc": "2.0", "method": method, "params": params });
        self.write_frame(&msg).await
    }

    /// `textDocument/didOpen` with in-memory text.
    pub async fn did_open(&self, uri: &str, language_id: &str, text: &str) -> Result<()> {
        self.notify(
            "textDocument/didOpen",
            json!({
                "textDocument": {
                    "uri": uri,
                    "languageId": language_id,
                    "version": 1,
                    "text": text,
                }
            }),
        )
        .await
    }

    pub async fn document_symbol(&self, uri: &str) -> Result<Value> {
        self.request(
            "textDocument/documentSymbol",
            json!({ "textDocument": { "uri": uri } }),
        )
        .await
    }

    pub async fn definition(&self, uri: &str, line: u32, character: u32) -> Result<Value> {
        self.request(
            "textDocument/definition",
            json!({
                "textDocument": { "uri": uri },
                "position": { "line": line, "character": character }
            }),
        )
        .await
    }

    /// Best-effort `shutdown`/`exit` on stop (§4.C).
    pub async fn stop(&self) {
        let _ = tokio::time::timeout(Duration::from_secs(2), self.request("shutdown", Value::Null)).await;
        let _ = self.notify("exit", Value::Null).await;
        let _ = self.child.lock().await.kill().await;
    }
}
