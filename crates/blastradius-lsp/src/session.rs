//! A warm LSP client for one `(language, workspace_root)` pair (§4.C
//! Session), with bounded outbound concurrency and document-symbol /
//! definition caches keyed by file fingerprint.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use blastradius_core::{BlastradiusError, Language, LspConfig, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::client::LspClient;
use crate::failure::{LspFailure, LspFailureReason};
use crate::server_registry::{probe, server_command};

/// Cache key: a file's URI plus the `(mtime_ns, size)` fingerprint the
/// caller observed when it read the file off disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FileFingerprint {
    uri: String,
    mtime_ns: i128,
    size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DefinitionKey {
    file: FileFingerprint,
    line: u32,
    character: u32,
}

/// A session wrapping one [`LspClient`] plus its caches. Cheap to clone
/// (internals are `Arc`-backed); owned by the [`crate::session_manager::SessionManager`].
#[derive(Clone)]
pub struct Session {
    language: Language,
    workspace_root: PathBuf,
    cfg: LspConfig,
    client: Arc<tokio::sync::Mutex<Option<Arc<LspClient>>>>,
    semaphore: Arc<Semaphore>,
    opened: Arc<DashMap<String, ()>>,
    doc_symbol_cache: Arc<DashMap<FileFingerprint, Value>>,
    definition_cache: Arc<DashMap<DefinitionKey, Value>>,
    pub(crate) last_used: Arc<Mutex<Instant>>,
    disabled: Arc<std::sync::atomic::AtomicBool>,
}

pub struct BatchDefinitionRequest {
    pub line: u32,
    pub character: u32,
}

impl Session {
    pub fn new(language: Language, workspace_root: PathBuf, cfg: LspConfig) -> Self {
        Self {
            language,
            workspace_root,
            semaphore: Arc::new(Semaphore::new(cfg.session_concurrency)),
            cfg,
            client: Arc::new(tokio::sync::Mutex::new(None)),
            opened: Arc::new(DashMap::new()),
            doc_symbol_cache: Arc::new(DashMap::new()),
            definition_cache: Arc::new(DashMap::new()),
            last_used: Arc::new(Mutex::new(Instant::now())),
            disabled: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    pub fn touch(&self) {
        *self.last_used.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> std::time::Duration {
        self.last_used.lock().elapsed()
    }

    /// `true` once a permanent failure (missing binary) has latched.
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(std::sync::atomic::Ordering::Relaxed)
    }

    async fn ensure_client(&self) -> std::result::Result<Arc<LspClient>, LspFailure> {
        if self.is_disabled() {
            return Err(LspFailure {
                reason: LspFailureReason::MissingServer,
                detail: format!("{} has no available language server", self.language),
            });
        }

        let mut guard = self.client.lock().await;
        if let Some(existing) = guard.as_ref() {
            if !existing.has_exited().await {
                return Ok(existing.clone());
            }
        }

        let Some(cmd) = server_command(self.language) else {
            self.disabled.store(true, std::sync::atomic::Ordering::Relaxed);
            return Err(LspFailure {
                reason: LspFailureReason::MissingServer,
                detail: format!("no server command registered for {}", self.language),
            });
        };
        if !probe(&cmd) {
            self.disabled.store(true, std::sync::atomic::Ordering::Relaxed);
            return Err(LspFailure {
                reason: LspFailureReason::MissingServer,
                detail: format!("{} not found on PATH", cmd.join(" ")),
            });
        }

        match LspClient::start(&cmd, &self.workspace_root, self.cfg.clone()).await {
            Ok(client) => {
                *guard = Some(client.clone());
                self.opened.clear();
                Ok(client)
            }
            Err(BlastradiusError::Timeout(_)) => Err(LspFailure {
                reason: LspFailureReason::Timeout,
                detail: format!("starting {} timed out", self.language),
            }),
            Err(e) => Err(classify(&e)),
        }
    }

    async fn ensure_open(&self, client: &LspClient, uri: &str, text: &str) {
        if self.opened.contains_key(uri) {
            return;
        }
        if client.did_open(uri, self.language.key(), text).await.is_ok() {
            self.opened.insert(uri.to_string(), ());
        }
    }

    /// `textDocument/documentSymbol`, cached by `(uri, mtime_ns, size)`.
    pub async fn document_symbol(
        &self,
        path: &Path,
        text: &str,
        mtime_ns: i128,
        size: u64,
    ) -> std::result::Result<Value, LspFailure> {
        self.touch();
        let uri = file_uri(path);
        let key = FileFingerprint { uri: uri.clone(), mtime_ns, size };
        if let Some(cached) = self.doc_symbol_cache.get(&key) {
            return Ok(cached.clone());
        }

        let client = self.ensure_client().await?;
        let _permit = self.semaphore.acquire().await.map_err(|_| LspFailure {
            reason: LspFailureReason::Unknown,
            detail: "semaphore closed".to_string(),
        })?;
        self.ensure_open(&client, &uri, text).await;

        match client.document_symbol(&uri).await {
            Ok(v) => {
                self.doc_symbol_cache.insert(key, v.clone());
                Ok(v)
            }
            Err(e) => Err(classify(&e)),
        }
    }

    /// A single `textDocument/definition`, cached by `(uri, line, char, mtime_ns, size)`.
    pub async fn definition(
        &self,
        path: &Path,
        text: &str,
        mtime_ns: i128,
        size: u64,
        line: u32,
        character: u32,
    ) -> std::result::Result<Value, LspFailure> {
        self.touch();
        let uri = file_uri(path);
        let fp = FileFingerprint { uri: uri.clone(), mtime_ns, size };
        let key = DefinitionKey { file: fp, line, character };
        if let Some(cached) = self.definition_cache.get(&key) {
            return Ok(cached.clone());
        }

        let client = self.ensure_client().await?;
        let _permit = self.semaphore.acquire().await.map_err(|_| LspFailure {
            reason: LspFailureReason::Unknown,
            detail: "semaphore closed".to_string(),
        })?;
        self.ensure_open(&client, &uri, text).await;

        match client.definition(&uri, line, character).await {
            Ok(v) => {
                self.definition_cache.insert(key, v.clone());
                Ok(v)
            }
            Err(e) => Err(classify(&e)),
        }
    }

    /// Batch `definition` lookups for one file: open the document once,
    /// issue N concurrent requests bounded by the session semaphore, and
    /// cache each result individually by stable input index (§4.C, §5
    /// ordering guarantees).
    pub async fn batch_definitions(
        &self,
        path: &Path,
        text: &str,
        mtime_ns: i128,
        size: u64,
        positions: &[BatchDefinitionRequest],
    ) -> Vec<std::result::Result<Value, LspFailure>> {
        self.touch();
        let uri = file_uri(path);
        let client = match self.ensure_client().await {
            Ok(c) => c,
            Err(e) => return positions.iter().map(|_| Err(e.clone())).collect(),
        };
        self.ensure_open(&client, &uri, text).await;

        let fp = FileFingerprint { uri: uri.clone(), mtime_ns, size };
        let futures: Vec<_> = positions
            .iter()
            .map(|p| {
                let client = client.clone();
                let uri = uri.clone();
                let fp = fp.clone();
                let sem = self.semaphore.clone();
                let cache = self.definition_cache.clone();
                let (line, character) = (p.line, p.character);
                async move {
                    let key = DefinitionKey { file: fp, line, character };
                    if let Some(cached) = cache.get(&key) {
                        return Ok(cached.clone());
                    }
                    let _permit = sem.acquire().await.map_err(|_| LspFailure {
                        reason: LspFailureReason::Unknown,
                        detail: "semaphore closed".to_string(),
                    })?;
                    match client.definition(&uri, line, character).await {
                        Ok(v) => {
                            cache.insert(key, v.clone());
                            Ok(v)
                        }
                        Err(e) => Err(classify(&e)),
                    }
                }
            })
            .collect();

        futures::future::join_all(futures).await
    }
}

fn file_uri(path: &Path) -> String {
    url::Url::from_file_path(path)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("file://{}", path.display()))
}

fn classify(err: &BlastradiusError) -> LspFailure {
    match err {
        BlastradiusError::Timeout(_) => LspFailure {
            reason: LspFailureReason::Timeout,
            detail: err.to_string(),
        },
        BlastradiusError::Lsp(msg) => {
            let lower = msg.to_ascii_lowercase();
            let reason = if lower.contains("not found") || lower.contains("no such file") {
                LspFailureReason::MissingServer
            } else if lower.contains("parse") || lower.contains("protocol") || lower.contains("closed") {
                LspFailureReason::ProtocolError
            } else {
                LspFailureReason::Unknown
            };
            LspFailure { reason, detail: msg.clone() }
        }
        other => LspFailure {
            reason: LspFailureReason::Unknown,
            detail: other.to_string(),
        },
    }
}

/// Known opened URIs, exposed for tests that assert `didOpen` dedup.
#[cfg(test)]
pub(crate) fn opened_uris(session: &Session) -> HashSet<String> {
    session.opened.iter().map(|e| e.key().clone()).collect()
}
