//! One LSP subprocess, exclusively owned by its `LspClient`. A background
//! reader thread demultiplexes responses by request id into a shared map
//! guarded by a `parking_lot::Mutex` + `Condvar`.

use std::collections::{HashMap, HashSet};
use std::io::BufReader;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde_json::Value;

use crate::error::{LspError, LspResult};
use crate::lsp::protocol::{self, DocumentSymbol, Location};

#[derive(Debug, Clone, Copy, Default)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

struct Pending {
    responses: Mutex<HashMap<u64, Value>>,
    condvar: Condvar,
}

/// One language server process plus its reader thread.
pub struct LspClient {
    command: Vec<String>,
    child: StdMutex<Option<Child>>,
    stdin: StdMutex<Option<ChildStdin>>,
    reader_handle: StdMutex<Option<std::thread::JoinHandle<()>>>,
    next_id: AtomicU64,
    pending: Arc<Pending>,
    initialized: AtomicBool,
    opened: Mutex<HashSet<String>>,
    request_timeout: Duration,
}

impl LspClient {
    pub fn new(command: Vec<String>, request_timeout: Duration) -> Self {
        Self {
            command,
            child: StdMutex::new(None),
            stdin: StdMutex::new(None),
            reader_handle: StdMutex::new(None),
            next_id: AtomicU64::new(1),
            pending: Arc::new(Pending {
                responses: Mutex::new(HashMap::new()),
                condvar: Condvar::new(),
            }),
            initialized: AtomicBool::new(false),
            opened: Mutex::new(HashSet::new()),
            request_timeout,
        }
    }

    fn ensure_started(&self, root: &std::path::Path) -> LspResult<()> {
        if self.initialized.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.start(root)
    }

    fn start(&self, root: &std::path::Path) -> LspResult<()> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(LspError::NotInitialized);
        };
        let mut child = Command::new(program)
            .args(args)
            .current_dir(root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| LspError::Spawn {
                command: program.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(LspError::NotInitialized)?;
        let stdout = child.stdout.take().ok_or(LspError::NotInitialized)?;

        let pending = Arc::clone(&self.pending);
        let handle = std::thread::spawn(move || {
            let mut reader = BufReader::new(stdout);
            while let Ok(Some(value)) = protocol::read_frame(&mut reader) {
                if let Some(id) = value.get("id").and_then(Value::as_u64) {
                    let mut responses = pending.responses.lock();
                    responses.insert(id, value);
                    pending.condvar.notify_all();
                }
            }
        });

        *self.child.lock().unwrap() = Some(child);
        *self.stdin.lock().unwrap() = Some(stdin);
        *self.reader_handle.lock().unwrap() = Some(handle);

        self.send_request(
            "initialize",
            serde_json::json!({
                "processId": std::process::id(),
                "rootUri": format!("file://{}", root.display()),
                "capabilities": {},
            }),
        )?;
        self.send_notification("initialized", serde_json::json!({}))?;
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn send_notification(&self, method: &str, params: Value) -> LspResult<()> {
        let mut guard = self.stdin.lock().unwrap();
        let stdin = guard.as_mut().ok_or(LspError::NotInitialized)?;
        protocol::write_frame(stdin, &protocol::notification(method, params))
            .map_err(|e| LspError::Transport(e.to_string()))
    }

    fn send_request(&self, method: &str, params: Value) -> LspResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        {
            let mut guard = self.stdin.lock().unwrap();
            let stdin = guard.as_mut().ok_or(LspError::NotInitialized)?;
            protocol::write_frame(stdin, &protocol::request(id, method, params))
                .map_err(|e| LspError::Transport(e.to_string()))?;
        }
        self.await_response(id, method)
    }

    fn await_response(&self, id: u64, method: &str) -> LspResult<Value> {
        let deadline = Instant::now() + self.request_timeout;
        let mut responses = self.pending.responses.lock();
        loop {
            if let Some(value) = responses.remove(&id) {
                return Ok(value.get("result").cloned().unwrap_or(Value::Null));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.initialized.store(false, Ordering::SeqCst);
                return Err(LspError::Timeout {
                    method: method.to_string(),
                    timeout_secs: self.request_timeout.as_secs(),
                });
            }
            let timed_out = self.pending.condvar.wait_for(&mut responses, remaining).timed_out();
            if timed_out {
                self.initialized.store(false, Ordering::SeqCst);
                return Err(LspError::Timeout {
                    method: method.to_string(),
                    timeout_secs: self.request_timeout.as_secs(),
                });
            }
        }
    }

    fn ensure_opened(&self, uri: &str, content: &str, language_id: &str) -> LspResult<()> {
        let mut opened = self.opened.lock();
        if opened.contains(uri) {
            return Ok(());
        }
        self.send_notification(
            "textDocument/didOpen",
            serde_json::json!({
                "textDocument": {
                    "uri": uri,
                    "languageId": language_id,
                    "version": 1,
                    "text": content,
                },
            }),
        )?;
        opened.insert(uri.to_string());
        Ok(())
    }

    /// Issue `method` against `uri`/`pos`. On timeout the server is marked
    /// stale, restarted, and the request retried exactly once.
    fn positional_request(
        &self,
        root: &std::path::Path,
        method: &str,
        uri: &str,
        content: &str,
        language_id: &str,
        pos: Position,
    ) -> LspResult<Value> {
        self.ensure_started(root)?;
        self.ensure_opened(uri, content, language_id)?;
        let params = protocol::text_document_position(uri, pos);
        match self.send_request(method, params.clone()) {
            Ok(v) => Ok(v),
            Err(LspError::Timeout { .. }) => {
                self.start(root)?;
                self.ensure_opened(uri, content, language_id)?;
                self.send_request(method, params)
            }
            Err(e) => Err(e),
        }
    }

    pub fn goto_definition(
        &self,
        root: &std::path::Path,
        uri: &str,
        content: &str,
        language_id: &str,
        pos: Position,
    ) -> Vec<Location> {
        self.positional_request(root, "textDocument/definition", uri, content, language_id, pos)
            .map(|v| Location::parse_many(&v))
            .unwrap_or_default()
    }

    pub fn find_references(
        &self,
        root: &std::path::Path,
        uri: &str,
        content: &str,
        language_id: &str,
        pos: Position,
    ) -> Vec<Location> {
        self.positional_request(root, "textDocument/references", uri, content, language_id, pos)
            .map(|v| Location::parse_many(&v))
            .unwrap_or_default()
    }

    pub fn document_symbols(
        &self,
        root: &std::path::Path,
        uri: &str,
        content: &str,
        language_id: &str,
    ) -> Vec<DocumentSymbol> {
        self.ensure_started(root).ok();
        if self.ensure_opened(uri, content, language_id).is_err() {
            return Vec::new();
        }
        let result = self.send_request(
            "textDocument/documentSymbol",
            serde_json::json!({"textDocument": {"uri": uri}}),
        );
        result.map(|v| DocumentSymbol::parse_many(&v)).unwrap_or_default()
    }
}

impl Drop for LspClient {
    /// Signal the reader to stop, close stdin, wait for the reader to
    /// join, then terminate the child.
    fn drop(&mut self) {
        // Dropping the `ChildStdin` closes the pipe, which unblocks the
        // server's read loop and lets it exit on its own.
        self.stdin.lock().unwrap().take();
        if let Some(mut child) = self.child.lock().unwrap().take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.reader_handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}
