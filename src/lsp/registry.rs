//! Maps a file extension to the `LspClient` that serves it, with one
//! designated fallback entry for extensions that have no dedicated
//! server configured. Held in a `DashMap` so the main thread and the
//! watcher thread don't contend on a single lock.

use std::path::Path;
use std::time::Duration;

use dashmap::DashMap;

use crate::lsp::client::{LspClient, Position};
use crate::lsp::protocol::{DocumentSymbol, Location};

pub struct LspRegistry {
    root: std::path::PathBuf,
    servers: DashMap<String, std::sync::Arc<LspClient>>,
    fallback: Option<std::sync::Arc<LspClient>>,
}

impl LspRegistry {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            root: root.into(),
            servers: DashMap::new(),
            fallback: None,
        }
    }

    /// Build a registry from the configured `extension -> command` map
    /// (`Settings.lsp.servers`).
    pub fn from_config(
        root: impl Into<std::path::PathBuf>,
        servers: &std::collections::HashMap<String, Vec<String>>,
        request_timeout: Duration,
    ) -> Self {
        let mut registry = Self::new(root);
        for (ext, command) in servers {
            if ext == "*" {
                registry.fallback = Some(std::sync::Arc::new(LspClient::new(command.clone(), request_timeout)));
                continue;
            }
            registry
                .servers
                .insert(ext.clone(), std::sync::Arc::new(LspClient::new(command.clone(), request_timeout)));
        }
        registry
    }

    fn client_for(&self, ext: &str) -> Option<std::sync::Arc<LspClient>> {
        self.servers
            .get(ext)
            .map(|e| e.value().clone())
            .or_else(|| self.fallback.clone())
    }

    pub fn has_server_for(&self, ext: &str) -> bool {
        self.client_for(ext).is_some()
    }

    fn uri(path: &Path) -> String {
        format!("file://{}", path.display())
    }

    pub fn document_symbols(&self, ext: &str, path: &Path, content: &str) -> Vec<DocumentSymbol> {
        let Some(client) = self.client_for(ext) else {
            return Vec::new();
        };
        client.document_symbols(&self.root, &Self::uri(path), content, ext)
    }

    pub fn goto_definition(&self, ext: &str, path: &Path, content: &str, pos: Position) -> Vec<Location> {
        let Some(client) = self.client_for(ext) else {
            return Vec::new();
        };
        client.goto_definition(&self.root, &Self::uri(path), content, ext, pos)
    }

    pub fn find_references(&self, ext: &str, path: &Path, content: &str, pos: Position) -> Vec<Location> {
        let Some(client) = self.client_for(ext) else {
            return Vec::new();
        };
        client.find_references(&self.root, &Self::uri(path), content, ext, pos)
    }
}
