//! Layered configuration via `figment`: defaults -> `.photon/settings.toml`
//! -> `PHOTON_`-prefixed environment variables.
//!
//! # Environment variables
//!
//! `PHOTON_INDEXING__IGNORE_MAX_DEPTH=4` sets `indexing.list_max_depth`;
//! double underscores separate nested levels.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory name for all on-disk engine state.
pub const PHOTON_DIR: &str = ".photon";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub lsp: LspConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexingConfig {
    /// Directory/file-name components skipped during scans and walks.
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
    /// Interval in seconds between watcher metadata-only rescans.
    #[serde(default = "default_watch_interval_secs")]
    pub watch_interval_secs: u64,
    /// Max recursion depth for `list_project_files`.
    #[serde(default = "default_list_max_depth")]
    pub list_max_depth: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Line cap for `read_code_block` / `apply_patch` range edits.
    #[serde(default = "default_max_read_lines")]
    pub max_read_lines: u32,
    /// File extensions exempt from the line cap (non-code files).
    #[serde(default = "default_non_code_extensions")]
    pub non_code_extensions: Vec<String>,
    /// `run_command` captured output cap, in bytes.
    #[serde(default = "default_command_output_cap")]
    pub command_output_cap_bytes: usize,
    /// `run_command` / `syntax_check` wall-clock timeout.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// `grep` result cap.
    #[serde(default = "default_grep_max_results")]
    pub grep_max_results: usize,
    /// Whether `apply_patch` writes a backup by default.
    #[serde(default = "default_true")]
    pub backup_by_default: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Character-count threshold that triggers context compression.
    #[serde(default = "default_context_threshold_chars")]
    pub context_threshold_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LspConfig {
    #[serde(default = "default_lsp_timeout_secs")]
    pub request_timeout_secs: u64,
    /// extension -> server command line, e.g. `"rs" -> ["rust-analyzer"]`.
    #[serde(default)]
    pub servers: std::collections::HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_llm_retries")]
    pub max_retries: u32,
    /// Providers that reject array-typed `content` get it flattened.
    #[serde(default)]
    pub flatten_content: bool,
    /// Providers that reject a `name` field on tool-result messages.
    #[serde(default)]
    pub drop_tool_result_name: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub default: String,
    #[serde(default)]
    pub modules: std::collections::HashMap<String, String>,
}

fn default_ignore_patterns() -> Vec<String> {
    vec![
        ".git".into(),
        "node_modules".into(),
        "build".into(),
        ".venv".into(),
        PHOTON_DIR.into(),
    ]
}
fn default_watch_interval_secs() -> u64 {
    5
}
fn default_list_max_depth() -> usize {
    8
}
fn default_max_read_lines() -> u32 {
    500
}
fn default_non_code_extensions() -> Vec<String> {
    [
        "json", "md", "yml", "yaml", "toml", "txt", "xml", "html", "cmake", "lock", "ini", "cfg",
        "conf", "env", "gitignore", "cursorignore",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_command_output_cap() -> usize {
    30 * 1024
}
fn default_command_timeout_secs() -> u64 {
    30
}
fn default_grep_max_results() -> usize {
    200
}
fn default_true() -> bool {
    true
}
fn default_max_iterations() -> usize {
    50
}
fn default_context_threshold_chars() -> usize {
    100_000
}
fn default_lsp_timeout_secs() -> u64 {
    10
}
fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".into()
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_read_timeout_secs() -> u64 {
    60
}
fn default_llm_retries() -> u32 {
    3
}
fn default_log_level() -> String {
    "warn".into()
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: default_ignore_patterns(),
            watch_interval_secs: default_watch_interval_secs(),
            list_max_depth: default_list_max_depth(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_read_lines: default_max_read_lines(),
            non_code_extensions: default_non_code_extensions(),
            command_output_cap_bytes: default_command_output_cap(),
            command_timeout_secs: default_command_timeout_secs(),
            grep_max_results: default_grep_max_results(),
            backup_by_default: true,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            context_threshold_chars: default_context_threshold_chars(),
        }
    }
}

impl Default for LspConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_lsp_timeout_secs(),
            servers: std::collections::HashMap::new(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            max_retries: default_llm_retries(),
            flatten_content: false,
            drop_tool_result_name: false,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            indexing: IndexingConfig::default(),
            tools: ToolsConfig::default(),
            agent: AgentConfig::default(),
            lsp: LspConfig::default(),
            llm: LlmConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    /// Load configuration layered over `root/.photon/settings.toml`.
    pub fn load(root: &Path) -> Result<Self, figment::Error> {
        Self::load_from(root.join(PHOTON_DIR).join("settings.toml"))
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("PHOTON_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_string =
            toml::to_string_pretty(self).map_err(|e| std::io::Error::other(e.to_string()))?;
        std::fs::write(path, toml_string)
    }
}

/// `.photon/` layout helper: every on-disk path the engine touches.
pub struct PhotonPaths {
    root: PathBuf,
}

impl PhotonPaths {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            root: project_root.into(),
        }
    }

    pub fn photon_dir(&self) -> PathBuf {
        self.root.join(PHOTON_DIR)
    }
    pub fn settings_file(&self) -> PathBuf {
        self.photon_dir().join("settings.toml")
    }
    pub fn index_dir(&self) -> PathBuf {
        self.photon_dir().join("index")
    }
    pub fn symbols_json(&self) -> PathBuf {
        self.index_dir().join("symbols.json")
    }
    pub fn symbol_calls_json(&self) -> PathBuf {
        self.index_dir().join("symbol_calls.json")
    }
    pub fn call_graph_json(&self) -> PathBuf {
        self.index_dir().join("call_graph.json")
    }
    pub fn backups_dir(&self) -> PathBuf {
        self.photon_dir().join("backups")
    }
    pub fn patches_dir(&self) -> PathBuf {
        self.photon_dir().join("patches")
    }
    pub fn patch_stack_json(&self) -> PathBuf {
        self.patches_dir().join("patch_stack.json")
    }
    pub fn last_patch(&self) -> PathBuf {
        self.patches_dir().join("last.patch")
    }
    pub fn last_patch_json(&self) -> PathBuf {
        self.patches_dir().join("last_patch.json")
    }
    pub fn memory_dir(&self) -> PathBuf {
        self.photon_dir().join("memory")
    }
    pub fn failures_json(&self) -> PathBuf {
        self.memory_dir().join("failures.json")
    }
    pub fn project_json(&self) -> PathBuf {
        self.memory_dir().join("project.json")
    }
    pub fn preferences_json(&self) -> PathBuf {
        self.memory_dir().join("preferences.json")
    }
    pub fn current_attempt_json(&self) -> PathBuf {
        self.photon_dir().join("current_attempt.json")
    }
    pub fn logs_dir(&self) -> PathBuf {
        self.photon_dir().join("logs")
    }
    pub fn task_log(&self, task_id: &str) -> PathBuf {
        self.logs_dir().join(format!("task_{task_id}.log"))
    }
}
