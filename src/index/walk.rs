//! Directory walking for a scan: `ignore::WalkBuilder` with gitignore
//! support plus an `OverrideBuilder` for the configured ignore patterns.

use std::path::{Path, PathBuf};

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;

pub fn walk_files(root: &Path, ignore_patterns: &[String]) -> Vec<PathBuf> {
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .follow_links(false)
        .require_git(false);

    let mut overrides = OverrideBuilder::new(root);
    for pattern in ignore_patterns {
        let _ = overrides.add(&format!("!{pattern}"));
        let _ = overrides.add(&format!("!**/{pattern}/**"));
    }
    if let Ok(overrides) = overrides.build() {
        builder.overrides(overrides);
    }

    builder
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(|entry| entry.into_path())
        .collect()
}

pub fn relative_path(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}
