//! User preferences (spec.md §4.5 "User preference"): a flat JSON
//! key/value store at `.photon/memory/preferences.json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::PhotonPaths;

pub struct Preferences {
    path: PathBuf,
}

impl Preferences {
    pub fn new(project_root: &Path) -> Self {
        Self {
            path: PhotonPaths::new(project_root).preferences_json(),
        }
    }

    pub fn all(&self) -> HashMap<String, String> {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.all().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        let mut map = self.all();
        map.insert(key.to_string(), value.to_string());
        self.write(&map)
    }

    pub fn remove(&self, key: &str) -> std::io::Result<()> {
        let mut map = self.all();
        map.remove(key);
        self.write(&map)
    }

    fn write(&self, map: &HashMap<String, String>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(map)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn set_get_remove_round_trip() {
        let dir = TempDir::new().unwrap();
        let prefs = Preferences::new(dir.path());
        prefs.set("theme", "dark").unwrap();
        assert_eq!(prefs.get("theme"), Some("dark".to_string()));
        prefs.remove("theme").unwrap();
        assert_eq!(prefs.get("theme"), None);
    }
}
