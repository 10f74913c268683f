//! Project memory (spec.md §4.5 "Project memory"): autodetected project
//! type and build system, plus operator-authored notes, persisted to
//! `.photon/memory/project.json`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::PhotonPaths;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProjectProfile {
    pub project_type: Option<String>,
    pub build_system: Option<String>,
    #[serde(default)]
    pub toolchain: Vec<String>,
    #[serde(default)]
    pub architecture_notes: String,
    #[serde(default)]
    pub coding_conventions: String,
}

/// Marker file -> (project type, build system). Checked in order; the
/// first match wins.
const MARKERS: &[(&str, &str, &str)] = &[
    ("Cargo.toml", "rust", "cargo"),
    ("go.mod", "go", "go"),
    ("package.json", "node", "npm"),
    ("pyproject.toml", "python", "pip"),
    ("setup.py", "python", "pip"),
    ("requirements.txt", "python", "pip"),
    ("pom.xml", "java", "maven"),
    ("build.gradle", "java", "gradle"),
    ("CMakeLists.txt", "cpp", "cmake"),
    ("Makefile", "c", "make"),
];

/// `*.csproj` is a glob, not a fixed name, so it is probed separately from
/// `MARKERS` (spec.md's expanded marker-file list, SPEC_FULL.md §4.5).
fn has_csproj(root: &Path) -> bool {
    std::fs::read_dir(root)
        .into_iter()
        .flatten()
        .flatten()
        .any(|e| e.path().extension().and_then(|x| x.to_str()) == Some("csproj"))
}

/// Well-known tools probed on PATH when building the toolchain list.
const CANDIDATE_TOOLS: &[&str] =
    &["cargo", "rustc", "go", "node", "npm", "python3", "make", "cmake", "mvn", "gradle", "dotnet", "git"];

fn on_path(tool: &str) -> bool {
    let Ok(path_var) = std::env::var("PATH") else {
        return false;
    };
    std::env::split_paths(&path_var).any(|dir| {
        let candidate = dir.join(tool);
        candidate.is_file() || dir.join(format!("{tool}.exe")).is_file()
    })
}

fn detect_marker(root: &Path) -> (Option<String>, Option<String>) {
    for (marker, project_type, build_system) in MARKERS {
        if root.join(marker).exists() {
            return (Some(project_type.to_string()), Some(build_system.to_string()));
        }
    }
    if has_csproj(root) {
        return (Some("csharp".to_string()), Some("dotnet".to_string()));
    }
    (None, None)
}

/// Autodetects project type/build system from root marker files and
/// builds the toolchain list from `PATH` (spec.md §4.5: "Detection
/// consults the root for well-known marker files and the PATH for
/// well-known tools").
pub fn detect(root: &Path) -> ProjectProfile {
    let (project_type, build_system) = detect_marker(root);
    let toolchain: Vec<String> = CANDIDATE_TOOLS
        .iter()
        .filter(|tool| on_path(tool))
        .map(|tool| tool.to_string())
        .collect();
    ProjectProfile {
        project_type,
        build_system,
        toolchain,
        architecture_notes: String::new(),
        coding_conventions: String::new(),
    }
}

pub struct ProjectMemory {
    path: PathBuf,
}

impl ProjectMemory {
    pub fn new(project_root: &Path) -> Self {
        Self {
            path: PhotonPaths::new(project_root).project_json(),
        }
    }

    pub fn load(&self) -> ProjectProfile {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, profile: &ProjectProfile) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(profile)?)
    }

    /// Autodetects and persists a fresh profile, preserving any
    /// operator-authored notes already on disk.
    pub fn refresh(&self, root: &Path) -> std::io::Result<ProjectProfile> {
        let existing = self.load();
        let mut profile = detect(root);
        profile.architecture_notes = existing.architecture_notes;
        profile.coding_conventions = existing.coding_conventions;
        self.save(&profile)?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn detects_rust_project_from_cargo_toml() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();
        let profile = detect(dir.path());
        assert_eq!(profile.project_type.as_deref(), Some("rust"));
        assert_eq!(profile.build_system.as_deref(), Some("cargo"));
    }

    #[test]
    fn refresh_preserves_operator_notes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("go.mod"), "module x\n").unwrap();
        let memory = ProjectMemory::new(dir.path());
        let mut profile = memory.load();
        profile.architecture_notes = "layered by module".to_string();
        memory.save(&profile).unwrap();

        let refreshed = memory.refresh(dir.path()).unwrap();
        assert_eq!(refreshed.project_type.as_deref(), Some("go"));
        assert_eq!(refreshed.architecture_notes, "layered by module");
    }

    #[test]
    fn unknown_project_has_no_markers() {
        let dir = TempDir::new().unwrap();
        let profile = detect(dir.path());
        assert!(profile.project_type.is_none());
    }
}
