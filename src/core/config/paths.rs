use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub index_path: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let user_data_dir = discover_user_data_dir(&project_root);
        Self::with_data_dir(project_root, user_data_dir)
    }

    pub fn with_data_dir(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        let index_path = user_data_dir.join("policy_index.db");
        let secrets_path = user_data_dir.join("secrets.yaml");

        for dir in [&user_data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            project_root,
            user_data_dir,
            log_dir,
            index_path,
            secrets_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

const ROOT_ENV: &str = "POLICY_RAG_ROOT";
const DATA_DIR_ENV: &str = "POLICY_RAG_DATA_DIR";
const APP_DIR_NAME: &str = "policy-rag";

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var(ROOT_ENV) {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }

    env::current_dir().unwrap_or(manifest_dir)
}

fn discover_user_data_dir(project_root: &Path) -> PathBuf {
    let lookup = |key: &str| env::var(key).ok();
    if let Some(dir) = lookup(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    if cfg!(debug_assertions) {
        return project_root.join("data");
    }
    platform_data_dir(env::consts::OS, lookup)
}

/// Per-user data directory for a release build on `os`.
fn platform_data_dir(os: &str, lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    let home = || {
        lookup("HOME")
            .or_else(|| lookup("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    };

    match os {
        "windows" => lookup("LOCALAPPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(home)
            .join(APP_DIR_NAME),
        "macos" => home().join("Library/Application Support").join(APP_DIR_NAME),
        _ => lookup("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| home().join(".local/share"))
            .join(APP_DIR_NAME),
    }
}
