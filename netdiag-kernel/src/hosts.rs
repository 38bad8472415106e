use std::path::{Path, PathBuf};

/// Hôte synthétique pour les fichiers posés directement à la racine des logs
pub const LOCAL_HOST: &str = "local";

/// Dossiers de la racine qui ne sont pas des hôtes
pub const RESERVED_DIRS: [&str; 3] = ["failures", "snapshots", "archive"];

/// Source des hôtes connus. L'implémentation par défaut liste le système de
/// fichiers ; un registre externe peut la remplacer sans toucher à l'agrégation.
pub trait HostDirectory: Send + Sync {
    /// Identifiants d'hôtes triés lexicographiquement
    fn list_host_directories(&self) -> Vec<String>;

    /// Dossier contenant les flux d'un hôte ; `None` si l'identifiant est invalide
    fn host_dir(&self, host: &str) -> Option<PathBuf>;
}

/// Résolution par listage de la racine de collecte
#[derive(Debug, Clone)]
pub struct FsHostDirectory {
    root: PathBuf,
}

impl FsHostDirectory {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl HostDirectory for FsHostDirectory {
    fn list_host_directories(&self) -> Vec<String> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("[hosts] cannot list {}: {}", self.root.display(), e);
                return Vec::new();
            }
        };

        let mut hosts = Vec::new();
        let mut has_flat_csv = false;
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if path.is_dir() {
                if !RESERVED_DIRS.contains(&name.as_str()) && !name.starts_with('.') {
                    hosts.push(name);
                }
            } else if path.extension().and_then(|s| s.to_str()) == Some("csv") {
                has_flat_csv = true;
            }
        }
        if has_flat_csv && !hosts.iter().any(|h| h == LOCAL_HOST) {
            hosts.push(LOCAL_HOST.to_string());
        }
        hosts.sort();
        hosts
    }

    fn host_dir(&self, host: &str) -> Option<PathBuf> {
        if host == LOCAL_HOST {
            return Some(self.root.clone());
        }
        if !is_valid_host_id(host) {
            return None;
        }
        Some(self.root.join(host))
    }
}

/// Refuse tout identifiant qui sortirait de la racine
fn is_valid_host_id(host: &str) -> bool {
    !host.is_empty()
        && host != "."
        && host != ".."
        && !host.contains(['/', '\\', '\0'])
        && !RESERVED_DIRS.contains(&host)
}
