//! Durable record of the last-open composition.
//!
//! The only client-side state this core persists outside the store: the
//! active composition id, written on every successful create/load (and on
//! load-failure reversion) so a new session can auto-resume.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use beltane_types::CompositionId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LastSession {
    pub active_composition: Option<CompositionId>,
}

/// File-backed accessor for [`LastSession`].
#[derive(Debug, Clone)]
pub struct LastSessionFile {
    path: PathBuf,
}

impl LastSessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the user's config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("beltane")
            .join("last-session.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> LastSession {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => LastSession::default(),
        }
    }

    /// Persist the active composition id. Best-effort: failures are logged,
    /// never surfaced, since losing auto-resume is not worth interrupting
    /// an edit.
    pub fn record(&self, active_composition: Option<CompositionId>) {
        let session = LastSession { active_composition };
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&session) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    log::warn!("could not write last-session file: {}", e);
                }
            }
            Err(e) => log::warn!("could not encode last-session file: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn record_and_load() {
        let dir = TempDir::new().unwrap();
        let file = LastSessionFile::new(dir.path().join("last-session.json"));

        assert!(file.load().active_composition.is_none());

        file.record(Some(CompositionId::new(7)));
        assert_eq!(file.load().active_composition, Some(CompositionId::new(7)));

        file.record(None);
        assert!(file.load().active_composition.is_none());
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let file = LastSessionFile::new(dir.path().join("nested").join("last.json"));
        file.record(Some(CompositionId::new(1)));
        assert_eq!(file.load().active_composition, Some(CompositionId::new(1)));
    }

    #[test]
    fn garbage_file_reads_as_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last-session.json");
        std::fs::write(&path, "not json").unwrap();
        let file = LastSessionFile::new(path);
        assert!(file.load().active_composition.is_none());
    }
}
