use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anchorscan_core::Result;
use anchorscan_core::ports::IdentityStore;

/// Anchor identifier persisted as a single line of text.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let trimmed = raw.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn store(&self, value: &str) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, format!("{value}\n"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchorscan_core::identity::resolve_anchor_id;
    use tempfile::TempDir;

    #[test]
    fn missing_file_mints_and_persists_an_identifier() {
        let dir = TempDir::new().unwrap();
        let store = FileIdentityStore::new(dir.path().join("state/anchor_id"));

        let first = resolve_anchor_id(&store).unwrap();
        assert_eq!(first.as_str().len(), 12);
        assert_eq!(store.load().unwrap().as_deref(), Some(first.as_str()));

        let second = resolve_anchor_id(&store).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn legacy_identifier_is_replaced() {
        let dir = TempDir::new().unwrap();
        let store = FileIdentityStore::new(dir.path().join("anchor_id"));
        fs::write(store.path(), "3f2c9a1e-77b0-4c2d-9a51-0d6c1b2e4f88\n").unwrap();

        let id = resolve_anchor_id(&store).unwrap();
        assert_eq!(id.as_str().len(), 12);
        assert!(!id.as_str().contains('-'));
        assert_eq!(
            fs::read_to_string(store.path()).unwrap().trim(),
            id.as_str()
        );
    }

    #[test]
    fn blank_file_reads_as_absent() {
        let dir = TempDir::new().unwrap();
        let store = FileIdentityStore::new(dir.path().join("anchor_id"));
        fs::write(store.path(), "  \n").unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
