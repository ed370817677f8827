//! Directory-backed store.

use std::fs;
use std::path::{Path, PathBuf};

use super::{RemoteFile, RemoteStore};
use crate::error::{Error, Result};

/// Store rooted at a local directory.
///
/// Folders are subdirectories and ids are `/`-separated paths relative to
/// the root. Exporting a spreadsheet reads the file at the given id, which
/// must already be an `.xlsx` file.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, id: &str) -> Result<PathBuf> {
        let relative = Path::new(id);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(Error::InvalidConfig(format!("id escapes store root: {id}")));
        }
        Ok(self.root.join(relative))
    }
}

fn join_id(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{name}", parent.trim_end_matches('/'))
    }
}

impl RemoteStore for LocalStore {
    fn export_spreadsheet(&self, file_id: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.path(file_id)?)?)
    }

    fn find_folder(&self, name: &str, parent: Option<&str>) -> Result<Option<String>> {
        let id = join_id(parent.unwrap_or_default(), name);
        Ok(self.path(&id)?.is_dir().then_some(id))
    }

    fn list_files(&self, folder_id: &str) -> Result<Vec<RemoteFile>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(self.path(folder_id)?)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            files.push(RemoteFile {
                id: join_id(folder_id, &name),
                name,
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    fn delete(&self, file_id: &str) -> Result<()> {
        Ok(fs::remove_file(self.path(file_id)?)?)
    }

    fn upload(&self, folder_id: &str, name: &str, data: &[u8], _mime_type: &str) -> Result<String> {
        let id = join_id(folder_id, name);
        fs::write(self.path(&id)?, data)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PDF_MIME;
    use tempfile::TempDir;

    fn store() -> (TempDir, LocalStore) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("parent/Protocol_PDF")).unwrap();
        let store = LocalStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_find_folder() {
        let (_dir, store) = store();
        assert_eq!(
            store.find_folder("Protocol_PDF", Some("parent")).unwrap(),
            Some("parent/Protocol_PDF".to_string())
        );
        assert_eq!(store.find_folder("Protocol_PDF", None).unwrap(), None);
        assert_eq!(store.find_folder("parent", None).unwrap(), Some("parent".to_string()));
    }

    #[test]
    fn test_upload_list_delete() {
        let (_dir, store) = store();
        let folder = "parent/Protocol_PDF";
        let b = store.upload(folder, "b.pdf", b"%PDF-b", PDF_MIME).unwrap();
        store.upload(folder, "a.pdf", b"%PDF-a", PDF_MIME).unwrap();
        fs::create_dir(store.root().join(folder).join("nested")).unwrap();

        let files = store.list_files(folder).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
        assert_eq!(files[1].id, b);

        store.delete(&b).unwrap();
        assert_eq!(store.list_files(folder).unwrap().len(), 1);
    }

    #[test]
    fn test_export_reads_file() {
        let (_dir, store) = store();
        fs::write(store.root().join("survey.xlsx"), b"PK").unwrap();
        assert_eq!(store.export_spreadsheet("survey.xlsx").unwrap(), b"PK");
        assert!(matches!(store.export_spreadsheet("missing.xlsx"), Err(Error::Io(_))));
    }

    #[test]
    fn test_rejects_escaping_ids() {
        let (_dir, store) = store();
        assert!(store.delete("../outside").is_err());
        assert!(store.list_files("/etc").is_err());
    }
}
