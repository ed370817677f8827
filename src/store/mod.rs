//! Remote file storage.
//!
//! The pipeline talks to storage only through [`RemoteStore`]:
//!
//! - [`DriveStore`]: Google Drive REST API v3
//! - [`LocalStore`]: a directory tree, for offline runs and tests

mod credentials;
mod drive;
mod local;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use credentials::Credentials;
pub use drive::DriveStore;
pub use local::LocalStore;

pub const PDF_MIME: &str = "application/pdf";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// A file as listed by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
}

/// Operations the pipeline needs from file storage.
///
/// Ids are opaque strings chosen by the store.
pub trait RemoteStore {
    /// Download a spreadsheet in `.xlsx` format.
    fn export_spreadsheet(&self, file_id: &str) -> Result<Vec<u8>>;

    /// Id of the folder called `name`, optionally restricted to a parent.
    fn find_folder(&self, name: &str, parent: Option<&str>) -> Result<Option<String>>;

    /// Files directly inside a folder.
    fn list_files(&self, folder_id: &str) -> Result<Vec<RemoteFile>>;

    fn delete(&self, file_id: &str) -> Result<()>;

    /// Create a file in a folder and return its id.
    fn upload(&self, folder_id: &str, name: &str, data: &[u8], mime_type: &str) -> Result<String>;
}
