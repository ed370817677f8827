//! Run configuration.
//!
//! Loaded once from a TOML file and passed explicitly to
//! [`pipeline::run`](crate::pipeline::run). Nothing reads ambient state.
//!
//! ```toml
//! spreadsheet_id = "1AxfeWr3aFOb..."
//! parent_folder_id = "0B7..."
//! workdir = "/srv/exambot"
//! watermark = "/srv/exambot/logo.png"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::text::TargetEncoding;

/// Default config file looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "exambot.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Id of the response spreadsheet in remote storage.
    pub spreadsheet_id: String,
    /// Folder under which the PDF folder is looked up.
    pub parent_folder_id: Option<String>,
    /// Local directory for downloads and generated files.
    pub workdir: PathBuf,
    /// `token.json`; defaults to `<workdir>/token.json`.
    pub credentials: Option<PathBuf>,
    /// Sheet holding the responses.
    pub sheet: String,
    /// Departments in the order their protocols are generated.
    pub departments: Vec<String>,
    /// Name of both the local and the remote PDF folder.
    pub pdf_folder: String,
    /// Name of the local TeX folder.
    pub tex_folder: String,
    /// Image drawn faded behind every page.
    pub watermark: Option<PathBuf>,
    /// Target encoding label for answer filtering.
    pub encoding: String,
    pub latex_program: String,
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            parent_folder_id: None,
            workdir: PathBuf::from("."),
            credentials: None,
            sheet: "Sheet2".to_string(),
            departments: vec!["itet".to_string(), "phys".to_string(), "other".to_string()],
            pdf_folder: "Protocol_PDF".to_string(),
            tex_folder: "Protocol_Latex".to_string(),
            watermark: None,
            encoding: "bmp".to_string(),
            latex_program: "pdflatex".to_string(),
            http_timeout_secs: 60,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading config");
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.departments.is_empty() {
            return Err(Error::InvalidConfig("departments must not be empty".into()));
        }
        if self.sheet.trim().is_empty() {
            return Err(Error::InvalidConfig("sheet must not be empty".into()));
        }
        self.target_encoding()?;
        Ok(())
    }

    pub fn target_encoding(&self) -> Result<TargetEncoding> {
        self.encoding.parse()
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.credentials
            .clone()
            .unwrap_or_else(|| self.workdir.join("token.json"))
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.workdir.join(&self.pdf_folder)
    }

    pub fn tex_dir(&self) -> PathBuf {
        self.workdir.join(&self.tex_folder)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
