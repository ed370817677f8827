//! Error types for exambot operations.

use thiserror::Error;

/// Errors that can occur while fetching, rendering or publishing protocols.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid credentials: {0}")]
    Credentials(String),

    #[error("Invalid spreadsheet: {0}")]
    InvalidSpreadsheet(String),

    #[error("Sheet not found: {0}")]
    MissingSheet(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid department {given}; valid departments: {valid:?}")]
    InvalidDepartment { given: String, valid: Vec<String> },

    #[error("Invalid subject {given}; valid subjects: {valid:?}")]
    InvalidSubject { given: String, valid: Vec<String> },

    #[error("Remote folder not found: {0}")]
    MissingFolder(String),

    #[error("LaTeX compiler not found: {0}")]
    CompilerNotFound(String),

    #[error("LaTeX compilation failed for {stem}: {log}")]
    Compile { stem: String, log: String },

    #[error("Unknown text encoding: {0}")]
    InvalidEncoding(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
