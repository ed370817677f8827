//! Google Drive backend (REST API v3).
//!
//! # Endpoints
//! - `GET  /drive/v3/files` with a `q` search expression for listing
//! - `GET  /drive/v3/files/{id}/export?mimeType=...` for spreadsheet export
//! - `DELETE /drive/v3/files/{id}`
//! - `POST /upload/drive/v3/files?uploadType=multipart` for uploads
//!
//! All calls pass `supportsAllDrives=true` so folders on shared drives work.

use std::time::Duration;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{Credentials, FOLDER_MIME, RemoteFile, RemoteStore, XLSX_MIME};
use crate::error::{Error, Result};

const API_BASE: &str = "https://www.googleapis.com/drive/v3";
const UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

/// Store backed by a Google Drive account.
pub struct DriveStore {
    client: Client,
    access_token: String,
    api_base: String,
    upload_base: String,
}

impl DriveStore {
    /// Create a client and obtain an access token from `credentials`.
    pub fn connect(credentials: &Credentials, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let access_token = credentials.access_token(&client)?;
        Ok(Self::with_endpoints(client, access_token, API_BASE, UPLOAD_BASE))
    }

    /// Store talking to the given API and upload base URLs.
    pub(crate) fn with_endpoints(
        client: Client,
        access_token: impl Into<String>,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            access_token: access_token.into(),
            api_base: api_base.into(),
            upload_base: upload_base.into(),
        }
    }

    fn file_url(&self, file_id: &str) -> String {
        format!(
            "{}/files/{}",
            self.api_base,
            utf8_percent_encode(file_id, NON_ALPHANUMERIC)
        )
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.bearer_auth(&self.access_token).send()?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(Error::Api {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            })
        }
    }

    /// Run a search query and collect every page of results.
    fn search(&self, query: &str) -> Result<Vec<RemoteFile>> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(format!("{}/files", self.api_base)).query(&[
                ("q", query),
                ("fields", "nextPageToken, files(id, name)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: FileList = self.send(request)?.json()?;
            files.extend(page.files);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(files)
    }
}

/// Quote a value for use inside a Drive search expression.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn folder_query(name: &str, parent: Option<&str>) -> String {
    let mut query = format!(
        "mimeType = {} and name = {} and trashed = false",
        quote(FOLDER_MIME),
        quote(name)
    );
    if let Some(parent) = parent {
        query.push_str(&format!(" and {} in parents", quote(parent)));
    }
    query
}

fn children_query(folder_id: &str) -> String {
    format!(
        "{} in parents and mimeType != {} and trashed = false",
        quote(folder_id),
        quote(FOLDER_MIME)
    )
}

/// Body of a `multipart/related` upload: JSON metadata, then the media.
fn multipart_body(boundary: &str, metadata: &serde_json::Value, data: &[u8], mime_type: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 512);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

impl RemoteStore for DriveStore {
    fn export_spreadsheet(&self, file_id: &str) -> Result<Vec<u8>> {
        debug!(file_id, "exporting spreadsheet");
        let request = self
            .client
            .get(format!("{}/export", self.file_url(file_id)))
            .query(&[("mimeType", XLSX_MIME)]);
        Ok(self.send(request)?.bytes()?.to_vec())
    }

    fn find_folder(&self, name: &str, parent: Option<&str>) -> Result<Option<String>> {
        let folders = self.search(&folder_query(name, parent))?;
        if folders.len() > 1 {
            debug!(name, count = folders.len(), "several folders match, using the first");
        }
        Ok(folders.into_iter().next().map(|f| f.id))
    }

    fn list_files(&self, folder_id: &str) -> Result<Vec<RemoteFile>> {
        self.search(&children_query(folder_id))
    }

    fn delete(&self, file_id: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.file_url(file_id))
            .query(&[("supportsAllDrives", "true")]);
        self.send(request)?;
        Ok(())
    }

    fn upload(&self, folder_id: &str, name: &str, data: &[u8], mime_type: &str) -> Result<String> {
        let boundary = format!(
            "exambot-{}",
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        );
        let metadata = json!({ "name": name, "parents": [folder_id] });
        let request = self
            .client
            .post(format!("{}/files", self.upload_base))
            .query(&[
                ("uploadType", "multipart"),
                ("supportsAllDrives", "true"),
                ("fields", "id"),
            ])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(multipart_body(&boundary, &metadata, data, mime_type));

        let created: Created = self.send(request)?.json()?;
        Ok(created.id)
    }
}
