//! The protocol run: fetch, render, compile, publish.
//!
//! Remote storage is only modified after every protocol has been rendered
//! (and compiled, if a backend is given), and old remote files are only
//! deleted once every new PDF is uploaded. A failing run leaves the
//! previously published protocols in place.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use crate::compile::PdfBackend;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::protocol::{ProtocolOptions, file_stem, render_subject};
use crate::store::{PDF_MIME, RemoteStore};
use crate::survey::Survey;
use crate::xlsx::read_sheet_file;

/// Per-invocation switches.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Use this spreadsheet instead of exporting it from the store.
    pub input: Option<PathBuf>,
    /// Render and compile, but leave remote storage untouched.
    pub skip_upload: bool,
    /// Date used in file names; today if unset.
    pub date: Option<NaiveDate>,
}

/// Files written for one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub department: String,
    pub subject: String,
    pub tex: PathBuf,
    pub pdf: Option<PathBuf>,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub protocols: usize,
    pub pdfs: usize,
    pub deleted: usize,
    pub uploaded: usize,
}

/// Run the whole workflow.
///
/// Without a `backend` only `.tex` files are produced and nothing is
/// uploaded, since there are no PDFs to publish.
pub fn run(
    config: &Config,
    store: &dyn RemoteStore,
    backend: Option<&dyn PdfBackend>,
    options: &RunOptions,
) -> Result<Report> {
    let date = options.date.unwrap_or_else(|| Local::now().date_naive());

    let spreadsheet = match &options.input {
        Some(path) => path.clone(),
        None => fetch_spreadsheet(config, store, date)?,
    };

    let generated = generate(config, &spreadsheet, backend, date)?;
    let mut report = Report {
        protocols: generated.len(),
        pdfs: generated.iter().filter(|g| g.pdf.is_some()).count(),
        ..Report::default()
    };
    info!(protocols = report.protocols, pdfs = report.pdfs, "protocols generated");

    if options.skip_upload {
        info!("upload skipped");
    } else if backend.is_none() {
        warn!("no PDF backend, nothing to upload");
    } else {
        let (deleted, uploaded) = publish(config, store)?;
        report.deleted = deleted;
        report.uploaded = uploaded;
    }

    Ok(report)
}

/// Export the response spreadsheet into the working directory.
///
/// Spreadsheets from earlier runs are removed first.
pub fn fetch_spreadsheet(config: &Config, store: &dyn RemoteStore, date: NaiveDate) -> Result<PathBuf> {
    if config.spreadsheet_id.is_empty() {
        return Err(Error::InvalidConfig("spreadsheet_id is not set".into()));
    }

    fs::create_dir_all(&config.workdir)?;
    for path in files_with_extension(&config.workdir, "xlsx")? {
        fs::remove_file(&path)?;
        info!(path = %path.display(), "deleted old spreadsheet");
    }

    let data = store.export_spreadsheet(&config.spreadsheet_id)?;
    let path = config
        .workdir
        .join(format!("{}_protocols.xlsx", date.format("%Y%m%d")));
    fs::write(&path, data)?;
    info!(path = %path.display(), "spreadsheet downloaded");
    Ok(path)
}

/// Render every subject of the spreadsheet into the TeX folder, and compile
/// it into the PDF folder when a backend is given.
///
/// Both folders are emptied first.
pub fn generate(
    config: &Config,
    spreadsheet: &Path,
    backend: Option<&dyn PdfBackend>,
    date: NaiveDate,
) -> Result<Vec<Generated>> {
    let tex_dir = config.tex_dir();
    let pdf_dir = config.pdf_dir();
    clean_local(&tex_dir)?;
    if backend.is_some() {
        clean_local(&pdf_dir)?;
    }

    let sheet = read_sheet_file(spreadsheet, &config.sheet)?;
    let survey = Survey::from_sheet(&sheet, &config.departments)?;
    info!(responses = survey.len(), sheet = %config.sheet, "survey loaded");

    let options = ProtocolOptions {
        encoding: config.target_encoding()?,
        watermark: config
            .watermark
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned()),
    };

    let keys = survey.valid_subjects();
    let mut generated = Vec::new();
    let mut stems = HashSet::new();
    for key in &keys {
        let responses = survey.subject_responses(&key.subject, &key.department)?;
        let source = render_subject(&key.subject, &responses, &options).render();
        // A subject offered by several departments gets one file per department.
        let shared = keys.iter().filter(|k| k.subject == key.subject).count() > 1;
        let stem = if shared {
            format!("{}_{}", file_stem(date, &key.subject), key.department)
        } else {
            file_stem(date, &key.subject)
        };
        if !stems.insert(stem.clone()) {
            return Err(Error::InvalidSpreadsheet(format!(
                "subject {} of {} maps to the file name {stem} of another subject",
                key.subject, key.department
            )));
        }

        let tex = tex_dir.join(format!("{stem}.tex"));
        fs::write(&tex, &source)?;

        let pdf = match backend {
            Some(backend) => {
                let path = pdf_dir.join(format!("{stem}.pdf"));
                fs::write(&path, backend.compile(&stem, &source)?)?;
                info!(subject = %key.subject, department = %key.department, "PDF generated");
                Some(path)
            }
            None => {
                info!(subject = %key.subject, department = %key.department, "TeX generated");
                None
            }
        };

        generated.push(Generated {
            department: key.department.clone(),
            subject: key.subject.clone(),
            tex,
            pdf,
        });
    }

    Ok(generated)
}

/// Replace the contents of the remote PDF folder with the local PDFs.
///
/// The new PDFs are uploaded before any old file is deleted, so a failed
/// upload leaves the previous protocols in place. Old files whose id an
/// upload reused are kept. Returns `(deleted, uploaded)`.
pub fn publish(config: &Config, store: &dyn RemoteStore) -> Result<(usize, usize)> {
    let folder = store
        .find_folder(&config.pdf_folder, config.parent_folder_id.as_deref())?
        .ok_or_else(|| Error::MissingFolder(config.pdf_folder.clone()))?;

    let old = store.list_files(&folder)?;

    let pdfs = files_with_extension(&config.pdf_dir(), "pdf")?;
    let mut uploaded = HashSet::new();
    for path in &pdfs {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let data = fs::read(path)?;
        let id = store.upload(&folder, &name, &data, PDF_MIME)?;
        info!(name = %name, id = %id, "uploaded");
        uploaded.insert(id);
    }
    info!(count = pdfs.len(), "PDF protocols uploaded");

    let mut deleted = 0;
    for file in old.iter().filter(|f| !uploaded.contains(&f.id)) {
        store.delete(&file.id)?;
        info!(name = %file.name, id = %file.id, "deleted remote file");
        deleted += 1;
    }
    info!(count = deleted, "old PDF protocols deleted");

    Ok((deleted, pdfs.len()))
}

/// Create `dir` if needed and delete the files in it.
fn clean_local(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
            info!(file = %entry.file_name().to_string_lossy(), "deleted");
        }
    }
    info!(dir = %dir.display(), "cleaned local folder");
    Ok(())
}

/// Files in `dir` with the given extension, sorted by name.
fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case(extension))
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
