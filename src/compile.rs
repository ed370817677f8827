//! Turning LaTeX source into PDF.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{Error, Result};

/// Lines of compiler output kept in [`Error::Compile`].
const LOG_TAIL_LINES: usize = 20;

/// Something that typesets a LaTeX document into PDF bytes.
pub trait PdfBackend {
    /// Compile `source`. `stem` names the job and the intermediate files.
    fn compile(&self, stem: &str, source: &str) -> Result<Vec<u8>>;
}

/// Runs `pdflatex` (or a compatible program) in a scratch directory.
///
/// Assets such as the watermark image are copied next to the source before
/// each run, so documents can refer to them by file name. The scratch
/// directory, and with it every auxiliary file, is removed afterwards.
#[derive(Debug, Clone)]
pub struct Pdflatex {
    program: PathBuf,
    assets: Vec<PathBuf>,
}

impl Pdflatex {
    /// Locate `program` on `PATH` (or use it directly if it is a path).
    pub fn locate(program: &str) -> Result<Self> {
        let program = which::which(program).map_err(|_| Error::CompilerNotFound(program.to_string()))?;
        debug!(program = %program.display(), "found LaTeX compiler");
        Ok(Self {
            program,
            assets: Vec::new(),
        })
    }

    /// Copy `path` into the compile directory for every run.
    pub fn with_asset(mut self, path: impl AsRef<Path>) -> Self {
        self.assets.push(path.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl PdfBackend for Pdflatex {
    fn compile(&self, stem: &str, source: &str) -> Result<Vec<u8>> {
        let dir = tempfile::tempdir()?;
        let tex = dir.path().join(format!("{stem}.tex"));
        fs::write(&tex, source)?;

        for asset in &self.assets {
            if let Some(name) = asset.file_name() {
                fs::copy(asset, dir.path().join(name))?;
            }
        }

        let output = Command::new(&self.program)
            .arg("-interaction=nonstopmode")
            .arg("-halt-on-error")
            .arg(&tex)
            .current_dir(dir.path())
            .output()?;

        if !output.status.success() {
            return Err(Error::Compile {
                stem: stem.to_string(),
                log: log_tail(&String::from_utf8_lossy(&output.stdout)),
            });
        }

        Ok(fs::read(dir.path().join(format!("{stem}.pdf")))?)
    }
}

fn log_tail(log: &str) -> String {
    let lines: Vec<&str> = log.lines().collect();
    let start = lines.len().saturating_sub(LOG_TAIL_LINES);
    lines[start..].join("\n")
}
