//! exambot - exam protocol generator

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use chrono::Local;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use exambot::compile::{PdfBackend, Pdflatex};
use exambot::config::{Config, DEFAULT_CONFIG_FILE};
use exambot::store::{Credentials, DriveStore, LocalStore, RemoteStore};
use exambot::text::{filter_string_for, split_segments};
use exambot::{RunOptions, pipeline};

#[derive(Parser)]
#[command(name = "exambot")]
#[command(version, about = "Exam protocol generator", long_about = None)]
#[command(after_help = "EXAMPLES:
    exambot run                          Download, render and publish all protocols
    exambot run --skip-upload            Render and compile, keep remote folder as is
    exambot render responses.xlsx        Render protocols from a local spreadsheet
    exambot split 'Why $e^x$ ?'          Show how an answer is split")]
struct Cli {
    /// Config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full workflow
    Run {
        /// Use a local spreadsheet instead of exporting it
        #[arg(long, value_name = "XLSX")]
        input: Option<PathBuf>,

        /// Only write .tex files
        #[arg(long)]
        skip_pdf: bool,

        /// Do not touch remote storage after rendering
        #[arg(long)]
        skip_upload: bool,

        /// Use a local directory as remote storage
        #[arg(long, value_name = "DIR")]
        store_dir: Option<PathBuf>,

        /// Also write the log to this file
        #[arg(long, value_name = "FILE")]
        log_file: Option<PathBuf>,
    },
    /// Render protocols from a local spreadsheet
    Render {
        /// Spreadsheet (.xlsx)
        #[arg(value_name = "XLSX")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        out: PathBuf,

        /// Only write .tex files
        #[arg(long)]
        skip_pdf: bool,
    },
    /// Print the segments of an answer as JSON
    Split {
        #[arg(value_name = "TEXT")]
        text: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Command::Run { log_file, .. } => log_file.as_deref(),
        _ => None,
    };
    if let Err(e) = init_logging(cli.verbose, cli.quiet, log_file) {
        eprintln!("error: cannot open log file: {e}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Command::Run {
            input,
            skip_pdf,
            skip_upload,
            store_dir,
            log_file: _,
        } => run(
            cli.config.as_deref(),
            input,
            skip_pdf,
            skip_upload,
            store_dir.as_deref(),
        ),
        Command::Render {
            input,
            out,
            skip_pdf,
        } => render(cli.config.as_deref(), &input, out, skip_pdf),
        Command::Split { text } => split(cli.config.as_deref(), &text),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> std::io::Result<()> {
    let level = match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(File::create(path)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    Ok(())
}

/// Load the config file, falling back to defaults when the default file is
/// absent. An explicitly named file must exist.
fn load_config(path: Option<&Path>) -> exambot::Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Config::load(DEFAULT_CONFIG_FILE),
        None => Ok(Config::default()),
    }
}

fn pdf_backend(config: &Config) -> exambot::Result<Pdflatex> {
    let mut backend = Pdflatex::locate(&config.latex_program)?;
    if let Some(watermark) = &config.watermark {
        backend = backend.with_asset(watermark);
    }
    Ok(backend)
}

fn run(
    config_path: Option<&Path>,
    input: Option<PathBuf>,
    skip_pdf: bool,
    skip_upload: bool,
    store_dir: Option<&Path>,
) -> exambot::Result<()> {
    let config = load_config(config_path)?;

    let store: Box<dyn RemoteStore> = match store_dir {
        Some(dir) => Box::new(LocalStore::new(dir)),
        None => {
            let credentials = Credentials::from_file(config.credentials_path())?;
            Box::new(DriveStore::connect(&credentials, config.http_timeout())?)
        }
    };
    let backend = if skip_pdf {
        None
    } else {
        Some(pdf_backend(&config)?)
    };

    let options = RunOptions {
        input,
        skip_upload,
        date: None,
    };
    let report = exambot::run(
        &config,
        store.as_ref(),
        backend.as_ref().map(|b| b as &dyn PdfBackend),
        &options,
    )?;

    info!(
        protocols = report.protocols,
        pdfs = report.pdfs,
        deleted = report.deleted,
        uploaded = report.uploaded,
        "run complete"
    );
    Ok(())
}

fn render(
    config_path: Option<&Path>,
    input: &Path,
    out: PathBuf,
    skip_pdf: bool,
) -> exambot::Result<()> {
    let mut config = load_config(config_path)?;
    config.workdir = out;

    let backend = if skip_pdf {
        None
    } else {
        Some(pdf_backend(&config)?)
    };
    let generated = pipeline::generate(
        &config,
        input,
        backend.as_ref().map(|b| b as &dyn PdfBackend),
        Local::now().date_naive(),
    )?;

    for item in &generated {
        let path = item.pdf.as_ref().unwrap_or(&item.tex);
        println!("{}", path.display());
    }
    Ok(())
}

fn split(config_path: Option<&Path>, text: &str) -> exambot::Result<()> {
    let config = load_config(config_path)?;
    let filtered = filter_string_for(text, config.target_encoding()?);
    let segments: Vec<_> = split_segments(&filtered.text)
        .iter()
        .map(|s| json!({ "content": s.content, "marked_up": s.marked_up }))
        .collect();
    let output = json!({
        "filtered": filtered.text,
        "looks_marked_up": filtered.looks_marked_up,
        "segments": segments,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
