use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use lecture_notes::{
    extract::{DocumentFormat, ExtractorRegistry},
    ingress::UploadedFile,
    package::build_archive,
    render::render,
};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "render-notes",
    about = "Offline helpers for the lecture notes pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the labeled source bundle for local files or directories.
    Extract {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Render a markdown notes file into the DOCX/PDF archive.
    Render {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Extract { paths } => extract_sources(&paths),
        Command::Render { input, output } => render_archive(&input, &output),
    }
}

fn extract_sources(paths: &[PathBuf]) -> Result<()> {
    let registry = ExtractorRegistry::with_defaults();
    let mut files = Vec::new();

    for path in collect_files(paths)? {
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        if DocumentFormat::from_filename(&display_name).is_none() {
            eprintln!("skipping unsupported file {}", path.display());
            continue;
        }
        let bytes =
            fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        files.push(UploadedFile::new(&display_name, bytes));
    }

    if files.is_empty() {
        bail!("no supported files found");
    }

    let bundle = registry
        .extract_all(&files)
        .context("failed to extract source text")?;
    println!("{}", bundle.render());
    Ok(())
}

/// Expand directories recursively; files are returned in a stable, sorted order.
fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry =
                    entry.with_context(|| format!("failed to walk {}", path.display()))?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            bail!("{} does not exist", path.display());
        }
    }
    Ok(files)
}

fn render_archive(input: &Path, output: &Path) -> Result<()> {
    let markdown = fs::read_to_string(input)
        .with_context(|| format!("failed to read notes at {}", input.display()))?;
    if markdown.trim().is_empty() {
        bail!("{} contains no notes", input.display());
    }

    let artifacts = render(&markdown).context("failed to render notes")?;
    let archive = build_archive(&artifacts).context("failed to package notes")?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(output, &archive)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let digest = hex::encode(Sha256::digest(&archive));
    println!("{digest}  {}", output.display());
    Ok(())
}
