//! PDF overlay command line
//!
//! Opens a PDF, edits its saved text overlays, and exports the annotated file.
//! Overlays are stored per document under `--store`, so separate invocations
//! see the same edits.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use overlay_core::{
    to_surface, BlobStore, DirectoryBlobStore, DirectoryStore, EditField, EditorConfig,
    NormalizedPoint, OverlayId, PageSize, PDF_MIME,
};
use overlay_pdf::{LopdfRenderer, LopdfWriter, PdfEditor};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pdf-overlay")]
#[command(version, about = "Place text overlays on PDF pages and burn them in")]
struct Args {
    /// Editor configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding saved overlays and uploaded files
    #[arg(long, default_value = ".pdf-overlays")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a PDF and copy it into the store
    Upload { file: PathBuf },

    /// Show page count and page sizes
    Pages { document: String },

    /// Add a text overlay
    Add {
        document: String,
        /// 1-based page number
        #[arg(long, default_value = "1")]
        page: usize,
        #[arg(long)]
        text: Option<String>,
        /// Horizontal position as a fraction of page width
        #[arg(long)]
        x: Option<f64>,
        /// Vertical position from the top, as a fraction of page height
        #[arg(long)]
        y: Option<f64>,
        #[arg(long)]
        size: Option<f64>,
        #[arg(long)]
        color: Option<String>,
    },

    /// Print saved overlays as JSON
    List { document: String },

    /// Remove an overlay
    Remove {
        document: String,
        #[arg(long)]
        page: usize,
        #[arg(long)]
        id: String,
    },

    /// Write the annotated PDF
    Export {
        document: String,
        /// Output path; defaults to the derived download name
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn blob_store(store: &Path) -> Result<DirectoryBlobStore> {
    DirectoryBlobStore::open(store.join("blobs")).context("Failed to open blob store")
}

/// Resolve a document argument (a path or a `file://` URL) to its URL and bytes
fn read_document(store: &Path, document: &str) -> Result<(String, Vec<u8>)> {
    if document.starts_with("file://") {
        let bytes = blob_store(store)?
            .fetch(document)
            .with_context(|| format!("Failed to fetch {}", document))?;
        return Ok((document.to_string(), bytes));
    }

    let path = Path::new(document)
        .canonicalize()
        .with_context(|| format!("No such file: {}", document))?;
    let bytes = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok((format!("file://{}", path.display()), bytes))
}

async fn open_editor(args: &Args, document: &str) -> Result<PdfEditor<DirectoryStore>> {
    let config = match &args.config {
        Some(path) => EditorConfig::from_file(path)?,
        None => EditorConfig::default(),
    };
    let overlays = DirectoryStore::open(args.store.join("overlays"))
        .context("Failed to open overlay store")?;

    let (url, bytes) = read_document(&args.store, document)?;
    let mut editor = PdfEditor::new(LopdfRenderer::new(), overlays, config)
        .map_err(|e| anyhow::anyhow!("{} ({})", e.user_message(), e))?;
    editor
        .open(url, &bytes)
        .await
        .map_err(|e| anyhow::anyhow!("{} ({})", e.user_message(), e))?;
    Ok(editor)
}

/// Convert a 1-based page number from the command line
fn page_index(page: usize) -> Result<usize> {
    if page == 0 {
        bail!("Pages are numbered from 1");
    }
    Ok(page - 1)
}

async fn run(args: Args) -> Result<()> {
    match &args.command {
        Command::Upload { file } => {
            let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("document.pdf");
            let is_pdf = file
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
            let mime = if is_pdf { PDF_MIME } else { "application/octet-stream" };
            let uploaded = blob_store(&args.store)?
                .upload(name, &bytes, mime)
                .map_err(|e| anyhow::anyhow!("{} ({})", e.user_message(), e))?;
            println!("{}", uploaded.url);
        }

        Command::Pages { document } => {
            let editor = open_editor(&args, document).await?;
            for (index, size) in editor.page_sizes().iter().enumerate() {
                let failed = editor.pages().get(index).is_some_and(|p| p.surface().is_none());
                println!(
                    "page {}: {} x {} pt{}",
                    index + 1,
                    size.width,
                    size.height,
                    if failed { " (could not be displayed)" } else { "" }
                );
            }
        }

        Command::Add {
            document,
            page,
            text,
            x,
            y,
            size,
            color,
        } => {
            let page = page_index(*page)?;
            let mut editor = open_editor(&args, document).await?;
            let page_size: PageSize = editor
                .page_sizes()
                .get(page)
                .copied()
                .with_context(|| format!("Document has {} pages", editor.page_sizes().len()))?;

            let controller = editor.controller_mut();
            let id = controller.add_text_overlay(page)?;
            if let Some(text) = text {
                controller.on_edit_field(page, &id, EditField::Text(text.clone()))?;
            }
            if let Some(size) = size {
                controller.on_edit_field(page, &id, EditField::FontSize(*size))?;
            }
            if let Some(color) = color {
                controller.on_edit_field(page, &id, EditField::Color(color.clone()))?;
            }
            if x.is_some() || y.is_some() {
                let at = NormalizedPoint {
                    x: x.unwrap_or(0.5),
                    y: y.unwrap_or(0.5),
                };
                controller.on_drag_stop(page, &id, to_surface(at, page_size))?;
            }
            println!("{}", id);
        }

        Command::List { document } => {
            let editor = open_editor(&args, document).await?;
            let json = serde_json::to_string_pretty(&editor.controller().snapshot())
                .context("Failed to serialize overlays")?;
            println!("{}", json);
        }

        Command::Remove { document, page, id } => {
            let page = page_index(*page)?;
            let mut editor = open_editor(&args, document).await?;
            let id = OverlayId::from(id.as_str());
            if editor.controller().overlay(page, &id).is_none() {
                tracing::warn!("No overlay {} on page {}", id, page + 1);
            }
            editor.controller_mut().remove_text_overlay(page, &id)?;
        }

        Command::Export { document, out } => {
            let editor = open_editor(&args, document).await?;
            let exported = editor
                .prepare_export()?
                .run::<LopdfWriter>()
                .map_err(|e| anyhow::anyhow!("{} ({})", e.user_message(), e))?;

            let path = out
                .clone()
                .unwrap_or_else(|| PathBuf::from(&exported.file_name));
            fs::write(&path, &exported.bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(
                "Wrote {} ({} overlays)",
                path.display(),
                exported.placements.len()
            );
            println!("{}", path.display());
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries command output; logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(args).await
}
