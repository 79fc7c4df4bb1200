// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inkwerk — notebook export archive to PDF converter.
//
// Entry point. Initialises logging, merges the config file with command-line
// flags, and runs the archive through the reader and renderer.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use inkwerk_archive::ContainerReader;
use inkwerk_core::ExportConfig;
use tracing_subscriber::EnvFilter;

/// Convert a notebook export archive into a PDF.
#[derive(Parser, Debug)]
#[command(
    name = "inkwerk",
    version,
    about = "Convert a notebook export archive into a PDF with strokes and highlights",
    arg_required_else_help = true
)]
struct Cli {
    /// Export archive (.zip) to convert.
    archive: PathBuf,

    /// Output PDF. Defaults to the archive path with a .pdf extension.
    #[arg(short, long, env = "INKWERK_OUTPUT")]
    output: Option<PathBuf>,

    /// Emit every page, including pages without strokes.
    #[arg(long, env = "INKWERK_ALL_PAGES")]
    all_pages: bool,

    /// Export strokes and highlights without the background PDF.
    #[arg(long, env = "INKWERK_ANNOTATIONS_ONLY")]
    annotations_only: bool,

    /// JSON export configuration. Flags given here override its values.
    #[arg(long, env = "INKWERK_CONFIG")]
    config: Option<PathBuf>,

    /// Author recorded on highlight annotations.
    #[arg(long, env = "INKWERK_AUTHOR")]
    author: Option<String>,

    /// Document title. Defaults to the archive identifier.
    #[arg(long)]
    title: Option<String>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "INKWERK_VERBOSE")]
    verbose: bool,
}

impl Cli {
    fn export_config(&self) -> Result<ExportConfig> {
        let mut config = match &self.config {
            Some(path) => ExportConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => ExportConfig::default(),
        };

        config.all_pages |= self.all_pages;
        config.annotations_only |= self.annotations_only;
        if let Some(author) = &self.author {
            config.highlight_author = author.clone();
        }
        if let Some(title) = &self.title {
            config.title = Some(title.clone());
        }
        Ok(config)
    }

    fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.archive.with_extension("pdf"))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.export_config()?;
    let output = cli.output_path();
    if output == cli.archive {
        bail!("Output {} would overwrite the input archive", output.display());
    }

    tracing::info!(archive = %cli.archive.display(), output = %output.display(), "Inkwerk starting");

    let document = ContainerReader::new()
        .open(&cli.archive)
        .with_context(|| format!("Failed to read archive {}", cli.archive.display()))?;

    inkwerk_render::render_to_file(&document, &config, &output)
        .with_context(|| format!("Failed to export {}", output.display()))?;

    println!("{}", output.display());
    Ok(())
}
