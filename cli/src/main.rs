//! piimask command line front end.
//!
//! Masks personal information found by OCR in images and PDFs, optionally
//! packaging the results and writing an audit report.

mod config;
mod package;
mod report;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use piimask_core::{DocumentPipeline, PrefixedNaming, ProcessingResult};
use piimask_ocr::{tesseract_languages, TesseractEngine};
use piimask_render::MaskStyle;
use piimask_rules::Classifier;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{load_config, save_config, AppConfig};
use crate::report::AuditReport;

/// Mask personal information in scanned images and PDFs
#[derive(Parser)]
#[command(name = "piimask")]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, env = "PIIMASK_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// More log output (-v for debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mask an image (jpg, jpeg, png, tiff) or a PDF
    Mask {
        /// Input file
        input: PathBuf,

        /// blur or blackout
        #[arg(short, long, default_value_t = MaskStyle::Blur)]
        style: MaskStyle,

        /// Output directory, overrides the configured one
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Also package the outputs into this zip file
        #[arg(long, value_name = "FILE")]
        zip: Option<PathBuf>,

        /// Write a JSON audit report
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Re-run OCR on the outputs and report sensitive text still readable
        #[arg(long)]
        verify: bool,
    },

    /// Configuration file helpers
    Config {
        /// Write the default configuration to FILE
        #[arg(long, value_name = "FILE")]
        write: PathBuf,
    },

    /// List the Tesseract language packs installed
    Languages,
}

struct MaskRequest<'a> {
    input: &'a Path,
    style: MaskStyle,
    output_dir: Option<PathBuf>,
    zip: Option<&'a Path>,
    report: Option<&'a Path>,
    verify: bool,
}

fn init_logging(verbose: u8) {
    let filter = if verbose > 0 {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_mask(config: &AppConfig, request: MaskRequest<'_>) -> Result<ExitCode> {
    let output_dir = request
        .output_dir
        .unwrap_or_else(|| config.output_dir.clone());

    let engine = TesseractEngine::new(config.pipeline.tesseract.clone())
        .context("Tesseract is not available; set pipeline.tesseract.binaryPath")?;
    let mut pipeline = DocumentPipeline::from_config(
        &config.pipeline,
        Box::new(engine),
        Box::new(PrefixedNaming::new(&output_dir)),
    )?;

    let result = pipeline
        .process(request.input, request.style)
        .with_context(|| format!("Masking {} failed", request.input.display()))?;

    match &result {
        ProcessingResult::Image(path) => println!("{}", path.display()),
        ProcessingResult::Pages(paths) => {
            if paths.is_empty() {
                println!("{} has no pages", request.input.display());
            }
            for path in paths {
                println!("{}", path.display());
            }
        }
    }

    let verification = if request.verify {
        let mut engine = TesseractEngine::new(config.pipeline.tesseract.clone())?;
        let classifier = Classifier::new(&config.pipeline.policy)?;
        let outcome = piimask_verify::verify_outputs(result.paths(), &mut engine, &classifier)?;
        for warning in &outcome.warnings {
            eprintln!("warning: {}", warning);
        }
        Some(outcome)
    } else {
        None
    };
    let residual = verification.as_ref().is_some_and(|v| !v.ok);

    if let Some(dest) = request.zip {
        package::write_zip(result.paths(), dest)
            .with_context(|| format!("Failed to write {}", dest.display()))?;
        println!("{}", dest.display());
    }

    if let Some(dest) = request.report {
        let report = AuditReport::build(
            request.input,
            request.style,
            pipeline.ocr_name(),
            result.paths(),
            pipeline.last_reports(),
            verification,
        )
        .context("Failed to hash outputs")?;
        report
            .write(dest)
            .with_context(|| format!("Failed to write {}", dest.display()))?;
    }

    Ok(if residual {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    tracing::debug!("piimask v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Mask {
            input,
            style,
            output_dir,
            zip,
            report,
            verify,
        } => run_mask(
            &config,
            MaskRequest {
                input,
                style: *style,
                output_dir: output_dir.clone(),
                zip: zip.as_deref(),
                report: report.as_deref(),
                verify: *verify,
            },
        ),
        Commands::Config { write } => {
            save_config(write, &AppConfig::default())?;
            println!("{}", write.display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Languages => {
            let tesseract = &config.pipeline.tesseract;
            let languages = tesseract_languages(
                tesseract.binary_or_default(),
                tesseract.tessdata_path.as_deref(),
            )?;
            for lang in languages {
                println!("{}", lang);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
