//! # flyerpress CLI
//!
//! Command-line interface for batch flyer generation.
//!
//! ## Usage
//!
//! ```bash
//! # Export one PDF per CSV row into ./flyers
//! flyerpress generate --csv customers.csv --images-dir logos/
//!
//! # Render the second record to a PNG for a quick look
//! flyerpress preview --csv customers.csv --index 2 --png flyer.png
//!
//! # Render every record into ./previews
//! flyerpress preview --csv customers.csv --all --png-dir previews
//!
//! # Start the web UI
//! flyerpress serve --listen 0.0.0.0:8080
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flyerpress::{
    FlyerError,
    assets::AssetRegistry,
    batch::{BatchOrchestrator, BatchReport, ExportOutcome},
    config::FlyerConfig,
    export::DirectorySink,
    logging,
    record::{RecordSource, TableLoad},
    server::{self, ServerConfig},
};

/// flyerpress - Batch flyer and PDF generator
#[derive(Parser, Debug)]
#[command(name = "flyerpress")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log debug output (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Export one PDF per record into a directory
    Generate {
        #[command(flatten)]
        input: InputArgs,

        /// Output directory (created if missing)
        #[arg(long, value_name = "DIR", default_value = "flyers")]
        out: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Compose one record (or all of them) and save as PNG
    Preview {
        #[command(flatten)]
        input: InputArgs,

        /// Record position, starting at 1
        #[arg(long, default_value = "1", conflicts_with = "all")]
        index: usize,

        /// PNG file to write
        #[arg(
            long,
            value_name = "FILE",
            required_unless_present = "all",
            conflicts_with = "all"
        )]
        png: Option<PathBuf>,

        /// Preview every record, one PNG each
        #[arg(long, requires = "png_dir")]
        all: bool,

        /// Directory for `--all` previews (created if missing)
        #[arg(long, value_name = "DIR")]
        png_dir: Option<PathBuf>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Start the HTTP server with the web UI
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: String,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

/// Records and uploaded images.
#[derive(Args, Debug)]
struct InputArgs {
    /// CSV file with logo, phone, message and optional customer columns
    #[arg(long, value_name = "FILE")]
    csv: PathBuf,

    /// Image to register under its filename (repeatable)
    #[arg(long = "image", value_name = "FILE")]
    images: Vec<PathBuf>,

    /// Register every PNG/JPEG in a directory
    #[arg(long, value_name = "DIR")]
    images_dir: Option<PathBuf>,
}

/// Config file and per-field overrides.
#[derive(Args, Debug)]
struct PipelineArgs {
    /// TOML config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Template image
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Directory of bundled logos
    #[arg(long, value_name = "DIR")]
    logo_dir: Option<PathBuf>,

    /// TTF/OTF font for the phone number
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,
}

impl PipelineArgs {
    fn into_config(self) -> Result<FlyerConfig, FlyerError> {
        let mut config = match &self.config {
            Some(path) => FlyerConfig::load(path)?,
            None => FlyerConfig::default(),
        };
        if let Some(template) = self.template {
            config.template = template;
        }
        if let Some(logo_dir) = self.logo_dir {
            config.logo_dir = logo_dir;
        }
        if let Some(font) = self.font {
            config.font = Some(font);
        }
        Ok(config)
    }
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the command ran but some flyers failed.
fn run() -> Result<bool, FlyerError> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Generate {
            input,
            out,
            pipeline,
        } => {
            let config = pipeline.into_config()?;
            let (table, orchestrator) = prepare(&input, &config)?;
            let mut sink = DirectorySink::create(&out)?;

            let report = runtime.block_on(orchestrator.export_all(&table.records, &mut sink));

            print_report(&report);
            println!(
                "{} exported, {} failed -> {}",
                report.exported(),
                report.failed(),
                sink.dir().display()
            );
            Ok(report.is_success())
        }

        Commands::Preview {
            input,
            index,
            png,
            all,
            png_dir,
            pipeline,
        } => {
            let config = pipeline.into_config()?;
            let (table, orchestrator) = prepare(&input, &config)?;

            if all {
                let dir = png_dir.unwrap_or_else(|| PathBuf::from("previews"));
                let mut sink = DirectorySink::create(dir)?;
                let report = runtime.block_on(orchestrator.save_previews(&table.records, &mut sink));
                print_report(&report);
                println!(
                    "{} written, {} failed -> {}",
                    report.exported(),
                    report.failed(),
                    sink.dir().display()
                );
                return Ok(report.is_success());
            }

            let png = png.ok_or_else(|| FlyerError::Config("--png FILE is required".into()))?;
            let record = index
                .checked_sub(1)
                .and_then(|i| table.records.get(i))
                .ok_or_else(|| {
                    FlyerError::NotFound(format!(
                        "no record at position {} ({} loaded)",
                        index,
                        table.records.len()
                    ))
                })?;

            let flyer = runtime.block_on(orchestrator.render(record))?;
            flyer.save(&png)?;
            println!("Saved to {}", png.display());
            Ok(true)
        }

        Commands::Serve { listen, pipeline } => {
            let config = ServerConfig {
                listen_addr: listen,
                flyer: pipeline.into_config()?,
            };
            runtime.block_on(server::serve(config))?;
            Ok(true)
        }
    }
}

/// One line per record status.
fn print_report(report: &BatchReport) {
    for status in &report.statuses {
        match &status.outcome {
            ExportOutcome::Exported { bytes } => {
                println!("  ok      {} ({} bytes)", status.filename, bytes)
            }
            ExportOutcome::Failed { error } => {
                println!("  FAILED  {}: {}", status.filename, error)
            }
        }
    }
}

/// Parse the CSV, register images and build the orchestrator.
fn prepare(
    input: &InputArgs,
    config: &FlyerConfig,
) -> Result<(TableLoad, BatchOrchestrator), FlyerError> {
    let file = std::fs::File::open(&input.csv)
        .map_err(|e| FlyerError::Config(format!("Failed to open {}: {}", input.csv.display(), e)))?;
    let table = RecordSource::parse(file)?;

    for warning in &table.warnings {
        eprintln!("Warning: {}", warning);
    }
    for skipped in &table.skipped {
        match skipped.line {
            Some(line) => eprintln!("Warning: skipped line {}: {}", line, skipped.reason),
            None => eprintln!("Warning: skipped: {}", skipped.reason),
        }
    }
    println!(
        "Loaded {} record(s) from {}",
        table.records.len(),
        input.csv.display()
    );

    let mut images = AssetRegistry::new();
    if let Some(dir) = &input.images_dir {
        register_dir(&mut images, dir)?;
    }
    for path in &input.images {
        register_file(&mut images, path)?;
    }

    let orchestrator = config.orchestrator(config.compositor()?, Arc::new(images));
    Ok((table, orchestrator))
}

fn register_file(images: &mut AssetRegistry, path: &Path) -> Result<(), FlyerError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| FlyerError::Config(format!("Not an image file: {}", path.display())))?;
    let bytes = std::fs::read(path)?;
    if images.insert(name, bytes) {
        eprintln!("Warning: {} replaces an earlier image with the same name", name);
    }
    Ok(())
}

fn register_dir(images: &mut AssetRegistry, dir: &Path) -> Result<(), FlyerError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_image(path))
        .collect();
    paths.sort();

    for path in &paths {
        register_file(images, path)?;
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        .unwrap_or(false)
}
