//! skymesh CLI - HEALPix meshes and map resampling.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use skymesh::export::{export_mesh, run_export, ExportConfig, ExportReport, DEFAULT_SCALE};
use skymesh::fits::{ColumnRef, FitsFile};
use skymesh::healpix::{Healpix, Ordering};
use skymesh::mesh::PixelMeshOptions;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SKYMESH_BUILD_DATE"), ")");

/// HEALPix pixel meshes and sky map resampling.
#[derive(Parser)]
#[command(name = "skymesh", version = VERSION, about, long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show HDUs, columns and HEALPix keywords of a FITS file.
    #[command(visible_alias = "i")]
    Info {
        file: PathBuf,
    },

    /// Write the pixel-boundary mesh as OBJ.
    #[command(visible_alias = "m")]
    Mesh {
        #[arg(short, long)]
        nside: u32,

        /// Face order (RING or NESTED).
        #[arg(long, default_value = "RING")]
        ordering: Ordering,

        /// Boundary points per pixel edge.
        #[arg(short, long, default_value_t = 1)]
        step: usize,

        /// Merge vertices closer than this distance.
        #[arg(short, long)]
        weld: Option<f64>,

        #[arg(short, long, default_value = "healpix.obj")]
        output: PathBuf,
    },

    /// Resample map fields and write one sample file per field.
    #[command(visible_alias = "r")]
    Resample {
        file: PathBuf,

        #[arg(short, long)]
        nside: u32,

        /// Column name or 0-based index; repeatable. Defaults to I/Q/U Stokes.
        #[arg(short, long = "field")]
        fields: Vec<ColumnRef>,

        #[arg(long, default_value_t = DEFAULT_SCALE)]
        scale: f64,

        /// Output ordering (RING or NESTED).
        #[arg(long, default_value = "RING")]
        ordering: Ordering,

        /// Degraded pixel is UNSEEN if any child is.
        #[arg(long)]
        pessimistic: bool,

        /// Multiply values by (nside_out / nside_in)^power.
        #[arg(long, allow_negative_numbers = true)]
        power: Option<f64>,

        /// Also write the resampled maps to one FITS file.
        #[arg(long)]
        fits: Option<PathBuf>,

        /// Directory for sample files.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Run a JSON export job.
    #[command(visible_alias = "e")]
    Export {
        job: PathBuf,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("SKYMESH_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("skymesh={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `false` when some part of the command failed without aborting it.
fn run(command: Commands) -> Result<bool> {
    match command {
        Commands::Info { file } => cmd_info(&file).map(|_| true),
        Commands::Mesh { nside, ordering, step, weld, output } => {
            let opts = PixelMeshOptions { ordering, step };
            let stats = export_mesh(nside, &opts, weld, &output)
                .with_context(|| format!("failed to write mesh {}", output.display()))?;
            println!("{}: {} vertices, {} faces", stats.path.display(), stats.vertices, stats.faces);
            Ok(true)
        }
        Commands::Resample { file, nside, fields, scale, ordering, pessimistic, power, fits, output } => {
            let mut config = ExportConfig {
                input: Some(file),
                nside,
                ordering,
                scale,
                pessimistic,
                power,
                output_dir: output,
                fits_output: fits,
                mesh: None,
                ..Default::default()
            };
            if !fields.is_empty() {
                config.fields = fields;
            }
            let report = run_export(&config).context("resample failed")?;
            Ok(print_report(&report))
        }
        Commands::Export { job } => {
            let config = ExportConfig::load(&job)
                .with_context(|| format!("failed to load job {}", job.display()))?;
            debug!(?config, "loaded job");
            let report = run_export(&config)
                .with_context(|| format!("job {} failed", job.display()))?;
            Ok(print_report(&report))
        }
    }
}

fn cmd_info(path: &Path) -> Result<()> {
    info!(path = %path.display(), "opening");
    let fits = FitsFile::open(path).with_context(|| format!("failed to open {}", path.display()))?;

    println!("File: {}", path.display());
    println!("HDUs:");
    for hdu in fits.hdus() {
        println!(
            "  [{}] {:<10} {:<16} {} bytes",
            hdu.index,
            format!("{:?}", hdu.kind),
            hdu.name().unwrap_or("-"),
            hdu.data_len()
        );
    }

    if let Ok(map) = fits.map_info() {
        let npix = Healpix::npix_for(map.nside);
        println!();
        println!("HEALPix map:");
        println!("  NSIDE:    {}", map.nside);
        println!("  ORDERING: {}", map.ordering);
        println!("  Pixels:   {}", npix);
        if let Some(coordsys) = &map.coordsys {
            println!("  COORDSYS: {}", coordsys);
        }
        println!("  Columns:");
        for (i, name) in map.columns.iter().enumerate() {
            println!("    {i}: {name}");
        }
    }
    Ok(())
}

fn print_report(report: &ExportReport) -> bool {
    for field in &report.fields {
        println!(
            "{}: {} pixels ({} seen) -> {}",
            field.name,
            field.npix,
            field.seen,
            field.path.display()
        );
    }
    if let Some(path) = &report.fits {
        println!("maps: {}", path.display());
    }
    if let Some(mesh) = &report.mesh {
        println!("mesh: {} vertices, {} faces -> {}", mesh.vertices, mesh.faces, mesh.path.display());
    }
    for field in &report.duplicates {
        eprintln!("skipped: {field}: column already exported");
    }
    for (field, error) in &report.failures {
        eprintln!("failed: {field}: {error}");
    }
    report.is_success()
}
