//! Resample/export jobs.
//!
//! A job reads each requested field of a HEALPix FITS map, resamples it to
//! the target nside and ordering, scales it, and writes `<field>.txt` into
//! the output directory. It can also write the pixel mesh at the target
//! resolution, so face `i` of the mesh lines up with line `i` of every
//! sample file.

mod config;
mod samples;

pub use config::*;
pub use samples::*;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::fits::{write_maps, ColumnRef, FitsFile};
use crate::healpix::{ud_grade, Healpix, SkyMap};
use crate::mesh::{obj, pixel_mesh, weld, PixelMeshOptions};
use crate::util::Result;

/// One exported field.
#[derive(Clone, Debug)]
pub struct FieldExport {
    /// Column name as stored in the file.
    pub name: String,
    pub path: PathBuf,
    pub npix: usize,
    /// Pixels that are not UNSEEN.
    pub seen: usize,
}

/// Mesh written by a job.
#[derive(Clone, Debug)]
pub struct MeshExport {
    pub path: PathBuf,
    pub vertices: usize,
    pub faces: usize,
}

/// Outcome of [`run_export`].
#[derive(Default, Debug)]
pub struct ExportReport {
    pub fields: Vec<FieldExport>,
    /// Requested field and error message for every field that failed.
    pub failures: Vec<(String, String)>,
    /// Requested fields naming a column that was already exported.
    pub duplicates: Vec<String>,
    pub fits: Option<PathBuf>,
    pub mesh: Option<MeshExport>,
}

impl ExportReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Read, resample and scale one field.
pub fn resample_field(fits: &FitsFile, field: &ColumnRef, config: &ExportConfig) -> Result<(String, SkyMap)> {
    let (name, map) = fits.read_map(field)?;
    let mut map = ud_grade(&map, config.nside, &config.resample_options())?;
    map.scale(config.scale);
    Ok((name, map))
}

/// File name for a field's samples.
pub fn sample_file_name(field: &str) -> String {
    let stem: String = field
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    format!("{stem}.txt")
}

/// Build the pixel mesh at `nside`, optionally weld it, and write it as OBJ.
pub fn export_mesh(nside: u32, opts: &PixelMeshOptions, weld_tolerance: Option<f64>, path: &Path) -> Result<MeshExport> {
    let hp = Healpix::new(nside)?;
    let mut mesh = pixel_mesh(&hp, opts)?;
    if let Some(tolerance) = weld_tolerance {
        mesh = weld(&mesh, tolerance)?;
    }
    obj::save_obj(path, &mesh)?;
    Ok(MeshExport {
        path: path.to_path_buf(),
        vertices: mesh.num_vertices(),
        faces: mesh.num_faces(),
    })
}

/// Run a job.
///
/// Configuration and input-file errors abort the job. A field that cannot
/// be read, resampled or written is logged and recorded in
/// [`ExportReport::failures`]; the remaining fields are still exported.
/// A field resolving to a column (or sample file) already exported is
/// skipped and listed in [`ExportReport::duplicates`].
pub fn run_export(config: &ExportConfig) -> Result<ExportReport> {
    config.validate()?;
    let mut report = ExportReport::default();

    if let Some(input) = &config.input {
        info!(input = %input.display(), nside = config.nside, ordering = %config.ordering, "exporting fields");
        let fits = FitsFile::open(input)?;
        std::fs::create_dir_all(&config.output_dir)?;

        let mut maps = Vec::new();
        let mut files = HashSet::new();
        for field in &config.fields {
            if let Ok(column) = fits.first_bintable().and_then(|t| Ok(t.column(field)?.name.clone())) {
                if !files.insert(sample_file_name(&column)) {
                    warn!(%field, %column, "column already exported, skipping");
                    report.duplicates.push(field.to_string());
                    continue;
                }
            }
            let exported = resample_field(&fits, field, config).and_then(|(name, map)| {
                let path = config.output_dir.join(sample_file_name(&name));
                save_samples(&path, map.values())?;
                Ok((name, map, path))
            });
            match exported {
                Ok((name, map, path)) => {
                    info!(field = %name, path = %path.display(), "wrote samples");
                    report.fields.push(FieldExport {
                        name: name.clone(),
                        path,
                        npix: map.len(),
                        seen: map.num_seen(),
                    });
                    maps.push((name, map));
                }
                Err(e) => {
                    warn!(%field, error = %e, "field export failed");
                    report.failures.push((field.to_string(), e.to_string()));
                }
            }
        }

        if let Some(path) = &config.fits_output {
            if maps.is_empty() {
                warn!(path = %path.display(), "no fields exported, skipping FITS output");
            } else {
                let refs: Vec<(&str, &SkyMap)> = maps.iter().map(|(n, m)| (n.as_str(), m)).collect();
                write_maps(path, &refs, None)?;
                report.fits = Some(path.clone());
            }
        }
    }

    if let Some(job) = &config.mesh {
        let opts = PixelMeshOptions {
            ordering: config.ordering,
            step: job.step,
        };
        report.mesh = Some(export_mesh(config.nside, &opts, job.weld, &job.path)?);
    }

    info!(
        fields = report.fields.len(),
        failed = report.failures.len(),
        skipped = report.duplicates.len(),
        "export complete"
    );
    Ok(report)
}
