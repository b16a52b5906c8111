//! Export job configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::fits::ColumnRef;
use crate::healpix::{Healpix, Ordering, ResampleOptions};
use crate::util::{Error, Result};

/// Default unit scale: K to uK.
pub const DEFAULT_SCALE: f64 = 1e6;

/// Default target resolution.
pub const DEFAULT_NSIDE: u32 = 64;

/// Mesh output of an export job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshJob {
    pub path: PathBuf,
    /// Boundary points per pixel edge.
    pub step: usize,
    /// Merge vertices closer than this distance.
    pub weld: Option<f64>,
}

impl Default for MeshJob {
    fn default() -> Self {
        Self {
            path: PathBuf::from("healpix.obj"),
            step: 1,
            weld: None,
        }
    }
}

/// A resample/export job, usually loaded from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Source FITS map. Without it only the mesh is produced.
    pub input: Option<PathBuf>,
    /// Target resolution for samples and mesh.
    pub nside: u32,
    /// Target pixel ordering for samples and mesh faces.
    pub ordering: Ordering,
    /// Columns to export, by name or 0-based position.
    pub fields: Vec<ColumnRef>,
    /// Linear factor applied after resampling.
    pub scale: f64,
    pub pessimistic: bool,
    pub power: Option<f64>,
    /// Directory for `<field>.txt` files.
    pub output_dir: PathBuf,
    /// Also write all resampled fields to one FITS file.
    pub fits_output: Option<PathBuf>,
    pub mesh: Option<MeshJob>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            input: None,
            nside: DEFAULT_NSIDE,
            ordering: Ordering::Ring,
            fields: vec!["I_STOKES".into(), "Q_STOKES".into(), "U_STOKES".into()],
            scale: DEFAULT_SCALE,
            pessimistic: false,
            power: None,
            output_dir: PathBuf::from("."),
            fits_output: None,
            mesh: None,
        }
    }
}

impl ExportConfig {
    /// Parse a JSON job.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a JSON job; relative paths resolve against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let mut config = Self::from_json(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Prefix every relative path with `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(input) = &mut self.input {
            resolve(input);
        }
        resolve(&mut self.output_dir);
        if let Some(fits) = &mut self.fits_output {
            resolve(fits);
        }
        if let Some(mesh) = &mut self.mesh {
            resolve(&mut mesh.path);
        }
    }

    /// Reject jobs that cannot run.
    pub fn validate(&self) -> Result<()> {
        Healpix::new(self.nside).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if self.input.is_none() && self.mesh.is_none() {
            return Err(Error::InvalidConfig("neither input nor mesh given".into()));
        }
        if self.input.is_some() {
            if self.fields.is_empty() {
                return Err(Error::InvalidConfig("no fields to export".into()));
            }
            if !self.nside.is_power_of_two() {
                return Err(Error::InvalidConfig(format!(
                    "resampling needs a power-of-two nside, got {}",
                    self.nside
                )));
            }
        }
        if !self.scale.is_finite() {
            return Err(Error::InvalidConfig(format!("scale {} is not finite", self.scale)));
        }
        if self.ordering == Ordering::Nested && !self.nside.is_power_of_two() {
            return Err(Error::InvalidConfig("NESTED ordering needs a power-of-two nside".into()));
        }
        if let Some(mesh) = &self.mesh {
            if mesh.step == 0 {
                return Err(Error::InvalidConfig("mesh step must be at least 1".into()));
            }
            if mesh.weld.is_some_and(|t| !(t > 0.0)) {
                return Err(Error::InvalidConfig("weld tolerance must be positive".into()));
            }
        }
        Ok(())
    }

    pub fn resample_options(&self) -> ResampleOptions {
        ResampleOptions {
            ordering: Some(self.ordering),
            pessimistic: self.pessimistic,
            power: self.power,
        }
    }
}
