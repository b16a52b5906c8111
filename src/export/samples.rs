//! Plain-text sample files: one value per line.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::util::{Error, Result};

/// Write values one per line in shortest round-trip scientific notation.
pub fn write_samples<W: Write>(w: &mut W, values: &[f64]) -> io::Result<()> {
    for v in values {
        writeln!(w, "{:e}", v)?;
    }
    Ok(())
}

/// Write a sample file.
pub fn save_samples(path: impl AsRef<Path>, values: &[f64]) -> Result<()> {
    let mut w = BufWriter::new(File::create(path.as_ref())?);
    write_samples(&mut w, values)?;
    w.flush()?;
    Ok(())
}

/// Parse a sample file. Blank lines are skipped.
pub fn read_samples<R: BufRead>(reader: R) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let v = text
            .parse::<f64>()
            .map_err(|e| Error::parse(n + 1, format!("bad sample {text:?}: {e}")))?;
        values.push(v);
    }
    Ok(values)
}

pub fn load_samples(path: impl AsRef<Path>) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Error::FileNotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })?;
    read_samples(BufReader::new(file))
}
