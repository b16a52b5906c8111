//! HEALPix maps stored as FITS binary tables.
//!
//! A map is a column of the first `BINTABLE` extension. Large maps are
//! usually written with a repeat count (e.g. `1024E`), in which case pixel
//! `p` is element `p % repeat` of row `p / repeat`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{BigEndian, WriteBytesExt};
use tracing::{debug, info, warn};

use crate::healpix::{is_unseen, Healpix, Ordering, SkyMap, UNSEEN};
use crate::util::{Error, Result};
use super::format::{padded_len, ColumnType, TForm};
use super::header::{Card, Header, Value};
use super::reader::FitsFile;
use super::table::{BinTable, ColumnRef};

/// Largest repeat count used when writing map columns.
const WRITE_REPEAT: usize = 1024;

/// HEALPix keywords of a map table.
#[derive(Clone, Debug, PartialEq)]
pub struct MapInfo {
    pub nside: u32,
    pub ordering: Ordering,
    /// `TTYPEn` of every column.
    pub columns: Vec<String>,
    pub coordsys: Option<String>,
}

fn ordering_of(header: &Header) -> Result<Ordering> {
    match header.get_str("ORDERING") {
        Some(s) => s.parse(),
        None => {
            warn!("no ORDERING keyword, assuming RING");
            Ok(Ordering::Ring)
        }
    }
}

fn check_indexing(header: &Header) -> Result<()> {
    match header.get_str("INDXSCHM") {
        Some(s) if s.eq_ignore_ascii_case("EXPLICIT") => Err(Error::UnsupportedFormat(
            "explicit (cut-sky) pixel indexing".into(),
        )),
        _ => Ok(()),
    }
}

fn nside_of(table: &BinTable<'_>, npix: usize) -> Result<u32> {
    match table.header().get_int("NSIDE") {
        Some(ns) => u32::try_from(ns).map_err(|_| Error::InvalidNside(ns.unsigned_abs())),
        None => Healpix::nside_for(npix as u64)
            .ok_or_else(|| Error::header(format!("no NSIDE and {npix} is not 12 * nside^2"))),
    }
}

impl FitsFile {
    /// Resolution, ordering and columns of the map table.
    pub fn map_info(&self) -> Result<MapInfo> {
        let table = self.first_bintable()?;
        let header = table.header();
        let columns: Vec<String> = table.columns().iter().map(|c| c.name.clone()).collect();
        let npix = table
            .columns()
            .first()
            .map(|c| table.column_len(c))
            .unwrap_or(0);
        Ok(MapInfo {
            nside: nside_of(&table, npix)?,
            ordering: ordering_of(header)?,
            columns,
            coordsys: header.get_str("COORDSYS").map(str::to_string),
        })
    }

    /// Read one map column.
    ///
    /// NaNs and values equal to `BAD_DATA` become [`UNSEEN`]. Returns the
    /// resolved column name with the map.
    pub fn read_map(&self, column: &ColumnRef) -> Result<(String, SkyMap)> {
        let table = self.first_bintable()?;
        let header = table.header();
        check_indexing(header)?;
        let ordering = ordering_of(header)?;

        let col = table.column(column)?;
        let mut values = table.read_column(col)?;
        let nside = nside_of(&table, values.len())?;

        let bad = header.get_float("BAD_DATA");
        let mut masked = 0usize;
        for v in values.iter_mut() {
            let is_bad = v.is_nan() || bad.is_some_and(|b| *v == b || (is_unseen(b) && is_unseen(*v)));
            if is_bad {
                *v = UNSEEN;
                masked += 1;
            }
        }
        debug!(column = %col.name, nside, %ordering, masked, "read map column");

        let map = SkyMap::new(nside, ordering, values)?;
        Ok((col.name.clone(), map))
    }
}

/// Read one map column from a file.
pub fn read_map(path: impl AsRef<Path>, column: &ColumnRef) -> Result<SkyMap> {
    Ok(FitsFile::open(path)?.read_map(column)?.1)
}

/// Encode maps as a FITS file: empty primary HDU plus one `BINTABLE`
/// with a `D` column per map.
///
/// All maps must share nside and ordering.
pub fn map_to_bytes(maps: &[(&str, &SkyMap)], unit: Option<&str>) -> Result<Vec<u8>> {
    let (_, first) = maps
        .first()
        .ok_or_else(|| Error::other("no maps to write"))?;
    let (nside, ordering, npix) = (first.nside(), first.ordering(), first.len());
    for (name, m) in maps {
        if m.nside() != nside || m.ordering() != ordering {
            return Err(Error::other(format!(
                "map {name} is nside {} {}, expected nside {nside} {ordering}",
                m.nside(),
                m.ordering()
            )));
        }
    }

    let repeat = if npix % WRITE_REPEAT == 0 { WRITE_REPEAT } else { 1 };
    let nrows = npix / repeat;
    let form = TForm::new(repeat, ColumnType::Float64);
    let row_len = form.byte_width()? * maps.len();

    let mut primary = Header::new();
    primary
        .set("SIMPLE", Value::Logical(true), "conforms to FITS standard")
        .set("BITPIX", Value::Integer(8), "")
        .set("NAXIS", Value::Integer(0), "")
        .set("EXTEND", Value::Logical(true), "");

    let mut ext = Header::new();
    ext.set("XTENSION", Value::Str("BINTABLE".into()), "binary table extension")
        .set("BITPIX", Value::Integer(8), "")
        .set("NAXIS", Value::Integer(2), "")
        .set("NAXIS1", Value::Integer(row_len as i64), "bytes per row")
        .set("NAXIS2", Value::Integer(nrows as i64), "rows")
        .set("PCOUNT", Value::Integer(0), "")
        .set("GCOUNT", Value::Integer(1), "")
        .set("TFIELDS", Value::Integer(maps.len() as i64), "");
    for (i, (name, _)) in maps.iter().enumerate() {
        let n = i + 1;
        ext.push(Card::new(format!("TTYPE{n}"), Value::Str(name.to_string())));
        ext.push(Card::new(format!("TFORM{n}"), Value::Str(form.to_string())));
        if let Some(unit) = unit {
            ext.push(Card::new(format!("TUNIT{n}"), Value::Str(unit.to_string())));
        }
    }
    ext.set("PIXTYPE", Value::Str("HEALPIX".into()), "HEALPIX pixelisation")
        .set("ORDERING", Value::Str(ordering.as_str().into()), "pixel ordering scheme")
        .set("NSIDE", Value::Integer(nside as i64), "resolution parameter")
        .set("FIRSTPIX", Value::Integer(0), "")
        .set("LASTPIX", Value::Integer(npix as i64 - 1), "")
        .set("INDXSCHM", Value::Str("IMPLICIT".into()), "indexing")
        .set("OBJECT", Value::Str("FULLSKY".into()), "")
        .set("BAD_DATA", Value::Float(UNSEEN), "sentinel value for missing pixels");

    let mut out = primary.to_bytes()?;
    out.extend_from_slice(&ext.to_bytes()?);

    let data_start = out.len();
    for row in 0..nrows {
        for (_, m) in maps {
            for &v in &m.values()[row * repeat..(row + 1) * repeat] {
                out.write_f64::<BigEndian>(v)?;
            }
        }
    }
    let data_len = out.len() - data_start;
    out.resize(data_start + padded_len(data_len), 0);
    Ok(out)
}

/// Write maps to a FITS file (see [`map_to_bytes`]).
pub fn write_maps(path: impl AsRef<Path>, maps: &[(&str, &SkyMap)], unit: Option<&str>) -> Result<()> {
    let path = path.as_ref();
    let bytes = map_to_bytes(maps, unit)?;
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(&bytes)?;
    w.flush()?;
    info!(path = %path.display(), columns = maps.len(), bytes = bytes.len(), "wrote FITS map");
    Ok(())
}
