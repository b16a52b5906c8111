//! Binary table (`BINTABLE`) column access.

use std::fmt;
use std::str::FromStr;

use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};
use super::format::{ColumnType, TForm};
use super::header::Header;

/// Selects a table column by `TTYPEn` name or 0-based position.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{i}"),
            Self::Name(n) => f.write_str(n),
        }
    }
}

impl FromStr for ColumnRef {
    type Err = Error;

    /// All-digit strings select by position, anything else by name.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::ColumnNotFound("empty column name".into()));
        }
        Ok(match s.parse::<usize>() {
            Ok(i) => Self::Index(i),
            Err(_) => Self::Name(s.to_string()),
        })
    }
}

impl From<&str> for ColumnRef {
    fn from(s: &str) -> Self {
        Self::Name(s.to_string())
    }
}

impl From<usize> for ColumnRef {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

/// Layout and scaling of one table column.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    /// 0-based position.
    pub index: usize,
    /// `TTYPEn`, or `COLn` when absent.
    pub name: String,
    pub form: TForm,
    /// Byte offset within a row.
    pub offset: usize,
    pub unit: Option<String>,
    /// `TSCALn` (default 1).
    pub scale: f64,
    /// `TZEROn` (default 0).
    pub zero: f64,
    /// `TNULLn` for integer columns.
    pub null: Option<i64>,
}

/// Borrowed view of a binary table HDU.
pub struct BinTable<'a> {
    header: &'a Header,
    data: &'a [u8],
    row_len: usize,
    nrows: usize,
    columns: Vec<Column>,
}

impl<'a> BinTable<'a> {
    /// Build the column layout from a header and its data section.
    pub fn new(header: &'a Header, data: &'a [u8]) -> Result<Self> {
        let row_len = header.require_usize("NAXIS1")?;
        let nrows = header.require_usize("NAXIS2")?;
        let tfields = header.require_usize("TFIELDS")?;

        let mut columns = Vec::with_capacity(tfields);
        let mut offset = 0usize;
        for index in 0..tfields {
            let n = index + 1;
            let form = header
                .get_str(&format!("TFORM{n}"))
                .ok_or_else(|| Error::MissingKeyword(format!("TFORM{n}")))
                .and_then(TForm::parse)?;
            let name = header
                .get_str(&format!("TTYPE{n}"))
                .map(str::to_string)
                .unwrap_or_else(|| format!("COL{n}"));
            columns.push(Column {
                index,
                name,
                form,
                offset,
                unit: header.get_str(&format!("TUNIT{n}")).map(str::to_string),
                scale: header.get_float(&format!("TSCAL{n}")).unwrap_or(1.0),
                zero: header.get_float(&format!("TZERO{n}")).unwrap_or(0.0),
                null: header.get_int(&format!("TNULL{n}")),
            });
            offset = offset
                .checked_add(form.byte_width()?)
                .filter(|&end| end <= row_len)
                .ok_or_else(|| {
                    Error::header(format!("column {n} ({form}) does not fit in NAXIS1 = {row_len}"))
                })?;
        }
        let needed = row_len
            .checked_mul(nrows)
            .ok_or_else(|| Error::header("table size overflows"))?;
        if needed > data.len() {
            return Err(Error::UnexpectedEof(data.len() as u64));
        }

        Ok(Self { header, data, row_len, nrows, columns })
    }

    pub fn header(&self) -> &Header {
        self.header
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Bytes per row (`NAXIS1`).
    pub fn row_len(&self) -> usize {
        self.row_len
    }

    /// Resolve a column reference; names match case-insensitively.
    pub fn column(&self, column: &ColumnRef) -> Result<&Column> {
        let found = match column {
            ColumnRef::Index(i) => self.columns.get(*i),
            ColumnRef::Name(name) => self
                .columns
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(name)),
        };
        found.ok_or_else(|| Error::ColumnNotFound(column.to_string()))
    }

    /// Number of values a column holds (`repeat * nrows`).
    pub fn column_len(&self, column: &Column) -> usize {
        column.form.repeat.saturating_mul(self.nrows)
    }

    /// Decode a real-valued column, row by row, applying `TSCALn`/`TZEROn`.
    ///
    /// Integer values equal to `TNULLn` decode to NaN.
    pub fn read_column(&self, column: &Column) -> Result<Vec<f64>> {
        let kind = column.form.kind;
        if !kind.is_real() {
            return Err(Error::UnsupportedFormat(format!(
                "column {} has non-numeric form {}",
                column.name, column.form
            )));
        }
        let width = kind.size();
        let repeat = column.form.repeat;
        let mut out = Vec::with_capacity(self.column_len(column));

        for row in 0..self.nrows {
            let base = row * self.row_len + column.offset;
            let cell = &self.data[base..base + repeat * width];
            for raw in cell.chunks_exact(width) {
                let (value, int) = decode(kind, raw);
                let is_null = kind.is_integer() && int.is_some() && int == column.null;
                out.push(if is_null { f64::NAN } else { column.zero + column.scale * value });
            }
        }
        Ok(out)
    }
}

/// Decode one big-endian element; integer types also return the raw integer.
#[inline]
fn decode(kind: ColumnType, raw: &[u8]) -> (f64, Option<i64>) {
    match kind {
        ColumnType::Byte => (raw[0] as f64, Some(raw[0] as i64)),
        ColumnType::Int16 => {
            let v = BigEndian::read_i16(raw);
            (v as f64, Some(v as i64))
        }
        ColumnType::Int32 => {
            let v = BigEndian::read_i32(raw);
            (v as f64, Some(v as i64))
        }
        ColumnType::Int64 => {
            let v = BigEndian::read_i64(raw);
            (v as f64, Some(v))
        }
        ColumnType::Float32 => (BigEndian::read_f32(raw) as f64, None),
        ColumnType::Float64 => (BigEndian::read_f64(raw), None),
        _ => (f64::NAN, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fits::{Card, Value};
    use byteorder::WriteBytesExt;

    fn table_header(tforms: &[(&str, &str)], row_len: i64, nrows: i64) -> Header {
        let mut h = Header::new();
        h.push(Card::new("XTENSION", Value::Str("BINTABLE".into())))
            .push(Card::new("BITPIX", Value::Integer(8)))
            .push(Card::new("NAXIS", Value::Integer(2)))
            .push(Card::new("NAXIS1", Value::Integer(row_len)))
            .push(Card::new("NAXIS2", Value::Integer(nrows)))
            .push(Card::new("TFIELDS", Value::Integer(tforms.len() as i64)));
        for (i, (name, form)) in tforms.iter().enumerate() {
            h.push(Card::new(format!("TTYPE{}", i + 1), Value::Str(name.to_string())))
                .push(Card::new(format!("TFORM{}", i + 1), Value::Str(form.to_string())));
        }
        h
    }

    #[test]
    fn test_column_ref_parse() {
        assert_eq!("2".parse::<ColumnRef>().unwrap(), ColumnRef::Index(2));
        assert_eq!("I_STOKES".parse::<ColumnRef>().unwrap(), ColumnRef::from("I_STOKES"));
        assert!("".parse::<ColumnRef>().is_err());

        let refs: Vec<ColumnRef> = serde_json::from_str(r#"["TEMPERATURE", 1]"#).unwrap();
        assert_eq!(refs, vec![ColumnRef::from("TEMPERATURE"), ColumnRef::Index(1)]);
    }

    #[test]
    fn test_read_mixed_columns() {
        // Row: 2 x E (8 bytes) + 1 x J (4 bytes) = 12 bytes, 2 rows.
        let mut h = table_header(&[("SIGNAL", "2E"), ("HITS", "J")], 12, 2);
        h.push(Card::new("TSCAL2", Value::Float(0.5)))
            .push(Card::new("TZERO2", Value::Integer(10)))
            .push(Card::new("TNULL2", Value::Integer(-1)));

        let mut data = Vec::new();
        for (a, b, hits) in [(1.5f32, -2.0f32, 4i32), (3.25, 0.0, -1)] {
            data.write_f32::<BigEndian>(a).unwrap();
            data.write_f32::<BigEndian>(b).unwrap();
            data.write_i32::<BigEndian>(hits).unwrap();
        }

        let table = BinTable::new(&h, &data).unwrap();
        assert_eq!(table.nrows(), 2);

        let signal = table.column(&"signal".into()).unwrap();
        assert_eq!(table.read_column(signal).unwrap(), vec![1.5, -2.0, 3.25, 0.0]);

        let hits = table.column(&ColumnRef::Index(1)).unwrap();
        assert_eq!(hits.offset, 8);
        let values = table.read_column(hits).unwrap();
        assert_eq!(values[0], 12.0);
        assert!(values[1].is_nan());

        assert!(matches!(
            table.column(&"MISSING".into()),
            Err(Error::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_layout_checks() {
        let h = table_header(&[("A", "4D")], 16, 1);
        assert!(BinTable::new(&h, &[0u8; 32]).is_err(), "columns wider than NAXIS1");

        let h = table_header(&[("A", "2305843009213693952D")], 8, 1);
        assert!(matches!(BinTable::new(&h, &[0u8; 8]), Err(Error::UnsupportedFormat(_))));

        let h = table_header(&[("A", "1024D"), ("B", "18446744073709551615B")], 8192, 1);
        assert!(matches!(BinTable::new(&h, &[0u8; 8192]), Err(Error::InvalidHeader(_))));

        let h = table_header(&[("A", "D")], 8, 4);
        assert!(matches!(BinTable::new(&h, &[0u8; 16]), Err(Error::UnexpectedEof(16))));

        let h = table_header(&[("NAME", "8A")], 8, 1);
        let data = [b'x'; 8];
        let table = BinTable::new(&h, &data).unwrap();
        let col = table.column(&ColumnRef::Index(0)).unwrap();
        assert!(matches!(table.read_column(col), Err(Error::UnsupportedFormat(_))));
    }
}
