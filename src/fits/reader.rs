//! FITS file reader: byte source and HDU layout.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use flate2::read::GzDecoder;
#[cfg(feature = "mmap")]
use memmap2::Mmap;
use tracing::{debug, trace};

use crate::util::{Error, Result};
use super::format::*;
use super::header::Header;
use super::table::BinTable;

/// Backing bytes of an opened file.
enum Source {
    /// Memory-mapped file (preferred for large maps)
    #[cfg(feature = "mmap")]
    Mmap(Mmap),
    /// Whole file in memory (decompressed inputs, `mmap` disabled)
    Buffer(Vec<u8>),
}

impl Source {
    #[inline]
    fn bytes(&self) -> &[u8] {
        match self {
            #[cfg(feature = "mmap")]
            Self::Mmap(m) => &m[..],
            Self::Buffer(b) => b.as_slice(),
        }
    }
}

/// Kind of header-data unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HduKind {
    Primary,
    BinTable,
    Image,
    Other(String),
}

/// One header-data unit: its header and the location of its data.
#[derive(Clone, Debug)]
pub struct Hdu {
    pub index: usize,
    pub kind: HduKind,
    pub header: Header,
    data_offset: usize,
    data_len: usize,
}

impl Hdu {
    /// Byte offset of the data section in the file.
    #[inline]
    pub fn data_offset(&self) -> usize {
        self.data_offset
    }

    /// Unpadded size of the data section.
    #[inline]
    pub fn data_len(&self) -> usize {
        self.data_len
    }

    /// Extension name (`EXTNAME`), if any.
    pub fn name(&self) -> Option<&str> {
        self.header.get_str("EXTNAME")
    }
}

/// Size in bytes of the data section described by a header.
fn data_size(header: &Header) -> Result<usize> {
    let bitpix = header.require_int("BITPIX")?;
    if !matches!(bitpix, 8 | 16 | 32 | 64 | -32 | -64) {
        return Err(Error::header(format!("invalid BITPIX {bitpix}")));
    }
    let naxis = header.require_usize("NAXIS")?;
    if naxis == 0 {
        return Ok(0);
    }
    let mut elements = 1usize;
    for i in 1..=naxis {
        elements = elements
            .checked_mul(header.require_usize(&format!("NAXIS{i}"))?)
            .ok_or_else(|| Error::header("data size overflows"))?;
    }
    let pcount = usize::try_from(header.get_int("PCOUNT").unwrap_or(0).max(0))
        .map_err(|_| Error::header("PCOUNT out of range"))?;
    let gcount = usize::try_from(header.get_int("GCOUNT").unwrap_or(1).max(1))
        .map_err(|_| Error::header("GCOUNT out of range"))?;
    (bitpix.unsigned_abs() as usize / 8)
        .checked_mul(gcount)
        .and_then(|n| n.checked_mul(pcount.checked_add(elements)?))
        .ok_or_else(|| Error::header("data size overflows"))
}

/// An opened FITS file.
pub struct FitsFile {
    source: Source,
    hdus: Vec<Hdu>,
}

impl FitsFile {
    /// Open a file, memory mapping it when the `mmap` feature is enabled.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, true)
    }

    /// Open a file with optional memory mapping.
    ///
    /// Gzip-compressed files are detected by their magic bytes and always
    /// decompressed into memory.
    pub fn open_opts(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let mut magic = [0u8; 2];
        let is_gzip = file.read(&mut magic)? == 2 && magic == GZIP_MAGIC;
        file.seek(SeekFrom::Start(0))?;

        let source = if is_gzip {
            debug!(path = %path.display(), "decompressing gzip input");
            let mut buf = Vec::new();
            GzDecoder::new(file).read_to_end(&mut buf)?;
            Source::Buffer(buf)
        } else {
            Self::load(file, use_mmap)?
        };

        Self::from_source(source)
    }

    #[cfg(feature = "mmap")]
    fn load(mut file: File, use_mmap: bool) -> Result<Source> {
        if use_mmap && file.metadata()?.len() > 0 {
            // Safety: the map is read-only and lives as long as `FitsFile`.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            return Ok(Source::Mmap(mmap));
        }
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Ok(Source::Buffer(buf))
    }

    #[cfg(not(feature = "mmap"))]
    fn load(mut file: File, _use_mmap: bool) -> Result<Source> {
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Ok(Source::Buffer(buf))
    }

    /// Parse a FITS file held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_source(Source::Buffer(bytes))
    }

    fn from_source(source: Source) -> Result<Self> {
        let hdus = Self::scan(source.bytes())?;
        debug!(hdus = hdus.len(), "parsed FITS layout");
        Ok(Self { source, hdus })
    }

    /// Walk the HDUs of a file.
    fn scan(data: &[u8]) -> Result<Vec<Hdu>> {
        if data.len() < BLOCK_SIZE {
            return Err(Error::UnexpectedEof(data.len() as u64));
        }
        let mut hdus = Vec::new();
        let mut offset = 0usize;

        while offset + BLOCK_SIZE <= data.len() {
            let (header, header_len) = Header::parse(data, offset)?;
            let kind = if hdus.is_empty() {
                if header.get_bool("SIMPLE") != Some(true) {
                    return Err(Error::NotFits);
                }
                HduKind::Primary
            } else {
                match header.get_str("XTENSION") {
                    Some(x) if x.eq_ignore_ascii_case("BINTABLE") => HduKind::BinTable,
                    Some(x) if x.eq_ignore_ascii_case("IMAGE") => HduKind::Image,
                    Some(x) => HduKind::Other(x.to_string()),
                    None => {
                        trace!(offset, "no XTENSION, ignoring trailing bytes");
                        break;
                    }
                }
            };

            let data_offset = offset + header_len;
            let data_len = data_size(&header)?;
            let data_end = data_offset
                .checked_add(data_len)
                .ok_or_else(|| Error::header("data size overflows"))?;
            if data_end > data.len() {
                return Err(Error::UnexpectedEof(data_end as u64));
            }
            trace!(index = hdus.len(), ?kind, data_offset, data_len, "HDU");

            hdus.push(Hdu { index: hdus.len(), kind, header, data_offset, data_len });
            offset = data_offset + padded_len(data_len);
        }
        Ok(hdus)
    }

    /// All header-data units in file order.
    pub fn hdus(&self) -> &[Hdu] {
        &self.hdus
    }

    pub fn hdu(&self, index: usize) -> Option<&Hdu> {
        self.hdus.get(index)
    }

    /// Primary header.
    pub fn primary(&self) -> &Header {
        // `scan` fails unless the primary HDU was parsed.
        &self.hdus[0].header
    }

    /// Raw data bytes of an HDU.
    pub fn data(&self, hdu: &Hdu) -> &[u8] {
        &self.source.bytes()[hdu.data_offset..hdu.data_offset + hdu.data_len]
    }

    /// Binary table view of the HDU at `index`.
    pub fn bintable(&self, index: usize) -> Result<BinTable<'_>> {
        let hdu = self
            .hdu(index)
            .ok_or_else(|| Error::other(format!("no HDU {index}")))?;
        if hdu.kind != HduKind::BinTable {
            return Err(Error::UnsupportedFormat(format!("HDU {index} is not a BINTABLE")));
        }
        BinTable::new(&hdu.header, self.data(hdu))
    }

    /// First binary table in the file (where HEALPix maps live).
    pub fn first_bintable(&self) -> Result<BinTable<'_>> {
        let hdu = self
            .hdus
            .iter()
            .find(|h| h.kind == HduKind::BinTable)
            .ok_or_else(|| Error::UnsupportedFormat("no BINTABLE extension".into()))?;
        BinTable::new(&hdu.header, self.data(hdu))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fits::{Card, Value};

    fn primary_only() -> Vec<u8> {
        let mut h = Header::new();
        h.push(Card::new("SIMPLE", Value::Logical(true)))
            .push(Card::new("BITPIX", Value::Integer(8)))
            .push(Card::new("NAXIS", Value::Integer(0)));
        h.to_bytes().unwrap()
    }

    #[test]
    fn test_primary_only() {
        let fits = FitsFile::from_bytes(primary_only()).unwrap();
        assert_eq!(fits.hdus().len(), 1);
        assert_eq!(fits.hdus()[0].kind, HduKind::Primary);
        assert_eq!(fits.primary().get_int("BITPIX"), Some(8));
        assert!(fits.first_bintable().is_err());
    }

    #[test]
    fn test_not_fits() {
        let mut bytes = primary_only();
        bytes[..6].copy_from_slice(b"SIMPLX");
        assert!(matches!(FitsFile::from_bytes(bytes), Err(Error::NotFits)));
        assert!(matches!(FitsFile::from_bytes(vec![0; 10]), Err(Error::UnexpectedEof(10))));
    }

    #[test]
    fn test_truncated_data() {
        let mut h = Header::new();
        h.push(Card::new("SIMPLE", Value::Logical(true)))
            .push(Card::new("BITPIX", Value::Integer(-32)))
            .push(Card::new("NAXIS", Value::Integer(1)))
            .push(Card::new("NAXIS1", Value::Integer(1000)));
        assert!(matches!(
            FitsFile::from_bytes(h.to_bytes().unwrap()),
            Err(Error::UnexpectedEof(_))
        ));
    }

    #[test]
    fn test_data_size_overflow() {
        let mut h = Header::new();
        h.push(Card::new("SIMPLE", Value::Logical(true)))
            .push(Card::new("BITPIX", Value::Integer(64)))
            .push(Card::new("NAXIS", Value::Integer(1)))
            .push(Card::new("NAXIS1", Value::Integer(1)))
            .push(Card::new("PCOUNT", Value::Integer(i64::MAX)));
        assert!(matches!(
            FitsFile::from_bytes(h.to_bytes().unwrap()),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            FitsFile::open("/nonexistent/map.fits"),
            Err(Error::FileNotFound(_))
        ));
    }

    #[test]
    fn test_open_plain_and_gzip() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let dir = tempfile::TempDir::new().unwrap();
        let plain = dir.path().join("primary.fits");
        std::fs::write(&plain, primary_only()).unwrap();
        for use_mmap in [false, true] {
            let fits = FitsFile::open_opts(&plain, use_mmap).unwrap();
            assert_eq!(fits.hdus().len(), 1);
        }

        let packed = dir.path().join("primary.fits.gz");
        let mut gz = GzEncoder::new(File::create(&packed).unwrap(), Compression::fast());
        gz.write_all(&primary_only()).unwrap();
        gz.finish().unwrap();
        let fits = FitsFile::open(&packed).unwrap();
        assert_eq!(fits.primary().get_int("BITPIX"), Some(8));
    }
}
