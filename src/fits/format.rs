//! FITS format constants and binary table column forms.

use std::fmt;

use crate::util::{Error, Result};

/// Size of a FITS logical record in bytes.
pub const BLOCK_SIZE: usize = 2880;

/// Size of a header card in bytes.
pub const CARD_SIZE: usize = 80;

/// Width of the keyword field of a card.
pub const KEYWORD_SIZE: usize = 8;

/// Value indicator at columns 9-10 of a card.
pub const VALUE_INDICATOR: &[u8; 2] = b"= ";

/// First two bytes of a gzip stream.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Round `len` up to a whole number of blocks.
#[inline]
pub const fn padded_len(len: usize) -> usize {
    len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

/// Element type of a binary table column (the letter of `TFORMn`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Logical,
    Bit,
    Byte,
    Int16,
    Int32,
    Int64,
    Char,
    Float32,
    Float64,
    Complex32,
    Complex64,
    Descriptor32,
    Descriptor64,
}

impl ColumnType {
    /// Parse a `TFORMn` type letter.
    pub fn from_code(code: char) -> Option<Self> {
        Some(match code.to_ascii_uppercase() {
            'L' => Self::Logical,
            'X' => Self::Bit,
            'B' => Self::Byte,
            'I' => Self::Int16,
            'J' => Self::Int32,
            'K' => Self::Int64,
            'A' => Self::Char,
            'E' => Self::Float32,
            'D' => Self::Float64,
            'C' => Self::Complex32,
            'M' => Self::Complex64,
            'P' => Self::Descriptor32,
            'Q' => Self::Descriptor64,
            _ => return None,
        })
    }

    /// The `TFORMn` type letter.
    pub fn code(&self) -> char {
        match self {
            Self::Logical => 'L',
            Self::Bit => 'X',
            Self::Byte => 'B',
            Self::Int16 => 'I',
            Self::Int32 => 'J',
            Self::Int64 => 'K',
            Self::Char => 'A',
            Self::Float32 => 'E',
            Self::Float64 => 'D',
            Self::Complex32 => 'C',
            Self::Complex64 => 'M',
            Self::Descriptor32 => 'P',
            Self::Descriptor64 => 'Q',
        }
    }

    /// Bytes per element (bit columns are handled in [`TForm::byte_width`]).
    pub fn size(&self) -> usize {
        match self {
            Self::Logical | Self::Bit | Self::Byte | Self::Char => 1,
            Self::Int16 => 2,
            Self::Int32 | Self::Float32 => 4,
            Self::Int64 | Self::Float64 | Self::Complex32 | Self::Descriptor32 => 8,
            Self::Complex64 | Self::Descriptor64 => 16,
        }
    }

    /// Check if values of this type decode to a single real number.
    pub fn is_real(&self) -> bool {
        matches!(
            self,
            Self::Byte | Self::Int16 | Self::Int32 | Self::Int64 | Self::Float32 | Self::Float64
        )
    }

    /// Check if this is an integer type (subject to `TNULLn`).
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Byte | Self::Int16 | Self::Int32 | Self::Int64)
    }
}

/// Parsed `TFORMn` value: repeat count and element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TForm {
    pub repeat: usize,
    pub kind: ColumnType,
}

impl TForm {
    pub fn new(repeat: usize, kind: ColumnType) -> Self {
        Self { repeat, kind }
    }

    /// Parse forms like `E`, `1024E`, `1PE(100)`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
        let repeat = if digits == 0 {
            1
        } else {
            s[..digits]
                .parse()
                .map_err(|_| Error::UnsupportedFormat(format!("TFORM {s}")))?
        };
        let kind = s[digits..]
            .chars()
            .next()
            .and_then(ColumnType::from_code)
            .ok_or_else(|| Error::UnsupportedFormat(format!("TFORM {s}")))?;
        Ok(Self { repeat, kind })
    }

    /// Bytes occupied by this column in one table row.
    pub fn byte_width(&self) -> Result<usize> {
        match self.kind {
            ColumnType::Bit => Ok(self.repeat.div_ceil(8)),
            ColumnType::Descriptor32 | ColumnType::Descriptor64 => {
                Ok(self.kind.size() * self.repeat.min(1))
            }
            kind => kind
                .size()
                .checked_mul(self.repeat)
                .ok_or_else(|| Error::UnsupportedFormat(format!("TFORM {self} is too wide"))),
        }
    }
}

impl fmt::Display for TForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.repeat, self.kind.code())
    }
}
