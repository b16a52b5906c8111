//! FITS header cards: parsing and fixed-format serialization.

use std::fmt;

use crate::util::{Error, Result};
use super::format::*;

/// Value of a keyword card.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Logical(bool),
    Integer(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Fixed-format value field (columns 11-30 for numbers and logicals).
    fn to_field(&self) -> String {
        match self {
            Self::Logical(b) => format!("{:>20}", if *b { "T" } else { "F" }),
            Self::Integer(i) => format!("{:>20}", i),
            Self::Float(v) => format!("{:>20}", format_float(*v)),
            Self::Str(s) => format!("'{:<8}'", s.replace('\'', "''")),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value; integers widen to `f64`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Logical(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logical(b) => f.write_str(if *b { "T" } else { "F" }),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => f.write_str(&format_float(*v)),
            Self::Str(s) => write!(f, "'{s}'"),
        }
    }
}

/// Float with an explicit exponent, always parseable back as a real.
fn format_float(v: f64) -> String {
    let s = format!("{:E}", v);
    if s.contains('.') {
        s
    } else {
        s.replacen('E', ".0E", 1)
    }
}

/// A single 80-byte header record.
#[derive(Clone, Debug, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: Option<Value>,
    pub comment: Option<String>,
}

impl Card {
    pub fn new(keyword: impl Into<String>, value: Value) -> Self {
        Self { keyword: keyword.into(), value: Some(value), comment: None }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Parse one 80-byte card.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() != CARD_SIZE {
            return Err(Error::header(format!("card of {} bytes", raw.len())));
        }
        if !raw.iter().all(|b| (0x20..=0x7E).contains(b)) {
            return Err(Error::header("non-ASCII text in header card"));
        }
        // All bytes are printable ASCII, so UTF-8 conversion cannot fail.
        let text = String::from_utf8_lossy(raw);
        let keyword = text[..KEYWORD_SIZE].trim_end().to_string();

        if &raw[KEYWORD_SIZE..KEYWORD_SIZE + 2] != VALUE_INDICATOR {
            let rest = text[KEYWORD_SIZE..].trim_end();
            let comment = (!rest.is_empty()).then(|| rest.trim_start().to_string());
            return Ok(Self { keyword, value: None, comment });
        }

        let (value, comment) = parse_value_field(&text[KEYWORD_SIZE + 2..])
            .map_err(|msg| Error::header(format!("{keyword}: {msg}")))?;
        Ok(Self { keyword, value, comment })
    }

    /// Serialize to exactly 80 bytes.
    ///
    /// Keyword and value must fit in the card; a comment is cut at column 80.
    pub fn to_bytes(&self) -> Result<[u8; CARD_SIZE]> {
        let printable = |t: &str| t.bytes().all(|b| (0x20..=0x7E).contains(&b));
        if self.keyword.len() > KEYWORD_SIZE || !printable(&self.keyword) {
            return Err(Error::header(format!("invalid keyword {:?}", self.keyword)));
        }
        let mut line = format!("{:<8}", self.keyword);
        if let Some(value) = &self.value {
            line.push_str("= ");
            line.push_str(&value.to_field());
            if line.len() > CARD_SIZE || !printable(&line) {
                return Err(Error::header(format!(
                    "value of {} does not fit in one card",
                    self.keyword
                )));
            }
        }
        if let Some(c) = &self.comment {
            if self.value.is_some() {
                line.push_str(" / ");
            }
            line.extend(c.chars().filter(|ch| (' '..='~').contains(ch)));
        }
        let mut out = [b' '; CARD_SIZE];
        for (dst, src) in out.iter_mut().zip(line.bytes()) {
            *dst = src;
        }
        Ok(out)
    }
}

/// Split a value field into value and comment.
fn parse_value_field(field: &str) -> std::result::Result<(Option<Value>, Option<String>), String> {
    let trimmed = field.trim_start();

    if let Some(body) = trimmed.strip_prefix('\'') {
        let mut value = String::new();
        let mut chars = body.char_indices().peekable();
        let mut end = None;
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    value.push('\'');
                    chars.next();
                } else {
                    end = Some(i + 1);
                    break;
                }
            } else {
                value.push(c);
            }
        }
        let end = end.ok_or("unterminated string")?;
        let comment = split_comment(&body[end..]).1;
        return Ok((Some(Value::Str(value.trim_end().to_string())), comment));
    }

    let (raw, comment) = split_comment(trimmed);
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok((None, comment));
    }
    let value = match raw {
        "T" => Value::Logical(true),
        "F" => Value::Logical(false),
        _ => {
            if let Ok(i) = raw.parse::<i64>() {
                Value::Integer(i)
            } else {
                let normalized = raw.replace(['D', 'd'], "E");
                match normalized.parse::<f64>() {
                    Ok(v) => Value::Float(v),
                    Err(_) => return Err(format!("unparseable value {raw:?}")),
                }
            }
        }
    };
    Ok((Some(value), comment))
}

fn split_comment(s: &str) -> (&str, Option<String>) {
    match s.find('/') {
        Some(i) => {
            let c = s[i + 1..].trim();
            (&s[..i], (!c.is_empty()).then(|| c.to_string()))
        }
        None => (s, None),
    }
}

/// Ordered list of header cards of one HDU.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a header starting at `offset`.
    ///
    /// Returns the header and the number of bytes it occupies (whole blocks).
    pub fn parse(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let mut cards = Vec::new();
        let mut pos = offset;
        loop {
            let end = pos + CARD_SIZE;
            if end > data.len() {
                return Err(Error::UnexpectedEof(data.len() as u64));
            }
            let raw = &data[pos..end];
            pos = end;
            if raw.starts_with(b"END") && raw[3..].iter().all(|&b| b == b' ') {
                break;
            }
            if raw.iter().all(|&b| b == b' ') {
                continue;
            }
            cards.push(Card::parse(raw)?);
        }
        let len = padded_len(pos - offset);
        if offset + len > data.len() {
            return Err(Error::UnexpectedEof(data.len() as u64));
        }
        Ok((Self { cards }, len))
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// First value for a keyword (case-insensitive).
    pub fn get(&self, keyword: &str) -> Option<&Value> {
        self.cards
            .iter()
            .find(|c| c.keyword.eq_ignore_ascii_case(keyword))
            .and_then(|c| c.value.as_ref())
    }

    pub fn get_str(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(Value::as_str)
    }

    pub fn get_int(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(Value::as_int)
    }

    pub fn get_float(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(Value::as_float)
    }

    pub fn get_bool(&self, keyword: &str) -> Option<bool> {
        self.get(keyword).and_then(Value::as_bool)
    }

    /// Integer keyword that must be present.
    pub fn require_int(&self, keyword: &str) -> Result<i64> {
        match self.get(keyword) {
            Some(v) => v
                .as_int()
                .ok_or_else(|| Error::header(format!("{keyword} is not an integer: {v}"))),
            None => Err(Error::MissingKeyword(keyword.to_string())),
        }
    }

    /// Non-negative integer keyword that must be present.
    pub fn require_usize(&self, keyword: &str) -> Result<usize> {
        let v = self.require_int(keyword)?;
        usize::try_from(v).map_err(|_| Error::header(format!("{keyword} is negative: {v}")))
    }

    /// Append a card.
    pub fn push(&mut self, card: Card) -> &mut Self {
        self.cards.push(card);
        self
    }

    /// Append a keyword/value card; an empty comment is omitted.
    pub fn set(&mut self, keyword: &str, value: Value, comment: &str) -> &mut Self {
        let card = Card::new(keyword, value);
        if comment.is_empty() {
            self.push(card)
        } else {
            self.push(card.with_comment(comment))
        }
    }

    /// Serialize with the `END` card, padded to whole blocks.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(padded_len((self.cards.len() + 1) * CARD_SIZE));
        for card in &self.cards {
            out.extend_from_slice(&card.to_bytes()?);
        }
        let mut end = [b' '; CARD_SIZE];
        end[..3].copy_from_slice(b"END");
        out.extend_from_slice(&end);
        out.resize(padded_len(out.len()), b' ');
        Ok(out)
    }
}
