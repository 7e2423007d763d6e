use std::fmt;

/// Parse a comma-separated list of beat lengths into seconds.
///
/// # Grammar
///
/// ```text
/// beats      = beat { "," beat } ;
/// beat       = separators? number separators? [ unit ] separators? ;
/// number     = digits [ "." digits ] ;
/// digits     = digit , { digit } ;
/// unit       = "ms" | "s" | "m" ;
/// separators = { whitespace | "_" } ;
/// ```
///
/// A beat without a unit is read as seconds. Zero-length beats are allowed
/// as long as the list contains at least one beat longer than zero.
pub fn parse_beats(value: &str) -> Result<Vec<f64>, BeatParseError> {
    if value.trim().is_empty() {
        return Err(BeatParseError::Empty);
    }

    let beats = value
        .split(',')
        .enumerate()
        .map(|(position, beat)| {
            parse_beat(beat).map_err(|source| BeatParseError::Beat {
                position: position + 1,
                source: Box::new(source),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if beats.iter().all(|seconds| *seconds == 0.0) {
        return Err(BeatParseError::AllZero);
    }
    Ok(beats)
}

/// Parse a single beat length into seconds.
pub fn parse_beat(value: &str) -> Result<f64, BeatParseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BeatParseError::Empty);
    }

    if let Some((offset, ch)) = trimmed.char_indices().find(|(_, c)| !c.is_ascii()) {
        return Err(BeatParseError::UnexpectedChar {
            index: offset,
            found: ch,
        });
    }

    let bytes = trimmed.as_bytes();
    if bytes[0] == b'-' {
        return Err(BeatParseError::Negative);
    }
    let mut index = usize::from(bytes[0] == b'+');

    skip_separators(bytes, &mut index);
    let (mantissa, scale, number_len) = parse_number(bytes, index)?;
    index += number_len;
    skip_separators(bytes, &mut index);

    let unit = if index < bytes.len() {
        let (unit, unit_len) = parse_unit(trimmed, bytes, index)?;
        index += unit_len;
        skip_separators(bytes, &mut index);
        unit
    } else {
        Unit::Second
    };

    if index < bytes.len() {
        return Err(BeatParseError::UnexpectedChar {
            index,
            found: bytes[index] as char,
        });
    }

    let pow10 = POW10
        .get(scale as usize)
        .copied()
        .ok_or(BeatParseError::TooPrecise {
            max_precision: MAX_SCALE,
        })?;
    let nanos = mantissa
        .checked_mul(unit.nanos())
        .ok_or(BeatParseError::Overflow)?;

    Ok(nanos as f64 / pow10 as f64 / 1_000_000_000.0)
}

fn parse_number(bytes: &[u8], mut index: usize) -> Result<(u128, u32, usize), BeatParseError> {
    if index >= bytes.len() {
        return Err(BeatParseError::ExpectedNumber { index, found: None });
    }

    if !bytes[index].is_ascii_digit() {
        return Err(BeatParseError::ExpectedNumber {
            index,
            found: Some(bytes[index] as char),
        });
    }

    let mut mantissa: u128 = 0;
    let mut scale: u32 = 0;
    let mut seen_decimal = false;
    let mut decimal_index = None;
    let mut consumed = 0usize;

    while index < bytes.len() {
        let byte = bytes[index];
        match byte {
            b'0'..=b'9' => {
                mantissa = mantissa
                    .checked_mul(10)
                    .and_then(|value| value.checked_add((byte - b'0') as u128))
                    .ok_or(BeatParseError::Overflow)?;
                if seen_decimal {
                    scale += 1;
                }
                index += 1;
                consumed += 1;
            }
            b'.' if !seen_decimal => {
                seen_decimal = true;
                decimal_index = Some(index);
                index += 1;
                consumed += 1;
            }
            b'.' => {
                return Err(BeatParseError::UnexpectedChar { index, found: '.' });
            }
            _ => break,
        }
    }

    if seen_decimal && scale == 0 {
        let dot_index = decimal_index.unwrap_or(index);
        return Err(BeatParseError::MissingFractionDigits { index: dot_index });
    }
    if scale > MAX_SCALE {
        return Err(BeatParseError::TooPrecise {
            max_precision: MAX_SCALE,
        });
    }

    Ok((mantissa, scale, consumed))
}

fn parse_unit(original: &str, bytes: &[u8], index: usize) -> Result<(Unit, usize), BeatParseError> {
    let remaining = &bytes[index..];
    if remaining.starts_with(b"ms") {
        return Ok((Unit::Millisecond, 2));
    }
    if remaining.starts_with(b"s") {
        return Ok((Unit::Second, 1));
    }
    if remaining.starts_with(b"m") {
        return Ok((Unit::Minute, 1));
    }

    let mut end = index;
    while end < bytes.len() && bytes[end].is_ascii_alphabetic() {
        end += 1;
    }

    if end > index {
        return Err(BeatParseError::UnknownUnit {
            index,
            found: original[index..end].to_string(),
        });
    }

    Err(BeatParseError::UnexpectedChar {
        index,
        found: bytes[index] as char,
    })
}

fn skip_separators(bytes: &[u8], index: &mut usize) {
    while *index < bytes.len() {
        match bytes[*index] {
            b'_' => *index += 1,
            b if b.is_ascii_whitespace() => *index += 1,
            _ => break,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeatParseError {
    Empty,
    AllZero,
    Negative,
    Beat {
        position: usize,
        source: Box<BeatParseError>,
    },
    ExpectedNumber { index: usize, found: Option<char> },
    UnknownUnit { index: usize, found: String },
    MissingFractionDigits { index: usize },
    TooPrecise { max_precision: u32 },
    UnexpectedChar { index: usize, found: char },
    Overflow,
}

impl std::error::Error for BeatParseError {}

impl fmt::Display for BeatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BeatParseError::Empty => write!(f, "beat cannot be empty"),
            BeatParseError::AllZero => {
                write!(f, "at least one beat must be longer than zero")
            }
            BeatParseError::Negative => write!(f, "beat cannot be negative"),
            BeatParseError::Beat { position, source } => {
                write!(f, "beat #{position}: {source}")
            }
            BeatParseError::ExpectedNumber { index, found } => match found {
                Some(ch) => write!(
                    f,
                    "expected a number at position {} but found '{}'",
                    index + 1,
                    ch
                ),
                None => write!(f, "expected a number at position {}", index + 1),
            },
            BeatParseError::UnknownUnit { index, found } => {
                write!(f, "unknown unit '{}' at position {}", found, index + 1)
            }
            BeatParseError::MissingFractionDigits { index } => write!(
                f,
                "expected digits after decimal point at position {}",
                index + 1
            ),
            BeatParseError::TooPrecise { max_precision } => write!(
                f,
                "fractional precision is limited to {} digits",
                max_precision
            ),
            BeatParseError::UnexpectedChar { index, found } => write!(
                f,
                "unexpected character '{}' at position {}",
                found,
                index + 1
            ),
            BeatParseError::Overflow => write!(f, "beat is too large"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Unit {
    Millisecond,
    Second,
    Minute,
}

impl Unit {
    fn nanos(self) -> u128 {
        match self {
            Unit::Millisecond => 1_000_000,
            Unit::Second => 1_000_000_000,
            Unit::Minute => 60 * 1_000_000_000,
        }
    }
}

const MAX_SCALE: u32 = 12;

const POW10: [u128; 13] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
    100_000_000_000,
    1_000_000_000_000,
];
