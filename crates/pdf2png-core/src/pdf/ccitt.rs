//! CCITT Group 3/4 fax decompression for bilevel scans.
//!
//! Plain Group 4 goes through `fax::decoder::decode_g4`. Group 3 streams,
//! which PDF writers usually emit without EOL codes, and byte-aligned
//! Group 4 are decoded row by row here using the `fax` code tables.

use std::convert::Infallible;

use fax::maps::{Mode, black, mode, white};
use fax::{BitReader, Color, decoder};
use tracing::trace;

use crate::error::DecodeError;

/// `/DecodeParms` of a `CCITTFaxDecode` filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CcittParams {
    /// Negative: Group 4, zero: Group 3 1-D, positive: Group 3 mixed 1-D/2-D.
    pub k: i64,
    pub columns: u32,
    pub rows: Option<u32>,
    pub black_is_1: bool,
    /// Each coded row starts on a byte boundary.
    pub byte_align: bool,
}

impl Default for CcittParams {
    fn default() -> Self {
        Self {
            k: 0,
            columns: 1728,
            rows: None,
            black_is_1: false,
            byte_align: false,
        }
    }
}

/// Decompress to packed 1-bit rows, filter output bit convention included.
pub(crate) fn decode(data: &[u8], params: &CcittParams) -> Result<Vec<u8>, DecodeError> {
    let width = u16::try_from(params.columns)
        .map_err(|_| DecodeError::Codec(format!("CCITT width {} too large", params.columns)))?;

    let mut output = Vec::new();
    let mut rows = 0u32;
    let mut push_row = |transitions: &[u16]| {
        output.extend(transitions_to_row(transitions, width as usize, params.black_is_1));
        rows += 1;
    };

    let finished = if params.k < 0 && !params.byte_align {
        let height = params.rows.and_then(|rows| u16::try_from(rows).ok());
        decoder::decode_g4(data.iter().copied(), width, height, &mut push_row).is_some()
    } else {
        decode_rows(data, params, width, &mut push_row)
    };

    trace!("CCITT K={} decoded {} rows of width {}", params.k, rows, width);

    if rows == 0 {
        return Err(DecodeError::Codec("CCITT stream produced no rows".into()));
    }
    if !finished && params.rows.is_none_or(|expected| rows < expected) {
        return Err(DecodeError::Codec(format!(
            "CCITT stream ended early after {} rows",
            rows
        )));
    }

    Ok(output)
}

/// Row loop for Group 3 and byte-aligned Group 4 data.
///
/// EOL codes are optional before every row. Returns false when a row fails
/// to decode.
fn decode_rows(
    data: &[u8],
    params: &CcittParams,
    width: u16,
    push_row: &mut impl FnMut(&[u16]),
) -> bool {
    let mut bits = CodedBits::new(data);
    let mut reference = Vec::new();
    let mut row = Vec::new();
    let mut decoded = 0u32;

    while params.rows.is_none_or(|rows| decoded < rows) {
        if params.byte_align {
            bits.align();
        }
        // Consecutive EOLs mark the end of the page (RTC or EOFB).
        if bits.skip_eols() > 1 || bits.at_end() {
            return true;
        }

        let two_dimensional = match params.k {
            k if k < 0 => true,
            0 => false,
            _ => match bits.bit() {
                Some(tag) => tag == 0,
                None => return true,
            },
        };
        if params.k > 0 && bits.eol_ahead() {
            return true;
        }

        row.clear();
        let complete = if two_dimensional {
            two_dimensional_row(&mut bits, &reference, width, &mut row)
        } else {
            one_dimensional_row(&mut bits, width, &mut row)
        };
        if complete.is_none() {
            trace!("CCITT row {} failed at bit {}", decoded + 1, bits.position);
            return false;
        }

        push_row(&row);
        decoded += 1;
        std::mem::swap(&mut reference, &mut row);
    }

    true
}

/// Modified Huffman row: alternating white and black runs.
fn one_dimensional_row(bits: &mut CodedBits<'_>, width: u16, row: &mut Vec<u16>) -> Option<()> {
    let mut a0 = 0u16;
    let mut color = Color::White;
    while a0 < width {
        a0 = a0.checked_add(run_length(bits, color)?)?;
        if a0 < width {
            row.push(a0);
        }
        color = !color;
    }
    Some(())
}

/// READ-coded row relative to the previous row's color changes.
fn two_dimensional_row(
    bits: &mut CodedBits<'_>,
    reference: &[u16],
    width: u16,
    row: &mut Vec<u16>,
) -> Option<()> {
    let end = i32::from(width);
    // -1 is the imaginary white pixel before the row.
    let mut a0: i32 = -1;
    let mut color = Color::White;

    while a0 < end {
        let (b1, b2) = changing_elements(reference, a0, color, width);
        match mode::decode(bits)? {
            Mode::Pass => a0 = i32::from(b2),
            Mode::Vertical(delta) => {
                let a1 = i32::from(b1) + i32::from(delta);
                if !(0..=end).contains(&a1) {
                    return None;
                }
                if a1 < end {
                    row.push(a1 as u16);
                }
                a0 = a1;
                color = !color;
            }
            Mode::Horizontal => {
                let a1 = a0.max(0) + i32::from(run_length(bits, color)?);
                let a2 = a1 + i32::from(run_length(bits, !color)?);
                row.extend(
                    [a1, a2]
                        .into_iter()
                        .filter(|&edge| edge < end)
                        .map(|edge| edge as u16),
                );
                a0 = a2;
            }
            Mode::Extension | Mode::EOF => return None,
        }
    }
    Some(())
}

/// `b1` and `b2`: the first change on the reference row right of `a0` to the
/// opposite of `color`, and the change after it.
fn changing_elements(reference: &[u16], a0: i32, color: Color, width: u16) -> (u16, u16) {
    // Even entries switch to black, odd entries back to white.
    let mut index = match color {
        Color::White => 0,
        Color::Black => 1,
    };
    while reference
        .get(index)
        .is_some_and(|&edge| i32::from(edge) <= a0)
    {
        index += 2;
    }
    let edge = |i: usize| reference.get(i).copied().unwrap_or(width);
    (edge(index), edge(index + 1))
}

/// One run of `color`, makeup codes included.
fn run_length(bits: &mut CodedBits<'_>, color: Color) -> Option<u16> {
    let mut total = 0u16;
    loop {
        let run = match color {
            Color::White => white::decode(bits)?,
            Color::Black => black::decode(bits)?,
        };
        total = total.checked_add(run)?;
        if run < 64 {
            return Some(total);
        }
    }
}

/// Bit cursor over coded data. Peeks past the last byte read zero bits.
struct CodedBits<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> CodedBits<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    fn bit(&mut self) -> Option<u16> {
        let bit = self.peek(1)?;
        self.position += 1;
        Some(bit)
    }

    fn align(&mut self) {
        self.position = self.position.div_ceil(8) * 8;
    }

    /// Only zero fill remains.
    fn at_end(&self) -> bool {
        let byte = self.position / 8;
        match self.data.get(byte) {
            None => true,
            Some(&first) => {
                first & (0xFF >> (self.position % 8)) == 0
                    && self.data[byte + 1..].iter().all(|&b| b == 0)
            }
        }
    }

    /// No code word starts with nine zeros, so they can only be fill or an EOL.
    fn eol_ahead(&self) -> bool {
        self.peek(9) == Some(0)
    }

    /// Consume fill bits and EOL codes, returning the number of EOLs.
    fn skip_eols(&mut self) -> usize {
        let mut count = 0;
        while self.eol_ahead() {
            while self.peek(1) == Some(0) {
                self.position += 1;
            }
            if self.bit().is_none() {
                break;
            }
            count += 1;
        }
        count
    }
}

impl BitReader for CodedBits<'_> {
    type Error = Infallible;

    fn peek(&self, bits: u8) -> Option<u16> {
        if bits > 16 || self.position >= self.data.len() * 8 {
            return None;
        }
        let byte = self.position / 8;
        let window = (0..3).fold(0u32, |acc, i| {
            acc << 8 | u32::from(self.data.get(byte + i).copied().unwrap_or(0))
        });
        let shift = 24 - self.position % 8 - usize::from(bits);
        Some(((window >> shift) & ((1u32 << bits) - 1)) as u16)
    }

    fn consume(&mut self, bits: u8) -> Result<(), Infallible> {
        self.position += usize::from(bits);
        Ok(())
    }

    fn bits_to_byte_boundary(&self) -> u8 {
        ((8 - self.position % 8) % 8) as u8
    }
}

/// Pack one row given as color-change positions, starting white.
fn transitions_to_row(transitions: &[u16], width: usize, black_is_1: bool) -> Vec<u8> {
    let (white_bit, black_bit) = if black_is_1 { (0, 1) } else { (1, 0) };
    let mut row = vec![if white_bit == 1 { 0xFF } else { 0x00 }; width.div_ceil(8)];

    let mut is_black = false;
    let mut start = 0usize;
    let paint = |from: usize, to: usize, row: &mut [u8]| {
        for pixel in from..to.min(width) {
            let mask = 0x80 >> (pixel % 8);
            if black_bit == 1 {
                row[pixel / 8] |= mask;
            } else {
                row[pixel / 8] &= !mask;
            }
        }
    };

    for &position in transitions {
        let position = position as usize;
        if is_black {
            paint(start, position, &mut row[..]);
        }
        is_black = !is_black;
        start = position;
    }
    if is_black {
        paint(start, width, &mut row[..]);
    }

    row
}
