//! Conversions between numbers, number text and the LSB-first bit arrays the
//! shifter consumes.
//!
//! A [`BitArray`] stores one bit per byte, index 0 being the least significant
//! bit, inside a fixed-capacity buffer. Nothing here allocates except the
//! `to_*_string` formatters.
use alloc::string::String;
use core::fmt;

use crate::config::MAX_DR_LEN;
use crate::error::{Error, Result};

/// Fixed-capacity bit buffer with an explicit length.
///
/// Every element is 0 or 1 and every element at or past `len()` is 0, so a
/// register can be shifted with a length longer than its contents and the
/// extra bits are zeros.
#[derive(Clone, PartialEq, Eq)]
pub struct BitArray<const N: usize = MAX_DR_LEN> {
    bits: [u8; N],
    len: usize,
}

/// The buffer type used for `ir_in`, `ir_out`, `dr_in` and `dr_out`.
pub type Register = BitArray<MAX_DR_LEN>;

impl<const N: usize> Default for BitArray<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> BitArray<N> {
    pub const fn new() -> Self {
        Self { bits: [0; N], len: 0 }
    }

    /// The `len` least significant bits of `n`.
    pub fn from_u32(n: u32, len: usize) -> Result<Self> {
        let mut arr = Self::new();
        int_to_bin_array(&mut arr, n, len)?;
        Ok(arr)
    }

    /// Copy a slice of bits, LSB first. Any non-zero byte counts as a 1.
    pub fn from_bits(bits: &[u8]) -> Result<Self> {
        if bits.len() > N {
            return Err(Error::OutOfBounds);
        }
        let mut arr = Self::new();
        for (dst, src) in arr.bits.iter_mut().zip(bits) {
            *dst = (*src != 0) as u8;
        }
        arr.len = bits.len();
        Ok(arr)
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bit at `index`; anything outside the buffer reads as 0.
    pub fn bit(&self, index: usize) -> bool {
        index < N && self.bits[index] != 0
    }

    /// Set one bit, growing the length to cover it.
    pub fn set(&mut self, index: usize, bit: bool) -> Result<()> {
        if index >= N {
            return Err(Error::OutOfBounds);
        }
        self.bits[index] = bit as u8;
        if index >= self.len {
            self.len = index + 1;
        }
        Ok(())
    }

    /// Change the length. Bits dropped by shrinking are zeroed.
    pub fn set_len(&mut self, len: usize) -> Result<()> {
        if len > N {
            return Err(Error::OutOfBounds);
        }
        if len < self.len {
            self.bits[len..self.len].fill(0);
        }
        self.len = len;
        Ok(())
    }

    /// Zero the first `len` bits; the length is kept.
    pub fn clear(&mut self, len: usize) {
        let len = len.min(N);
        self.bits[..len].fill(0);
    }

    /// Zero everything and drop the length to 0.
    pub fn clear_all(&mut self) {
        self.bits.fill(0);
        self.len = 0;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bits[..self.len]
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.as_slice().iter().map(|b| *b != 0)
    }

    /// Position of the highest set bit plus one, 0 for an all-zero array.
    pub fn significant_bits(&self) -> usize {
        self.bits[..self.len]
            .iter()
            .rposition(|b| *b != 0)
            .map_or(0, |i| i + 1)
    }

    /// The value as an integer, when it fits into 32 bits.
    pub fn to_u32(&self) -> Result<u32> {
        if self.significant_bits() > 32 {
            return Err(Error::OutOfBounds);
        }
        bin_array_to_int(self, self.len.min(32))
    }

    /// Binary digits, most significant first. `len()` digits, at least one.
    pub fn to_bin_string(&self) -> String {
        if self.len == 0 {
            return String::from("0");
        }
        self.bits[..self.len]
            .iter()
            .rev()
            .map(|b| if *b != 0 { '1' } else { '0' })
            .collect()
    }

    /// Hex digits, most significant first, one per started nibble.
    pub fn to_hex_string(&self) -> String {
        let nibbles = self.len.div_ceil(4).max(1);
        (0..nibbles)
            .rev()
            .map(|n| {
                let v = (0..4).fold(0u32, |acc, b| acc | (self.bit(n * 4 + b) as u32) << b);
                char::from_digit(v, 16).unwrap_or('0').to_ascii_uppercase()
            })
            .collect()
    }

    /// Decimal digits of the unsigned value, without leading zeros.
    pub fn to_dec_string(&self) -> String {
        let mut work = self.bits;
        let len = self.significant_bits();
        let mut digits = String::new();

        // Long division by ten, one pass per digit.
        loop {
            let mut rem = 0u8;
            let mut nonzero = false;
            for b in work[..len].iter_mut().rev() {
                rem = rem * 2 + *b;
                if rem >= 10 {
                    rem -= 10;
                    *b = 1;
                    nonzero = true;
                } else {
                    *b = 0;
                }
            }
            digits.push(char::from(b'0' + rem));
            if !nonzero {
                break;
            }
        }
        digits.chars().rev().collect()
    }
}

impl<const N: usize> fmt::Display for BitArray<N> {
    /// Bits most significant first, the way they are read off a register.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.as_slice().iter().rev() {
            f.write_str(if *b != 0 { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl<const N: usize> fmt::Debug for BitArray<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitArray<{}>[{}; 0b{}]", N, self.len, self)
    }
}

/// Write the `len` least significant bits of `n` into `arr`, LSB first.
/// Everything else in `arr` is cleared.
pub fn int_to_bin_array<const N: usize>(arr: &mut BitArray<N>, n: u32, len: usize) -> Result<()> {
    if len > 32 || len > N {
        return Err(Error::OutOfBounds);
    }
    arr.clear_all();
    for (i, b) in arr.bits[..len].iter_mut().enumerate() {
        *b = ((n >> i) & 1) as u8;
    }
    arr.len = len;
    Ok(())
}

/// Read the first `len` bits of `arr` as an unsigned integer, LSB first.
pub fn bin_array_to_int<const N: usize>(arr: &BitArray<N>, len: usize) -> Result<u32> {
    if len > 32 || len > N {
        return Err(Error::OutOfBounds);
    }
    Ok(arr.bits[..len]
        .iter()
        .enumerate()
        .fold(0, |acc, (i, b)| acc | (*b as u32) << i))
}

/// Value of a single hex digit.
pub fn chr2hex(ch: char) -> Result<u8> {
    ch.to_digit(16).map(|d| d as u8).ok_or(Error::BadConversion)
}

fn bin_digit(ch: char) -> Result<u8> {
    match ch {
        '0' => Ok(0),
        '1' => Ok(1),
        _ => Err(Error::BadConversion),
    }
}

/// Shared body of the power-of-two radix parsers. Digits arrive most
/// significant first; `arr` is only written once the whole text is valid.
fn pow2_str_to_bin_array<const N: usize>(
    arr: &mut BitArray<N>,
    text: &str,
    bits_per_digit: usize,
    digit: fn(char) -> Result<u8>,
) -> Result<()> {
    if text.is_empty() {
        return Err(Error::BadConversion);
    }
    let mut out = BitArray::<N>::new();
    let mut width = 0;
    for (k, ch) in text.chars().rev().enumerate() {
        let d = digit(ch)?;
        for b in 0..bits_per_digit {
            let pos = k * bits_per_digit + b;
            let bit = (d >> b) & 1;
            if pos < N {
                out.bits[pos] = bit;
            } else if bit != 0 {
                return Err(Error::OutOfBounds);
            }
        }
        width += bits_per_digit;
    }
    out.len = width.min(N);
    *arr = out;
    Ok(())
}

/// Parse hex digits (no prefix), e.g. `"1F"`, into `arr`.
pub fn hex_str_to_bin_array<const N: usize>(arr: &mut BitArray<N>, text: &str) -> Result<()> {
    pow2_str_to_bin_array(arr, text, 4, chr2hex)
}

/// Parse binary digits (no prefix), e.g. `"1010"`, into `arr`.
pub fn bin_str_to_bin_array<const N: usize>(arr: &mut BitArray<N>, text: &str) -> Result<()> {
    pow2_str_to_bin_array(arr, text, 1, bin_digit)
}

/// Parse decimal digits into `arr`. The value may be wider than 32 bits.
pub fn dec_str_to_bin_array<const N: usize>(arr: &mut BitArray<N>, text: &str) -> Result<()> {
    if text.is_empty() {
        return Err(Error::BadConversion);
    }
    let mut out = BitArray::<N>::new();
    for ch in text.chars() {
        let d = ch.to_digit(10).ok_or(Error::BadConversion)? as u8;
        // out = out * 10 + d
        let mut carry = d;
        for b in out.bits.iter_mut() {
            let v = *b * 10 + carry;
            *b = v & 1;
            carry = v >> 1;
        }
        if carry != 0 {
            return Err(Error::OutOfBounds);
        }
    }
    out.len = out.bits.iter().rposition(|b| *b != 0).map_or(1, |i| i + 1).min(N);
    *arr = out;
    Ok(())
}
