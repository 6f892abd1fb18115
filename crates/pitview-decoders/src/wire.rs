//! Little-endian primitive readers shared by all packet decoders.
//!
//! Every reader is bounds-checked and returns `None` past the end of the
//! buffer, so decode routines can thread `?` through a whole field list and
//! collapse any truncation into a soft failure. The profiled games all emit
//! from little-endian platforms; there is no big-endian variant.

/// Reads an `i8` at `offset`.
#[expect(clippy::cast_possible_wrap, reason = "reinterpreting the wire byte is the point")]
pub fn read_i8(data: &[u8], offset: usize) -> Option<i8> {
    data.get(offset).map(|b| *b as i8)
}

/// Reads a `u8` at `offset`.
pub fn read_u8(data: &[u8], offset: usize) -> Option<u8> {
    data.get(offset).copied()
}

/// Reads a little-endian `i16` at `offset`.
pub fn read_i16_le(data: &[u8], offset: usize) -> Option<i16> {
    data.get(offset..offset.checked_add(2)?)
        .and_then(|b| b.try_into().ok())
        .map(i16::from_le_bytes)
}

/// Reads a little-endian `u16` at `offset`.
pub fn read_u16_le(data: &[u8], offset: usize) -> Option<u16> {
    data.get(offset..offset.checked_add(2)?)
        .and_then(|b| b.try_into().ok())
        .map(u16::from_le_bytes)
}

/// Reads a little-endian `i32` at `offset`.
pub fn read_i32_le(data: &[u8], offset: usize) -> Option<i32> {
    data.get(offset..offset.checked_add(4)?)
        .and_then(|b| b.try_into().ok())
        .map(i32::from_le_bytes)
}

/// Reads a little-endian `u32` at `offset`.
pub fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset.checked_add(4)?)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
}

/// Reads a little-endian `u64` at `offset`.
pub fn read_u64_le(data: &[u8], offset: usize) -> Option<u64> {
    data.get(offset..offset.checked_add(8)?)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_le_bytes)
}

/// Reads a little-endian IEEE-754 `f32` at `offset`.
pub fn read_f32_le(data: &[u8], offset: usize) -> Option<f32> {
    data.get(offset..offset.checked_add(4)?)
        .and_then(|b| b.try_into().ok())
        .map(f32::from_le_bytes)
}

/// Reads a little-endian IEEE-754 `f64` at `offset`.
pub fn read_f64_le(data: &[u8], offset: usize) -> Option<f64> {
    data.get(offset..offset.checked_add(8)?)
        .and_then(|b| b.try_into().ok())
        .map(f64::from_le_bytes)
}

/// Reads a signed 16-bit fixed-point value and maps `[-32767, 32767]` to
/// `[-1.0, 1.0]` (the direction-cosine encoding used by the F1 formats).
pub fn read_norm_i16_le(data: &[u8], offset: usize) -> Option<f32> {
    read_i16_le(data, offset).map(|v| f32::from(v) / 32767.0)
}

/// Reads up to `max_chars` UTF-16LE code units starting at `offset`,
/// stopping at the first zero code unit. Never reads past `max_chars`
/// even when no terminator is present.
pub fn read_wide_string(data: &[u8], offset: usize, max_chars: usize) -> Option<String> {
    let mut units = Vec::with_capacity(max_chars);
    for i in 0..max_chars {
        let unit = read_u16_le(data, offset.checked_add(i.checked_mul(2)?)?)?;
        if unit == 0 {
            break;
        }
        units.push(unit);
    }
    Some(String::from_utf16_lossy(&units))
}

/// Reads up to `max_bytes` single-byte characters starting at `offset`,
/// trimming trailing null bytes (fixed-width C string fields).
pub fn read_byte_string(data: &[u8], offset: usize, max_bytes: usize) -> Option<String> {
    let raw = data.get(offset..offset.checked_add(max_bytes)?)?;
    let end = raw.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    let trimmed = raw.get(..end)?;
    Some(trimmed.iter().map(|b| char::from(*b)).collect())
}

/// Explicit cursor over a byte buffer for formats read in strict wire order.
///
/// Each read advances the cursor by the field width; a read past the end
/// leaves the cursor unchanged and returns `None`. Keeping the cursor an
/// explicit value (rather than shared mutable state) keeps each extraction
/// routine independently testable.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Starts a cursor at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Starts a cursor at `offset` into `data`.
    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self { data, pos: offset }
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Advances the cursor over `n` bytes without surfacing them.
    pub fn skip(&mut self, n: usize) -> Option<()> {
        let next = self.pos.checked_add(n)?;
        if next > self.data.len() {
            return None;
        }
        self.pos = next;
        Some(())
    }

    fn take<T>(&mut self, width: usize, value: Option<T>) -> Option<T> {
        let v = value?;
        self.pos = self.pos.checked_add(width)?;
        Some(v)
    }

    /// Reads an `i8` and advances.
    pub fn i8(&mut self) -> Option<i8> {
        let v = read_i8(self.data, self.pos);
        self.take(1, v)
    }

    /// Reads a `u8` and advances.
    pub fn u8(&mut self) -> Option<u8> {
        let v = read_u8(self.data, self.pos);
        self.take(1, v)
    }

    /// Reads a little-endian `i16` and advances.
    pub fn i16(&mut self) -> Option<i16> {
        let v = read_i16_le(self.data, self.pos);
        self.take(2, v)
    }

    /// Reads a little-endian `u16` and advances.
    pub fn u16(&mut self) -> Option<u16> {
        let v = read_u16_le(self.data, self.pos);
        self.take(2, v)
    }

    /// Reads a little-endian `i32` and advances.
    pub fn i32(&mut self) -> Option<i32> {
        let v = read_i32_le(self.data, self.pos);
        self.take(4, v)
    }

    /// Reads a little-endian `u32` and advances.
    pub fn u32(&mut self) -> Option<u32> {
        let v = read_u32_le(self.data, self.pos);
        self.take(4, v)
    }

    /// Reads a little-endian `u64` and advances.
    pub fn u64(&mut self) -> Option<u64> {
        let v = read_u64_le(self.data, self.pos);
        self.take(8, v)
    }

    /// Reads a little-endian `f32` and advances.
    pub fn f32(&mut self) -> Option<f32> {
        let v = read_f32_le(self.data, self.pos);
        self.take(4, v)
    }

    /// Reads a little-endian `f64` and advances.
    pub fn f64(&mut self) -> Option<f64> {
        let v = read_f64_le(self.data, self.pos);
        self.take(8, v)
    }

    /// Reads a normalized fixed-point `i16` and advances.
    pub fn norm_i16(&mut self) -> Option<f32> {
        let v = read_norm_i16_le(self.data, self.pos);
        self.take(2, v)
    }

    /// Reads a fixed-width UTF-16LE string field and advances over the
    /// whole field regardless of where the terminator sits.
    pub fn wide_string(&mut self, max_chars: usize) -> Option<String> {
        let width = max_chars.checked_mul(2)?;
        if self.pos.checked_add(width)? > self.data.len() {
            return None;
        }
        let v = read_wide_string(self.data, self.pos, max_chars);
        self.take(width, v)
    }

    /// Reads a fixed-width single-byte string field and advances over the
    /// whole field.
    pub fn byte_string(&mut self, max_bytes: usize) -> Option<String> {
        let v = read_byte_string(self.data, self.pos, max_bytes);
        self.take(max_bytes, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_reads_are_little_endian() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        assert_eq!(read_u16_le(&data, 0), Some(0x0201));
        assert_eq!(read_u32_le(&data, 0), Some(0x0403_0201));
        assert_eq!(read_u64_le(&data, 0), Some(0x0807_0605_0403_0201));
        assert_eq!(read_i16_le(&[0xFF, 0xFF], 0), Some(-1));
        assert_eq!(read_i32_le(&[0xFE, 0xFF, 0xFF, 0xFF], 0), Some(-2));
    }

    #[test]
    fn float_reads_round_trip() {
        let mut data = Vec::new();
        data.extend_from_slice(&1.5_f32.to_le_bytes());
        data.extend_from_slice(&(-2.25_f64).to_le_bytes());
        assert_eq!(read_f32_le(&data, 0), Some(1.5));
        assert_eq!(read_f64_le(&data, 4), Some(-2.25));
    }

    #[test]
    fn out_of_range_reads_fail_softly() {
        let data = [0u8; 4];
        assert_eq!(read_u32_le(&data, 1), None);
        assert_eq!(read_f32_le(&data, 4), None);
        assert_eq!(read_u8(&data, 4), None);
        assert_eq!(read_u64_le(&data, 0), None);
        // Offsets near usize::MAX must not wrap around.
        assert_eq!(read_u32_le(&data, usize::MAX), None);
    }

    #[test]
    fn normalized_i16_maps_full_scale() {
        let pos = 32767_i16.to_le_bytes();
        let neg = (-32767_i16).to_le_bytes();
        assert_eq!(read_norm_i16_le(&pos, 0), Some(1.0));
        assert_eq!(read_norm_i16_le(&neg, 0), Some(-1.0));
    }

    #[test]
    fn wide_string_stops_at_terminator() {
        // "1:23" followed by a null and junk inside a 8-char field.
        let mut data = Vec::new();
        for ch in ['1', ':', '2', '3'] {
            data.extend_from_slice(&(ch as u16).to_le_bytes());
        }
        data.extend_from_slice(&0u16.to_le_bytes());
        for _ in 0..3 {
            data.extend_from_slice(&('X' as u16).to_le_bytes());
        }
        assert_eq!(read_wide_string(&data, 0, 8).as_deref(), Some("1:23"));
    }

    #[test]
    fn wide_string_honors_max_chars_without_terminator() {
        let mut data = Vec::new();
        for _ in 0..16 {
            data.extend_from_slice(&('a' as u16).to_le_bytes());
        }
        assert_eq!(read_wide_string(&data, 0, 4).as_deref(), Some("aaaa"));
    }

    #[test]
    fn byte_string_trims_trailing_nulls() {
        let data = *b"VER\0\0\0\0\0";
        assert_eq!(read_byte_string(&data, 0, 8).as_deref(), Some("VER"));
        // Interior nulls are preserved; only the tail is trimmed.
        let data = *b"A\0B\0\0\0\0\0";
        assert_eq!(read_byte_string(&data, 0, 8).as_deref(), Some("A\0B"));
    }

    #[test]
    fn cursor_threads_through_mixed_fields() {
        let mut data = Vec::new();
        data.extend_from_slice(&7_i32.to_le_bytes());
        data.extend_from_slice(&0.5_f32.to_le_bytes());
        data.push(9);
        let mut r = ByteReader::new(&data);
        assert_eq!(r.i32(), Some(7));
        assert_eq!(r.f32(), Some(0.5));
        assert_eq!(r.u8(), Some(9));
        assert_eq!(r.position(), 9);
        // Exhausted: further reads fail and do not move the cursor.
        assert_eq!(r.u8(), None);
        assert_eq!(r.position(), 9);
    }

    #[test]
    fn cursor_skip_is_bounds_checked() {
        let data = [0u8; 10];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.skip(10), Some(()));
        assert_eq!(r.skip(1), None);
    }
}
