//! Little-endian bit addressing over a byte buffer.
//!
//! Bit `n` lives in byte `n / 8` at position `n % 8`, counting from the least
//! significant bit. Multi-bit values are assembled least-significant bit
//! first, so a field that starts mid-byte continues into the low bits of the
//! next byte.
//!
//! Positions past the end of the buffer read as zero and ignore writes. The
//! buffer is never resized.

/// Returns the bit at `bit_index`, or 0 when the index is past the buffer.
pub fn get_bit(bytes: &[u8], bit_index: usize) -> u8 {
    match bytes.get(bit_index / 8) {
        Some(byte) => (byte >> (bit_index % 8)) & 1,
        None => 0,
    }
}

pub fn read_bits(bytes: &[u8], start_bit: usize, width: u32) -> u32 {
    debug_assert!(width <= u32::BITS, "bit width {width} exceeds 32");
    let mut value = 0u32;
    for i in 0..width {
        let Some(bit_index) = start_bit.checked_add(i as usize) else {
            break;
        };
        if get_bit(bytes, bit_index) == 1 {
            value |= 1 << i;
        }
    }
    value
}

/// Writes the low `width` bits of `value` starting at `start_bit`.
///
/// Each target bit is cleared and then set from `value`, so bits of `value`
/// above `width` are ignored. Range checks belong to the caller.
pub fn write_bits(bytes: &mut [u8], start_bit: usize, width: u32, value: u32) {
    debug_assert!(width <= u32::BITS, "bit width {width} exceeds 32");
    for i in 0..width {
        let Some(bit_index) = start_bit.checked_add(i as usize) else {
            break;
        };
        let Some(byte) = bytes.get_mut(bit_index / 8) else {
            continue;
        };
        let mask = 1u8 << (bit_index % 8);
        *byte &= !mask;
        if (value >> i) & 1 == 1 {
            *byte |= mask;
        }
    }
}

/// Largest value representable in `width` bits.
pub fn max_value(width: u32) -> u32 {
    if width >= u32::BITS {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}
