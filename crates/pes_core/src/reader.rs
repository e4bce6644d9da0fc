use crate::core_api::{CoreError, CoreErrorCode};

/// Widest integer handled by the whole-byte helpers.
pub const MAX_UINT_WIDTH: usize = 8;

/// Reads a little-endian unsigned integer of `width` bytes at `offset`.
///
/// Returns `None` when the span does not fit inside `bytes` or `width` is not
/// in `1..=8`.
pub fn read_le_uint(bytes: &[u8], offset: usize, width: usize) -> Option<u64> {
    if width == 0 || width > MAX_UINT_WIDTH {
        return None;
    }
    let end = offset.checked_add(width)?;
    let window = bytes.get(offset..end)?;

    let mut buf = [0u8; MAX_UINT_WIDTH];
    buf[..width].copy_from_slice(window);
    Some(u64::from_le_bytes(buf))
}

pub fn write_le_uint(
    bytes: &mut [u8],
    offset: usize,
    width: usize,
    value: u64,
) -> Result<(), CoreError> {
    if width == 0 || width > MAX_UINT_WIDTH {
        return Err(CoreError::new(
            CoreErrorCode::InvalidValue,
            format!("unsupported integer width {width}, expected 1-{MAX_UINT_WIDTH} bytes"),
        ));
    }
    if width < MAX_UINT_WIDTH && value >> (width * 8) != 0 {
        return Err(CoreError::new(
            CoreErrorCode::InvalidValue,
            format!("value {value} does not fit in {width} bytes"),
        ));
    }

    let len = bytes.len();
    let window = offset
        .checked_add(width)
        .and_then(|end| bytes.get_mut(offset..end))
        .ok_or_else(|| {
            CoreError::new(
                CoreErrorCode::OutOfRange,
                format!("{width}-byte write at offset {offset} exceeds buffer of {len} bytes"),
            )
        })?;

    window.copy_from_slice(&value.to_le_bytes()[..width]);
    Ok(())
}
