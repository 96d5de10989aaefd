//! Scroll position to chunk mapping.

/// Number of chunks needed for `total_rows` rows.
#[inline]
pub fn chunk_count(total_rows: u64, chunk_size: usize) -> usize {
    if chunk_size == 0 {
        return 0;
    }
    total_rows.div_ceil(chunk_size as u64) as usize
}

/// Map a normalized viewport position to the chunk holding that row.
///
/// `approx_row = floor(fraction * (total_rows - 1))`, and the target chunk
/// is `approx_row / chunk_size` clamped to the valid chunk range. Fractions
/// outside `[0, 1]` are clamped and NaN is treated as 0. Returns 0 when there
/// are no rows.
///
/// # Examples
///
/// ```
/// use bigcsv::dsv::map_position;
///
/// assert_eq!(map_position(0.0, 10_000, 1000), 0);
/// assert_eq!(map_position(0.5, 10_000, 1000), 4);
/// assert_eq!(map_position(1.0, 10_000, 1000), 9);
/// ```
pub fn map_position(fraction: f64, total_rows: u64, chunk_size: usize) -> usize {
    let count = chunk_count(total_rows, chunk_size);
    if count == 0 {
        return 0;
    }

    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };
    let approx_row = (fraction * (total_rows - 1) as f64).floor() as u64;
    let target = (approx_row / chunk_size as u64) as usize;

    target.min(count - 1)
}
