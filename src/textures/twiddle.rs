//! Twiddled texture addressing.
//!
//! Twiddled textures store pixels in Morton order with the x bits on the odd
//! positions and the y bits on the even positions. Non-square textures are a
//! row (landscape) or column (portrait) of square tiles, each tile stored
//! contiguously.

/// Morton offsets for one axis of a `side`-wide square, built by accumulating
/// the per-step increments (`1, 3, 1, 11, 1, 3, 1, 43, ...` for y; doubled for x).
fn axis_offsets(side: usize) -> Vec<u32> {
    let mut offsets = Vec::with_capacity(side);
    let mut value = 0u32;
    for i in 0..side {
        offsets.push(value);
        // Incrementing i flips its trailing ones to zero and sets the next bit.
        let trailing = (i as u32).trailing_ones();
        let cleared: u32 = (0..trailing).map(|bit| 1u32 << (bit * 2)).sum();
        value = value - cleared + (1u32 << (trailing * 2));
    }
    offsets
}

/// Whether a `width` x `height` image is stored linearly ("stride") rather than
/// as twiddled square tiles.
///
/// Landscape images whose width is a non-power-of-two multiple of 32, or whose
/// height is not a power of two, are stride. Otherwise the short side must be a
/// power of two that divides the long side.
pub fn is_stride_layout(width: usize, height: usize) -> bool {
    if width > height
        && ((width % 32 == 0 && !width.is_power_of_two()) || !height.is_power_of_two())
    {
        return true;
    }
    let side = width.min(height);
    side == 0 || !side.is_power_of_two() || width.max(height) % side != 0
}

/// Permutation mapping raster position `y * w + x` to the pixel's storage
/// index in a twiddled `w` x `h` image.
///
/// Stride layouts (see [`is_stride_layout`]) yield the identity permutation.
pub fn detwiddle(width: usize, height: usize) -> Vec<u32> {
    if is_stride_layout(width, height) {
        return (0..(width * height) as u32).collect();
    }

    let side = width.min(height);
    let offsets = axis_offsets(side);
    let tile_len = (side * side) as u32;

    let mut arr = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let (tile, tx, ty) = if width >= height {
                (x / side, x % side, y)
            } else {
                (y / side, x, y % side)
            };
            arr.push(tile as u32 * tile_len + ((offsets[tx] << 1) | offsets[ty]));
        }
    }
    arr
}
