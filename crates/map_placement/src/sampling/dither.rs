//! Ordered-dithering thresholds.
//!
//! Every stencil position owns one threshold from an 8x8 Bayer matrix. Any aligned
//! power-of-two sub-block of the matrix is itself evenly spread over `[0, 1)`, so
//! smaller stencils reuse the top-left corner.

/// Bayer matrix, row-major, values `0..64`.
pub const DITHER_MATRIX: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

pub const DITHER_SIZE: usize = 8;

/// Threshold in `[0, 1)` for stencil cell `(x, y)`; coordinates wrap at 8.
#[inline]
pub fn threshold(x: usize, y: usize) -> f32 {
    DITHER_MATRIX[y % DITHER_SIZE][x % DITHER_SIZE] as f32 / 64.0
}
