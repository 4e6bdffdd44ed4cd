use image::{imageops, RgbImage};
use ndarray::Array4;

/// Map an 8-bit channel value to the unit range
pub fn normalize(value: u8) -> f32 {
    value as f32 / 255.0
}

/// Extract the square tile at grid position (row, col)
///
/// Tiles are addressed on the grid implied by `edge`; remainder pixels on
/// the right and bottom edges of the mosaic never produce a partial tile.
pub fn tile(image: &RgbImage, edge: u32, row: u32, col: u32) -> RgbImage {
    imageops::crop_imm(image, col * edge, row * edge, edge, edge).to_image()
}

/// Extract all tiles of one grid row, stacked into a normalized batch
///
/// # Returns
/// * NHWC tensor of shape [ncols, edge, edge, 3] with values in [0, 1],
///   column order preserved. Channels-last matches how the classifiers
///   are exported.
pub fn row_batch(image: &RgbImage, edge: u32, row: u32, ncols: u32) -> Array4<f32> {
    let mut batch = Array4::<f32>::zeros((ncols as usize, edge as usize, edge as usize, 3));

    for c in 0..ncols {
        let tile = tile(image, edge, row, c);
        for y in 0..edge {
            for x in 0..edge {
                let pixel = tile.get_pixel(x, y);
                for ch in 0..3 {
                    batch[[c as usize, y as usize, x as usize, ch]] = normalize(pixel[ch]);
                }
            }
        }
    }

    batch
}
