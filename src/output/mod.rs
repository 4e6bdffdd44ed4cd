use crate::predict::{ActivationMaps, ResultsTable};
use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use image::{GrayImage, Luma};
use ndarray::Array2;
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tar::Builder;

/// Archive the results of one mosaic alongside the source image
///
/// Writes `<stem>.predictions.tar.gz` next to the image, containing:
/// - `predictions.tsv` — the results table, row-major
/// - `activations/CAM_<class>.png` — one grayscale map per class,
///   one pixel per tile
pub fn save(table: &ResultsTable, maps: &ActivationMaps, image_path: &Path) -> Result<()> {
    let path = archive_path(image_path);
    let file = File::create(&path)
        .with_context(|| format!("Failed to create archive {}", path.display()))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    let tsv = table.to_tsv()?;
    append(&mut builder, "predictions.tsv", &tsv)?;

    for (class, map) in maps.iter() {
        let png = render_map(map)?;
        append(&mut builder, &format!("activations/CAM_{class}.png"), &png)?;
    }

    let encoder = builder
        .into_inner()
        .context("Failed to finalize prediction archive")?;
    encoder
        .finish()
        .context("Failed to finalize prediction archive")?;

    tracing::info!("Saved {} predictions to {}", table.len(), path.display());
    Ok(())
}

/// Archive path for a source image: same directory, `<stem>.predictions.tar.gz`
pub fn archive_path(image_path: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    image_path.with_file_name(format!("{stem}.predictions.tar.gz"))
}

fn append<W: Write>(builder: &mut Builder<W>, name: &str, data: &[u8]) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_path(name)?;
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append(&header, data)
        .with_context(|| format!("Failed to add {name} to the archive"))
}

/// Render one activation map as an 8-bit grayscale PNG, one pixel per tile
fn render_map(map: &Array2<f32>) -> Result<Vec<u8>> {
    let (nrows, ncols) = map.dim();
    let image = GrayImage::from_fn(ncols as u32, nrows as u32, |x, y| {
        let value = (map[[y as usize, x as usize]] * 255.0).clamp(0.0, 255.0) as u8;
        Luma([value])
    });

    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .context("Failed to encode activation map")?;
    Ok(buffer.into_inner())
}
