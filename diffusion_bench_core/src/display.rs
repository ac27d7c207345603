use std::path::Path;

use image::{imageops, DynamicImage, RgbImage};
use tracing::info;

use crate::error::{BenchError, Result};

/// Lay a batch out left to right on a single row.
pub fn image_grid(images: &[DynamicImage]) -> Result<RgbImage> {
    if images.is_empty() {
        return Err(BenchError::EmptyBatch);
    }
    let width = images.iter().map(|i| i.width()).sum();
    let height = images.iter().map(|i| i.height()).max().unwrap_or(0);

    let mut canvas = RgbImage::new(width, height);
    let mut x = 0;
    for image in images {
        imageops::replace(&mut canvas, &image.to_rgb8(), i64::from(x), 0);
        x += image.width();
    }
    Ok(canvas)
}

/// Save a batch side by side. The format follows the file extension.
pub fn save_grid<P: AsRef<Path>>(images: &[DynamicImage], path: P) -> Result<()> {
    let path = path.as_ref();
    image_grid(images)?.save(path)?;
    info!("saved {} images to `{}`.", images.len(), path.display());
    Ok(())
}
