//! QR code extraction from still images

use image::GrayImage;
use log::debug;
use std::path::Path;

use crate::errors::QrError;

/// Decode the first QR code found in the image at `path`
pub fn decode_file(path: &Path) -> Result<String, QrError> {
    let image = image::open(path)?.to_luma8();
    debug!(
        "Scanning {} ({}x{}) for a QR code",
        path.display(),
        image.width(),
        image.height()
    );
    decode_luma(&image)
}

/// Decode the first QR code found in a greyscale image
pub fn decode_luma(image: &GrayImage) -> Result<String, QrError> {
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        image.width() as usize,
        image.height() as usize,
        |x, y| image.get_pixel(x as u32, y as u32).0[0],
    );
    let grids = prepared.detect_grids();
    let grid = grids.first().ok_or(QrError::NoCode)?;
    let (_, content) = grid
        .decode()
        .map_err(|e| QrError::Decode(format!("{:?}", e)))?;
    Ok(content)
}
