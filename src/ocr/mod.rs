pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use extract::{parse_reading, Reading};
pub use setup::ensure_tesseract;

use anyhow::Result;
use image::RgbImage;

/// High-level extraction: cropped ROI frame → temperature reading.
///
/// Greyscale → Otsu binarization → 3x3 median denoise → Tesseract with the
/// configured argument string → first numeric token.
pub fn extract_temperature(roi_frame: &RgbImage, ocr_args: &str) -> Result<Reading> {
    let gray = preprocess::to_grayscale(roi_frame);
    let level = preprocess::otsu_level(&gray);
    let binary = preprocess::binarize(&gray, level);
    let denoised = preprocess::median_denoise(&binary);

    let text = engine::recognize_text(&denoised, ocr_args)?;
    extract::parse_reading(&text)
}
