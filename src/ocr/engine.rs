use anyhow::{anyhow, Result};
use image::GrayImage;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::{find_tessdata_dir, find_tesseract_executable};

/// Runs Tesseract on a preprocessed greyscale image and returns the raw
/// recognized text.
///
/// `ocr_args` is the config-supplied tuning string, split on whitespace and
/// passed straight through to the CLI (page segmentation mode, character
/// whitelist, and so on).
pub fn recognize_text(img: &GrayImage, ocr_args: &str) -> Result<String> {
    let tesseract_exe = find_tesseract_executable()?;

    // Tesseract reads from a file, so round-trip through a temp PNG
    let temp_input = NamedTempFile::with_suffix(".png")?;
    img.save(temp_input.path())?;

    let mut command = Command::new(&tesseract_exe);
    command.arg(temp_input.path()).arg("stdout");

    if let Some(tessdata_dir) = find_tessdata_dir() {
        command.arg("--tessdata-dir").arg(tessdata_dir);
    }

    for arg in ocr_args.split_whitespace() {
        command.arg(arg);
    }

    let output = command.output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("Tesseract failed: {}", stderr));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
