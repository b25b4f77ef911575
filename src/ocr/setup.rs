use anyhow::{anyhow, Result};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use crate::log;
use crate::paths::get_tesseract_dir;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

/// Install locations checked after PATH.
const COMMON_INSTALL_PATHS: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];

/// System tessdata locations checked when TESSDATA_PREFIX is not set.
const COMMON_TESSDATA_PATHS: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
    r"C:\Program Files\Tesseract-OCR\tessdata",
];

/// Verifies that Tesseract is usable. Must be called before any camera
/// access; a missing OCR engine is fatal.
///
/// If no tessdata directory is visible anywhere, attempts to download
/// eng.traineddata into the per-user data dir. Download failures are only
/// warnings: the installation may still carry language data at a compiled-in
/// path we cannot see.
pub fn ensure_tesseract() -> Result<()> {
    let exe = find_tesseract_executable()?;
    log(&format!("Tesseract found: {}", exe.display()));

    if find_tessdata_dir().is_none() {
        let local_tessdata = get_tesseract_dir().join("tessdata");
        if let Err(e) = download_tessdata(&local_tessdata) {
            log(&format!("Warning: could not fetch eng.traineddata: {}", e));
            log("OCR may fail if the installation has no language data.");
        }
    }

    Ok(())
}

/// Finds the Tesseract executable: PATH first, then common install paths.
pub fn find_tesseract_executable() -> Result<PathBuf> {
    if let Ok(output) = Command::new("tesseract").arg("--version").output() {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    for path in COMMON_INSTALL_PATHS {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract OCR not found. Please install it first:\n\
         - Debian/Ubuntu: sudo apt install tesseract-ocr\n\
         - macOS: brew install tesseract\n\
         - Windows: https://github.com/UB-Mannheim/tesseract/wiki\n\
         Then make sure the executable is on your PATH."
    ))
}

/// Finds a tessdata directory containing eng.traineddata, if any is visible.
/// Checks the per-user download dir, TESSDATA_PREFIX, then system paths.
pub fn find_tessdata_dir() -> Option<PathBuf> {
    let local_tessdata = get_tesseract_dir().join("tessdata");
    if local_tessdata.join("eng.traineddata").exists() {
        return Some(local_tessdata);
    }

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let p = PathBuf::from(&prefix);
        if p.join("eng.traineddata").exists() {
            return Some(p);
        }
        let p = PathBuf::from(&prefix).join("tessdata");
        if p.join("eng.traineddata").exists() {
            return Some(p);
        }
    }

    for path in COMMON_TESSDATA_PATHS {
        let p = PathBuf::from(path);
        if p.join("eng.traineddata").exists() {
            return Some(p);
        }
    }

    None
}

/// Downloads English trained data into the given directory.
fn download_tessdata(tessdata_dir: &PathBuf) -> Result<()> {
    fs::create_dir_all(tessdata_dir)?;

    let eng_url = format!("{}/eng.traineddata", TESSDATA_REPO);
    let eng_path = tessdata_dir.join("eng.traineddata");

    log("Downloading eng.traineddata...");

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&eng_url)
        .header("User-Agent", "tempmon")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download eng.traineddata: HTTP {}",
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(&eng_path)?;
    file.write_all(&bytes)?;

    log(&format!(
        "Downloaded eng.traineddata ({} bytes)",
        bytes.len()
    ));

    Ok(())
}
