use std::path::PathBuf;

/// Returns the path of the configuration file in the working directory.
pub fn config_path() -> PathBuf {
    PathBuf::from("config.json")
}

/// Returns the logs directory: `./logs/`
pub fn get_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

/// Returns the snapshots directory: `./snapshots/`
pub fn get_snapshots_dir() -> PathBuf {
    PathBuf::from("snapshots")
}

/// Returns the per-user directory for downloaded Tesseract data.
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tempmon")
        .join("tesseract")
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    std::fs::create_dir_all(get_snapshots_dir())?;
    Ok(())
}
