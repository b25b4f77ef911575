//! Temperature Monitor
//!
//! Polls a camera pointed at a temperature display, reads the value from a
//! fixed frame region via Tesseract OCR, and raises a threshold-crossing
//! alert with cooldown.

mod alert;
mod calibrate;
mod camera;
mod config;
mod monitor;
mod ocr;
mod paths;

use anyhow::{anyhow, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;

use config::MonitorConfig;
use monitor::Monitor;

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join("tempmon.log");
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn main() -> Result<()> {
    paths::ensure_directories()?;

    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("--help") | Some("-h") => {
            show_help();
            Ok(())
        }
        Some("--setup") => {
            show_setup_instructions();
            Ok(())
        }
        Some("--list") => {
            camera::list_available_cameras();
            Ok(())
        }
        Some("--select") => {
            ocr::ensure_tesseract()?;
            let Some(index) = camera::select_camera_interactive()? else {
                return Err(anyhow!("No working cameras found"));
            };
            run_monitor(Some(index), true)
        }
        Some("--calibrate") => {
            ocr::ensure_tesseract()?;
            calibrate::run_calibration(&paths::config_path())
        }
        Some(arg) => match arg.parse::<u32>() {
            Ok(index) => {
                log(&format!("Using camera {} from command line", index));
                run_monitor(Some(index), false)
            }
            Err(_) => Err(anyhow!(
                "Unknown argument: {} (use --help for usage)",
                arg
            )),
        },
        None => {
            ocr::ensure_tesseract()?;
            log("Auto-detecting cameras...");
            let Some(index) = camera::auto_select_camera() else {
                return Err(anyhow!(
                    "No working cameras found!\n\
                     Troubleshooting:\n\
                     1. If using a phone webcam, make sure the phone app is running\n\
                     2. Run `tempmon --list` to see what was detected\n\
                     3. Check that no other application is holding the camera"
                ));
            };
            log(&format!("Auto-selected camera {}", index));
            println!("Use --select next time to choose manually");
            run_monitor(Some(index), true)
        }
    }
}

/// Loads the config and runs the monitor loop. The Tesseract check must
/// already have passed. When `persist_index` is set, the chosen camera is
/// written back to config for future runs.
fn run_monitor(camera_override: Option<u32>, persist_index: bool) -> Result<()> {
    let config_path = paths::config_path();
    let mut config = MonitorConfig::load_or_create(&config_path)?;

    if persist_index {
        if let Some(index) = camera_override {
            config.camera_index = index;
            config.save(&config_path)?;
        }
    }

    let mut monitor = Monitor::new(config, config_path);
    monitor.run(camera_override)
}

fn show_help() {
    println!(
        r#"
Temperature Monitor - Usage:

  tempmon              Auto-select a camera and start monitoring
  tempmon <index>      Monitor using a specific camera
  tempmon --list       List available cameras
  tempmon --select     Choose a camera interactively, then monitor
  tempmon --calibrate  Calibrate the temperature display region
  tempmon --setup      Show phone webcam setup instructions
  tempmon --help       Show this help

Configuration file (config.json):
  - camera_index: camera device index (usually 0 or 1)
  - temperature_threshold: alert threshold value
  - threshold_direction: "above" or "below"
  - roi: region of interest for the temperature display
  - alert_cooldown_seconds: time between alerts
  - ocr_config: extra arguments passed to the tesseract CLI

Commands while monitoring (type on stdin):
  q - quit
  r - reset ROI to center of frame
  c - save an annotated snapshot
  + - increase threshold by 1
  - - decrease threshold by 1
"#
    );
}

fn show_setup_instructions() {
    println!(
        r#"
PHONE WEBCAM SETUP OPTIONS:

Option 1 - DroidCam (Android/iOS):
   1. Install the DroidCam app on your phone
   2. Install the DroidCam client on your computer
   3. Connect via WiFi or USB
   4. The phone shows up as an additional camera device

Option 2 - Iriun Webcam (Android/iOS):
   1. Install the Iriun Webcam app on your phone
   2. Install the Iriun Webcam software on your computer
   3. Connect via WiFi or USB
   4. Usually appears as camera index 0 or 1

Option 3 - EpocCam (iOS):
   1. Install the EpocCam app on your iPhone
   2. Install the drivers on your computer
   3. Connect to the same WiFi network

After setup, run `tempmon --list` and the phone camera should be listed.
"#
    );
}
