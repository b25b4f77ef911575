//! Main monitoring loop.
//!
//! Polls the camera, crops the configured region, extracts a temperature
//! via OCR, and feeds the alert state machine. Runtime commands arrive on
//! an mpsc channel fed by a detached stdin reader thread.

use anyhow::{Context, Result};
use chrono::Local;
use image::{Rgb, RgbImage};
use std::fs::OpenOptions;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use crate::alert::{self, AlertState};
use crate::camera::CameraSource;
use crate::config::{MonitorConfig, Roi, ThresholdDirection};
use crate::log;
use crate::ocr;
use crate::paths;

/// Runtime commands accepted while monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    ResetRoi,
    Snapshot,
    RaiseThreshold,
    LowerThreshold,
}

/// Maps one stdin line to a command.
pub fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "q" | "quit" => Some(Command::Quit),
        "r" => Some(Command::ResetRoi),
        "c" => Some(Command::Snapshot),
        "+" => Some(Command::RaiseThreshold),
        "-" => Some(Command::LowerThreshold),
        _ => None,
    }
}

/// Spawns the stdin reader thread. The thread exits after sending Quit or
/// when stdin closes; the channel disconnecting is not a stop signal.
fn spawn_command_reader() -> Receiver<Command> {
    let (sender, receiver) = mpsc::channel();

    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(command) => {
                    if sender.send(command).is_err() {
                        break;
                    }
                    if command == Command::Quit {
                        break;
                    }
                }
                None => {
                    if !line.trim().is_empty() {
                        println!("Unknown command: {} (use q, r, c, +, -)", line.trim());
                    }
                }
            }
        }
    });

    receiver
}

/// Status recorded with each temperature log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Normal,
    Alert,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Normal => write!(f, "normal"),
            Status::Alert => write!(f, "ALERT"),
        }
    }
}

fn format_log_line(timestamp: &str, value: f64, status: Status) -> String {
    format!(
        "{} - Temperature: {}°C - Status: {}",
        timestamp, value, status
    )
}

/// Appends one line to the temperature log and echoes it to the console.
pub fn log_temperature(path: &Path, value: f64, status: Status) -> Result<()> {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let line = format_log_line(&timestamp, value, status);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    writeln!(file, "{}", line).context("Failed to write temperature log")?;

    println!("{}", line);
    Ok(())
}

/// Draws a 2px rectangle outline marking the region of interest.
/// The rectangle is clamped to the frame before drawing.
fn draw_roi_outline(frame: &mut RgbImage, roi: &Roi, color: Rgb<u8>) {
    let (w, h) = frame.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let r = roi.clamped(w, h);

    for t in 0..2u32 {
        let top = r.y + t;
        let bottom = (r.y + r.height).saturating_sub(1 + t);
        for x in r.x..r.x + r.width {
            if top < h {
                frame.put_pixel(x, top, color);
            }
            if bottom >= r.y && bottom < h {
                frame.put_pixel(x, bottom, color);
            }
        }

        let left = r.x + t;
        let right = (r.x + r.width).saturating_sub(1 + t);
        for y in r.y..r.y + r.height {
            if left < w {
                frame.put_pixel(left, y, color);
            }
            if right >= r.x && right < w {
                frame.put_pixel(right, y, color);
            }
        }
    }
}

/// Owned monitor state: configuration, alert flag, last reading, and the
/// frame counter. No ambient globals.
pub struct Monitor {
    config: MonitorConfig,
    config_path: PathBuf,
    alert: AlertState,
    last_reading: Option<f64>,
    frame_count: u64,
}

impl Monitor {
    pub fn new(config: MonitorConfig, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
            alert: AlertState::new(),
            last_reading: None,
            frame_count: 0,
        }
    }

    /// Green outline normally, red while alerting.
    fn outline_color(&self) -> Rgb<u8> {
        if self.alert.is_alerting() {
            Rgb([255, 0, 0])
        } else {
            Rgb([0, 255, 0])
        }
    }

    /// Runs the poll loop until the quit command arrives.
    ///
    /// The camera handle lives inside this function and its stream stops on
    /// every exit path, including error returns.
    pub fn run(&mut self, camera_override: Option<u32>) -> Result<()> {
        let index = camera_override.unwrap_or(self.config.camera_index);
        log(&format!("Opening camera {}...", index));

        let mut camera = CameraSource::open_with_fallback(index)?;
        let (frame_w, frame_h) = camera.resolution();
        log(&format!(
            "Camera {} ready ({}x{})",
            camera.index(),
            frame_w,
            frame_h
        ));

        let direction = match self.config.threshold_direction {
            ThresholdDirection::Above => "above",
            ThresholdDirection::Below => "below",
        };
        log(&format!(
            "Monitoring temperature (threshold: {}°C, {})",
            self.config.temperature_threshold, direction
        ));
        log(&format!("Logging to: {}", self.config.log_file));
        println!("Commands: q=quit, r=reset ROI, c=snapshot, +/-=adjust threshold");

        let commands = spawn_command_reader();
        let mut last_log_time = Instant::now();
        let mut last_frame: Option<RgbImage> = None;

        loop {
            if !self.handle_commands(&commands, last_frame.as_ref())? {
                break;
            }

            let frame = match camera.read_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    log(&format!("Warning: {:#}", e));
                    thread::sleep(Duration::from_secs(1));
                    continue;
                }
            };
            self.frame_count += 1;

            let roi_frame = ocr::preprocess::crop_roi(&frame, &self.config.roi);
            match ocr::extract_temperature(&roi_frame, &self.config.ocr_config) {
                Ok(reading) => {
                    if let Some(value) = reading.value {
                        self.last_reading = Some(value);
                        self.apply_reading(value)?;

                        if last_log_time.elapsed()
                            >= Duration::from_secs(self.config.log_interval)
                        {
                            log_temperature(
                                Path::new(&self.config.log_file),
                                value,
                                Status::Normal,
                            )?;
                            last_log_time = Instant::now();

                            if self.config.enable_preview {
                                self.write_preview(&frame);
                            }
                        }
                    }
                }
                Err(e) => log(&format!("Warning: OCR failed: {:#}", e)),
            }
            last_frame = Some(frame);

            thread::sleep(Duration::from_secs_f64(self.config.capture_interval.max(0.0)));
        }

        log(&format!(
            "Monitor stopped. Processed {} frames.",
            self.frame_count
        ));
        if let Some(value) = self.last_reading {
            log(&format!("Last reading: {}°C", value));
        }
        Ok(())
    }

    /// Feeds one reading to the alert state machine.
    fn apply_reading(&mut self, value: f64) -> Result<()> {
        let crossed = alert::check(
            value,
            self.config.temperature_threshold,
            self.config.threshold_direction,
        );
        if crossed && self.alert.raise() {
            log(&format!(
                "ALERT! Temperature {}°C has reached threshold!",
                value
            ));
            log_temperature(Path::new(&self.config.log_file), value, Status::Alert)?;
            alert::spawn_alert_sound();
            self.alert
                .schedule_reset(Duration::from_secs(self.config.alert_cooldown_seconds));
        }
        Ok(())
    }

    /// Drains pending commands. Returns false when the loop should stop.
    fn handle_commands(
        &mut self,
        commands: &Receiver<Command>,
        last_frame: Option<&RgbImage>,
    ) -> Result<bool> {
        loop {
            let command = match commands.try_recv() {
                Ok(command) => command,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(true),
            };

            match command {
                Command::Quit => {
                    log("Stopping monitor...");
                    return Ok(false);
                }
                Command::ResetRoi => {
                    let Some(frame) = last_frame else {
                        log("No frame captured yet, cannot reset ROI");
                        continue;
                    };
                    let (w, h) = frame.dimensions();
                    self.config.roi = Roi::centered(w, h);
                    self.config.save(&self.config_path)?;
                    log("ROI reset to center of frame");
                }
                Command::Snapshot => {
                    let Some(frame) = last_frame else {
                        log("No frame captured yet, cannot save snapshot");
                        continue;
                    };
                    let mut annotated = frame.clone();
                    draw_roi_outline(&mut annotated, &self.config.roi, self.outline_color());

                    let filename =
                        format!("capture_{}.png", Local::now().format("%Y%m%d_%H%M%S"));
                    let path = paths::get_snapshots_dir().join(filename);
                    match annotated.save(&path) {
                        Ok(()) => log(&format!("Saved capture: {}", path.display())),
                        Err(e) => log(&format!("Failed to save capture: {}", e)),
                    }
                }
                Command::RaiseThreshold => {
                    self.config.temperature_threshold += 1.0;
                    self.config.save(&self.config_path)?;
                    log(&format!(
                        "Threshold increased to: {}°C",
                        self.config.temperature_threshold
                    ));
                }
                Command::LowerThreshold => {
                    self.config.temperature_threshold -= 1.0;
                    self.config.save(&self.config_path)?;
                    log(&format!(
                        "Threshold decreased to: {}°C",
                        self.config.temperature_threshold
                    ));
                }
            }
        }
    }

    /// Best-effort preview frame with the ROI outlined.
    fn write_preview(&self, frame: &RgbImage) {
        let mut annotated = frame.clone();
        draw_roi_outline(&mut annotated, &self.config.roi, self.outline_color());
        let path = paths::get_snapshots_dir().join("preview.png");
        if let Err(e) = annotated.save(&path) {
            log(&format!("Failed to write preview: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_command_known_keys() {
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("quit"), Some(Command::Quit));
        assert_eq!(parse_command(" r \n"), Some(Command::ResetRoi));
        assert_eq!(parse_command("c"), Some(Command::Snapshot));
        assert_eq!(parse_command("+"), Some(Command::RaiseThreshold));
        assert_eq!(parse_command("-"), Some(Command::LowerThreshold));
    }

    #[test]
    fn test_parse_command_rejects_noise() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("x"), None);
        assert_eq!(parse_command("++"), None);
    }

    #[test]
    fn test_format_log_line() {
        let line = format_log_line("2025-01-02 03:04:05", 12.5, Status::Normal);
        assert_eq!(line, "2025-01-02 03:04:05 - Temperature: 12.5°C - Status: normal");

        let line = format_log_line("2025-01-02 03:04:05", 60.0, Status::Alert);
        assert_eq!(line, "2025-01-02 03:04:05 - Temperature: 60°C - Status: ALERT");
    }

    #[test]
    fn test_log_temperature_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("temperature_log.txt");

        log_temperature(&path, 21.5, Status::Normal).unwrap();
        log_temperature(&path, 55.0, Status::Alert).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("Temperature: 21.5°C - Status: normal"));
        assert!(lines[1].ends_with("Temperature: 55°C - Status: ALERT"));
    }

    #[test]
    fn test_draw_roi_outline_marks_border() {
        let mut frame: RgbImage = image::ImageBuffer::new(100, 100);
        let roi = Roi {
            x: 10,
            y: 20,
            width: 40,
            height: 30,
        };
        let green = Rgb([0u8, 255u8, 0u8]);
        draw_roi_outline(&mut frame, &roi, green);
        assert_eq!(*frame.get_pixel(10, 20), green, "top-left corner");
        assert_eq!(*frame.get_pixel(49, 49), green, "bottom-right corner");
        assert_eq!(*frame.get_pixel(30, 35), Rgb([0, 0, 0]), "interior untouched");
    }

    #[test]
    fn test_draw_roi_outline_oversize_roi() {
        // Clamping happens before drawing, so this must not panic
        let mut frame: RgbImage = image::ImageBuffer::new(50, 50);
        let roi = Roi {
            x: 40,
            y: 40,
            width: 100,
            height: 100,
        };
        draw_roi_outline(&mut frame, &roi, Rgb([0, 255, 0]));
        assert_eq!(*frame.get_pixel(49, 49), Rgb([0, 255, 0]));
    }
}
