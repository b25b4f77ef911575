//! Interactive ROI calibration.
//!
//! Terminal wizard: captures a reference frame for the user to inspect,
//! collects the two corners of the temperature display region, verifies the
//! selection with a test OCR pass, and saves it to config. Calibration and
//! monitoring are mutually exclusive modes; each owns its own camera handle.

use anyhow::{anyhow, Result};
use std::io::{BufRead, Lines, StdinLock, Write};
use std::path::Path;

use crate::camera::CameraSource;
use crate::config::{MonitorConfig, Roi};
use crate::log;
use crate::ocr;
use crate::paths;

/// Steps in the calibration wizard.
#[derive(Clone, Copy, Debug, PartialEq)]
enum CalibrationStep {
    /// Capture a reference frame for the user to inspect.
    CaptureFrame,
    /// Collect the top-left corner of the display region.
    TopLeft,
    /// Collect the bottom-right corner of the display region.
    BottomRight,
    /// Run a test OCR pass over the selection and confirm.
    Verify,
}

impl CalibrationStep {
    fn description(&self) -> &'static str {
        match self {
            Self::CaptureFrame => "Capture reference frame",
            Self::TopLeft => "Display region - TOP-LEFT corner",
            Self::BottomRight => "Display region - BOTTOM-RIGHT corner",
            Self::Verify => "Verify with test OCR",
        }
    }

    fn step_number(&self) -> usize {
        match self {
            Self::CaptureFrame => 1,
            Self::TopLeft => 2,
            Self::BottomRight => 3,
            Self::Verify => 4,
        }
    }

    fn total_steps() -> usize {
        4
    }
}

fn announce(step: CalibrationStep) {
    println!(
        "\nStep {}/{}: {}",
        step.step_number(),
        CalibrationStep::total_steps(),
        step.description()
    );
}

/// Parses "x y" or "x,y" into a pixel coordinate pair.
fn parse_point(input: &str) -> Option<(u32, u32)> {
    let mut parts = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty());
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((x, y))
}

fn prompt_point(lines: &mut Lines<StdinLock<'_>>, label: &str) -> Result<(u32, u32)> {
    loop {
        print!("Enter {} as 'x y': ", label);
        std::io::stdout().flush()?;
        let line = lines
            .next()
            .ok_or_else(|| anyhow!("stdin closed during calibration"))??;
        match parse_point(&line) {
            Some(point) => return Ok(point),
            None => println!("Could not parse that, expected two numbers like '120 80'."),
        }
    }
}

enum Choice {
    Save,
    Retry,
    Quit,
}

fn prompt_choice(lines: &mut Lines<StdinLock<'_>>) -> Result<Choice> {
    loop {
        print!("Save this region? (s=save, r=retry, q=quit without saving): ");
        std::io::stdout().flush()?;
        let line = lines
            .next()
            .ok_or_else(|| anyhow!("stdin closed during calibration"))??;
        match line.trim() {
            "s" => return Ok(Choice::Save),
            "r" => return Ok(Choice::Retry),
            "q" => return Ok(Choice::Quit),
            _ => println!("Please answer s, r, or q."),
        }
    }
}

/// Runs the calibration wizard and persists the chosen region.
pub fn run_calibration(config_path: &Path) -> Result<()> {
    let mut config = MonitorConfig::load_or_create(config_path)?;

    println!("\nROI CALIBRATION MODE");
    println!("This positions the temperature display within the camera frame.");

    let mut camera = CameraSource::open_with_fallback(config.camera_index)?;
    let (frame_w, frame_h) = camera.resolution();

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        announce(CalibrationStep::CaptureFrame);
        let frame = camera.read_frame()?;
        let reference_path = paths::get_snapshots_dir().join("calibration_frame.png");
        frame.save(&reference_path)?;
        println!(
            "Reference frame saved: {} ({}x{})",
            reference_path.display(),
            frame_w,
            frame_h
        );
        println!("Open it in an image viewer and note the display's pixel coordinates.");

        announce(CalibrationStep::TopLeft);
        let top_left = prompt_point(&mut lines, "the top-left corner")?;

        announce(CalibrationStep::BottomRight);
        let bottom_right = prompt_point(&mut lines, "the bottom-right corner")?;

        let roi = Roi::from_corners(top_left, bottom_right).clamped(frame_w, frame_h);
        println!(
            "Selected ROI: x={}, y={}, width={}, height={}",
            roi.x, roi.y, roi.width, roi.height
        );

        announce(CalibrationStep::Verify);
        let cropped = ocr::preprocess::crop_roi(&frame, &roi);
        match ocr::extract_temperature(&cropped, &config.ocr_config) {
            Ok(reading) => {
                println!("OCR text: {:?}", reading.raw_text);
                match reading.value {
                    Some(value) => println!("Extracted value: {}", value),
                    None => println!(
                        "No numeric value found. The region may need to fit the digits tighter."
                    ),
                }
            }
            Err(e) => println!("Test OCR failed: {:#}", e),
        }

        match prompt_choice(&mut lines)? {
            Choice::Save => {
                config.roi = roi;
                config.save(config_path)?;
                log(&format!(
                    "ROI saved: x={}, y={}, width={}, height={}",
                    roi.x, roi.y, roi.width, roi.height
                ));
                return Ok(());
            }
            Choice::Retry => continue,
            Choice::Quit => {
                println!("Calibration abandoned, config unchanged.");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point_space_separated() {
        assert_eq!(parse_point("120 80"), Some((120, 80)));
        assert_eq!(parse_point("  120   80  "), Some((120, 80)));
    }

    #[test]
    fn test_parse_point_comma_separated() {
        assert_eq!(parse_point("120,80"), Some((120, 80)));
        assert_eq!(parse_point("120, 80"), Some((120, 80)));
    }

    #[test]
    fn test_parse_point_rejects_garbage() {
        assert_eq!(parse_point(""), None);
        assert_eq!(parse_point("120"), None);
        assert_eq!(parse_point("a b"), None);
        assert_eq!(parse_point("1 2 3"), None);
        assert_eq!(parse_point("-5 10"), None);
    }

    #[test]
    fn test_steps_are_sequential() {
        let steps = [
            CalibrationStep::CaptureFrame,
            CalibrationStep::TopLeft,
            CalibrationStep::BottomRight,
            CalibrationStep::Verify,
        ];
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.step_number(), i + 1);
        }
        assert_eq!(CalibrationStep::total_steps(), steps.len());
    }
}
