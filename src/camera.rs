//! Camera frame source.
//!
//! Wraps a nokhwa capture device as an exclusively-owned stream of RGB
//! frames. The stream stops when the source drops, so the device is
//! released on every exit path, including errors.

use anyhow::{Context, Result};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::{query, Camera};
use std::io::Write;

use crate::log;

/// Index tried when the configured camera fails to open.
const FALLBACK_INDEX: u32 = 1;

pub struct CameraSource {
    camera: Camera,
    index: u32,
}

impl CameraSource {
    /// Opens the camera at `index` and starts its stream.
    pub fn open(index: u32) -> Result<Self> {
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .with_context(|| format!("Could not open camera {}", index))?;
        camera
            .open_stream()
            .with_context(|| format!("Camera {} opened but not capturing", index))?;
        Ok(Self { camera, index })
    }

    /// Opens the configured camera, trying the secondary index if it fails.
    pub fn open_with_fallback(primary: u32) -> Result<Self> {
        match Self::open(primary) {
            Ok(source) => Ok(source),
            Err(e) if primary != FALLBACK_INDEX => {
                log(&format!("{:#}", e));
                log(&format!("Trying camera {}...", FALLBACK_INDEX));
                Self::open(FALLBACK_INDEX).context("Could not open any camera")
            }
            Err(e) => Err(e),
        }
    }

    /// Reads and decodes one frame.
    pub fn read_frame(&mut self) -> Result<RgbImage> {
        let frame = self.camera.frame().context("Could not read frame")?;
        let image = frame
            .decode_image::<RgbFormat>()
            .context("Could not decode frame")?;
        Ok(image)
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn resolution(&self) -> (u32, u32) {
        let resolution = self.camera.resolution();
        (resolution.width(), resolution.height())
    }

    pub fn frame_rate(&self) -> u32 {
        self.camera.frame_rate()
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        let _ = self.camera.stop_stream();
    }
}

/// A probed, working camera device.
#[derive(Debug, Clone)]
pub struct CameraDescriptor {
    pub index: u32,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Opens a camera briefly and confirms it delivers frames.
pub fn probe_camera(index: u32) -> Result<(u32, u32, u32)> {
    let mut source = CameraSource::open(index)?;
    source.read_frame()?;
    let (width, height) = source.resolution();
    Ok((width, height, source.frame_rate()))
}

/// Scans for cameras that actually deliver frames, printing one line per
/// device found.
pub fn list_available_cameras() -> Vec<CameraDescriptor> {
    println!("\nScanning for available cameras...");
    println!("{}", "-".repeat(50));

    let infos = match query(ApiBackend::Auto) {
        Ok(infos) => infos,
        Err(e) => {
            log(&format!("Camera enumeration failed: {}", e));
            return Vec::new();
        }
    };

    let mut available = Vec::new();
    for info in infos {
        let Ok(index) = info.index().as_index() else {
            continue;
        };
        match probe_camera(index) {
            Ok((width, height, fps)) => {
                println!(
                    "  [{}] {}: {}x{} @ {}fps",
                    index,
                    info.human_name(),
                    width,
                    height,
                    fps
                );
                available.push(CameraDescriptor {
                    index,
                    name: info.human_name(),
                    width,
                    height,
                    fps,
                });
            }
            Err(_) => {
                println!("  [{}] {}: not capturing", index, info.human_name());
            }
        }
    }

    if available.is_empty() {
        println!("  No working cameras found!");
    } else {
        println!("\n  Found {} camera(s)", available.len());
    }
    println!("{}", "-".repeat(50));

    available
}

/// Returns the first camera that passes probing.
pub fn auto_select_camera() -> Option<u32> {
    list_available_cameras().first().map(|cam| cam.index)
}

/// Lists cameras and lets the user pick one on stdin.
/// Returns None when no camera is available or stdin closes.
pub fn select_camera_interactive() -> Result<Option<u32>> {
    let cameras = list_available_cameras();

    if cameras.is_empty() {
        println!("\nNo cameras detected. If using a phone webcam, start the phone app first.");
        return Ok(None);
    }

    if cameras.len() == 1 {
        println!("\nAuto-selecting camera {}", cameras[0].index);
        return Ok(Some(cameras[0].index));
    }

    println!("\nMultiple cameras found. Please select one:");
    for cam in &cameras {
        println!(
            "  {}: {} ({}x{} @ {}fps)",
            cam.index, cam.name, cam.width, cam.height, cam.fps
        );
    }

    loop {
        print!("\nEnter camera number (blank for {}): ", cameras[0].index);
        std::io::stdout().flush()?;

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let choice = line.trim();

        if choice.is_empty() {
            println!("Using default camera {}", cameras[0].index);
            return Ok(Some(cameras[0].index));
        }

        match choice.parse::<u32>() {
            Ok(selected) if cameras.iter().any(|cam| cam.index == selected) => {
                println!("Selected camera {}", selected);
                return Ok(Some(selected));
            }
            Ok(selected) => println!("Camera {} not available. Try again.", selected),
            Err(_) => println!("Please enter a number."),
        }
    }
}
