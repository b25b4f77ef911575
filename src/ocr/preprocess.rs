use image::{GrayImage, ImageBuffer, Luma, RgbImage};

use crate::config::Roi;

/// Crops the region of interest from a frame.
///
/// The rectangle is clamped to the frame bounds first, so the crop never
/// addresses pixels outside the image.
pub fn crop_roi(img: &RgbImage, roi: &Roi) -> RgbImage {
    let (w, h) = img.dimensions();
    let r = roi.clamped(w, h);
    image::imageops::crop_imm(img, r.x, r.y, r.width, r.height).to_image()
}

/// Converts a frame to 8-bit greyscale.
pub fn to_grayscale(img: &RgbImage) -> GrayImage {
    image::imageops::grayscale(img)
}

/// Computes a global binarization level by Otsu's method: the level that
/// maximizes between-class variance of the histogram.
pub fn otsu_level(img: &GrayImage) -> u8 {
    let mut histogram = [0u32; 256];
    for pixel in img.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total = img.width() as u64 * img.height() as u64;
    if total == 0 {
        return 0;
    }

    let sum_all: u64 = histogram
        .iter()
        .enumerate()
        .map(|(value, &count)| value as u64 * count as u64)
        .sum();

    let mut sum_back = 0u64;
    let mut weight_back = 0u64;
    let mut best_level = 0u8;
    let mut best_variance = 0.0f64;

    for level in 0..256usize {
        weight_back += histogram[level] as u64;
        if weight_back == 0 {
            continue;
        }
        let weight_fore = total - weight_back;
        if weight_fore == 0 {
            break;
        }
        sum_back += level as u64 * histogram[level] as u64;

        let mean_back = sum_back as f64 / weight_back as f64;
        let mean_fore = (sum_all - sum_back) as f64 / weight_fore as f64;
        let diff = mean_back - mean_fore;
        let variance = weight_back as f64 * weight_fore as f64 * diff * diff;

        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }

    best_level
}

/// Converts greyscale to binary: pixels above the level become white,
/// everything else black.
pub fn binarize(img: &GrayImage, level: u8) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output = ImageBuffer::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let value = if pixel[0] > level { 255u8 } else { 0u8 };
        output.put_pixel(x, y, Luma([value]));
    }

    output
}

/// Removes isolated noise pixels with a 3x3 median filter.
/// Border pixels use edge-clamped neighborhoods.
pub fn median_denoise(img: &GrayImage) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    let mut output = ImageBuffer::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let mut neighborhood = [0u8; 9];
            let mut i = 0;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let nx = (x as i64 + dx).clamp(0, width as i64 - 1) as u32;
                    let ny = (y as i64 + dy).clamp(0, height as i64 - 1) as u32;
                    neighborhood[i] = img.get_pixel(nx, ny)[0];
                    i += 1;
                }
            }
            neighborhood.sort_unstable();
            output.put_pixel(x, y, Luma([neighborhood[4]]));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_crop_roi() {
        // 100x200 frame with coordinates encoded in the channels
        let img: RgbImage =
            ImageBuffer::from_fn(100, 200, |x, y| Rgb([x as u8, y as u8, 0]));

        let roi = Roi {
            x: 10,
            y: 50,
            width: 50,
            height: 20,
        };
        let cropped = crop_roi(&img, &roi);

        assert_eq!(cropped.dimensions(), (50, 20));
        assert_eq!(cropped.get_pixel(0, 0)[0], 10);
        assert_eq!(cropped.get_pixel(0, 0)[1], 50);
    }

    #[test]
    fn test_crop_roi_clamps() {
        let img: RgbImage = ImageBuffer::new(100, 100);
        let roi = Roi {
            x: 90,
            y: 90,
            width: 50,
            height: 50,
        };
        let cropped = crop_roi(&img, &roi);

        // Only 10x10 pixels remain inside the frame
        assert_eq!(cropped.dimensions(), (10, 10));
    }

    #[test]
    fn test_otsu_separates_bimodal_image() {
        // Half dark (40), half bright (200): the level must fall between
        let img: GrayImage =
            ImageBuffer::from_fn(10, 10, |x, _| Luma([if x < 5 { 40u8 } else { 200u8 }]));

        let level = otsu_level(&img);
        assert!(level >= 40 && level < 200, "level {} out of range", level);
    }

    #[test]
    fn test_otsu_empty_image() {
        let img: GrayImage = ImageBuffer::new(0, 0);
        assert_eq!(otsu_level(&img), 0);
    }

    #[test]
    fn test_binarize() {
        let mut img: GrayImage = ImageBuffer::new(3, 1);
        img.put_pixel(0, 0, Luma([10]));
        img.put_pixel(1, 0, Luma([128]));
        img.put_pixel(2, 0, Luma([250]));

        let result = binarize(&img, 128);
        assert_eq!(result.get_pixel(0, 0)[0], 0);
        assert_eq!(result.get_pixel(1, 0)[0], 0, "level itself is background");
        assert_eq!(result.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn test_median_removes_salt_noise() {
        // Black field with a single white pixel in the middle
        let mut img: GrayImage = ImageBuffer::new(5, 5);
        img.put_pixel(2, 2, Luma([255]));

        let result = median_denoise(&img);
        assert_eq!(result.get_pixel(2, 2)[0], 0);
    }

    #[test]
    fn test_median_preserves_solid_region() {
        let img: GrayImage = ImageBuffer::from_fn(5, 5, |_, _| Luma([255]));
        let result = median_denoise(&img);
        assert!(result.pixels().all(|p| p[0] == 255));
    }
}
