//! Pixel operations used by the cascade.
//!
//! All operate on 8-bit grayscale rasters and preserve dimensions.

use image::{GrayImage, Luma};
use imageproc::filter::filter3x3;

/// High-pass kernel, row-major: centre weight 9, all neighbours -1
const SHARPEN_KERNEL: [i32; 9] = [-1, -1, -1, -1, 9, -1, -1, -1, -1];

/// Local mean threshold.
///
/// A pixel becomes 255 when it is brighter than the mean of the
/// `(2 * radius + 1)²` window around it minus `offset`. Windows are clipped
/// at the image border. Uses an integral image, so cost is independent of
/// the radius.
pub fn adaptive_mean_threshold(gray: &GrayImage, radius: u32, offset: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let (w, h) = (width as usize, height as usize);
    let iw = w + 1;

    let mut integral = vec![0i64; iw * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0i64;
        for x in 0..w {
            row_sum += gray.get_pixel(x as u32, y as u32).0[0] as i64;
            integral[(y + 1) * iw + (x + 1)] = row_sum + integral[y * iw + (x + 1)];
        }
    }

    let r = radius as usize;
    let offset = offset as i64;

    GrayImage::from_fn(width, height, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let x0 = x.saturating_sub(r);
        let y0 = y.saturating_sub(r);
        let x1 = (x + r + 1).min(w);
        let y1 = (y + r + 1).min(h);

        let area = ((x1 - x0) * (y1 - y0)) as i64;
        let sum = integral[y1 * iw + x1] - integral[y0 * iw + x1] - integral[y1 * iw + x0]
            + integral[y0 * iw + x0];

        let value = gray.get_pixel(x as u32, y as u32).0[0] as i64;
        // value > sum / area - offset, kept in integers
        if value * area > sum - offset * area {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Convolve with the 3x3 sharpening kernel.
///
/// Border pixels are padded by repeating the edge, and results are clamped
/// to `0..=255`.
pub fn sharpen(gray: &GrayImage) -> GrayImage {
    filter3x3::<Luma<u8>, i32, u8>(gray, &SHARPEN_KERNEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adaptive_threshold_handles_lighting_gradient() {
        // Dark mark on a page that brightens left to right
        let gray = GrayImage::from_fn(40, 20, |x, y| {
            if (18..22).contains(&x) && (8..12).contains(&y) {
                Luma([(x * 3) as u8])
            } else {
                Luma([(100 + x * 3) as u8])
            }
        });

        let out = adaptive_mean_threshold(&gray, 5, 2);

        assert_eq!(out.get_pixel(20, 10).0[0], 0);
        assert_eq!(out.get_pixel(5, 5).0[0], 255);
        assert_eq!(out.get_pixel(30, 15).0[0], 255);
    }

    #[test]
    fn sharpen_leaves_flat_regions_alone() {
        let gray = GrayImage::from_pixel(5, 5, Luma([77]));
        let out = sharpen(&gray);
        assert!(out.pixels().all(|p| p.0[0] == 77));
    }

    #[test]
    fn sharpen_boosts_isolated_peak() {
        let mut gray = GrayImage::from_pixel(5, 5, Luma([100]));
        gray.put_pixel(2, 2, Luma([120]));

        let out = sharpen(&gray);

        // 9 * 120 - 8 * 100 = 280, clamped
        assert_eq!(out.get_pixel(2, 2).0[0], 255);
        // neighbour: 9 * 100 - 7 * 100 - 120 = 80
        assert_eq!(out.get_pixel(1, 2).0[0], 80);
    }

    #[test]
    fn sharpen_pads_border_by_repeating_edge() {
        let gray = GrayImage::from_raw(3, 1, vec![10, 20, 30]).unwrap();
        let out = sharpen(&gray);

        // Left pixel sees [10, 10, 20] on every row: 9*10 - 5*10 - 3*20 = -20
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        // Right pixel sees [20, 30, 30]: 9*30 - 3*20 - 5*30 = 60
        assert_eq!(out.get_pixel(2, 0).0[0], 60);
    }
}
