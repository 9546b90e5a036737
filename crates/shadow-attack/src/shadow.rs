//! Shadow rasterisation and compositing

use crate::ShadowPolygon;
use image::{GrayImage, Luma, RgbImage};
use imageproc::filter::gaussian_blur_f32;

/// Rasterise a shadow polygon into an 8-bit coverage mask.
///
/// A pixel is covered when its centre lies inside the polygon and, if a
/// sign region is given, inside that region too. With `edge_blur_sigma > 0`
/// the mask edge is softened and then cut back to the sign region, so the
/// shadow never spills onto the background.
pub fn shadow_mask(
    polygon: &ShadowPolygon,
    width: u32,
    height: u32,
    region: Option<&GrayImage>,
    edge_blur_sigma: f32,
) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return mask;
    }

    let in_region = |x: u32, y: u32| region.map_or(true, |r| r.get_pixel(x, y)[0] > 0);

    let (x0, y0, x1, y1) = polygon.bounds();
    if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
        return mask;
    }
    let col_range = |lo: f32, hi: f32, len: u32| -> (u32, u32) {
        let start = lo.floor().max(0.0).min(len as f32) as u32;
        let end = (hi.ceil() + 1.0).max(0.0).min(len as f32) as u32;
        (start, end)
    };
    let (xs, xe) = col_range(x0, x1, width);
    let (ys, ye) = col_range(y0, y1, height);

    for y in ys..ye {
        for x in xs..xe {
            if polygon.contains(x as f32 + 0.5, y as f32 + 0.5) && in_region(x, y) {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }

    if edge_blur_sigma > 0.0 {
        mask = gaussian_blur_f32(&mask, edge_blur_sigma);
        if let Some(region) = region {
            for (x, y, px) in mask.enumerate_pixels_mut() {
                if region.get_pixel(x, y)[0] == 0 {
                    px[0] = 0;
                }
            }
        }
    }

    mask
}

/// Darken `image` under `mask` by `darkness`.
///
/// Each channel is scaled by `1 - darkness * coverage`; results are rounded
/// and clamped to `[0, 255]`. The input is left untouched.
pub fn apply_shadow(image: &RgbImage, mask: &GrayImage, darkness: f32) -> RgbImage {
    let darkness = darkness.clamp(0.0, 1.0);
    let mut out = image.clone();
    for (x, y, px) in out.enumerate_pixels_mut() {
        let coverage = mask.get_pixel(x, y)[0] as f32 / 255.0;
        if coverage == 0.0 {
            continue;
        }
        let factor = 1.0 - darkness * coverage;
        for c in px.0.iter_mut() {
            *c = (*c as f32 * factor).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}
