use super::{Color, Offset};
use crate::error::{check_threshold, MaskError, Result};
use crate::postprocess::MaskGrid;
use image::RgbaImage;

/// How the destination alpha channel is treated when a mask is blended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaPolicy {
    /// Covered pixels become fully opaque (alpha 255).
    #[default]
    OpaqueOverlay,
    /// Covered pixels keep their existing alpha.
    BlendedOverlay,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub color: Color,
    /// Overlay opacity in `[0, 1]`: 0 keeps the original pixel, 1 paints the colour.
    pub alpha: f64,
    pub policy: AlphaPolicy,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            color: image::Rgb([0, 114, 189]),
            alpha: 0.5,
            policy: AlphaPolicy::OpaqueOverlay,
        }
    }
}

/// The rectangle of the pixel buffer a mask is stretched over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasRegion {
    pub offset: Offset,
    pub width: u32,
    pub height: u32,
}

impl CanvasRegion {
    pub fn square(offset: Offset, size: u32) -> Self {
        Self {
            offset,
            width: size,
            height: size,
        }
    }

    /// The whole of `image`.
    pub fn covering(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            offset: Offset::ZERO,
            width,
            height,
        }
    }
}

/// Blend `mask` into `pixels` as a translucent solid colour.
///
/// Every mask cell above `threshold` covers the destination block
/// `[floor(x·sx), floor((x+1)·sx)) × [floor(y·sy), floor((y+1)·sy))` of
/// `region`, where `sx = region.width / mask.width` and likewise for y. The
/// blocks partition the region, so no pixel is written twice. Each RGB
/// channel becomes `floor((1 − alpha)·old + alpha·color)`; the alpha channel
/// follows `style.policy`. Pixels outside the covered blocks, and block
/// pixels that fall outside the buffer, are left untouched.
///
/// The caller keeps ownership of `pixels` and must not read it concurrently.
/// Returns the number of pixels written.
pub fn composite_overlay(
    pixels: &mut RgbaImage,
    mask: &MaskGrid,
    threshold: f32,
    style: &OverlayStyle,
    region: CanvasRegion,
) -> Result<usize> {
    check_threshold(threshold)?;
    if !(0.0..=1.0).contains(&style.alpha) {
        return Err(MaskError::InvalidAlpha(style.alpha));
    }

    let _span = tracing::debug_span!("composite").entered();

    let (mask_width, mask_height) = mask.dimensions();
    let (buffer_width, buffer_height) = pixels.dimensions();
    let scale_x = region.width as f64 / mask_width as f64;
    let scale_y = region.height as f64 / mask_height as f64;

    let alpha = style.alpha;
    let keep = 1.0 - alpha;
    let blend =
        |old: u8, color: u8| (keep * f64::from(old) + alpha * f64::from(color)).floor() as u8;

    let mut written = 0usize;

    for y in 0..mask_height {
        let start_y = ((y as f64 * scale_y).floor() as u32).min(region.height);
        let end_y = (((y + 1) as f64 * scale_y).floor() as u32).min(region.height);

        for x in 0..mask_width {
            if mask.get(x, y) <= threshold {
                continue;
            }
            let start_x = ((x as f64 * scale_x).floor() as u32).min(region.width);
            let end_x = (((x + 1) as f64 * scale_x).floor() as u32).min(region.width);

            for py in start_y..end_y {
                let dy = i64::from(region.offset.y) + i64::from(py);
                if dy < 0 || dy >= i64::from(buffer_height) {
                    continue;
                }
                for px in start_x..end_x {
                    let dx = i64::from(region.offset.x) + i64::from(px);
                    if dx < 0 || dx >= i64::from(buffer_width) {
                        continue;
                    }

                    let pixel = pixels.get_pixel_mut(dx as u32, dy as u32);
                    pixel[0] = blend(pixel[0], style.color[0]);
                    pixel[1] = blend(pixel[1], style.color[1]);
                    pixel[2] = blend(pixel[2], style.color[2]);
                    if style.policy == AlphaPolicy::OpaqueOverlay {
                        pixel[3] = 255;
                    }
                    written += 1;
                }
            }
        }
    }

    tracing::debug!(
        "Composited {}x{} mask onto {}x{} region at ({}, {}): {} pixels",
        mask_width,
        mask_height,
        region.width,
        region.height,
        region.offset.x,
        region.offset.y,
        written
    );

    Ok(written)
}

/// Like [`composite_overlay`], but leaves `pixels` alone and returns a blended copy.
pub fn composited(
    pixels: &RgbaImage,
    mask: &MaskGrid,
    threshold: f32,
    style: &OverlayStyle,
    region: CanvasRegion,
) -> Result<RgbaImage> {
    let mut copy = pixels.clone();
    composite_overlay(&mut copy, mask, threshold, style, region)?;
    Ok(copy)
}
