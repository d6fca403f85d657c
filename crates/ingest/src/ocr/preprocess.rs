//! Contrast stretch applied to rendered pages before recognition.

use image::RgbaImage;

/// Contrast used by the pipeline unless configured otherwise.
pub const DEFAULT_CONTRAST: f32 = 1.5;

/// Standard contrast-correction factor for a contrast value in -255..255.
pub fn contrast_factor(contrast: f32) -> f32 {
    259.0 * (contrast + 255.0) / (255.0 * (259.0 - contrast))
}

/// `out = clamp(factor * (in - 128) + 128)` on the R, G and B channels of
/// every pixel. Alpha is left untouched. The transform is fixed: it does not
/// look at the image's actual brightness distribution.
pub fn stretch_contrast(image: &RgbaImage, contrast: f32) -> RgbaImage {
    let factor = contrast_factor(contrast);
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        for channel in pixel.0.iter_mut().take(3) {
            *channel = stretch(*channel, factor);
        }
    }
    out
}

fn stretch(value: u8, factor: f32) -> u8 {
    (factor * (f32::from(value) - 128.0) + 128.0)
        .round()
        .clamp(0.0, 255.0) as u8
}
