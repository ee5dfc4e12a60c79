//! Fog-over-basemap compositing.

use image::{GrayImage, Rgba, RgbaImage};

/// Composite a fog colour over `base` wherever `mask` is not revealed.
///
/// `mask` is a luminance mask from a [`Compositor`](crate::Compositor)
/// (255 = revealed). `offset` is the pan translation `(dx, dy)` from
/// [`Frame::Translated`](fogmap_core::Frame::Translated): the mask is
/// sampled at `(x - dx, y - dy)` with nearest-neighbour lookup, and
/// pixels that fall outside it are fully fogged. The fog colour's own
/// alpha scales the result, so a translucent fog lets the map show
/// through everywhere.
///
/// The output has the dimensions of `base`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn apply_fog(
    base: &RgbaImage,
    mask: &GrayImage,
    fog: Rgba<u8>,
    offset: (f64, f64),
) -> RgbaImage {
    let (width, height) = base.dimensions();
    let (mask_w, mask_h) = mask.dimensions();
    let (dx, dy) = if offset.0.is_finite() && offset.1.is_finite() {
        offset
    } else {
        tracing::warn!(?offset, "non-finite fog offset, compositing unshifted");
        (0.0, 0.0)
    };
    let fog_alpha = f64::from(fog[3]) / 255.0;

    let sample = |x: u32, y: u32| -> f64 {
        let sx = (f64::from(x) + 0.5 - dx).floor();
        let sy = (f64::from(y) + 0.5 - dy).floor();
        if sx < 0.0 || sy < 0.0 || sx >= f64::from(mask_w) || sy >= f64::from(mask_h) {
            return 0.0;
        }
        f64::from(mask.get_pixel(sx as u32, sy as u32)[0]) / 255.0
    };

    let mut output = RgbaImage::new(width, height);
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        let t = fog_alpha * (1.0 - sample(x, y));
        let under = base.get_pixel(x, y);
        let blend = |b: u8, f: u8| -> u8 {
            let val = f64::from(b).mul_add(1.0 - t, f64::from(f) * t);
            val.round().clamp(0.0, 255.0) as u8
        };
        *pixel = Rgba([
            blend(under[0], fog[0]),
            blend(under[1], fog[1]),
            blend(under[2], fog[2]),
            blend(under[3], 255),
        ]);
    }
    output
}
