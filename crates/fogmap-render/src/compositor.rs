//! The `RevealGeometry -> pixels` contract.
//!
//! A [`Compositor`] turns reveal geometry into a luminance mask the size
//! of the output surface: 255 where the map shows through, 0 where the
//! fog is opaque, intermediate values along anti-aliased edges. The
//! [`CompositorKind`] enum selects an implementation at runtime.

use fogmap_core::RevealGeometry;
use image::{GrayImage, Luma};
use tiny_skia::Pixmap;

use crate::mask::StrokeMaskCompositor;
use crate::polygon::PolygonCompositor;

/// Errors from allocating or drawing an output surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// Width or height is zero.
    #[error("invalid output dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// The rasteriser could not allocate a surface of this size.
    #[error("failed to allocate a {width}x{height} pixmap")]
    PixmapAllocation { width: u32, height: u32 },
}

/// Renders reveal geometry into a luminance mask (255 = revealed).
///
/// Geometry coordinates are pixels of the region it was built against.
/// During a pan the caller applies the translation when compositing
/// (see [`apply_fog`](crate::apply_fog)); the mask itself is never
/// shifted.
pub trait Compositor {
    /// Rasterise `geometry` into a `width` x `height` mask.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the dimensions are zero or the surface
    /// cannot be allocated.
    fn reveal_mask(
        &self,
        geometry: &RevealGeometry,
        width: u32,
        height: u32,
    ) -> Result<GrayImage, RenderError>;
}

/// Selects which compositor to use.
///
/// Both produce the same mask up to anti-aliasing and the small outward
/// bulge of polygonised discs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositorKind {
    /// Anti-aliased discs and round-capped strokes drawn straight into
    /// the mask.
    #[default]
    StrokeMask,

    /// World rectangle minus the union of the reveal rings, filled as
    /// fog and inverted.
    Polygon,
}

impl Compositor for CompositorKind {
    fn reveal_mask(
        &self,
        geometry: &RevealGeometry,
        width: u32,
        height: u32,
    ) -> Result<GrayImage, RenderError> {
        match *self {
            Self::StrokeMask => StrokeMaskCompositor.reveal_mask(geometry, width, height),
            Self::Polygon => PolygonCompositor::default().reveal_mask(geometry, width, height),
        }
    }
}

/// Allocate a transparent pixmap, rejecting empty dimensions.
pub(crate) fn new_pixmap(width: u32, height: u32) -> Result<Pixmap, RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidDimensions { width, height });
    }
    Pixmap::new(width, height).ok_or(RenderError::PixmapAllocation { width, height })
}

/// Copy the pixmap's alpha channel into a mask, optionally inverted.
///
/// Alpha is unaffected by premultiplication so no un-premultiply step is
/// needed.
pub(crate) fn alpha_to_mask(pixmap: &Pixmap, invert: bool) -> GrayImage {
    let mut mask = GrayImage::new(pixmap.width(), pixmap.height());
    for (pixel, rgba) in mask.pixels_mut().zip(pixmap.data().chunks_exact(4)) {
        let alpha = rgba[3];
        *pixel = Luma([if invert { 255 - alpha } else { alpha }]);
    }
    mask
}
